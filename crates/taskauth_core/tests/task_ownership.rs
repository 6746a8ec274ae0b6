use rusqlite::Connection;
use taskauth_core::db::open_db_in_memory;
use taskauth_core::{
    CoreError, IdentityDraft, IdentityId, IdentityRepository, NewTask, RepoError,
    SqliteIdentityRepository, SqliteTaskRepository, TaskDraft, TaskListQuery, TaskPatch,
    TaskRepository, TaskService,
};
use uuid::Uuid;

fn insert_identity(conn: &Connection, email: &str) -> IdentityId {
    SqliteIdentityRepository::new(conn)
        .insert_identity(&IdentityDraft {
            name: "Owner".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            age: None,
        })
        .unwrap()
}

#[test]
fn create_then_get_roundtrip_stamps_owner() {
    let conn = open_db_in_memory().unwrap();
    let owner = insert_identity(&conn, "u@example.com");
    let tasks = TaskService::new(SqliteTaskRepository::new(&conn));

    let created = tasks.create(owner, NewTask::new("buy milk")).unwrap();
    let loaded = tasks.get(owner, created.id).unwrap();

    assert_eq!(loaded.description, "buy milk");
    assert!(!loaded.completed);
    assert_eq!(loaded.owner, owner);
}

#[test]
fn other_identity_cannot_see_or_touch_task() {
    let conn = open_db_in_memory().unwrap();
    let alice = insert_identity(&conn, "alice@example.com");
    let bob = insert_identity(&conn, "bob@example.com");
    let tasks = TaskService::new(SqliteTaskRepository::new(&conn));

    let task = tasks.create(alice, NewTask::new("alice's secret")).unwrap();

    assert!(tasks
        .list(bob, &TaskListQuery::default())
        .unwrap()
        .is_empty());
    assert_eq!(tasks.get(bob, task.id).unwrap_err(), CoreError::NotFound);
    assert_eq!(
        tasks
            .update(bob, task.id, TaskPatch { completed: Some(true) })
            .unwrap_err(),
        CoreError::NotFound
    );
    assert_eq!(tasks.delete(bob, task.id).unwrap_err(), CoreError::NotFound);

    // Not-owned and missing are indistinguishable.
    assert_eq!(tasks.get(bob, Uuid::new_v4()).unwrap_err(), CoreError::NotFound);

    let untouched = tasks.get(alice, task.id).unwrap();
    assert!(!untouched.completed);
}

#[test]
fn update_changes_completed_only_for_owner() {
    let conn = open_db_in_memory().unwrap();
    let owner = insert_identity(&conn, "u@example.com");
    let tasks = TaskService::new(SqliteTaskRepository::new(&conn));
    let task = tasks.create(owner, NewTask::new("write report")).unwrap();

    let updated = tasks
        .update(owner, task.id, TaskPatch { completed: Some(true) })
        .unwrap();
    assert!(updated.completed);
    assert_eq!(updated.description, "write report");

    let unchanged = tasks.update(owner, task.id, TaskPatch::default()).unwrap();
    assert!(unchanged.completed);
}

#[test]
fn list_filters_by_completion_and_paginates_in_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let owner = insert_identity(&conn, "u@example.com");
    let other = insert_identity(&conn, "o@example.com");
    let tasks = TaskService::new(SqliteTaskRepository::new(&conn));

    let first = tasks.create(owner, NewTask::new("one")).unwrap();
    let second = tasks.create(owner, NewTask::new("two")).unwrap();
    let third = tasks.create(owner, NewTask::new("three")).unwrap();
    tasks.create(other, NewTask::new("foreign")).unwrap();
    tasks
        .update(owner, second.id, TaskPatch { completed: Some(true) })
        .unwrap();

    let all = tasks.list(owner, &TaskListQuery::default()).unwrap();
    let ids: Vec<_> = all.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);

    let open = tasks
        .list(
            owner,
            &TaskListQuery {
                completed: Some(false),
                ..TaskListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|task| !task.completed));

    let page = tasks
        .list(
            owner,
            &TaskListQuery {
                limit: Some(1),
                offset: 1,
                ..TaskListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, second.id);
}

#[test]
fn delete_removes_task_for_owner() {
    let conn = open_db_in_memory().unwrap();
    let owner = insert_identity(&conn, "u@example.com");
    let tasks = TaskService::new(SqliteTaskRepository::new(&conn));
    let task = tasks.create(owner, NewTask::new("temporary")).unwrap();

    let removed = tasks.delete(owner, task.id).unwrap();
    assert_eq!(removed.id, task.id);
    assert_eq!(tasks.get(owner, task.id).unwrap_err(), CoreError::NotFound);
    assert_eq!(tasks.delete(owner, task.id).unwrap_err(), CoreError::NotFound);
}

#[test]
fn blank_description_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let owner = insert_identity(&conn, "u@example.com");
    let tasks = TaskService::new(SqliteTaskRepository::new(&conn));

    assert!(matches!(
        tasks.create(owner, NewTask::new("")).unwrap_err(),
        CoreError::Validation(_)
    ));
}

#[test]
fn store_requires_existing_owner_and_cascades_on_identity_delete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::new(&conn);

    let orphan = TaskDraft {
        description: "nobody's".to_string(),
        completed: false,
        owner: Uuid::new_v4(),
    };
    assert!(matches!(
        repo.insert_task(&orphan).unwrap_err(),
        RepoError::MissingReference("owner")
    ));

    let owner = insert_identity(&conn, "u@example.com");
    let tasks = TaskService::new(repo);
    let task = tasks.create(owner, NewTask::new("cascade me")).unwrap();

    SqliteIdentityRepository::new(&conn)
        .delete_identity(owner)
        .unwrap()
        .unwrap();
    assert_eq!(tasks.get(owner, task.id).unwrap_err(), CoreError::NotFound);
}
