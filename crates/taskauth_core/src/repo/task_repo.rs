//! Task repository contract and SQLite implementation.
//!
//! The repository itself is owner-agnostic; owner scoping is applied by
//! `TaskService`, which always sets `TaskFilter::owner`.

use crate::model::identity::IdentityId;
use crate::model::task::{Task, TaskDraft, TaskId};
use crate::repo::{
    classify_write_error, parse_bool, parse_uuid, push_page, Page, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    description,
    completed,
    owner
FROM tasks";

/// Conjunctive predicate over task records. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub id: Option<TaskId>,
    pub owner: Option<IdentityId>,
    pub completed: Option<bool>,
}

impl TaskFilter {
    /// Matches every task of `owner`.
    pub fn owned_by(owner: IdentityId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    /// Narrows the filter to one task id.
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Narrows the filter by completion state when `Some`.
    pub fn with_completed(mut self, completed: Option<bool>) -> Self {
        self.completed = completed;
        self
    }

    fn to_where_clause(self, bind_values: &mut Vec<Value>) -> String {
        let mut sql = String::from(" WHERE 1 = 1");
        if let Some(id) = self.id {
            sql.push_str(" AND id = ?");
            bind_values.push(Value::Text(id.to_string()));
        }
        if let Some(owner) = self.owner {
            sql.push_str(" AND owner = ?");
            bind_values.push(Value::Text(owner.to_string()));
        }
        if let Some(completed) = self.completed {
            sql.push_str(" AND completed = ?");
            bind_values.push(Value::Integer(i64::from(completed)));
        }
        sql
    }
}

/// Store-level task changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub completed: Option<bool>,
}

/// Document-store operations for task records.
pub trait TaskRepository {
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<TaskId>;
    fn find_task(&self, filter: TaskFilter) -> RepoResult<Option<Task>>;
    fn find_tasks(&self, filter: TaskFilter, page: Page) -> RepoResult<Vec<Task>>;
    fn update_task(&self, id: TaskId, changes: TaskChanges) -> RepoResult<Option<Task>>;
    fn delete_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
}

/// SQLite-backed task repository.
#[derive(Clone, Copy)]
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates a repository over an open, migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<TaskId> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO tasks (id, description, completed, owner)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    id.to_string(),
                    draft.description.as_str(),
                    i64::from(draft.completed),
                    draft.owner.to_string(),
                ],
            )
            .map_err(|err| classify_write_error(err, "id", "owner"))?;

        Ok(id)
    }

    fn find_task(&self, filter: TaskFilter) -> RepoResult<Option<Task>> {
        let page = Page {
            limit: Some(1),
            offset: 0,
        };
        Ok(self.find_tasks(filter, page)?.into_iter().next())
    }

    fn find_tasks(&self, filter: TaskFilter, page: Page) -> RepoResult<Vec<Task>> {
        let mut bind_values = Vec::new();
        let mut sql = format!("{TASK_SELECT_SQL}{}", filter.to_where_clause(&mut bind_values));
        sql.push_str(" ORDER BY created_at ASC, rowid ASC");
        push_page(&mut sql, &mut bind_values, page);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        Ok(tasks)
    }

    fn update_task(&self, id: TaskId, changes: TaskChanges) -> RepoResult<Option<Task>> {
        if let Some(completed) = changes.completed {
            let changed = self.conn.execute(
                "UPDATE tasks
                 SET completed = ?1, updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?2;",
                params![i64::from(completed), id.to_string()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }

        self.find_task(TaskFilter::default().with_id(id))
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let tx = self.conn.unchecked_transaction()?;
        let existing = tx
            .query_row(
                &format!("{TASK_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_task_row(row)),
            )
            .optional()?
            .transpose()?;

        if existing.is_some() {
            tx.execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;
        }
        tx.commit()?;

        Ok(existing)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let owner_text: String = row.get("owner")?;
    Ok(Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        description: row.get("description")?,
        completed: parse_bool(row.get("completed")?, "tasks.completed")?,
        owner: parse_uuid(&owner_text, "tasks.owner")?,
    })
}
