//! Ownership-scoped task use-cases.
//!
//! # Invariants
//! - Every lookup carries `owner == caller`; a task owned by someone else
//!   is reported exactly like a missing one (`CoreError::NotFound`).
//! - `owner` comes from the authenticated caller, never from the payload.
//! - Patches are allow-listed to `completed`; a rejected patch leaves the
//!   task untouched.

use crate::error::{CoreError, CoreResult};
use crate::model::identity::IdentityId;
use crate::model::task::{NewTask, Task, TaskId, TaskPatch};
use crate::repo::task_repo::{TaskChanges, TaskFilter, TaskRepository};
use crate::repo::Page;
use log::info;

/// Listing options layered on top of the owner filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub completed: Option<bool>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists the caller's tasks in creation order.
    pub fn list(&self, owner: IdentityId, query: &TaskListQuery) -> CoreResult<Vec<Task>> {
        let filter = TaskFilter::owned_by(owner).with_completed(query.completed);
        let page = Page {
            limit: query.limit,
            offset: query.offset,
        };
        Ok(self.repo.find_tasks(filter, page)?)
    }

    /// Fetches one of the caller's tasks.
    pub fn get(&self, owner: IdentityId, task_id: TaskId) -> CoreResult<Task> {
        self.repo
            .find_task(TaskFilter::owned_by(owner).with_id(task_id))?
            .ok_or(CoreError::NotFound)
    }

    /// Creates a task owned by the caller.
    pub fn create(&self, owner: IdentityId, payload: NewTask) -> CoreResult<Task> {
        let draft = payload.into_draft(owner)?;
        let task_id = self.repo.insert_task(&draft)?;
        info!("event=task_create module=tasks status=ok task_id={task_id} owner={owner}");
        self.get(owner, task_id)
    }

    /// Applies an allow-listed patch to one of the caller's tasks.
    pub fn update(&self, owner: IdentityId, task_id: TaskId, patch: TaskPatch) -> CoreResult<Task> {
        let task = self.get(owner, task_id)?;
        let changes = TaskChanges {
            completed: patch.completed,
        };
        let updated = self
            .repo
            .update_task(task.id, changes)?
            .ok_or(CoreError::NotFound)?;
        info!(
            "event=task_update module=tasks status=ok task_id={task_id} owner={owner} completed={}",
            updated.completed
        );
        Ok(updated)
    }

    /// Deletes one of the caller's tasks and returns it.
    pub fn delete(&self, owner: IdentityId, task_id: TaskId) -> CoreResult<Task> {
        let task = self.get(owner, task_id)?;
        let removed = self
            .repo
            .delete_task(task.id)?
            .ok_or(CoreError::NotFound)?;
        info!("event=task_delete module=tasks status=ok task_id={task_id} owner={owner}");
        Ok(removed)
    }
}
