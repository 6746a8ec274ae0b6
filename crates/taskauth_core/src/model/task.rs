//! Task domain model: the owned resource.
//!
//! # Invariants
//! - `owner` is stamped once from the authenticated identity and is never
//!   client-writable.
//! - Only `completed` may change after creation.

use crate::model::identity::IdentityId;
use crate::model::patch::{expect_object, PatchError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Store-assigned task identifier.
pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskValidationError {
    MissingDescription,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDescription => write!(f, "Task description is required"),
        }
    }
}

impl Error for TaskValidationError {}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub completed: bool,
    pub owner: IdentityId,
}

/// Client payload for task creation.
///
/// Unknown keys, including any `owner`, are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTask {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    /// Creates an open task payload with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            completed: false,
        }
    }

    /// Validates the payload and stamps it with its owner.
    pub fn into_draft(self, owner: IdentityId) -> Result<TaskDraft, TaskValidationError> {
        if self.description.trim().is_empty() {
            return Err(TaskValidationError::MissingDescription);
        }
        Ok(TaskDraft {
            description: self.description,
            completed: self.completed,
            owner,
        })
    }
}

/// Insert-ready task record; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub description: String,
    pub completed: bool,
    pub owner: IdentityId,
}

/// Closed set of task fields a client may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Completed,
}

impl TaskField {
    pub const UPDATABLE: [TaskField; 1] = [Self::Completed];

    /// Returns the JSON key for this field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }

    /// Resolves a JSON key; keys outside the allow-list yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::UPDATABLE
            .into_iter()
            .find(|field| field.as_str() == value)
    }
}

/// Typed task patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Parses a client JSON object; any key but `completed` rejects the patch.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PatchError> {
        let object = expect_object(value)?;
        let mut patch = Self::default();

        for (key, value) in object {
            match TaskField::parse(key) {
                Some(TaskField::Completed) => {
                    patch.completed = Some(value.as_bool().ok_or(PatchError::InvalidValue {
                        field: TaskField::Completed.as_str(),
                        expected: "a boolean",
                    })?);
                }
                None => return Err(PatchError::DisallowedField(key.clone())),
            }
        }

        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::{NewTask, TaskPatch, TaskValidationError};
    use crate::model::patch::PatchError;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn owner_in_payload_is_ignored_and_stamped_from_caller() {
        let caller = Uuid::new_v4();
        let payload: NewTask = serde_json::from_value(json!({
            "description": "buy milk",
            "owner": Uuid::new_v4().to_string(),
        }))
        .expect("payload should deserialize");

        let draft = payload.into_draft(caller).expect("draft should be valid");
        assert_eq!(draft.owner, caller);
        assert!(!draft.completed);
    }

    #[test]
    fn blank_description_is_rejected() {
        let err = NewTask::new("   ").into_draft(Uuid::new_v4()).unwrap_err();
        assert_eq!(err, TaskValidationError::MissingDescription);
    }

    #[test]
    fn patch_allows_only_completed() {
        let patch = TaskPatch::from_json(&json!({ "completed": true })).unwrap();
        assert_eq!(patch.completed, Some(true));

        let err = TaskPatch::from_json(&json!({ "completed": true, "description": "x" }))
            .unwrap_err();
        assert_eq!(err, PatchError::DisallowedField("description".to_string()));

        let err = TaskPatch::from_json(&json!({ "completed": "yes" })).unwrap_err();
        assert!(matches!(err, PatchError::InvalidValue { field: "completed", .. }));
    }
}
