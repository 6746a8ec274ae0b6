//! Token-based multi-session authentication with ownership-scoped tasks.
//!
//! Layers, leaf first: `model` (records and validation), `repo` (document
//! store contracts over SQLite), `auth` (hashing, tokens, session registry,
//! auth gate), `service` (use-cases), `api` (HTTP-facing handlers).

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use api::{Api, ApiResponse};
pub use auth::gate::{AuthContext, AuthGate};
pub use auth::password::{CredentialHasher, HashError};
pub use auth::registry::SessionRegistry;
pub use auth::token::{TokenClaims, TokenError, TokenIssuer};
pub use config::{AppConfig, AuthConfig, ConfigError};
pub use error::{CoreError, CoreResult};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::identity::{
    Identity, IdentityField, IdentityId, IdentityPatch, IdentityValidationError, NewIdentity,
    PublicIdentity,
};
pub use model::patch::PatchError;
pub use model::task::{NewTask, Task, TaskDraft, TaskField, TaskId, TaskPatch, TaskValidationError};
pub use repo::identity_repo::{
    IdentityChanges, IdentityDraft, IdentityFilter, IdentityRepository, SqliteIdentityRepository,
};
pub use repo::task_repo::{SqliteTaskRepository, TaskChanges, TaskFilter, TaskRepository};
pub use repo::{Page, RepoError, RepoResult};
pub use service::account_service::{AccountService, SessionGrant};
pub use service::credential_store::CredentialStore;
pub use service::task_service::{TaskListQuery, TaskService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
