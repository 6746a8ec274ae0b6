//! HTTP-facing handlers.
//!
//! # Responsibility
//! - Turn raw request parts (`Authorization` header value, JSON body, path
//!   id) into service calls.
//! - Map results onto status codes and JSON bodies.
//!
//! # Invariants
//! - Routing, transport and request logging stay outside this module.
//! - Protected handlers run the auth gate before anything else.
//! - Response bodies never contain a password, hash or token set; the only
//!   token ever returned is the one just issued by register/login.
//! - Internal failures surface as a bare 500; details go to the log only.

use crate::auth::gate::AuthContext;
use crate::auth::password::{CredentialHasher, HashError};
use crate::auth::token::TokenIssuer;
use crate::config::AuthConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::identity::{IdentityPatch, NewIdentity};
use crate::model::task::{NewTask, TaskId, TaskPatch};
use crate::repo::identity_repo::SqliteIdentityRepository;
use crate::repo::task_repo::SqliteTaskRepository;
use crate::service::account_service::AccountService;
use crate::service::task_service::{TaskListQuery, TaskService};
use log::{error, info};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const MAINTENANCE_MESSAGE: &str = "Under maintenance";

/// Status code and JSON body produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Returns whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Which key carries the message in an error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKey {
    /// Register/login report `{status: message}`.
    Status,
    Error,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Handler set bound to one store connection.
pub struct Api<'conn> {
    conn: &'conn Connection,
    hasher: CredentialHasher,
    issuer: TokenIssuer,
    maintenance: bool,
}

impl<'conn> Api<'conn> {
    /// Binds handlers to `conn` with hasher and issuer built from `auth`.
    pub fn new(conn: &'conn Connection, auth: &AuthConfig) -> Result<Self, HashError> {
        Ok(Self {
            conn,
            hasher: CredentialHasher::new(auth)?,
            issuer: TokenIssuer::new(auth),
            maintenance: false,
        })
    }

    /// Puts every handler into maintenance mode (503).
    pub fn with_maintenance(mut self, maintenance: bool) -> Self {
        self.maintenance = maintenance;
        self
    }

    /// `POST /users`
    pub fn register(&self, body: &Value) -> ApiResponse {
        self.public("register", 201, ErrorKey::Status, || {
            let candidate: NewIdentity = serde_json::from_value(body.clone())
                .map_err(|err| CoreError::Validation(err.to_string()))?;
            to_body(&self.accounts().register(candidate)?)
        })
    }

    /// `POST /users/login`
    pub fn login(&self, body: &Value) -> ApiResponse {
        self.public("login", 200, ErrorKey::Status, || {
            let request: LoginRequest =
                serde_json::from_value(body.clone()).map_err(|_| CoreError::Authentication)?;
            to_body(&self.accounts().login(&request.email, &request.password)?)
        })
    }

    /// `POST /users/logout`
    pub fn logout(&self, authorization: Option<&str>) -> ApiResponse {
        self.protected("logout", authorization, 200, |context| {
            self.accounts().logout(context)?;
            Ok(json!({ "status": "Logged out" }))
        })
    }

    /// `POST /users/logoutAll`
    pub fn logout_all(&self, authorization: Option<&str>) -> ApiResponse {
        self.protected("logout_all", authorization, 200, |context| {
            self.accounts().logout_all(context)?;
            Ok(json!({ "status": "Logged out of all sessions" }))
        })
    }

    /// `GET /users/me`
    pub fn profile(&self, authorization: Option<&str>) -> ApiResponse {
        self.protected("profile", authorization, 200, |context| {
            to_body(&self.accounts().profile(context))
        })
    }

    /// `PATCH /users/me`
    pub fn update_profile(&self, authorization: Option<&str>, body: &Value) -> ApiResponse {
        self.protected("update_profile", authorization, 200, |context| {
            let patch = IdentityPatch::from_json(body)?;
            to_body(&self.accounts().update_profile(context, patch)?)
        })
    }

    /// `DELETE /users/me`
    pub fn delete_account(&self, authorization: Option<&str>) -> ApiResponse {
        self.protected("delete_account", authorization, 202, |context| {
            to_body(&self.accounts().delete_account(context)?)
        })
    }

    /// `GET /tasks`
    pub fn list_tasks(&self, authorization: Option<&str>, query: &TaskListQuery) -> ApiResponse {
        self.protected("list_tasks", authorization, 200, |context| {
            to_body(&self.tasks().list(context.identity.id, query)?)
        })
    }

    /// `GET /tasks/:id`
    pub fn get_task(&self, authorization: Option<&str>, task_id: &str) -> ApiResponse {
        self.protected("get_task", authorization, 200, |context| {
            to_body(&self.tasks().get(context.identity.id, parse_task_id(task_id)?)?)
        })
    }

    /// `POST /tasks`
    pub fn create_task(&self, authorization: Option<&str>, body: &Value) -> ApiResponse {
        self.protected("create_task", authorization, 201, |context| {
            let payload: NewTask = serde_json::from_value(body.clone())
                .map_err(|err| CoreError::Validation(err.to_string()))?;
            to_body(&self.tasks().create(context.identity.id, payload)?)
        })
    }

    /// `PATCH /tasks/:id`
    pub fn update_task(
        &self,
        authorization: Option<&str>,
        task_id: &str,
        body: &Value,
    ) -> ApiResponse {
        self.protected("update_task", authorization, 200, |context| {
            let patch = TaskPatch::from_json(body)?;
            let task_id = parse_task_id(task_id)?;
            to_body(&self.tasks().update(context.identity.id, task_id, patch)?)
        })
    }

    /// `DELETE /tasks/:id`
    pub fn delete_task(&self, authorization: Option<&str>, task_id: &str) -> ApiResponse {
        self.protected("delete_task", authorization, 202, |context| {
            to_body(&self.tasks().delete(context.identity.id, parse_task_id(task_id)?)?)
        })
    }

    fn accounts(&self) -> AccountService<'_, SqliteIdentityRepository<'conn>> {
        AccountService::new(
            SqliteIdentityRepository::new(self.conn),
            &self.hasher,
            &self.issuer,
        )
    }

    fn tasks(&self) -> TaskService<SqliteTaskRepository<'conn>> {
        TaskService::new(SqliteTaskRepository::new(self.conn))
    }

    fn public(
        &self,
        handler: &'static str,
        success: u16,
        key: ErrorKey,
        run: impl FnOnce() -> CoreResult<Value>,
    ) -> ApiResponse {
        if self.maintenance {
            return maintenance_response(handler);
        }
        respond(handler, success, key, run())
    }

    fn protected(
        &self,
        handler: &'static str,
        authorization: Option<&str>,
        success: u16,
        run: impl FnOnce(&AuthContext) -> CoreResult<Value>,
    ) -> ApiResponse {
        if self.maintenance {
            return maintenance_response(handler);
        }
        let result = self
            .accounts()
            .authenticate(authorization)
            .and_then(|context| run(&context));
        respond(handler, success, ErrorKey::Error, result)
    }
}

/// HTTP status for each error kind.
pub fn status_for(err: &CoreError) -> u16 {
    match err {
        CoreError::Validation(_)
        | CoreError::DuplicateKey(_)
        | CoreError::Authentication
        | CoreError::InvalidUpdate(_) => 400,
        CoreError::Unauthenticated => 401,
        CoreError::NotFound => 404,
        CoreError::Internal => 500,
    }
}

fn respond(
    handler: &'static str,
    success: u16,
    key: ErrorKey,
    result: CoreResult<Value>,
) -> ApiResponse {
    let response = match result {
        Ok(body) => ApiResponse {
            status: success,
            body,
        },
        Err(err) => {
            let body = match (key, &err) {
                (_, CoreError::Unauthenticated) | (ErrorKey::Error, _) => {
                    json!({ "error": err.to_string() })
                }
                (ErrorKey::Status, _) => json!({ "status": err.to_string() }),
            };
            ApiResponse {
                status: status_for(&err),
                body,
            }
        }
    };

    if response.status >= 500 {
        error!(
            "event=api_response module=api handler={handler} status=error status_code={}",
            response.status
        );
    } else {
        info!(
            "event=api_response module=api handler={handler} status={} status_code={}",
            if response.is_success() { "ok" } else { "rejected" },
            response.status
        );
    }
    response
}

fn maintenance_response(handler: &'static str) -> ApiResponse {
    info!("event=api_response module=api handler={handler} status=rejected status_code=503 reason=maintenance");
    ApiResponse {
        status: 503,
        body: json!({ "error": MAINTENANCE_MESSAGE }),
    }
}

/// Unparseable ids are indistinguishable from missing tasks.
fn parse_task_id(raw: &str) -> CoreResult<TaskId> {
    TaskId::parse_str(raw.trim()).map_err(|_| CoreError::NotFound)
}

fn to_body<T: Serialize>(value: &T) -> CoreResult<Value> {
    serde_json::to_value(value).map_err(|err| {
        error!("event=api_encode module=api status=error error={err}");
        CoreError::Internal
    })
}

#[cfg(test)]
mod tests {
    use super::status_for;
    use crate::error::CoreError;

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(status_for(&CoreError::Validation("x".into())), 400);
        assert_eq!(status_for(&CoreError::DuplicateKey("email")), 400);
        assert_eq!(status_for(&CoreError::InvalidUpdate("owner".into())), 400);
        assert_eq!(status_for(&CoreError::Authentication), 400);
        assert_eq!(status_for(&CoreError::Unauthenticated), 401);
        assert_eq!(status_for(&CoreError::NotFound), 404);
        assert_eq!(status_for(&CoreError::Internal), 500);
    }
}
