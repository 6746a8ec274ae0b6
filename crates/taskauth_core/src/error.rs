//! Caller-facing error taxonomy.
//!
//! # Invariants
//! - Storage and crypto failures never leak their details through
//!   `Display`; they become `Internal` and are logged where they happen.
//! - `Authentication` has one message regardless of which check failed.
//! - `NotFound` does not distinguish "missing" from "owned by someone else".

use crate::auth::password::HashError;
use crate::auth::token::TokenError;
use crate::model::identity::IdentityValidationError;
use crate::model::patch::PatchError;
use crate::model::task::TaskValidationError;
use crate::repo::RepoError;
use log::error;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

pub const AUTHENTICATION_FAILED_MESSAGE: &str = "unable to login";
pub const UNAUTHENTICATED_MESSAGE: &str = "Unauthenticated request";
pub const INVALID_UPDATE_MESSAGE: &str = "Invalid update attempted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A field constraint was violated; carries the first violated rule.
    Validation(String),
    /// A unique field collided with an existing record.
    DuplicateKey(&'static str),
    /// Bad credentials.
    Authentication,
    /// Missing, invalid or revoked session token.
    Unauthenticated,
    /// A patch named a field outside the allow-list.
    InvalidUpdate(String),
    /// Missing or inaccessible resource.
    NotFound,
    /// Anything the caller cannot act on.
    Internal,
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::DuplicateKey(field) => write!(f, "An account with that {field} already exists"),
            Self::Authentication => write!(f, "{AUTHENTICATION_FAILED_MESSAGE}"),
            Self::Unauthenticated => write!(f, "{UNAUTHENTICATED_MESSAGE}"),
            Self::InvalidUpdate(_) => write!(f, "{INVALID_UPDATE_MESSAGE}"),
            Self::NotFound => write!(f, "Not found"),
            Self::Internal => write!(f, "Internal error"),
        }
    }
}

impl Error for CoreError {}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateKey(field) => Self::DuplicateKey(field),
            other => {
                error!("event=store_failure module=core status=error error={other}");
                Self::Internal
            }
        }
    }
}

impl From<IdentityValidationError> for CoreError {
    fn from(value: IdentityValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<TaskValidationError> for CoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<PatchError> for CoreError {
    fn from(value: PatchError) -> Self {
        match value {
            PatchError::DisallowedField(field) => Self::InvalidUpdate(field),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<HashError> for CoreError {
    fn from(value: HashError) -> Self {
        error!("event=hash_failure module=core status=error error={value}");
        Self::Internal
    }
}

impl From<TokenError> for CoreError {
    fn from(value: TokenError) -> Self {
        error!("event=token_failure module=core status=error error={value}");
        Self::Internal
    }
}
