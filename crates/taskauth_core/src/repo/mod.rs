//! Document-store contracts and their SQLite implementations.
//!
//! # Responsibility
//! - Offer per-record `insert` / `find_one` / `find_many` / `update_one` /
//!   `delete_one` operations to the auth and service layers.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Identifiers are generated by the store on insert.
//! - Constraint violations come back as semantic errors (`DuplicateKey`,
//!   `MissingReference`), never as raw SQLite codes.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod identity_repo;
pub mod task_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every record type.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A unique index rejected the write; carries the field name.
    DuplicateKey(&'static str),
    /// A foreign key rejected the write; carries the field name.
    MissingReference(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey(field) => write!(f, "duplicate value for unique field `{field}`"),
            Self::MissingReference(field) => {
                write!(f, "field `{field}` references a missing record")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Limit/offset window applied to `find_many` style queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Maps write failures, turning constraint violations into semantic errors.
pub(crate) fn classify_write_error(
    err: rusqlite::Error,
    unique_field: &'static str,
    reference_field: &'static str,
) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return RepoError::DuplicateKey(unique_field)
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return RepoError::MissingReference(reference_field)
            }
            _ => {}
        }
    }
    err.into()
}

pub(crate) fn parse_uuid(text: &str, column: &str) -> RepoResult<uuid::Uuid> {
    uuid::Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn push_page(sql: &mut String, bind_values: &mut Vec<rusqlite::types::Value>, page: Page) {
    if let Some(limit) = page.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(rusqlite::types::Value::Integer(i64::from(limit)));
        if page.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(rusqlite::types::Value::Integer(i64::from(page.offset)));
        }
    } else if page.offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(rusqlite::types::Value::Integer(i64::from(page.offset)));
    }
}
