//! Identity repository contract and SQLite implementation.
//!
//! # Invariants
//! - `email` is unique; a conflicting insert/update changes nothing and
//!   returns `RepoError::DuplicateKey("email")`.
//! - `active_tokens` is stored with the identity row and always written in
//!   full. Concurrent read-modify-write cycles are last-writer-wins.

use crate::model::identity::{Identity, IdentityId};
use crate::repo::{classify_write_error, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Number;
use uuid::Uuid;

const IDENTITY_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    password_hash,
    age,
    active_tokens
FROM identities";

/// Insert-ready identity; the password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDraft {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<Number>,
}

/// Predicate for single-identity lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityFilter<'a> {
    Id(IdentityId),
    Email(&'a str),
}

/// Store-level field changes. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub age: Option<Number>,
    pub active_tokens: Option<Vec<String>>,
}

impl IdentityChanges {
    /// Changes that only replace the active token set.
    pub fn tokens(active_tokens: Vec<String>) -> Self {
        Self {
            active_tokens: Some(active_tokens),
            ..Self::default()
        }
    }
}

/// Document-store operations for identity records.
pub trait IdentityRepository {
    fn insert_identity(&self, draft: &IdentityDraft) -> RepoResult<IdentityId>;
    fn find_identity(&self, filter: IdentityFilter<'_>) -> RepoResult<Option<Identity>>;
    fn update_identity(
        &self,
        id: IdentityId,
        changes: &IdentityChanges,
    ) -> RepoResult<Option<Identity>>;
    fn delete_identity(&self, id: IdentityId) -> RepoResult<Option<Identity>>;
}

/// SQLite-backed identity repository.
#[derive(Clone, Copy)]
pub struct SqliteIdentityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityRepository<'conn> {
    /// Creates a repository over an open, migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl IdentityRepository for SqliteIdentityRepository<'_> {
    fn insert_identity(&self, draft: &IdentityDraft) -> RepoResult<IdentityId> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO identities (
                    id,
                    name,
                    email,
                    password_hash,
                    age,
                    active_tokens
                ) VALUES (?1, ?2, ?3, ?4, ?5, '[]');",
                params![
                    id.to_string(),
                    draft.name.as_str(),
                    draft.email.as_str(),
                    draft.password_hash.as_str(),
                    draft.age.as_ref().map(age_to_sql),
                ],
            )
            .map_err(|err| classify_write_error(err, "email", "id"))?;

        Ok(id)
    }

    fn find_identity(&self, filter: IdentityFilter<'_>) -> RepoResult<Option<Identity>> {
        let (column, value) = match filter {
            IdentityFilter::Id(id) => ("id", id.to_string()),
            IdentityFilter::Email(email) => ("email", email.to_string()),
        };

        let mut stmt = self
            .conn
            .prepare(&format!("{IDENTITY_SELECT_SQL} WHERE {column} = ?1;"))?;
        let mut rows = stmt.query([value])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_identity_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_identity(
        &self,
        id: IdentityId,
        changes: &IdentityChanges,
    ) -> RepoResult<Option<Identity>> {
        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = &changes.name {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(email) = &changes.email {
            assignments.push("email = ?");
            bind_values.push(Value::Text(email.clone()));
        }
        if let Some(password_hash) = &changes.password_hash {
            assignments.push("password_hash = ?");
            bind_values.push(Value::Text(password_hash.clone()));
        }
        if let Some(age) = &changes.age {
            assignments.push("age = ?");
            bind_values.push(age_to_sql(age));
        }
        if let Some(tokens) = &changes.active_tokens {
            let encoded = serde_json::to_string(tokens).map_err(|err| {
                RepoError::InvalidData(format!("cannot encode active_tokens: {err}"))
            })?;
            assignments.push("active_tokens = ?");
            bind_values.push(Value::Text(encoded));
        }

        if assignments.is_empty() {
            return self.find_identity(IdentityFilter::Id(id));
        }

        let sql = format!(
            "UPDATE identities
             SET {}, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(id.to_string()));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind_values))
            .map_err(|err| classify_write_error(err, "email", "id"))?;
        if changed == 0 {
            return Ok(None);
        }

        self.find_identity(IdentityFilter::Id(id))
    }

    fn delete_identity(&self, id: IdentityId) -> RepoResult<Option<Identity>> {
        let tx = self.conn.unchecked_transaction()?;
        let existing = tx
            .query_row(
                &format!("{IDENTITY_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_identity_row(row)),
            )
            .optional()?
            .transpose()?;

        if existing.is_some() {
            tx.execute("DELETE FROM identities WHERE id = ?1;", [id.to_string()])?;
        }
        tx.commit()?;

        Ok(existing)
    }
}

fn parse_identity_row(row: &Row<'_>) -> RepoResult<Identity> {
    let id_text: String = row.get("id")?;
    let tokens_text: String = row.get("active_tokens")?;
    let active_tokens = serde_json::from_str::<Vec<String>>(&tokens_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid token list in identities.active_tokens: {err}"
        ))
    })?;

    Ok(Identity {
        id: parse_uuid(&id_text, "identities.id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        age: age_from_sql(row.get("age")?)?,
        active_tokens,
    })
}

/// Whole ages bind as INTEGER, fractional ones as REAL.
fn age_to_sql(age: &Number) -> Value {
    age.as_i64()
        .map(Value::Integer)
        .or_else(|| age.as_f64().map(Value::Real))
        .unwrap_or(Value::Null)
}

fn age_from_sql(value: Value) -> RepoResult<Option<Number>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(whole) => Ok(Some(Number::from(whole))),
        Value::Real(years) => Number::from_f64(years).map(Some).ok_or_else(|| {
            RepoError::InvalidData(format!("non-finite age in identities.age: {years}"))
        }),
        _ => Err(RepoError::InvalidData(
            "identities.age must be numeric".to_string(),
        )),
    }
}
