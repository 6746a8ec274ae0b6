//! Per-identity registry of live session tokens.
//!
//! # Invariants
//! - Every mutation is a full read-modify-write of the identity's token set.
//! - Concurrent `register`/`revoke` calls for one identity are not isolated;
//!   the last write wins and may drop a concurrently registered token.

use crate::model::identity::{Identity, IdentityId};
use crate::repo::identity_repo::{IdentityChanges, IdentityFilter, IdentityRepository};
use crate::repo::RepoResult;
use log::info;

/// Session registry over an identity repository.
///
/// Every operation returns the updated identity, or `None` when the identity
/// no longer exists.
pub struct SessionRegistry<'r, R: IdentityRepository> {
    repo: &'r R,
}

impl<'r, R: IdentityRepository> SessionRegistry<'r, R> {
    /// Creates a registry over the identity repository.
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// Appends `token` to the identity's active set.
    pub fn register(&self, identity_id: IdentityId, token: &str) -> RepoResult<Option<Identity>> {
        let Some(identity) = self.repo.find_identity(IdentityFilter::Id(identity_id))? else {
            return Ok(None);
        };

        let mut tokens = identity.active_tokens;
        tokens.push(token.to_string());
        let active_sessions = tokens.len();
        let updated = self
            .repo
            .update_identity(identity_id, &IdentityChanges::tokens(tokens))?;

        info!(
            "event=session_register module=auth status=ok identity_id={identity_id} active_sessions={active_sessions}"
        );
        Ok(updated)
    }

    /// Removes exactly `token`; other sessions stay valid. Absent tokens are
    /// a no-op.
    pub fn revoke(&self, identity_id: IdentityId, token: &str) -> RepoResult<Option<Identity>> {
        let Some(identity) = self.repo.find_identity(IdentityFilter::Id(identity_id))? else {
            return Ok(None);
        };
        if !identity.holds_token(token) {
            return Ok(Some(identity));
        }

        let tokens: Vec<String> = identity
            .active_tokens
            .into_iter()
            .filter(|active| active != token)
            .collect();
        let active_sessions = tokens.len();
        let updated = self
            .repo
            .update_identity(identity_id, &IdentityChanges::tokens(tokens))?;

        info!(
            "event=session_revoke module=auth status=ok identity_id={identity_id} active_sessions={active_sessions}"
        );
        Ok(updated)
    }

    /// Clears the identity's whole active set in one write.
    pub fn revoke_all(&self, identity_id: IdentityId) -> RepoResult<Option<Identity>> {
        let updated = self
            .repo
            .update_identity(identity_id, &IdentityChanges::tokens(Vec::new()))?;

        info!("event=session_revoke_all module=auth status=ok identity_id={identity_id}");
        Ok(updated)
    }
}
