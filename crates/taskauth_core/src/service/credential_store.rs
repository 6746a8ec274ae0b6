//! Credential store: identity records, password hashing, credential lookup.
//!
//! # Invariants
//! - Plaintext passwords are hashed before reaching the repository and are
//!   not retained afterwards.
//! - `find_by_credentials` fails with one generic error for both unknown
//!   email and wrong password, at comparable cost.

use crate::auth::password::CredentialHasher;
use crate::error::{CoreError, CoreResult};
use crate::model::identity::{Identity, IdentityId, IdentityPatch, NewIdentity};
use crate::repo::identity_repo::{
    IdentityChanges, IdentityDraft, IdentityFilter, IdentityRepository,
};
use log::{error, info, warn};

pub struct CredentialStore<'r, R: IdentityRepository> {
    repo: &'r R,
    hasher: &'r CredentialHasher,
}

impl<'r, R: IdentityRepository> CredentialStore<'r, R> {
    /// Creates a store over the given repository and hasher.
    pub fn new(repo: &'r R, hasher: &'r CredentialHasher) -> Self {
        Self { repo, hasher }
    }

    /// Validates, hashes and persists a new identity with no sessions.
    pub fn create(&self, candidate: NewIdentity) -> CoreResult<Identity> {
        let candidate = candidate.validated()?;
        let draft = IdentityDraft {
            password_hash: self.hasher.hash(&candidate.password)?,
            name: candidate.name,
            email: candidate.email,
            age: candidate.age,
        };

        let id = self.repo.insert_identity(&draft)?;
        info!("event=identity_create module=credentials status=ok identity_id={id}");
        self.read_back(id, "created identity not found in read-back")
    }

    /// Applies an allow-listed patch, re-validating and re-hashing as needed.
    /// An empty patch returns the stored record without a write.
    pub fn update_fields(&self, id: IdentityId, patch: IdentityPatch) -> CoreResult<Identity> {
        if patch.is_empty() {
            return self
                .repo
                .find_identity(IdentityFilter::Id(id))?
                .ok_or(CoreError::NotFound);
        }
        let patch = patch.validated()?;
        let password_hash = patch
            .password
            .as_deref()
            .map(|password| self.hasher.hash(password))
            .transpose()?;
        let changes = IdentityChanges {
            name: patch.name,
            email: patch.email,
            password_hash,
            age: patch.age,
            active_tokens: None,
        };

        let updated = self
            .repo
            .update_identity(id, &changes)?
            .ok_or(CoreError::NotFound)?;
        info!(
            "event=identity_update module=credentials status=ok identity_id={id} password_changed={}",
            changes.password_hash.is_some()
        );
        Ok(updated)
    }

    /// Resolves an identity by email and password.
    pub fn find_by_credentials(&self, email: &str, password: &str) -> CoreResult<Identity> {
        let email = email.trim();
        let password = password.trim();

        match self.repo.find_identity(IdentityFilter::Email(email))? {
            Some(identity) if self.hasher.verify(password, &identity.password_hash) => {
                Ok(identity)
            }
            Some(identity) => {
                warn!(
                    "event=login module=credentials status=rejected identity_id={}",
                    identity.id
                );
                Err(CoreError::Authentication)
            }
            None => {
                // Spend one hash so the unknown-email path costs like a mismatch.
                let _ = self.hasher.hash(password);
                warn!("event=login module=credentials status=rejected identity_id=none");
                Err(CoreError::Authentication)
            }
        }
    }

    /// Removes the identity; owned tasks go with it.
    pub fn delete(&self, id: IdentityId) -> CoreResult<Identity> {
        let removed = self.repo.delete_identity(id)?.ok_or(CoreError::NotFound)?;
        info!("event=identity_delete module=credentials status=ok identity_id={id}");
        Ok(removed)
    }

    fn read_back(&self, id: IdentityId, details: &str) -> CoreResult<Identity> {
        self.repo
            .find_identity(IdentityFilter::Id(id))?
            .ok_or_else(|| {
                error!("event=identity_read_back module=credentials status=error identity_id={id} error={details}");
                CoreError::Internal
            })
    }
}
