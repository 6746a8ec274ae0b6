//! Session lifecycle and self-service account operations.
//!
//! # Contract
//! - `register` / `login` create a session and return a sanitized identity
//!   together with the new token.
//! - `logout` removes only the token that authenticated the request;
//!   `logout_all` removes every token of the caller.
//! - Nothing returned from here carries a password hash or token set.

use crate::auth::gate::{AuthContext, AuthGate};
use crate::auth::password::CredentialHasher;
use crate::auth::registry::SessionRegistry;
use crate::auth::token::TokenIssuer;
use crate::error::{CoreError, CoreResult};
use crate::model::identity::{Identity, IdentityPatch, NewIdentity, PublicIdentity};
use crate::repo::identity_repo::IdentityRepository;
use crate::service::credential_store::CredentialStore;
use log::{error, info};
use serde::Serialize;

/// Result of a successful register/login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionGrant {
    #[serde(rename = "user")]
    pub identity: PublicIdentity,
    pub token: String,
}

pub struct AccountService<'a, R: IdentityRepository> {
    repo: R,
    hasher: &'a CredentialHasher,
    issuer: &'a TokenIssuer,
}

impl<'a, R: IdentityRepository> AccountService<'a, R> {
    /// Creates a service over the identity repository and shared auth components.
    pub fn new(repo: R, hasher: &'a CredentialHasher, issuer: &'a TokenIssuer) -> Self {
        Self {
            repo,
            hasher,
            issuer,
        }
    }

    /// Creates an identity and opens its first session.
    pub fn register(&self, candidate: NewIdentity) -> CoreResult<SessionGrant> {
        let identity = self.credentials().create(candidate)?;
        self.open_session(identity)
    }

    /// Opens an additional session for valid credentials.
    pub fn login(&self, email: &str, password: &str) -> CoreResult<SessionGrant> {
        let identity = self.credentials().find_by_credentials(email, password)?;
        info!(
            "event=login module=account status=ok identity_id={}",
            identity.id
        );
        self.open_session(identity)
    }

    /// Runs the auth gate for a protected operation.
    pub fn authenticate(&self, authorization: Option<&str>) -> CoreResult<AuthContext> {
        AuthGate::new(&self.repo, self.issuer).authenticate(authorization)
    }

    /// Revokes the token that authenticated `context`.
    pub fn logout(&self, context: &AuthContext) -> CoreResult<()> {
        SessionRegistry::new(&self.repo).revoke(context.identity.id, &context.token)?;
        Ok(())
    }

    /// Revokes every token of the caller.
    pub fn logout_all(&self, context: &AuthContext) -> CoreResult<()> {
        SessionRegistry::new(&self.repo).revoke_all(context.identity.id)?;
        Ok(())
    }

    /// Sanitized view of the caller.
    pub fn profile(&self, context: &AuthContext) -> PublicIdentity {
        context.identity.public_view()
    }

    /// Applies an allow-listed patch to the caller's own record.
    pub fn update_profile(
        &self,
        context: &AuthContext,
        patch: IdentityPatch,
    ) -> CoreResult<PublicIdentity> {
        let updated = self
            .credentials()
            .update_fields(context.identity.id, patch)?;
        Ok(updated.public_view())
    }

    /// Removes the caller's identity; the store cascades to owned tasks.
    pub fn delete_account(&self, context: &AuthContext) -> CoreResult<PublicIdentity> {
        let removed = self.credentials().delete(context.identity.id)?;
        Ok(removed.public_view())
    }

    fn credentials(&self) -> CredentialStore<'_, R> {
        CredentialStore::new(&self.repo, self.hasher)
    }

    fn open_session(&self, identity: Identity) -> CoreResult<SessionGrant> {
        let token = self.issuer.issue(identity.id)?;
        let registered = SessionRegistry::new(&self.repo).register(identity.id, &token)?;
        let Some(identity) = registered else {
            error!(
                "event=session_open module=account status=error identity_id={} error=identity vanished before token registration",
                identity.id
            );
            return Err(CoreError::Internal);
        };

        Ok(SessionGrant {
            identity: identity.public_view(),
            token,
        })
    }
}
