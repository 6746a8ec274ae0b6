//! Auth gate: bearer header to trusted identity context.
//!
//! # Invariants
//! - Success requires a valid signature AND the exact token string in the
//!   identity's active set; revocation therefore ends a session even though
//!   its signature still verifies.
//! - Every failure collapses into `CoreError::Unauthenticated`; the reason is
//!   only logged.

use crate::auth::token::TokenIssuer;
use crate::error::{CoreError, CoreResult};
use crate::model::identity::Identity;
use crate::repo::identity_repo::{IdentityFilter, IdentityRepository};
use log::{error, warn};

const BEARER_PREFIX: &str = "Bearer ";

/// Verified caller of a protected operation.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
    /// Raw token that authenticated this request; logout removes exactly it.
    pub token: String,
}

pub struct AuthGate<'r, R: IdentityRepository> {
    repo: &'r R,
    issuer: &'r TokenIssuer,
}

impl<'r, R: IdentityRepository> AuthGate<'r, R> {
    /// Creates a gate that verifies with `issuer` and checks sessions in `repo`.
    pub fn new(repo: &'r R, issuer: &'r TokenIssuer) -> Self {
        Self { repo, issuer }
    }

    /// Resolves the raw `Authorization` header value.
    pub fn authenticate(&self, authorization: Option<&str>) -> CoreResult<AuthContext> {
        let token = extract_bearer(authorization).ok_or_else(|| {
            reject("missing_or_malformed_header");
            CoreError::Unauthenticated
        })?;

        let claims = self.issuer.verify(token).map_err(|err| {
            reject(&format!("token_rejected reason=\"{err}\""));
            CoreError::Unauthenticated
        })?;

        let identity = match self.repo.find_identity(IdentityFilter::Id(claims.sub)) {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                reject(&format!("identity_missing identity_id={}", claims.sub));
                return Err(CoreError::Unauthenticated);
            }
            Err(err) => {
                error!(
                    "event=auth_gate module=auth status=error error_code=identity_lookup_failed identity_id={} error={err}",
                    claims.sub
                );
                return Err(CoreError::Unauthenticated);
            }
        };

        if !identity.holds_token(token) {
            reject(&format!("token_inactive identity_id={}", identity.id));
            return Err(CoreError::Unauthenticated);
        }

        Ok(AuthContext {
            identity,
            token: token.to_string(),
        })
    }
}

/// Extracts `<token>` from `Bearer <token>`.
pub fn extract_bearer(authorization: Option<&str>) -> Option<&str> {
    let token = authorization?.trim().strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

fn reject(reason: &str) {
    warn!("event=auth_gate module=auth status=rejected reason={reason}");
}

#[cfg(test)]
mod tests {
    use super::extract_bearer;

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(Some("  Bearer   abc  ")), Some("abc"));
        assert_eq!(extract_bearer(None), None);
        assert_eq!(extract_bearer(Some("Basic abc")), None);
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(Some("Bearer a b")), None);
    }
}
