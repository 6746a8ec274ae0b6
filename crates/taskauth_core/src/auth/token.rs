//! Stateless session-token signing and verification.
//!
//! Tokens use the compact HS256 JWT layout
//! `base64url(header).base64url(claims).base64url(hmac_sha256)` so existing
//! JWT tooling can inspect them. Verification is purely computational: it
//! proves this process issued the token, not that the session is still live.

use crate::config::AuthConfig;
use crate::model::identity::IdentityId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not three dot-separated base64url segments.
    Malformed,
    /// Header names an algorithm this issuer does not produce.
    UnsupportedHeader,
    BadSignature,
    /// Signature matched but the claims could not be decoded.
    InvalidClaims(String),
    Signing(String),
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => write!(f, "token is malformed"),
            Self::UnsupportedHeader => write!(f, "token header is not supported"),
            Self::BadSignature => write!(f, "token signature does not match"),
            Self::InvalidClaims(reason) => write!(f, "token claims are invalid: {reason}"),
            Self::Signing(reason) => write!(f, "token signing failed: {reason}"),
        }
    }
}

impl Error for TokenError {}

/// Signed payload. No `exp` claim; a token lives until revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identity the token was issued to.
    pub sub: IdentityId,
    /// Per-token nonce; two logins in the same second still differ.
    pub jti: Uuid,
    /// Issue time in unix seconds.
    pub iat: u64,
}

/// Issues and verifies session tokens with the process signing secret.
#[derive(Clone)]
pub struct TokenIssuer {
    key: Vec<u8>,
    header_segment: String,
}

impl TokenIssuer {
    /// Creates an issuer keyed with the configured signing secret.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: config.signing_secret.as_bytes().to_vec(),
            header_segment: URL_SAFE_NO_PAD.encode(TOKEN_HEADER_JSON),
        }
    }

    /// Signs a fresh token for `identity_id`.
    pub fn issue(&self, identity_id: IdentityId) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: identity_id,
            jti: Uuid::new_v4(),
            iat: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0),
        };
        let claims_json =
            serde_json::to_vec(&claims).map_err(|err| TokenError::Signing(err.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            self.header_segment,
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Checks layout, header and signature, then decodes the claims.
    ///
    /// Says nothing about whether the session is still active.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        if header != self.header_segment {
            return Err(TokenError::UnsupportedHeader);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let signing_input_len = header.len() + 1 + claims.len();
        let mut mac = self.mac()?;
        mac.update(&token.as_bytes()[..signing_input_len]);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|err| TokenError::InvalidClaims(err.to_string()))?;
        serde_json::from_slice(&claims_json).map_err(|err| TokenError::InvalidClaims(err.to_string()))
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.key).map_err(|err| TokenError::Signing(err.to_string()))
    }
}

impl Debug for TokenIssuer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{TokenError, TokenIssuer};
    use crate::config::AuthConfig;
    use uuid::Uuid;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::new(secret).unwrap())
    }

    #[test]
    fn issued_token_verifies_to_its_identity() {
        let issuer = issuer("unit-secret");
        let identity_id = Uuid::new_v4();
        let token = issuer.issue(identity_id).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(issuer.verify(&token).unwrap().sub, identity_id);
    }

    #[test]
    fn tokens_for_same_identity_are_distinct() {
        let issuer = issuer("unit-secret");
        let identity_id = Uuid::new_v4();
        assert_ne!(issuer.issue(identity_id).unwrap(), issuer.issue(identity_id).unwrap());
    }

    #[test]
    fn foreign_secret_fails_signature_check() {
        let token = issuer("secret-a").issue(Uuid::new_v4()).unwrap();
        assert_eq!(
            issuer("secret-b").verify(&token).unwrap_err(),
            TokenError::BadSignature
        );
    }

    #[test]
    fn tampered_claims_fail_signature_check() {
        let issuer = issuer("unit-secret");
        let token = issuer.issue(Uuid::new_v4()).unwrap();
        let other = issuer.issue(Uuid::new_v4()).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert_eq!(issuer.verify(&forged).unwrap_err(), TokenError::BadSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        let issuer = issuer("unit-secret");
        assert_eq!(issuer.verify("not-a-token").unwrap_err(), TokenError::Malformed);
        assert_eq!(issuer.verify("a.b.c.d").unwrap_err(), TokenError::Malformed);
    }
}
