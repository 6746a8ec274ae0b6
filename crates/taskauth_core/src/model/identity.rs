//! Identity domain model.
//!
//! # Responsibility
//! - Define the registered account record and its sanitized outward view.
//! - Validate registration candidates and profile patches.
//!
//! # Invariants
//! - `name` is trimmed and at least `MIN_NAME_CHARS` characters.
//! - `email` is trimmed and syntactically valid; uniqueness is a store concern.
//! - `age`, when present, is at least `MIN_AGE`.
//! - `password_hash` and `active_tokens` never leave the core through
//!   serialization; only `PublicIdentity` is `Serialize`.

use crate::model::patch::{expect_object, PatchError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

/// Store-assigned identity identifier.
pub type IdentityId = Uuid;

pub const MIN_NAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MIN_AGE: u32 = 18;

/// Symbols that satisfy the strong-password symbol rule.
pub const PASSWORD_SYMBOLS: &str = "-#!$@£%^&*()_+|~=`{}[]:\";'<>?,./\\ ";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
    )
    .expect("valid email regex")
});

/// Field-level rule violated by an identity candidate or patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityValidationError {
    NameTooShort,
    InvalidEmail,
    WeakPassword,
    Underage,
}

impl Display for IdentityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameTooShort => write!(f, "Name must be at least {MIN_NAME_CHARS} characters"),
            Self::InvalidEmail => write!(f, "Email is invalid"),
            Self::WeakPassword => write!(f, "Weak password"),
            Self::Underage => write!(f, "Age must be at least {MIN_AGE}"),
        }
    }
}

impl Error for IdentityValidationError {}

/// Persisted identity record.
///
/// `Debug` is implemented by hand so the hash and tokens never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<Number>,
    /// Currently valid session tokens, in issue order.
    pub active_tokens: Vec<String>,
}

impl Identity {
    /// Returns whether `token` is one of this identity's live sessions.
    pub fn holds_token(&self, token: &str) -> bool {
        self.active_tokens.iter().any(|active| active == token)
    }

    /// Strips credentials and sessions for outward serialization.
    pub fn public_view(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            age: self.age.clone(),
        }
    }
}

impl Debug for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("age", &self.age)
            .field("active_tokens", &self.active_tokens.len())
            .finish()
    }
}

/// Sanitized identity returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicIdentity {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<Number>,
}

/// Registration candidate as submitted by a client.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct NewIdentity {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub age: Option<Number>,
}

impl NewIdentity {
    /// Checks every rule in declaration order and returns the trimmed candidate.
    pub fn validated(self) -> Result<Self, IdentityValidationError> {
        Ok(Self {
            name: validate_name(&self.name)?,
            email: validate_email(&self.email)?,
            password: validate_password(&self.password)?,
            age: self.age.map(validate_age).transpose()?,
        })
    }
}

impl Debug for NewIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("age", &self.age)
            .finish()
    }
}

/// Closed set of identity fields a client may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Name,
    Email,
    Password,
    Age,
}

impl IdentityField {
    pub const UPDATABLE: [IdentityField; 4] = [Self::Name, Self::Email, Self::Password, Self::Age];

    /// Returns the JSON key for this field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Password => "password",
            Self::Age => "age",
        }
    }

    /// Resolves a JSON key; keys outside the allow-list yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::UPDATABLE
            .into_iter()
            .find(|field| field.as_str() == value)
    }
}

/// Typed self-service profile patch. `None` leaves the field untouched.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct IdentityPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<Number>,
}

impl IdentityPatch {
    /// Parses a client JSON object.
    ///
    /// Any key outside `IdentityField::UPDATABLE` rejects the whole patch.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PatchError> {
        let object = expect_object(value)?;
        let mut patch = Self::default();

        for (key, value) in object {
            let field = IdentityField::parse(key)
                .ok_or_else(|| PatchError::DisallowedField(key.clone()))?;
            match field {
                IdentityField::Name => patch.name = Some(expect_string(field, value)?),
                IdentityField::Email => patch.email = Some(expect_string(field, value)?),
                IdentityField::Password => patch.password = Some(expect_string(field, value)?),
                IdentityField::Age => match value {
                    serde_json::Value::Number(age) => patch.age = Some(age.clone()),
                    _ => {
                        return Err(PatchError::InvalidValue {
                            field: field.as_str(),
                            expected: "a number",
                        })
                    }
                },
            }
        }

        Ok(patch)
    }

    /// Re-validates every present field with the registration rules.
    pub fn validated(self) -> Result<Self, IdentityValidationError> {
        Ok(Self {
            name: self.name.as_deref().map(validate_name).transpose()?,
            email: self.email.as_deref().map(validate_email).transpose()?,
            password: self.password.as_deref().map(validate_password).transpose()?,
            age: self.age.map(validate_age).transpose()?,
        })
    }

    /// Returns whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none() && self.age.is_none()
    }
}

impl Debug for IdentityPatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityPatch")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("age", &self.age)
            .finish()
    }
}

fn expect_string(field: IdentityField, value: &serde_json::Value) -> Result<String, PatchError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or(PatchError::InvalidValue {
            field: field.as_str(),
            expected: "a string",
        })
}

fn validate_name(name: &str) -> Result<String, IdentityValidationError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_NAME_CHARS {
        return Err(IdentityValidationError::NameTooShort);
    }
    Ok(trimmed.to_string())
}

fn validate_email(email: &str) -> Result<String, IdentityValidationError> {
    let trimmed = email.trim();
    if !EMAIL_RE.is_match(trimmed) {
        return Err(IdentityValidationError::InvalidEmail);
    }
    Ok(trimmed.to_string())
}

/// Strong password: at least eight characters with an ASCII lowercase
/// letter, an ASCII uppercase letter, an ASCII digit and one of
/// `PASSWORD_SYMBOLS`.
fn validate_password(password: &str) -> Result<String, IdentityValidationError> {
    let trimmed = password.trim();
    let strong = trimmed.chars().count() >= MIN_PASSWORD_CHARS
        && trimmed.chars().any(|c| c.is_ascii_lowercase())
        && trimmed.chars().any(|c| c.is_ascii_uppercase())
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed.chars().any(|c| PASSWORD_SYMBOLS.contains(c));
    if !strong {
        return Err(IdentityValidationError::WeakPassword);
    }
    Ok(trimmed.to_string())
}

/// Any JSON number is accepted as long as it is at least `MIN_AGE`.
fn validate_age(age: Number) -> Result<Number, IdentityValidationError> {
    let adult = age
        .as_f64()
        .is_some_and(|years| years >= f64::from(MIN_AGE));
    if !adult {
        return Err(IdentityValidationError::Underage);
    }
    Ok(age)
}

#[cfg(test)]
mod tests {
    use super::{IdentityPatch, IdentityValidationError, NewIdentity};
    use crate::model::patch::PatchError;
    use serde_json::json;

    fn candidate() -> NewIdentity {
        NewIdentity {
            name: "  Ada Lovelace ".to_string(),
            email: " ada@example.com ".to_string(),
            password: "Engine#1843".to_string(),
            age: Some(36.into()),
        }
    }

    #[test]
    fn validated_candidate_is_trimmed() {
        let valid = candidate().validated().expect("candidate should be valid");
        assert_eq!(valid.name, "Ada Lovelace");
        assert_eq!(valid.email, "ada@example.com");
    }

    #[test]
    fn first_violated_rule_is_reported() {
        let mut bad = candidate();
        bad.name = "Al".to_string();
        bad.email = "not-an-email".to_string();
        assert_eq!(
            bad.validated().unwrap_err(),
            IdentityValidationError::NameTooShort
        );
    }

    #[test]
    fn rejects_bad_email_weak_password_and_minor() {
        let mut bad_email = candidate();
        bad_email.email = "ada@localhost".to_string();
        assert_eq!(
            bad_email.validated().unwrap_err(),
            IdentityValidationError::InvalidEmail
        );

        for weak in [
            "Sh#1a",
            "alllowercase#1",
            "NoDigits#here",
            "NoSymbol123",
            "Éééééé1#",
            "ÀBCDÉFG1#",
            "Passwörd1€",
        ] {
            let mut bad_password = candidate();
            bad_password.password = weak.to_string();
            assert_eq!(
                bad_password.validated().unwrap_err(),
                IdentityValidationError::WeakPassword,
                "`{weak}` should be rejected"
            );
        }

        let mut minor = candidate();
        minor.age = Some(17.into());
        assert_eq!(
            minor.validated().unwrap_err(),
            IdentityValidationError::Underage
        );
    }

    #[test]
    fn password_classes_are_ascii_with_fixed_symbol_set() {
        for strong in ["Engine#1843", "Pass word1", "Ünïcode£Ok9a"] {
            let mut with_password = candidate();
            with_password.password = strong.to_string();
            assert!(with_password.validated().is_ok(), "`{strong}` should be accepted");
        }
    }

    #[test]
    fn age_accepts_any_number_at_or_above_minimum() {
        let registration = |age: serde_json::Value| {
            serde_json::from_value::<NewIdentity>(json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "password": "Engine#1843",
                "age": age,
            }))
            .expect("numeric age should deserialize")
            .validated()
        };

        let adult = registration(json!(25.5)).expect("fractional adult age is valid");
        assert_eq!(adult.age.and_then(|age| age.as_f64()), Some(25.5));
        assert!(registration(json!(18)).is_ok());

        for underage in [json!(-3), json!(17.5), json!(0)] {
            assert_eq!(
                registration(underage).unwrap_err(),
                IdentityValidationError::Underage
            );
        }
    }

    #[test]
    fn patch_age_is_checked_against_minimum() {
        let patch = IdentityPatch::from_json(&json!({ "age": 17.5 })).unwrap();
        assert_eq!(patch.validated().unwrap_err(), IdentityValidationError::Underage);

        let patch = IdentityPatch::from_json(&json!({ "age": 40.25 })).unwrap();
        assert!(patch.validated().is_ok());
        assert!(IdentityPatch::from_json(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn patch_rejects_fields_outside_allow_list() {
        let err = IdentityPatch::from_json(&json!({ "name": "Grace", "active_tokens": [] }))
            .unwrap_err();
        assert_eq!(err, PatchError::DisallowedField("active_tokens".to_string()));
    }

    #[test]
    fn patch_rejects_wrong_value_shapes() {
        let err = IdentityPatch::from_json(&json!({ "age": "forty" })).unwrap_err();
        assert!(matches!(err, PatchError::InvalidValue { field: "age", .. }));
        assert_eq!(
            IdentityPatch::from_json(&json!(["name"])).unwrap_err(),
            PatchError::NotAnObject
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", candidate());
        assert!(!rendered.contains("Engine#1843"));
    }
}
