//! Shared parsing errors for allow-listed partial updates.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure while turning a client JSON patch into a typed patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Patch body was not a JSON object.
    NotAnObject,
    /// Key is outside the record's updatable field set.
    DisallowedField(String),
    /// Key is allowed but carries a value of the wrong shape.
    InvalidValue {
        field: &'static str,
        expected: &'static str,
    },
}

impl Display for PatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "update body must be a JSON object"),
            Self::DisallowedField(field) => write!(f, "field `{field}` cannot be updated"),
            Self::InvalidValue { field, expected } => {
                write!(f, "field `{field}` must be {expected}")
            }
        }
    }
}

impl Error for PatchError {}

pub(crate) fn expect_object(
    value: &serde_json::Value,
) -> Result<&serde_json::Map<String, serde_json::Value>, PatchError> {
    value.as_object().ok_or(PatchError::NotAnObject)
}
