//! Secret string handling with redacted display and serialization.
//!
//! `RedactedString` holds the archive password and the SMTP password. Both end up in places
//! where the whole configuration gets printed (debug dumps, error context), so the value never
//! leaves through `Debug` or `Serialize`.

use bon::Builder;
use derive_more::From;
use getset::Getters;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use std::result;
use validator::Validate;
use zeroize::Zeroize;

/// Placeholder text shown instead of the actual secret in logs/debug output
pub static REDACTED_PASSPHRASE: &str = "###REDACTED_PASSPHRASE###";

/// A string that gets redacted in debug output and serialization
///
/// Memory is zeroed on drop.
#[derive(Validate, Clone, Default, Zeroize, From, Builder, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RedactedString {
    #[validate(length(min = 1, message = "must not be empty"))]
    #[builder(into)]
    inner: String,
}

impl From<&str> for RedactedString {
    fn from(value: &str) -> Self {
        RedactedString::builder().inner(value).build()
    }
}

impl Debug for RedactedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", REDACTED_PASSPHRASE)
    }
}

impl Serialize for RedactedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED_PASSPHRASE)
    }
}

impl<'de> Deserialize<'de> for RedactedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_str(RedactedStringVisitor)
    }
}

impl Drop for RedactedString {
    fn drop(&mut self) {
        self.zeroize();
    }
}

pub struct RedactedStringVisitor;

impl Visitor<'_> for RedactedStringVisitor {
    type Value = RedactedString;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a string")
    }

    /// Deserializes the actual secret from the config file
    fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(RedactedString::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_string_validation() {
        let valid = RedactedString::from("p");
        assert!(valid.validate().is_ok());

        let invalid = RedactedString::default();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_redacted_string_debug() {
        let redacted = RedactedString::from("secret_password");
        assert_eq!(format!("{:?}", redacted), REDACTED_PASSPHRASE);
    }

    #[test]
    fn test_redacted_string_serialize() {
        let redacted = RedactedString::from("secret_password");
        let serialized = serde_json::to_string(&redacted).unwrap();
        assert_eq!(serialized, format!("\"{}\"", REDACTED_PASSPHRASE));
    }

    #[test]
    fn test_redacted_string_deserialize() {
        let redacted: RedactedString = serde_json::from_str("\"actual_password_123\"").unwrap();
        assert_eq!(redacted.inner(), "actual_password_123");
    }

    #[test]
    fn test_redacted_string_zeroize() {
        let mut redacted = RedactedString::from("secret_password");
        redacted.zeroize();
        assert!(redacted.inner().is_empty());
    }
}
