/// Anonymous per-device identity
///
/// Public readers never log in. The blog generates a random token once per
/// browser, persists it client-side, and sends it as `user_identifier` with
/// likes, comments and activity events. The server only checks its shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_IDENTIFIER_LEN: usize = 8;
pub const MAX_IDENTIFIER_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("user_identifier is required")]
    Missing,

    #[error("user_identifier must be between 8 and 128 characters")]
    InvalidLength,

    #[error("user_identifier may only contain letters, digits, '-' and '_'")]
    InvalidCharacters,
}

/// A validated anonymous device identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnonymousId(String);

impl AnonymousId {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(IdentityError::Missing);
        }

        if raw.len() < MIN_IDENTIFIER_LEN || raw.len() > MAX_IDENTIFIER_LEN {
            return Err(IdentityError::InvalidLength);
        }

        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(IdentityError::InvalidCharacters);
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AnonymousId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AnonymousId> for String {
    fn from(id: AnonymousId) -> Self {
        id.0
    }
}

impl fmt::Display for AnonymousId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AnonymousId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_uuid_and_nanoid() {
        assert!(AnonymousId::parse("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(AnonymousId::parse("V1StGXR8_Z5jdHi6B-myT").is_ok());
    }

    #[test]
    fn test_trims_whitespace() {
        let id = AnonymousId::parse("  device_42xyz  ").unwrap();
        assert_eq!(id.as_str(), "device_42xyz");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(AnonymousId::parse(""), Err(IdentityError::Missing));
        assert_eq!(AnonymousId::parse("short"), Err(IdentityError::InvalidLength));
        assert_eq!(
            AnonymousId::parse(&"a".repeat(MAX_IDENTIFIER_LEN + 1)),
            Err(IdentityError::InvalidLength)
        );
        assert_eq!(
            AnonymousId::parse("has spaces in it"),
            Err(IdentityError::InvalidCharacters)
        );
        assert_eq!(
            AnonymousId::parse("<script>alert(1)</script>"),
            Err(IdentityError::InvalidCharacters)
        );
    }

    #[test]
    fn test_serde_validates() {
        let id: AnonymousId = serde_json::from_str("\"abcdefgh\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abcdefgh\"");
        assert!(serde_json::from_str::<AnonymousId>("\"abc\"").is_err());
    }
}
