//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty (after trimming).
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace inside the address.
    #[error("email cannot contain whitespace")]
    Whitespace,
    /// The input does not contain exactly one @ symbol.
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain part (after @) is empty or has no dot.
    #[error("email domain must look like example.com")]
    InvalidDomain,
}

/// An email address as accepted by the storefront login and registration
/// forms.
///
/// Surrounding whitespace is trimmed. The address must have one `@`, a
/// non-empty local part and a dotted domain.
///
/// ```
/// use shopfront_core::Email;
///
/// let email = Email::parse("  jane.doe@example.com ").unwrap();
/// assert_eq!(email.as_str(), "jane.doe@example.com");
/// assert_eq!(email.username(), "jane.doe");
///
/// assert!(Email::parse("jane@").is_err());
/// assert!(Email::parse("jane@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from user input.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first rule the input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::AtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty()
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
        {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// The part before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or("", |(local, _)| local)
    }

    /// The part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }

    /// Username proposed at registration: the local part of the address.
    #[must_use]
    pub fn username(&self) -> &str {
        self.local_part()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for input in [
            "user@example.com",
            "user.name+tag@example.co.uk",
            "a@b.io",
        ] {
            assert!(Email::parse(input).is_ok(), "{input} should parse");
        }
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        let email = Email::parse("\tuser@example.com \n").unwrap();
        assert_eq!(email.as_str(), "user@example.com");
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("user example.com"), Err(EmailError::Whitespace));
        assert_eq!(Email::parse("userexample.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@example.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("user@"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("user@localhost"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("user@example."), Err(EmailError::InvalidDomain));
    }

    #[test]
    fn test_rejects_overlong_addresses() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        ));
    }

    #[test]
    fn test_username_is_local_part() {
        let email = Email::parse("a@b.com").unwrap();
        assert_eq!(email.username(), "a");
        assert_eq!(email.domain(), "b.com");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = Email::parse("user@example.com").unwrap();
        assert_eq!(
            serde_json::to_string(&email).unwrap(),
            "\"user@example.com\""
        );
    }
}
