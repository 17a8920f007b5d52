//! Identity provider subject identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Uid`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UidError {
    /// The input string is empty.
    #[error("uid cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("uid must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace or control characters.
    #[error("uid cannot contain whitespace or control characters")]
    InvalidCharacter,
}

/// Opaque, stable subject identifier issued by the identity provider.
///
/// Accounts and admin records are keyed by uid. The value is never
/// interpreted, only compared.
///
/// ```
/// use gadget_pulse_core::Uid;
///
/// let uid = Uid::parse("u1").unwrap();
/// assert_eq!(uid.as_str(), "u1");
/// assert!(Uid::parse("").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Maximum length of a uid accepted by the identity provider.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `Uid` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 128 characters, or
    /// contains whitespace or control characters.
    pub fn parse(s: &str) -> Result<Self, UidError> {
        if s.is_empty() {
            return Err(UidError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(UidError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(UidError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Uid` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Uid {
    type Err = UidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uid {
    type Error = UidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Uid {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Uid {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Uid {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Uid::parse("u1").is_ok());
        assert!(Uid::parse("Xy7Qb2kLmN0pQrStUvWxYz123456").is_ok());
        assert!(Uid::parse(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Uid::parse(""), Err(UidError::Empty));
        assert!(matches!(
            Uid::parse(&"a".repeat(129)),
            Err(UidError::TooLong { max: 128 })
        ));
        assert_eq!(Uid::parse("u 1"), Err(UidError::InvalidCharacter));
        assert_eq!(Uid::parse("u\u{0}1"), Err(UidError::InvalidCharacter));
    }

    #[test]
    fn test_serde_is_plain_string() {
        let uid = Uid::parse("u1").unwrap();
        assert_eq!(serde_json::to_string(&uid).unwrap(), "\"u1\"");
        assert!(serde_json::from_str::<Uid>("\"\"").is_err());
    }
}
