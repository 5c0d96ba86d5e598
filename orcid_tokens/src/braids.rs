use aliri_braid::braid;
use std::fmt;
use thiserror::Error;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(&self.0, &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// A client ID
#[braid(serde)]
pub struct ClientId;

/// The identity of the party on whose behalf tokens are held
///
/// Tokens in a [`TokenStore`][crate::store::TokenStore] are partitioned by
/// principal, so two users of the same client never see each other's tokens.
#[braid(serde)]
pub struct Principal;

/// Identifies a protected resource, such as the ORCID member API
#[braid(serde)]
pub struct ResourceId;

/// An OAuth2 authorization code
///
/// Valid for a single token exchange only.
#[braid(serde, debug = "owned", display = "owned")]
pub struct AuthorizationCode;

limited_reveal!(AuthorizationCodeRef: "AUTHORIZATION CODE", 5);

/// An access token
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

limited_reveal!(AccessTokenRef: "ACCESS TOKEN", 15);

/// A refresh token
#[braid(serde, debug = "owned", display = "owned")]
pub struct RefreshToken;

limited_reveal!(RefreshTokenRef: "REFRESH TOKEN", 5);

/// An invalid scope token
#[derive(Debug, Error)]
pub enum InvalidScopeToken {
    /// The scope token was the empty string
    #[error("scope token cannot be empty")]
    EmptyString,
    /// The scope token contained an invalid byte
    #[error("invalid scope token byte at position {position}: 0x{value:02x}")]
    InvalidByte {
        /// The index in the scope token where the invalid byte was found
        position: usize,
        /// The invalid byte value
        value: u8,
    },
}

impl From<std::convert::Infallible> for InvalidScopeToken {
    fn from(x: std::convert::Infallible) -> Self {
        match x {}
    }
}

/// An OAuth2 scope token, such as `/read-limited`
///
/// A scope token must be composed of printable ASCII characters excluding
/// ` ` (space), `"` (double quote), and `\` (backslash).
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed reference to an OAuth2 [`ScopeToken`]"
)]
pub struct ScopeToken;

impl aliri_braid::Validator for ScopeToken {
    type Error = InvalidScopeToken;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            Err(InvalidScopeToken::EmptyString)
        } else if let Some((position, &value)) = s
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, &b)| b <= 0x20 || b == 0x22 || b == 0x5C || 0x7F <= b)
        {
            Err(InvalidScopeToken::InvalidByte { position, value })
        } else {
            Ok(())
        }
    }
}

/// An invalid ORCID iD
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidOrcidId {
    /// The identifier is not four groups of four characters separated by `-`
    #[error("ORCID iD must have the form 0000-0000-0000-0000")]
    Malformed,
    /// The identifier contains a character other than a digit, or `X` in
    /// the final position
    #[error("invalid ORCID iD character at position {position}: {value:?}")]
    InvalidCharacter {
        /// The index in the identifier where the invalid character was found
        position: usize,
        /// The invalid character
        value: char,
    },
    /// The final check character does not match the ISO 7064 MOD 11-2 checksum
    #[error("ORCID iD check character should be {expected:?}, found {found:?}")]
    ChecksumMismatch {
        /// The check character computed from the first fifteen digits
        expected: char,
        /// The check character present in the identifier
        found: char,
    },
}

impl From<std::convert::Infallible> for InvalidOrcidId {
    fn from(x: std::convert::Infallible) -> Self {
        match x {}
    }
}

/// An ORCID iD, such as `0000-0002-1825-0097`
///
/// The check character is verified against the ISO 7064 MOD 11-2
/// checksum of the preceding fifteen digits.
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed reference to an [`OrcidId`]"
)]
pub struct OrcidId;

impl aliri_braid::Validator for OrcidId {
    type Error = InvalidOrcidId;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.len() != 19 {
            return Err(InvalidOrcidId::Malformed);
        }

        let mut total = 0u32;
        for (position, value) in s.char_indices() {
            match position {
                4 | 9 | 14 => {
                    if value != '-' {
                        return Err(InvalidOrcidId::Malformed);
                    }
                }
                18 => {
                    let expected = match (12 - total % 11) % 11 {
                        10 => 'X',
                        n => char::from_digit(n, 10).unwrap_or('0'),
                    };
                    if value != 'X' && !value.is_ascii_digit() {
                        return Err(InvalidOrcidId::InvalidCharacter { position, value });
                    }
                    if value != expected {
                        return Err(InvalidOrcidId::ChecksumMismatch {
                            expected,
                            found: value,
                        });
                    }
                }
                _ => match value.to_digit(10) {
                    Some(digit) => total = (total + digit) * 2,
                    None => return Err(InvalidOrcidId::InvalidCharacter { position, value }),
                },
            }
        }

        Ok(())
    }
}
