use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Local-part rules applied by [`parse_address_with_mode`](super::parse_address_with_mode).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// RFC 5322 dot-atom only.
    #[default]
    Strict,
    /// Also accepts a quoted-string local part.
    Relaxed,
}

/// A syntactically valid address, split into its local part and its
/// IDNA-normalised (ASCII, lowercase) domain.
///
/// Deserialising re-parses the `address` field; `user` and `domain` are
/// derived from it, never taken from the input.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(try_from = "AddressRepr"))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    user: String,
    domain: String,
    address: String,
}

impl Address {
    pub(crate) fn new(user: &str, ascii_domain: &str) -> Self {
        Self {
            user: user.to_string(),
            domain: ascii_domain.to_string(),
            address: format!("{user}@{ascii_domain}"),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `user@domain`, with the domain in its ASCII form.
    pub fn as_str(&self) -> &str {
        &self.address
    }
}

#[cfg(feature = "with-serde")]
#[derive(serde::Deserialize)]
struct AddressRepr {
    address: String,
}

#[cfg(feature = "with-serde")]
impl TryFrom<AddressRepr> for Address {
    type Error = AddressError;

    fn try_from(repr: AddressRepr) -> Result<Self, Self::Error> {
        super::parse_address_with_mode(&repr.address, ValidationMode::Relaxed)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parse_address(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("must contain exactly one '@'")]
    MissingSeparator,
    #[error("invalid email address: {}", reasons.join("; "))]
    Invalid { reasons: Vec<String> },
}

impl AddressError {
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::MissingSeparator => vec![self.to_string()],
            Self::Invalid { reasons } => reasons.clone(),
        }
    }
}
