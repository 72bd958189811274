//! Address syntax checks and normalisation.
//!
//! [`parse_address`] is the only way to obtain an [`Address`]; everything
//! downstream relies on its domain already being lowercase ASCII.

mod domain;
mod local;
mod types;

pub use types::{Address, AddressError, ValidationMode};

use domain::normalize_domain;
use local::check_local;

const MAX_ADDRESS_LEN: usize = 254;

/// Parses `email` with [`ValidationMode::Strict`] rules.
pub fn parse_address(email: &str) -> Result<Address, AddressError> {
    parse_address_with_mode(email, ValidationMode::Strict)
}

pub fn parse_address_with_mode(email: &str, mode: ValidationMode) -> Result<Address, AddressError> {
    let input = email.trim();
    let Some((local, domain)) = input.rsplit_once('@') else {
        return Err(AddressError::MissingSeparator);
    };
    if local.contains('@') && !local.starts_with('"') {
        return Err(AddressError::MissingSeparator);
    }

    let mut reasons = Vec::new();
    if input.len() > MAX_ADDRESS_LEN {
        reasons.push(format!("total length {} > {MAX_ADDRESS_LEN}", input.len()));
    }
    check_local(local, mode, &mut reasons);
    let ascii_domain = normalize_domain(domain, &mut reasons);

    match ascii_domain {
        Some(ascii) if reasons.is_empty() => Ok(Address::new(local, &ascii)),
        _ => Err(AddressError::Invalid { reasons }),
    }
}
