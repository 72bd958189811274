//! Public profile presence: does anything online know this address?

#[cfg(feature = "with-gravatar")]
mod gravatar;

#[cfg(feature = "with-gravatar")]
pub use gravatar::GravatarPresence;

use crate::Address;

/// Read-only existence check keyed by the address.
pub trait PresenceCheck: Send + Sync {
    fn has_presence(&self, address: &Address) -> bool;
}

/// Reports no presence for every address.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPresence;

impl PresenceCheck for NoPresence {
    fn has_presence(&self, _address: &Address) -> bool {
        false
    }
}
