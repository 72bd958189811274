//! Mail exchanger resolution.
//!
//! [`LookupMx`] is the seam the probe resolves through; [`SystemResolver`]
//! backs it with the system DNS configuration.

mod resolver;
mod types;

pub use resolver::{LookupMx, SystemResolver, resolve_with};
pub use types::MxRecord;
