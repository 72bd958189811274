#![forbid(unsafe_code)]
//! mailprobe_lib: SMTP deliverability probing for e-mail addresses.
//!
//! [`Verifier`] parses an address, opens an SMTP session on the domain's mail
//! exchanger, checks for a catch-all, probes the recipient with `RCPT TO`
//! (never `DATA`) and reports a [`Verdict`]. Disposable-provider and
//! public-profile signals are folded in alongside.

mod deadline;
pub mod disposable;
pub mod error;
pub mod mx;
pub mod presence;
pub mod probe;
pub mod validator;
pub mod verifier;

pub use deadline::Deadline;
pub use disposable::{DisposableCheck, DisposableDomains};
pub use error::ErrorKind;
pub use mx::{LookupMx, MxRecord, SystemResolver};
pub use presence::{NoPresence, PresenceCheck};
#[cfg(feature = "with-gravatar")]
pub use presence::GravatarPresence;
pub use probe::{
    ClassifiedResponse, Connect, DeliverabilityProbe, Probe, ProbeError, ProbeOptions,
    ResponseKind, SmtpConnector, classify,
};
pub use validator::{Address, AddressError, ValidationMode, parse_address, parse_address_with_mode};
pub use verifier::{Verdict, Verifier, VerifierOptions, VerifyError, run_with_timeout};
