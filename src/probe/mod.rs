//! SMTP deliverability probing.
//!
//! A [`DeliverabilityProbe`] walks one exchanger through greeting, `EHLO` and
//! `MAIL FROM`, then answers recipient questions with `RCPT TO` without ever
//! reaching `DATA`. Replies are interpreted by [`classify`].

mod classify;
mod connector;
mod deliverability;
mod error;
mod options;
mod session;
mod types;
mod util;

pub use classify::{classify, classify_io};
pub use connector::SmtpConnector;
pub use deliverability::{Connect, DeliverabilityProbe, Probe};
pub use error::ProbeError;
pub use options::ProbeOptions;
pub use types::{ClassifiedResponse, ResponseKind, SmtpReply, Stage};

#[cfg(test)]
pub(crate) mod tests;
