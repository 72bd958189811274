//! Verification orchestration.
//!
//! A [`Verifier`] turns one address into a [`Verdict`]: it opens a probe
//! session on the domain, asks for a catch-all first, probes the real
//! recipient only when needed, and folds in the disposable and presence
//! signals. [`run_with_timeout`] bounds the whole run in wall-clock time.

mod error;
mod options;
mod timeout;
mod types;

pub use error::VerifyError;
pub use options::VerifierOptions;
pub use timeout::run_with_timeout;
pub use types::Verdict;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::disposable::{DisposableCheck, DisposableDomains};
use crate::error::ErrorKind;
use crate::presence::{NoPresence, PresenceCheck};
use crate::probe::{Connect, Probe, ProbeError, SmtpConnector};
use crate::{Address, Deadline, parse_address};
use types::{Mailbox, Signals};

/// Runs verifications against one connector and a fixed set of signals.
///
/// Cloning is cheap; collaborators are shared.
pub struct Verifier<C = SmtpConnector> {
    connector: Arc<C>,
    disposable: Arc<dyn DisposableCheck>,
    presence: Arc<dyn PresenceCheck>,
    retries: u32,
}

impl<C> Clone for Verifier<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            disposable: Arc::clone(&self.disposable),
            presence: Arc::clone(&self.presence),
            retries: self.retries,
        }
    }
}

impl Verifier<SmtpConnector> {
    pub fn new(options: VerifierOptions) -> Self {
        let connector = SmtpConnector::new(
            options.hello_name.clone(),
            options.source_address(),
            options.probe.clone(),
        );
        Self::with_connector(connector, options.retries)
    }
}

impl<C: Connect> Verifier<C> {
    /// Uses the built-in disposable list and no presence check.
    pub fn with_connector(connector: C, retries: u32) -> Self {
        Self {
            connector: Arc::new(connector),
            disposable: Arc::new(DisposableDomains::builtin()),
            presence: Arc::new(NoPresence),
            retries,
        }
    }

    pub fn disposable(mut self, check: impl DisposableCheck + 'static) -> Self {
        self.disposable = Arc::new(check);
        self
    }

    pub fn presence(mut self, check: impl PresenceCheck + 'static) -> Self {
        self.presence = Arc::new(check);
        self
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Parses `email` and verifies it. Malformed input fails before any
    /// network activity.
    pub fn verify_email(&self, email: &str) -> Result<Verdict, VerifyError> {
        let address = parse_address(email)?;
        self.verify_address(&address)
    }

    pub fn verify_address(&self, address: &Address) -> Result<Verdict, VerifyError> {
        self.verify_address_until(address, Deadline::none())
    }

    /// Like [`verify_address`](Self::verify_address) with every network
    /// operation clamped to `deadline`.
    pub fn verify_address_until(
        &self,
        address: &Address,
        deadline: Deadline,
    ) -> Result<Verdict, VerifyError> {
        let disposable = self.disposable.is_disposable(address.domain());

        let presence = Arc::clone(&self.presence);
        let (opened, has_presence) = thread::scope(|scope| {
            let lookup = match thread::Builder::new()
                .name("mailprobe-presence".to_string())
                .spawn_scoped(scope, || presence.has_presence(address))
            {
                Ok(handle) => Some(handle),
                Err(err) => {
                    warn!(%address, error = %err, "presence check not started");
                    None
                }
            };
            let opened = self.connector.open(address.domain(), deadline);
            let has_presence = lookup.is_some_and(|handle| {
                handle.join().unwrap_or_else(|_| {
                    warn!(%address, "presence check panicked");
                    false
                })
            });
            (opened, has_presence)
        });

        let mut probe = match opened {
            Ok(probe) => probe,
            Err(err) => {
                debug!(%address, kind = %err.kind(), error = %err, "probe session not opened");
                return Err(err.into());
            }
        };
        let outcome = self.probe_mailbox(&mut probe, address);
        probe.close();

        let mailbox = outcome.map_err(|err| {
            debug!(%address, kind = %err.kind(), error = %err, "recipient probe failed");
            VerifyError::from(err)
        })?;
        let verdict = Verdict::new(
            address.clone(),
            mailbox,
            Signals {
                disposable,
                has_presence,
            },
        );
        info!(
            %address,
            deliverable = verdict.deliverable(),
            catch_all = verdict.catch_all(),
            full_inbox = verdict.full_inbox(),
            disposable,
            has_presence,
            "verified"
        );
        Ok(verdict)
    }

    fn probe_mailbox(&self, probe: &mut C::Probe, address: &Address) -> Result<Mailbox, ProbeError> {
        if probe.has_catch_all(self.retries) {
            return Ok(Mailbox::CatchAll);
        }
        match probe.is_deliverable(address.as_str(), self.retries) {
            Ok(()) => Ok(Mailbox::Deliverable),
            Err(err) if err.kind() == ErrorKind::MailboxFull => Ok(Mailbox::FullInbox),
            Err(err) => Err(err),
        }
    }
}

impl<C> Verifier<C>
where
    C: Connect + Send + Sync + 'static,
{
    /// Verifies on a worker thread and gives up after `timeout`.
    ///
    /// The same deadline bounds the worker's socket operations, so an
    /// abandoned run winds down on its own shortly after.
    pub fn verify_address_timeout(
        &self,
        address: &Address,
        timeout: Duration,
    ) -> Result<Verdict, VerifyError> {
        let verifier = self.clone();
        let address = address.clone();
        let deadline = Deadline::after(timeout);
        run_with_timeout(timeout, move || {
            verifier.verify_address_until(&address, deadline)
        })
    }

    pub fn verify_email_timeout(&self, email: &str, timeout: Duration) -> Result<Verdict, VerifyError> {
        let address = parse_address(email)?;
        self.verify_address_timeout(&address, timeout)
    }
}
