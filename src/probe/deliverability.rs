use tracing::debug;

use super::session::SmtpSession;
use super::util::random_local_part;
use super::{ClassifiedResponse, ProbeError, ProbeOptions, ResponseKind, SmtpReply, Stage};
use crate::Deadline;
use crate::mx::{LookupMx, resolve_with};

/// Recipient probing over an already negotiated session.
pub trait Probe {
    /// Probes a synthetic, unlikely local part at the session's domain.
    /// `true` only when the server accepts it.
    fn has_catch_all(&mut self, retries: u32) -> bool;

    /// Probes `address` in the same mail transaction. `Ok(())` means the
    /// recipient was accepted; every other outcome is an error carrying the
    /// classified reply.
    fn is_deliverable(&mut self, address: &str, retries: u32) -> Result<(), ProbeError>;

    /// Releases the connection. Calling it again is a no-op.
    fn close(&mut self);
}

/// Opens a [`Probe`] for a domain.
pub trait Connect {
    type Probe: Probe;

    fn open(&self, domain: &str, deadline: Deadline) -> Result<Self::Probe, ProbeError>;
}

/// An SMTP session parked right after `MAIL FROM`, ready for `RCPT TO`.
pub struct DeliverabilityProbe {
    domain: String,
    exchanger: String,
    session: Option<SmtpSession>,
}

impl DeliverabilityProbe {
    /// Resolves the exchangers of `domain` and negotiates a session with the
    /// first one that completes greeting, `EHLO` and `MAIL FROM`.
    ///
    /// Fails with [`ProbeError::NoSuchHost`] when no candidate exists or none
    /// accepted a TCP connection. When some candidate connected but turned the
    /// session down, that refusal is returned instead.
    pub fn open<R>(
        resolver: &R,
        domain: &str,
        hello_name: &str,
        source_address: &str,
        options: &ProbeOptions,
        deadline: Deadline,
    ) -> Result<Self, ProbeError>
    where
        R: LookupMx + ?Sized,
    {
        ProbeError::check_argument(Stage::Hello, hello_name)?;
        ProbeError::check_argument(Stage::MailFrom, source_address)?;

        let records = resolve_with(resolver, domain, options.max_exchangers, deadline)
            .map_err(|err| ProbeError::lookup(domain, err))?;

        let mut refusal = None;
        for record in &records {
            match handshake(
                resolver,
                &record.exchange,
                hello_name,
                source_address,
                options,
                deadline,
            ) {
                Ok(session) => {
                    debug!(domain, exchanger = %record.exchange, "probe session ready");
                    return Ok(Self {
                        domain: domain.to_string(),
                        exchanger: record.exchange.clone(),
                        session: Some(session),
                    });
                }
                Err(err @ ProbeError::Timeout { .. }) if deadline.is_expired() => return Err(err),
                Err(err) => {
                    debug!(domain, exchanger = %record.exchange, error = %err, "exchanger unusable");
                    if !err.is_connect_failure() {
                        refusal = Some(err);
                    }
                }
            }
        }

        Err(refusal.unwrap_or_else(|| ProbeError::NoSuchHost {
            domain: domain.to_string(),
        }))
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn exchanger(&self) -> &str {
        &self.exchanger
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Sends `RCPT TO`, re-issuing it while the server answers with a
    /// temporary rejection and `retries` is not used up.
    fn rcpt(&mut self, address: &str, retries: u32) -> Result<ClassifiedResponse, ProbeError> {
        ProbeError::check_argument(Stage::RcptTo, address)?;
        let session = self.session.as_mut().ok_or(ProbeError::Closed)?;
        let command = format!("RCPT TO:<{address}>");
        let mut attempt = 0;
        loop {
            let response =
                ClassifiedResponse::from_reply(session.command(&command, Stage::RcptTo)?);
            if response.kind != ResponseKind::TemporaryRejection || attempt >= retries {
                return Ok(response);
            }
            attempt += 1;
            debug!(address, attempt, retries, %response, "temporary rejection, retrying");
        }
    }
}

impl Probe for DeliverabilityProbe {
    fn has_catch_all(&mut self, retries: u32) -> bool {
        let synthetic = format!("{}@{}", random_local_part(), self.domain);
        match self.rcpt(&synthetic, retries) {
            Ok(response) => {
                debug!(domain = %self.domain, %response, "catch-all probe answered");
                response.is_accepted()
            }
            Err(err) => {
                debug!(domain = %self.domain, error = %err, "catch-all probe failed");
                false
            }
        }
    }

    fn is_deliverable(&mut self, address: &str, retries: u32) -> Result<(), ProbeError> {
        let response = self.rcpt(address, retries)?;
        if response.is_accepted() {
            return Ok(());
        }
        Err(ProbeError::Rejected {
            host: self.exchanger.clone(),
            stage: Stage::RcptTo,
            response,
        })
    }

    fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.quit();
            debug!(exchanger = %self.exchanger, "probe session closed");
        }
    }
}

impl Drop for DeliverabilityProbe {
    fn drop(&mut self) {
        self.close();
    }
}

fn handshake<R>(
    resolver: &R,
    host: &str,
    hello_name: &str,
    source_address: &str,
    options: &ProbeOptions,
    deadline: Deadline,
) -> Result<SmtpSession, ProbeError>
where
    R: LookupMx + ?Sized,
{
    let mut session = SmtpSession::connect(resolver, host, options, deadline)?;
    match negotiate(&mut session, hello_name, source_address) {
        Ok(()) => Ok(session),
        Err(err) => {
            session.quit();
            Err(err)
        }
    }
}

fn negotiate(
    session: &mut SmtpSession,
    hello_name: &str,
    source_address: &str,
) -> Result<(), ProbeError> {
    let greeting = session.read_reply(Stage::Greeting)?;
    expect_accepted(session, Stage::Greeting, greeting)?;

    let ehlo = session.command(&format!("EHLO {hello_name}"), Stage::Hello)?;
    if ehlo.code / 100 == 5 {
        // RFC 5321 §4.1.4: servers without ESMTP still speak HELO
        let helo = session.command(&format!("HELO {hello_name}"), Stage::Hello)?;
        expect_accepted(session, Stage::Hello, helo)?;
    } else {
        expect_accepted(session, Stage::Hello, ehlo)?;
    }

    let mail = session.command(&format!("MAIL FROM:<{source_address}>"), Stage::MailFrom)?;
    expect_accepted(session, Stage::MailFrom, mail)
}

fn expect_accepted(session: &SmtpSession, stage: Stage, reply: SmtpReply) -> Result<(), ProbeError> {
    let response = ClassifiedResponse::from_reply(reply);
    if response.is_accepted() {
        return Ok(());
    }
    Err(ProbeError::Refused {
        host: session.host().to_string(),
        stage,
        response,
    })
}
