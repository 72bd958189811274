use std::io;

use thiserror::Error;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

use super::{ClassifiedResponse, ResponseKind, Stage, classify_io};
use crate::error::ErrorKind;

/// Errors raised while opening or driving a probe session.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no mail exchanger accepted a connection for {domain}")]
    NoSuchHost { domain: String },
    #[error("mail exchanger lookup for {domain} failed: {source}")]
    Lookup {
        domain: String,
        #[source]
        source: ResolveError,
    },
    #[error("{host}: {stage} failed: {source}")]
    Io {
        host: String,
        stage: Stage,
        #[source]
        source: io::Error,
    },
    #[error("{host}: {stage} timed out")]
    Timeout { host: String, stage: Stage },
    #[error("{host}: malformed reply during {stage}: {detail}")]
    Protocol {
        host: String,
        stage: Stage,
        detail: String,
    },
    /// The exchanger turned the session down before any recipient was probed.
    #[error("{host}: {stage} refused: {response}")]
    Refused {
        host: String,
        stage: Stage,
        response: ClassifiedResponse,
    },
    /// A recipient probe ended on something other than acceptance.
    #[error("{host}: {stage} answered {response}")]
    Rejected {
        host: String,
        stage: Stage,
        response: ClassifiedResponse,
    },
    /// A command argument would break out of its SMTP line.
    #[error("{stage} argument {value:?} contains line breaks or angle brackets")]
    UnsafeArgument { stage: Stage, value: String },
    #[error("probe session already closed")]
    Closed,
}

impl ProbeError {
    pub(crate) fn io(host: &str, stage: Stage, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::timeout(host, stage),
            _ => Self::Io {
                host: host.to_string(),
                stage,
                source,
            },
        }
    }

    pub(crate) fn timeout(host: &str, stage: Stage) -> Self {
        Self::Timeout {
            host: host.to_string(),
            stage,
        }
    }

    pub(crate) fn protocol(host: &str, stage: Stage, detail: impl Into<String>) -> Self {
        Self::Protocol {
            host: host.to_string(),
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn lookup(domain: &str, source: ResolveError) -> Self {
        Self::Lookup {
            domain: domain.to_string(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSuchHost { .. } => ErrorKind::NoSuchHost,
            Self::Lookup { source, .. } => match source.kind() {
                ResolveErrorKind::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::NoSuchHost,
            },
            Self::Io { source, .. } => classify_io(source)
                .error_kind()
                .unwrap_or(ErrorKind::ConnectionRefused),
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Protocol { .. } => ErrorKind::UnexpectedResponse,
            Self::Refused { response, .. } => match response.kind {
                ResponseKind::Blocked => ErrorKind::Blocked,
                _ => ErrorKind::ConnectionRefused,
            },
            Self::Rejected { response, .. } => response
                .kind
                .error_kind()
                .unwrap_or(ErrorKind::UnexpectedResponse),
            Self::UnsafeArgument { .. } => ErrorKind::EmailParseFailure,
            Self::Closed => ErrorKind::ConnectionRefused,
        }
    }

    /// Rejects values that cannot be embedded in a single command line.
    pub(crate) fn check_argument(stage: Stage, value: &str) -> Result<(), Self> {
        if value.contains(|c: char| c.is_control() || c == '<' || c == '>') {
            return Err(Self::UnsafeArgument {
                stage,
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Whether this failure happened before a TCP connection existed, in
    /// which case the next exchanger candidate is worth trying.
    pub(crate) fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Self::Io {
                stage: Stage::Connect,
                ..
            } | Self::Timeout {
                stage: Stage::Connect,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(code: u16, text: &str) -> ClassifiedResponse {
        ClassifiedResponse::from_reply(super::super::SmtpReply {
            code,
            message: text.to_string(),
        })
    }

    #[test]
    fn rejected_keeps_classified_kind() {
        let err = ProbeError::Rejected {
            host: "mx.example.com".into(),
            stage: Stage::RcptTo,
            response: response(552, "5.2.2 Mailbox full"),
        };
        assert_eq!(err.kind(), ErrorKind::MailboxFull);
        assert_eq!(
            err.to_string(),
            "mx.example.com: RCPT TO answered 552 5.2.2 Mailbox full"
        );
    }

    #[test]
    fn refused_session_is_connection_refused_unless_blocked() {
        let refused = ProbeError::Refused {
            host: "mx".into(),
            stage: Stage::Greeting,
            response: response(554, "No SMTP service here"),
        };
        let blocked = ProbeError::Refused {
            host: "mx".into(),
            stage: Stage::MailFrom,
            response: response(550, "5.7.1 Client host blocked using Spamhaus"),
        };
        assert_eq!(refused.kind(), ErrorKind::ConnectionRefused);
        assert_eq!(blocked.kind(), ErrorKind::Blocked);
    }

    #[test]
    fn read_timeouts_become_timeout() {
        let would_block = io::Error::new(io::ErrorKind::WouldBlock, "resource temporarily unavailable");
        let err = ProbeError::io("mx", Stage::RcptTo, would_block);
        assert!(matches!(err, ProbeError::Timeout { stage: Stage::RcptTo, .. }));
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn connect_failures_are_detected() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(ProbeError::io("mx", Stage::Connect, refused).is_connect_failure());
        assert!(!ProbeError::timeout("mx", Stage::Greeting).is_connect_failure());
    }
}
