use std::fmt;

use crate::probe::ResponseKind;

/// The kind of failure behind any error a verification can return.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmailParseFailure,
    NoSuchHost,
    ConnectionRefused,
    TemporaryRejection,
    PermanentRejection,
    MailboxFull,
    Blocked,
    UnexpectedResponse,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailParseFailure => "email_parse_failure",
            Self::NoSuchHost => "no_such_host",
            Self::ConnectionRefused => "connection_refused",
            Self::TemporaryRejection => "temporary_rejection",
            Self::PermanentRejection => "permanent_rejection",
            Self::MailboxFull => "mailbox_full",
            Self::Blocked => "blocked",
            Self::UnexpectedResponse => "unexpected_response",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResponseKind {
    /// `None` for [`ResponseKind::Accepted`].
    pub fn error_kind(self) -> Option<ErrorKind> {
        Some(match self {
            Self::Accepted => return None,
            Self::PermanentRejection => ErrorKind::PermanentRejection,
            Self::TemporaryRejection => ErrorKind::TemporaryRejection,
            Self::MailboxFull => ErrorKind::MailboxFull,
            Self::NoSuchHost => ErrorKind::NoSuchHost,
            Self::ConnectionRefused => ErrorKind::ConnectionRefused,
            Self::Blocked => ErrorKind::Blocked,
            Self::UnexpectedResponse => ErrorKind::UnexpectedResponse,
        })
    }
}
