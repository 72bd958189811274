use std::fmt;

/// SMTP dialogue step a reply or failure belongs to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Greeting,
    Hello,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Hello => "EHLO/HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        })
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
/// Multi-line replies are joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// What a reply (or transport failure) means for deliverability.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Accepted,
    /// No such mailbox / user unknown.
    PermanentRejection,
    /// Retry-later codes, greylisting.
    TemporaryRejection,
    MailboxFull,
    /// The domain or exchanger does not exist.
    NoSuchHost,
    /// The exchanger refused or dropped the session.
    ConnectionRefused,
    /// The probing host itself is refused (blocklists, reputation).
    Blocked,
    UnexpectedResponse,
}

/// A reply together with its classification.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedResponse {
    pub code: u16,
    pub text: String,
    pub kind: ResponseKind,
}

impl ClassifiedResponse {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            code,
            kind: super::classify(code, &text),
            text,
        }
    }

    pub fn from_reply(reply: SmtpReply) -> Self {
        Self::new(reply.code, reply.message)
    }

    pub fn is_accepted(&self) -> bool {
        self.kind == ResponseKind::Accepted
    }
}

impl fmt::Display for ClassifiedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text.replace('\n', " "))
    }
}
