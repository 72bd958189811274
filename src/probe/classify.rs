//! Reply classification.
//!
//! Servers are not consistent about status codes, so the leading digit only
//! picks the base class; the reply text (and any RFC 3463 enhanced status
//! code in it) decides the sub-case.

use std::io;
use std::sync::LazyLock;

use regex::Regex;

use super::ResponseKind;

static MAILBOX_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b[45]\.2\.2\b|(mailbox|inbox|in-box|account|user) (is )?(full|over (the )?quota)|over ?quota|quota (exceeded|exceed)|exceeded (its |the )?(storage|quota)|storage allocation|insufficient (storage|space|disk space)|out of (storage|space)|not enough (storage|space)|mailbox size limit",
    )
    .expect("mailbox-full pattern")
});

static UNKNOWN_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b5\.1\.2\b|(unknown|invalid|unresolvable|non-?existent|unrout(e)?able) (recipient |destination )?domain|domain (not found|does not exist|doesn't exist|unknown|is invalid|not resolvable)|no such domain|(host|hostname) (not found|unknown)|unknown host|no such host",
    )
    .expect("unknown-domain pattern")
});

// RFC 3463 x.1.1 (bad mailbox) and x.4.1 (no answer from host, which
// Office 365 uses for unknown recipients), plus the usual wording.
static UNKNOWN_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b5\.[14]\.1\b|(user|recipient|mailbox|account) (unknown|not found|does not exist|doesn't exist|unavailable)|unknown (user|recipient|mailbox)|no such (user|recipient|mailbox|account)|(invalid|nonexistent|non-existent) (user|recipient|mailbox)",
    )
    .expect("unknown-user pattern")
});

// Only wording about the sending side: its host, IP or reputation.
static BLOCKED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bblock(ed|list|listed)\b|black ?list(ed)?|spamhaus|spamcop|\bbanned\b|(sender|sending|ip|client|your) reputation|poor reputation|\b(dnsbl|rbl)\b|(client|sending|sender|your) (host|ip|address)[^.;]*\b(rejected|refused|denied)|rejected as spam",
    )
    .expect("blocked pattern")
});

/// Maps an SMTP status code and reply text to a [`ResponseKind`].
///
/// Total and pure: every input yields exactly one kind.
pub fn classify(code: u16, text: &str) -> ResponseKind {
    match code / 100 {
        2 => ResponseKind::Accepted,
        4 => classify_transient(code, text),
        5 => classify_permanent(code, text),
        _ => ResponseKind::UnexpectedResponse,
    }
}

fn classify_transient(code: u16, text: &str) -> ResponseKind {
    if code == 421 {
        // service closing transmission channel
        return ResponseKind::ConnectionRefused;
    }
    if MAILBOX_FULL.is_match(text) {
        ResponseKind::MailboxFull
    } else if BLOCKED.is_match(text) {
        ResponseKind::Blocked
    } else {
        ResponseKind::TemporaryRejection
    }
}

fn classify_permanent(code: u16, text: &str) -> ResponseKind {
    if MAILBOX_FULL.is_match(text) {
        ResponseKind::MailboxFull
    } else if UNKNOWN_DOMAIN.is_match(text) {
        ResponseKind::NoSuchHost
    } else if UNKNOWN_USER.is_match(text) {
        ResponseKind::PermanentRejection
    } else if BLOCKED.is_match(text) {
        ResponseKind::Blocked
    } else if code == 552 {
        // "requested mail action aborted: exceeded storage allocation"
        ResponseKind::MailboxFull
    } else {
        ResponseKind::PermanentRejection
    }
}

/// Classifies a transport-level failure that prevented any reply.
pub fn classify_io(err: &io::Error) -> ResponseKind {
    use io::ErrorKind::*;
    match err.kind() {
        NotFound | AddrNotAvailable | HostUnreachable | NetworkUnreachable => {
            ResponseKind::NoSuchHost
        }
        InvalidData | InvalidInput => ResponseKind::UnexpectedResponse,
        _ => ResponseKind::ConnectionRefused,
    }
}
