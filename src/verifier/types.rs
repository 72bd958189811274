use crate::Address;

/// What the recipient probe established about the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mailbox {
    CatchAll,
    Deliverable,
    FullInbox,
}

/// Signals gathered next to the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Signals {
    pub disposable: bool,
    pub has_presence: bool,
}

/// Result of one verification.
///
/// Only the crate builds verdicts, which keeps the flags consistent:
/// a missing host rules out every mailbox flag, a catch-all server implies
/// deliverability, and a full inbox is neither deliverable nor catch-all.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    #[cfg_attr(feature = "with-serde", serde(flatten))]
    address: Address,
    deliverable: bool,
    full_inbox: bool,
    host_exists: bool,
    catch_all: bool,
    disposable: bool,
    has_presence: bool,
}

impl Verdict {
    pub(crate) fn new(address: Address, mailbox: Mailbox, signals: Signals) -> Self {
        Self {
            address,
            deliverable: matches!(mailbox, Mailbox::CatchAll | Mailbox::Deliverable),
            full_inbox: mailbox == Mailbox::FullInbox,
            host_exists: true,
            catch_all: mailbox == Mailbox::CatchAll,
            disposable: signals.disposable,
            has_presence: signals.has_presence,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn deliverable(&self) -> bool {
        self.deliverable
    }

    pub fn full_inbox(&self) -> bool {
        self.full_inbox
    }

    pub fn host_exists(&self) -> bool {
        self.host_exists
    }

    pub fn catch_all(&self) -> bool {
        self.catch_all
    }

    pub fn disposable(&self) -> bool {
        self.disposable
    }

    pub fn has_presence(&self) -> bool {
        self.has_presence
    }

    /// Checks the relations between the flags.
    pub fn is_consistent(&self) -> bool {
        let host = self.host_exists || !(self.deliverable || self.catch_all || self.full_inbox);
        let catch_all = !self.catch_all || self.deliverable;
        let full = !self.full_inbox || !(self.deliverable || self.catch_all);
        host && catch_all && full
    }
}
