//! Disposable (throwaway) mailbox providers.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use phf::phf_set;

/// Membership test for throwaway mailbox domains.
pub trait DisposableCheck: Send + Sync {
    fn is_disposable(&self, domain: &str) -> bool;
}

const BUILTIN: phf::Set<&'static str> = phf_set! {
    "0-mail.com",
    "10minutemail.com",
    "10minutemail.net",
    "20minutemail.com",
    "33mail.com",
    "anonbox.net",
    "discard.email",
    "dispostable.com",
    "dropmail.me",
    "emailondeck.com",
    "fakeinbox.com",
    "getairmail.com",
    "getnada.com",
    "guerrillamail.biz",
    "guerrillamail.com",
    "guerrillamail.de",
    "guerrillamail.info",
    "guerrillamail.net",
    "guerrillamail.org",
    "guerrillamailblock.com",
    "harakirimail.com",
    "incognitomail.org",
    "mailcatch.com",
    "maildrop.cc",
    "mailinator.com",
    "mailinator.net",
    "mailnesia.com",
    "mintemail.com",
    "mohmal.com",
    "mytemp.email",
    "sharklasers.com",
    "spam4.me",
    "spamgourmet.com",
    "temp-mail.org",
    "tempail.com",
    "tempmail.net",
    "tempmailo.com",
    "tempr.email",
    "throwawaymail.com",
    "trashmail.com",
    "trashmail.de",
    "trashmail.net",
    "yopmail.com",
    "yopmail.fr",
    "yopmail.net",
};

/// Built-in provider list, optionally extended from newline-separated lists.
///
/// A domain matches when it, or any parent domain, is listed.
#[derive(Debug, Clone, Default)]
pub struct DisposableDomains {
    extra: HashSet<String>,
}

impl DisposableDomains {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Reads one domain per line; blank lines and `#` comments are skipped.
    pub fn extend_from_reader<R: BufRead>(&mut self, reader: R) -> io::Result<usize> {
        let before = self.extra.len();
        for line in reader.lines() {
            let line = line?;
            let entry = line.split('#').next().unwrap_or_default().trim();
            if !entry.is_empty() {
                self.extra.insert(normalize(entry));
            }
        }
        Ok(self.extra.len() - before)
    }

    pub fn extend_from_file(&mut self, path: impl AsRef<Path>) -> io::Result<usize> {
        let file = File::open(path)?;
        self.extend_from_reader(BufReader::new(file))
    }

    pub fn insert(&mut self, domain: &str) {
        self.extra.insert(normalize(domain));
    }

    fn contains(&self, domain: &str) -> bool {
        BUILTIN.contains(domain) || self.extra.contains(domain)
    }
}

impl DisposableCheck for DisposableDomains {
    fn is_disposable(&self, domain: &str) -> bool {
        let domain = normalize(domain);
        let mut candidate = domain.as_str();
        loop {
            if self.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return false,
            }
        }
    }
}

fn normalize(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}
