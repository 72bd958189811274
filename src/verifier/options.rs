use crate::probe::ProbeOptions;

/// Deployment-wide identity and retry policy of a [`Verifier`](super::Verifier).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOptions {
    /// Announced in `EHLO`/`HELO`.
    pub hello_name: String,
    /// Reverse path used in `MAIL FROM`. Empty means `postmaster@<hello_name>`.
    pub source_address: String,
    /// Extra `RCPT TO` attempts after a temporary rejection.
    pub retries: u32,
    pub probe: ProbeOptions,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            hello_name: "localhost".to_string(),
            source_address: String::new(),
            retries: 3,
            probe: ProbeOptions::default(),
        }
    }
}

impl VerifierOptions {
    pub fn new(hello_name: impl Into<String>, source_address: impl Into<String>) -> Self {
        Self {
            hello_name: hello_name.into(),
            source_address: source_address.into(),
            ..Self::default()
        }
    }

    pub fn source_address(&self) -> String {
        if self.source_address.is_empty() {
            format!("postmaster@{}", self.hello_name)
        } else {
            self.source_address.clone()
        }
    }
}
