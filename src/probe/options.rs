use std::time::Duration;

/// Network knobs for one probe session. Every connect/read/write is also
/// clamped to whatever remains of the caller's [`Deadline`](crate::Deadline).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    /// Exchanger candidates tried before giving up on the domain.
    pub max_exchangers: usize,
    pub ipv6: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            max_exchangers: 3,
            ipv6: false,
        }
    }
}
