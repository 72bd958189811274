use std::time::{Duration, Instant};

/// An optional absolute point in time after which no further network I/O
/// may start. Threaded from the timeout guard down to every socket call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Shrinks a per-operation `budget` to what is left before the deadline.
    /// `None` once the deadline has passed.
    pub fn clamp(&self, budget: Duration) -> Option<Duration> {
        match self.remaining() {
            None => Some(budget),
            Some(left) if left.is_zero() => None,
            Some(left) => Some(budget.min(left)),
        }
    }
}
