use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::probe::ProbeError;
use crate::validator::AddressError;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("email parse failure: {0}")]
    EmailParse(#[from] AddressError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("verification did not finish within {0:?}")]
    Timeout(Duration),
    #[error("could not start verification worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("verification worker stopped without a result")]
    WorkerLost,
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmailParse(_) => ErrorKind::EmailParseFailure,
            Self::Probe(err) => err.kind(),
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Spawn(_) | Self::WorkerLost => ErrorKind::UnexpectedResponse,
        }
    }
}
