use super::{Connect, DeliverabilityProbe, ProbeError, ProbeOptions};
use crate::Deadline;
use crate::mx::{LookupMx, SystemResolver};

/// Opens [`DeliverabilityProbe`]s announcing itself with a fixed identity.
#[derive(Debug, Clone)]
pub struct SmtpConnector<R = SystemResolver> {
    resolver: R,
    hello_name: String,
    source_address: String,
    options: ProbeOptions,
}

impl SmtpConnector<SystemResolver> {
    pub fn new(
        hello_name: impl Into<String>,
        source_address: impl Into<String>,
        options: ProbeOptions,
    ) -> Self {
        Self::with_resolver(SystemResolver, hello_name, source_address, options)
    }
}

impl<R: LookupMx> SmtpConnector<R> {
    pub fn with_resolver(
        resolver: R,
        hello_name: impl Into<String>,
        source_address: impl Into<String>,
        options: ProbeOptions,
    ) -> Self {
        Self {
            resolver,
            hello_name: hello_name.into(),
            source_address: source_address.into(),
            options,
        }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }
}

impl<R: LookupMx> Connect for SmtpConnector<R> {
    type Probe = DeliverabilityProbe;

    fn open(&self, domain: &str, deadline: Deadline) -> Result<Self::Probe, ProbeError> {
        DeliverabilityProbe::open(
            &self.resolver,
            domain,
            &self.hello_name,
            &self.source_address,
            &self.options,
            deadline,
        )
    }
}
