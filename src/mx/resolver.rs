use std::collections::HashSet;
use std::net::IpAddr;

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    system_conf::read_system_conf,
};

use super::MxRecord;
use crate::Deadline;

/// Source of mail exchanger candidates for a domain and of the addresses
/// behind them. Every lookup must give up once `deadline` has passed.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str, deadline: Deadline) -> Result<Vec<MxRecord>, ResolveError>;

    fn lookup_ip(&self, host: &str, deadline: Deadline) -> Result<Vec<IpAddr>, ResolveError>;
}

/// Looks exchangers up through the system resolver configuration, falling
/// back to the domain's own address records when it publishes no MX.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    /// A resolver whose per-query timeout fits in what is left of `deadline`,
    /// with a single attempt so the total stays bounded too.
    fn bounded(deadline: Deadline) -> Result<Resolver, ResolveError> {
        if deadline.is_expired() {
            return Err(ResolveErrorKind::Timeout.into());
        }
        let (config, mut opts) = read_system_conf()?;
        opts.timeout = deadline
            .clamp(opts.timeout)
            .ok_or_else(|| ResolveError::from(ResolveErrorKind::Timeout))?;
        opts.attempts = 1;
        Ok(Resolver::new(config, opts)?)
    }
}

impl LookupMx for SystemResolver {
    fn lookup_mx(&self, domain: &str, deadline: Deadline) -> Result<Vec<MxRecord>, ResolveError> {
        let resolver = Self::bounded(deadline)?;
        lookup_with(&resolver, domain)
    }

    fn lookup_ip(&self, host: &str, deadline: Deadline) -> Result<Vec<IpAddr>, ResolveError> {
        let resolver = Self::bounded(deadline)?;
        Ok(resolver.lookup_ip(host)?.iter().collect())
    }
}

fn lookup_with(resolver: &Resolver, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
    let lookup = match resolver.mx_lookup(domain) {
        Ok(lookup) => lookup,
        Err(err) if is_no_records(&err) => return implicit_exchanger(resolver, domain),
        Err(err) => return Err(err),
    };
    Ok(lookup
        .iter()
        .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(&mx.exchange().to_utf8())))
        // null MX (RFC 7505)
        .filter(|record| !record.exchange.is_empty())
        .collect())
}

// RFC 5321 §5.1: no MX means the domain itself is the exchanger.
fn implicit_exchanger(resolver: &Resolver, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
    match resolver.lookup_ip(domain) {
        Ok(ips) if ips.iter().next().is_some() => Ok(vec![MxRecord::new(0, domain)]),
        Ok(_) => Ok(Vec::new()),
        Err(err) if is_no_records(&err) => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

fn is_no_records(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

/// Returns the candidates for `domain` sorted by preference, without
/// duplicates, keeping at most `max` of them.
pub fn resolve_with<R>(
    resolver: &R,
    domain: &str,
    max: usize,
    deadline: Deadline,
) -> Result<Vec<MxRecord>, ResolveError>
where
    R: LookupMx + ?Sized,
{
    let mut records = resolver.lookup_mx(domain, deadline)?;
    records.sort();
    let mut seen = HashSet::new();
    records.retain(|record| seen.insert(record.exchange.clone()));
    records.truncate(max.max(1));
    Ok(records)
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
impl LookupMx for crate::mx::tests::StubResolver {
    fn lookup_mx(&self, domain: &str, _deadline: Deadline) -> Result<Vec<MxRecord>, ResolveError> {
        (self.on_lookup)(domain)
    }

    fn lookup_ip(&self, host: &str, _deadline: Deadline) -> Result<Vec<IpAddr>, ResolveError> {
        self.addresses
            .get(host)
            .cloned()
            .ok_or_else(|| ResolveError::from(format!("no address records for {host}")))
    }
}
