use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;
use trust_dns_resolver::error::ResolveErrorKind;

use super::{ProbeError, ProbeOptions, SmtpReply, Stage};
use crate::Deadline;
use crate::mx::LookupMx;

// RFC 5321 caps reply lines at 512 octets; be lenient but bounded.
const MAX_LINE_LEN: u64 = 4096;
const MAX_REPLY_LINES: usize = 128;
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// A plain-text SMTP connection. Every read and write is armed with
/// `min(command_timeout, time left before deadline)`.
pub(crate) struct SmtpSession {
    host: String,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    command_timeout: Duration,
    deadline: Deadline,
}

impl SmtpSession {
    pub(crate) fn connect<R>(
        resolver: &R,
        host: &str,
        options: &ProbeOptions,
        deadline: Deadline,
    ) -> Result<Self, ProbeError>
    where
        R: LookupMx + ?Sized,
    {
        let addrs = socket_addrs(resolver, host, options, deadline)?;

        let mut last_err = None;
        for addr in &addrs {
            let Some(timeout) = deadline.clamp(options.connect_timeout) else {
                return Err(ProbeError::timeout(host, Stage::Connect));
            };
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    debug!(host, %addr, "connected");
                    let reader = stream
                        .try_clone()
                        .map(BufReader::new)
                        .map_err(|err| ProbeError::io(host, Stage::Connect, err))?;
                    return Ok(Self {
                        host: host.to_string(),
                        stream,
                        reader,
                        command_timeout: options.command_timeout,
                        deadline,
                    });
                }
                Err(err) => {
                    debug!(host, %addr, error = %err, "connect failed");
                    last_err = Some(err);
                }
            }
        }
        Err(ProbeError::io(
            host,
            Stage::Connect,
            last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "no socket address available")
            }),
        ))
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    /// Reads a reply without sending anything first (the server greeting).
    pub(crate) fn read_reply(&mut self, stage: Stage) -> Result<SmtpReply, ProbeError> {
        self.arm(stage, self.command_timeout)?;
        self.read_armed(stage)
    }

    pub(crate) fn command(&mut self, command: &str, stage: Stage) -> Result<SmtpReply, ProbeError> {
        self.arm(stage, self.command_timeout)?;
        self.send(command, stage)?;
        self.read_armed(stage)
    }

    /// Best-effort `QUIT` followed by a socket shutdown. Never fails.
    pub(crate) fn quit(&mut self) {
        let budget = self.command_timeout.min(QUIT_TIMEOUT);
        let outcome = self
            .arm(Stage::Quit, budget)
            .and_then(|()| self.send("QUIT", Stage::Quit))
            .and_then(|()| self.read_armed(Stage::Quit));
        if let Err(err) = outcome {
            debug!(host = %self.host, error = %err, "QUIT not acknowledged");
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn arm(&self, stage: Stage, budget: Duration) -> Result<(), ProbeError> {
        let timeout = self
            .deadline
            .clamp(budget)
            .ok_or_else(|| ProbeError::timeout(&self.host, stage))?
            .max(Duration::from_millis(1));
        self.stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| self.stream.set_write_timeout(Some(timeout)))
            .map_err(|err| ProbeError::io(&self.host, stage, err))
    }

    fn send(&mut self, command: &str, stage: Stage) -> Result<(), ProbeError> {
        debug!(host = %self.host, %stage, "C: {command}");
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream
            .write_all(&line)
            .and_then(|()| self.stream.flush())
            .map_err(|err| ProbeError::io(&self.host, stage, err))
    }

    fn read_armed(&mut self, stage: Stage) -> Result<SmtpReply, ProbeError> {
        let mut code = None;
        let mut lines = Vec::new();
        loop {
            let raw = self.read_line(stage)?;
            if raw.len() < 3 || !raw.is_char_boundary(3) {
                return Err(ProbeError::protocol(
                    &self.host,
                    stage,
                    format!("invalid SMTP reply: '{raw}'"),
                ));
            }
            let parsed = raw[..3].parse::<u16>().map_err(|_| {
                ProbeError::protocol(
                    &self.host,
                    stage,
                    format!("invalid SMTP status code: '{}'", &raw[..3]),
                )
            })?;
            match code {
                Some(existing) if existing != parsed => {
                    return Err(ProbeError::protocol(
                        &self.host,
                        stage,
                        format!("inconsistent SMTP reply codes: {existing} vs {parsed}"),
                    ));
                }
                Some(_) => {}
                None => code = Some(parsed),
            }

            let continuation = raw.as_bytes().get(3) == Some(&b'-');
            lines.push(raw.get(4..).unwrap_or_default().to_string());
            if !continuation {
                break;
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(ProbeError::protocol(&self.host, stage, "reply has too many lines"));
            }
        }

        let reply = SmtpReply {
            code: code.unwrap_or_default(),
            message: lines.join("\n"),
        };
        debug!(host = %self.host, %stage, "S: {} {}", reply.code, reply.message);
        Ok(reply)
    }

    fn read_line(&mut self, stage: Stage) -> Result<String, ProbeError> {
        let mut raw = String::new();
        let read = (&mut self.reader)
            .take(MAX_LINE_LEN)
            .read_line(&mut raw)
            .map_err(|err| ProbeError::io(&self.host, stage, err))?;
        if !raw.ends_with('\n') {
            if read as u64 == MAX_LINE_LEN {
                return Err(ProbeError::protocol(&self.host, stage, "reply line too long"));
            }
            return Err(ProbeError::io(
                &self.host,
                stage,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading reply",
                ),
            ));
        }
        raw.pop();
        if raw.ends_with('\r') {
            raw.pop();
        }
        Ok(raw)
    }
}

/// Exchanger addresses, resolved through `resolver` under the deadline.
/// IP literals are used as they are.
fn socket_addrs<R>(
    resolver: &R,
    host: &str,
    options: &ProbeOptions,
    deadline: Deadline,
) -> Result<Vec<SocketAddr>, ProbeError>
where
    R: LookupMx + ?Sized,
{
    let ips = match host.parse::<IpAddr>() {
        Ok(ip) => vec![ip],
        Err(_) => resolver
            .lookup_ip(host, deadline)
            .map_err(|err| match err.kind() {
                ResolveErrorKind::Timeout => ProbeError::timeout(host, Stage::Connect),
                _ => ProbeError::io(
                    host,
                    Stage::Connect,
                    io::Error::new(io::ErrorKind::AddrNotAvailable, err.to_string()),
                ),
            })?,
    };
    let addrs: Vec<SocketAddr> = ips
        .into_iter()
        .filter(|ip| options.ipv6 || ip.is_ipv4())
        .map(|ip| SocketAddr::new(ip, options.port))
        .collect();
    if addrs.is_empty() {
        return Err(ProbeError::io(
            host,
            Stage::Connect,
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{host} has no usable address"),
            ),
        ));
    }
    Ok(addrs)
}
