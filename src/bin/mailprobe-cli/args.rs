use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mailprobe_lib::{DisposableDomains, ProbeOptions, VerifierOptions};

#[derive(Parser)]
#[command(name = "mailprobe-cli", version, about = "Probe e-mail deliverability over SMTP")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// read addresses from stdin, one per line
    #[arg(long)]
    pub stdin: bool,

    /// write report to file (json/ndjson/csv)
    #[arg(long)]
    pub out: Option<String>,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// wall-clock budget per address in ms (0 disables)
    #[arg(long = "timeout-ms", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// name announced in EHLO/HELO
    #[arg(long, env = "MAILPROBE_HELLO_NAME", default_value = "localhost")]
    pub hello: String,

    /// MAIL FROM reverse path (default postmaster@<hello>)
    #[arg(long = "from", env = "MAILPROBE_SOURCE_ADDRESS", default_value = "")]
    pub from: String,

    /// extra RCPT TO attempts after a temporary rejection
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// mail exchangers tried per domain
    #[arg(long = "max-mx", default_value_t = 3)]
    pub max_mx: usize,

    /// allow IPv6 exchanger addresses
    #[arg(long)]
    pub ipv6: bool,

    /// extra disposable domains, one per line
    #[arg(long = "disposable-list")]
    pub disposable_list: Option<PathBuf>,

    /// look up a Gravatar profile for each address
    #[cfg(feature = "with-gravatar")]
    #[arg(long)]
    pub gravatar: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// verify a single address
    Verify { email: String },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    /// Rejects flag combinations before any address is probed.
    pub fn check_output(&self) -> Result<()> {
        if self.out.is_some() && self.format == "human" {
            bail!("--out requires --format json|ndjson|csv");
        }
        Ok(())
    }

    pub fn verifier_options(&self) -> VerifierOptions {
        VerifierOptions {
            hello_name: self.hello.clone(),
            source_address: self.from.clone(),
            retries: self.retries,
            probe: ProbeOptions {
                port: self.port,
                max_exchangers: self.max_mx,
                ipv6: self.ipv6,
                ..ProbeOptions::default()
            },
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn disposable_domains(&self) -> Result<DisposableDomains> {
        let mut domains = DisposableDomains::builtin();
        if let Some(path) = &self.disposable_list {
            let added = domains
                .extend_from_file(path)
                .with_context(|| format!("read disposable list {}", path.display()))?;
            tracing::debug!(added, path = %path.display(), "disposable list loaded");
        }
        Ok(domains)
    }
}
