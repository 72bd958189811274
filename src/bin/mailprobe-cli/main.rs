mod args;
mod output;

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use mailprobe_lib::Verifier;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};
use crate::output::OutputRow;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    cli.check_output()?;

    let emails: Vec<String> = if cli.stdin {
        let mut emails = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let email = line.trim();
            if !email.is_empty() {
                emails.push(email.to_string());
            }
        }
        emails
    } else if let Some(Commands::Verify { email }) = &cli.cmd {
        vec![email.clone()]
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    };

    let verifier = build_verifier(&cli)?;
    let timeout = cli.timeout();
    let rows: Vec<OutputRow> = emails
        .into_iter()
        .map(|email| {
            let result = match timeout {
                Some(timeout) => verifier.verify_email_timeout(&email, timeout),
                None => verifier.verify_email(&email),
            };
            OutputRow::new(email, result)
        })
        .collect();

    output::write_reports(&rows, &cli)?;

    // exit codes: 0 all verdicts, 2 some error, 1 fatal
    if output::any_error(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

fn build_verifier(cli: &Cli) -> Result<Verifier> {
    let verifier = Verifier::new(cli.verifier_options()).disposable(cli.disposable_domains()?);

    #[cfg(feature = "with-gravatar")]
    let verifier = if cli.gravatar {
        let presence = mailprobe_lib::GravatarPresence::new(std::time::Duration::from_secs(5))
            .context("build gravatar client")?;
        verifier.presence(presence)
    } else {
        verifier
    };

    Ok(verifier)
}
