#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};

use crate::args::Cli;
use mailprobe_lib::{ErrorKind, Verdict, VerifyError};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug)]
pub struct OutputRow {
    pub input: String,
    #[cfg_attr(feature = "with-serde", serde(flatten))]
    pub verdict: Option<Verdict>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<ErrorReport>,
}

impl OutputRow {
    pub fn new(input: impl Into<String>, result: Result<Verdict, VerifyError>) -> Self {
        let (verdict, error) = match result {
            Ok(verdict) => (Some(verdict), None),
            Err(err) => (
                None,
                Some(ErrorReport {
                    kind: err.kind(),
                    message: err.to_string(),
                }),
            ),
        };
        Self {
            input: input.into(),
            verdict,
            error,
        }
    }

    pub fn human_summary(&self) -> String {
        match (&self.verdict, &self.error) {
            (Some(verdict), _) => {
                let status = if verdict.full_inbox() {
                    "[FULL]"
                } else {
                    "[DELIVERABLE]"
                };
                let mut flags = Vec::new();
                if verdict.catch_all() {
                    flags.push("catch-all");
                }
                if verdict.disposable() {
                    flags.push("disposable");
                }
                if verdict.has_presence() {
                    flags.push("presence");
                }
                if flags.is_empty() {
                    format!("{status:<13} {}", verdict.address())
                } else {
                    format!("{status:<13} {} ({})", verdict.address(), flags.join(", "))
                }
            }
            (None, Some(error)) => {
                format!("{:<13} {} :: {}: {}", "[ERROR]", self.input, error.kind, error.message)
            }
            (None, None) => format!("{:<13} {}", "[UNKNOWN]", self.input),
        }
    }
}

pub fn write_reports(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(rows),
        "json" => write_json(rows, cli),
        "ndjson" => write_ndjson(rows, cli),
        "csv" => write_csv(rows, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn any_error(rows: &[OutputRow]) -> bool {
    rows.iter().any(|row| row.error.is_some())
}

fn write_human(rows: &[OutputRow]) -> Result<()> {
    for row in rows {
        println!("{}", row.human_summary());
    }
    Ok(())
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for row in rows {
            let line = serde_json::to_string(row)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=ndjson requires the 'with-serde' feature")
}

#[cfg(feature = "with-csv")]
const CSV_HEADER: [&str; 11] = [
    "input",
    "user",
    "domain",
    "deliverable",
    "full_inbox",
    "host_exists",
    "catch_all",
    "disposable",
    "has_presence",
    "error_kind",
    "error",
];

#[cfg(feature = "with-csv")]
fn write_csv(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=csv requires the 'with-csv' feature")
}

#[cfg(feature = "with-csv")]
fn csv_record(row: &OutputRow) -> Vec<String> {
    let flag = |f: fn(&Verdict) -> bool| {
        row.verdict
            .as_ref()
            .map(|v| f(v).to_string())
            .unwrap_or_default()
    };
    let (user, domain) = match &row.verdict {
        Some(v) => (v.address().user().to_string(), v.address().domain().to_string()),
        None => (String::new(), String::new()),
    };
    let (error_kind, error) = match &row.error {
        Some(e) => (e.kind.to_string(), e.message.clone()),
        None => (String::new(), String::new()),
    };
    vec![
        row.input.clone(),
        user,
        domain,
        flag(Verdict::deliverable),
        flag(Verdict::full_inbox),
        flag(Verdict::host_exists),
        flag(Verdict::catch_all),
        flag(Verdict::disposable),
        flag(Verdict::has_presence),
        error_kind,
        error,
    ]
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
