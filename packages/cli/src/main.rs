//! `kdf`: command-line interface to the KDF validator.
//!
//! - **`validate`**: check one artifact and report every violation.
//! - **`fingerprint`**: canonical hash of a text, or a ready-made span anchor.
//! - **`conformance`**: run the fixture corpus and report PASS/FAIL per fixture.
//!
//! Exit codes: `0` success, `2` validation or conformance failure, `3`
//! anything else (unreadable input, bad fixture metadata). Reports go to
//! stdout, logs to stderr.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use kdf::render::{render_error, render_report};
use kdf::{canonical_hash, span_fingerprint, validate_document, ExitStatus, StructuralSchema, ValidateError};
use kdf_conformance::RunnerConfig;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "kdf=warn,kdf_conformance=warn";

/// kdf: KDF artifact validator
///
/// Validate knowledge artifacts and run the conformance suite.
#[derive(Parser)]
#[command(name = "kdf", version, about, long_about = None)]
struct Cli {
    /// Report format.
    #[arg(long, global = true, value_enum, default_value_t = Format::Text, env = "KDF_FORMAT")]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a single KDF artifact.
    ///
    /// Runs the structural schema check and the semantic validator and
    /// reports every violation found. Exits 0 if the artifact is valid,
    /// 2 otherwise.
    ///
    /// Pass `-` as FILE to read from stdin.
    Validate {
        /// Path to a JSON file, or `-` for stdin.
        file: PathBuf,
    },

    /// Print the canonical SHA-256 of a text file, or a span_fingerprint
    /// anchor for part of it.
    ///
    /// Offsets count characters of the canonical text (BOM removed, line
    /// endings normalised, trailing whitespace trimmed).
    ///
    /// Examples:
    ///   kdf fingerprint paragraph.txt
    ///   kdf fingerprint paragraph.txt --start 0 --end 39
    Fingerprint {
        /// Path to a UTF-8 text file, or `-` for stdin.
        file: PathBuf,

        /// First character of the span.
        #[arg(long, requires = "end")]
        start: Option<usize>,

        /// One past the last character of the span.
        #[arg(long, requires = "start")]
        end: Option<usize>,
    },

    /// Run the conformance suite.
    ///
    /// Expects `valid/`, `invalid/` and `edge/` fixture directories under
    /// the root. Exits 0 if every fixture meets its expectation, 2 otherwise.
    Conformance {
        /// Fixture root directory [env: KDF_CONFORMANCE_ROOT] [default: conformance]
        #[arg(long)]
        root: Option<PathBuf>,

        /// Worker threads; 0 picks one per CPU, 1 runs sequentially [env: KDF_JOBS] [default: 0]
        #[arg(long)]
        jobs: Option<usize>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let status = match cli.command {
        Command::Validate { file } => validate(&file, cli.format),
        Command::Fingerprint { file, start, end } => fingerprint(&file, start.zip(end), cli.format),
        Command::Conformance { root, jobs } => {
            let mut config = RunnerConfig::from_env();
            if let Some(root) = root {
                config.root = root;
            }
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            conformance(config, cli.format)
        }
    };
    process::exit(status.code());
}

/// `KDF_LOG`, then `RUST_LOG`, then [`DEFAULT_LOG_FILTER`].
fn init_tracing() {
    let filter = EnvFilter::try_from_env("KDF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn validate(file: &Path, format: Format) -> ExitStatus {
    let label = file.display().to_string();
    let json = read_input(file);

    let result = serde_json::from_str::<Value>(&json)
        .map_err(|e| ValidateError::Malformed(e.to_string()))
        .and_then(|document| validate_document(&document, &StructuralSchema));

    match (result, format) {
        (Ok(report), Format::Text) => {
            print!("{}", render_report(&label, &report));
            ExitStatus::from(&report)
        }
        (Ok(report), Format::Json) => {
            print_json(&report);
            ExitStatus::from(&report)
        }
        (Err(e), Format::Text) => {
            print!("{}", render_error(&label, &e));
            ExitStatus::from(&e)
        }
        (Err(e), Format::Json) => {
            print_json(&json!({"ok": false, "error": e.to_string()}));
            ExitStatus::from(&e)
        }
    }
}

fn fingerprint(file: &Path, span: Option<(usize, usize)>, format: Format) -> ExitStatus {
    let text = read_input(file);
    let Some((start, end)) = span else {
        let hash = canonical_hash(&text);
        match format {
            Format::Text => println!("{hash}"),
            Format::Json => print_json(&json!({"algo": kdf::hashing::FINGERPRINT_ALGO, "value": hash})),
        }
        return ExitStatus::Success;
    };

    match span_fingerprint(&text, start, end) {
        Ok(fp) => {
            match format {
                Format::Text => println!("{}", fp.value),
                Format::Json => print_json(&json!({
                    "type": "span_fingerprint",
                    "algo": fp.algo,
                    "value": fp.value,
                    "start": fp.start,
                    "end": fp.end,
                })),
            }
            ExitStatus::Success
        }
        Err(e) => {
            eprintln!("kdf: {e}");
            ExitStatus::Failure
        }
    }
}

fn conformance(config: RunnerConfig, format: Format) -> ExitStatus {
    let summary = match kdf_conformance::run(&config) {
        Ok(summary) => summary,
        Err(e) => fatal(&e.to_string()),
    };
    match format {
        Format::Text => print!("{}", summary.render_text()),
        Format::Json => print_json(&summary),
    }
    summary.exit_status()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fatal(&format!("failed to encode report: {e}")),
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {e}", path.display())))
    }
}

/// Print an error message to stderr and exit with the internal-error code.
fn fatal(msg: &str) -> ! {
    eprintln!("kdf: {msg}");
    process::exit(ExitStatus::Internal.code());
}
