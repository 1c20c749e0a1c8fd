//! Conformance suite runner.
//!
//! Each fixture is read, validated and compared against its expectation in
//! isolation, so fixtures are evaluated in parallel on a dedicated `rayon`
//! pool. Results are collected in corpus order, which keeps the summary
//! identical from run to run.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use kdf::hashing::canonical_json_digest;
use kdf::{
    validate_document, Artifact, EvidenceStatus, SchemaValidator, StructuralSchema, ValidationReport,
    Violation,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConformanceError;
use crate::fixture::{self, Category, ExpectedKind, Expectation, Fixture};
use crate::summary::SuiteSummary;

/// Environment variable naming the default fixture root.
pub const ROOT_ENV: &str = "KDF_CONFORMANCE_ROOT";
/// Environment variable for the worker count.
pub const JOBS_ENV: &str = "KDF_JOBS";
pub const DEFAULT_ROOT: &str = "conformance";

/// Runner configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `KDF_CONFORMANCE_ROOT` | `conformance` | Fixture root directory |
/// | `KDF_JOBS` | `0` (one per CPU) | Worker threads; `1` runs fixtures sequentially |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub root: PathBuf,
    /// Worker threads. `0` lets `rayon` pick.
    pub jobs: usize,
}

impl RunnerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            jobs: 0,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Populate config from environment variables, applying defaults where
    /// absent. An unparsable `KDF_JOBS` counts as absent.
    pub fn from_env() -> Self {
        let root = std::env::var(ROOT_ENV).unwrap_or_else(|_| DEFAULT_ROOT.into());
        let jobs = std::env::var(JOBS_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        Self::new(root).with_jobs(jobs)
    }
}

// ---------------------------------------------------------------------------
// Per-fixture results
// ---------------------------------------------------------------------------

/// What running the validator on a fixture produced.
#[derive(Debug, Clone)]
pub enum Observed {
    Report(ValidationReport),
    /// A fatal structural rejection.
    Rejected(String),
    /// The fixture could not be evaluated at all: unreadable file, invalid
    /// JSON, or a panic inside the validator.
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

/// One row of the suite table.
#[derive(Debug, Clone, Serialize)]
pub struct FixtureResult {
    pub name: String,
    pub category: Category,
    pub expected: Expectation,
    pub verdict: Verdict,
    /// Distinct violation kinds observed, or `["Malformed"]` for a rejection.
    pub kinds: Vec<String>,
    /// Strongest evidence status claimed by the artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_class: Option<EvidenceStatus>,
    /// JCS canonical digest of the fixture JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Why the row failed, or how an expected failure was met.
    pub detail: String,
    /// Full violation list, kept for failed rows only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl FixtureResult {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// `invalid` beats `needs_review` beats everything else.
pub fn status_class(artifact: &Artifact) -> EvidenceStatus {
    let statuses: Vec<_> = artifact.evidence.iter().map(|r| r.status()).collect();
    if statuses.contains(&EvidenceStatus::Invalid) {
        EvidenceStatus::Invalid
    } else if statuses.contains(&EvidenceStatus::NeedsReview) {
        EvidenceStatus::NeedsReview
    } else {
        EvidenceStatus::Valid
    }
}

/// Compare what happened with what was expected. Returns the verdict and a
/// short explanation.
///
/// An invalid fixture naming kind K passes when K is among the reported
/// kinds. An edge fixture naming K must report K and nothing else.
pub fn compare(category: Category, expectation: Expectation, observed: &Observed) -> (Verdict, String) {
    use Verdict::{Fail, Pass};

    match (expectation, observed) {
        (_, Observed::Internal(msg)) => (Fail, format!("internal error: {msg}")),

        (Expectation::Pass, Observed::Report(r)) if r.ok => (Pass, "valid".into()),
        (Expectation::Pass, Observed::Report(r)) => (
            Fail,
            format!("expected PASS, got {} violation(s)", r.violations.len()),
        ),
        (Expectation::Pass, Observed::Rejected(e)) => (Fail, format!("expected PASS, rejected: {e}")),

        (Expectation::Fail { .. }, Observed::Report(r)) if r.ok => (Fail, "expected FAIL".into()),
        (Expectation::Fail { kind: None }, Observed::Report(_)) => (Pass, "failed as expected".into()),
        (Expectation::Fail { kind: Some(ExpectedKind::Violation(k)) }, Observed::Report(r)) => {
            if category == Category::Edge && r.kinds() != [k] {
                (Fail, format!("expected exactly {k}, observed {}", join_kinds(r)))
            } else if r.has_kind(k) {
                (Pass, format!("failed as expected: {k}"))
            } else {
                (Fail, format!("expected {k}, observed {}", join_kinds(r)))
            }
        }
        (Expectation::Fail { kind: Some(ExpectedKind::Malformed) }, Observed::Report(r)) => (
            Fail,
            format!("expected rejection, observed {}", join_kinds(r)),
        ),

        (Expectation::Fail { kind: None | Some(ExpectedKind::Malformed) }, Observed::Rejected(e)) => {
            (Pass, format!("rejected as expected: {e}"))
        }
        (Expectation::Fail { kind: Some(ExpectedKind::Violation(k)) }, Observed::Rejected(e)) => {
            (Fail, format!("expected {k}, rejected: {e}"))
        }
    }
}

fn join_kinds(report: &ValidationReport) -> String {
    report
        .kinds()
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run one fixture. Never fails: every problem becomes a FAIL row.
pub fn evaluate(fixture: &Fixture, schema: &dyn SchemaValidator) -> FixtureResult {
    let mut digest = None;
    let mut status = None;

    let observed = match fs::read(&fixture.path) {
        Err(e) => Observed::Internal(format!("cannot read {}: {e}", fixture.path.display())),
        Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
            Err(e) => Observed::Internal(format!("invalid JSON: {e}")),
            Ok(document) => {
                digest = canonical_json_digest(&document).ok();
                status = Artifact::deserialize(&document).ok().map(|a| status_class(&a));
                let run = panic::catch_unwind(AssertUnwindSafe(|| validate_document(&document, schema)));
                match run {
                    Ok(Ok(report)) => Observed::Report(report),
                    Ok(Err(e)) => Observed::Rejected(e.to_string()),
                    Err(payload) => Observed::Internal(format!(
                        "validator panicked: {}",
                        panic_payload_to_string(payload.as_ref())
                    )),
                }
            }
        },
    };

    let (verdict, detail) = compare(fixture.category, fixture.expectation, &observed);
    let (kinds, violations) = match observed {
        Observed::Report(report) => {
            let kinds = report.kinds().iter().map(|k| k.to_string()).collect();
            let violations = if verdict == Verdict::Fail {
                report.violations
            } else {
                Vec::new()
            };
            (kinds, violations)
        }
        Observed::Rejected(_) => (vec![ExpectedKind::MALFORMED.to_string()], Vec::new()),
        Observed::Internal(_) => (Vec::new(), Vec::new()),
    };

    match verdict {
        Verdict::Pass => tracing::debug!(fixture = %fixture.name, "{detail}"),
        Verdict::Fail if kinds.is_empty() => tracing::warn!(fixture = %fixture.name, "{detail}"),
        Verdict::Fail => tracing::debug!(fixture = %fixture.name, "FAIL: {detail}"),
    }

    FixtureResult {
        name: fixture.name.clone(),
        category: fixture.category,
        expected: fixture.expectation,
        verdict,
        kinds,
        status_class: status,
        digest,
        detail,
        violations,
    }
}

/// Run the whole corpus under `config.root` with the built-in schema check.
pub fn run(config: &RunnerConfig) -> Result<SuiteSummary, ConformanceError> {
    run_with(config, &StructuralSchema)
}

/// Run the whole corpus with a caller-supplied schema validator.
///
/// # Errors
///
/// Only for a missing or unreadable root, bad sidecar metadata, or a worker
/// pool that cannot start. Fixture-level problems are FAIL rows.
pub fn run_with(config: &RunnerConfig, schema: &dyn SchemaValidator) -> Result<SuiteSummary, ConformanceError> {
    let corpus = fixture::discover(&config.root)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()?;

    let results: Vec<FixtureResult> = pool.install(|| {
        corpus
            .fixtures
            .par_iter()
            .map(|f| evaluate(f, schema))
            .collect()
    });

    let summary = SuiteSummary::new(results, corpus.empty_categories);
    tracing::info!(
        root = %config.root.display(),
        passed = summary.passed(),
        failed = summary.failed(),
        ok = summary.ok,
        "conformance run finished"
    );
    Ok(summary)
}
