//! Conformance suite runner for the KDF validator.
//!
//! The fixture corpus under `fixtures/` is the executable description of the
//! validator's rules: every fixture is an artifact plus an expectation
//! (must pass, must fail, must fail with a given violation kind). This crate
//! finds fixtures, runs [`kdf::validate_document`] on each, and compares.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`fixture`] | Categories, expectation sidecars, corpus discovery |
//! | [`runner`] | [`RunnerConfig`], per-fixture evaluation, the parallel run |
//! | [`summary`] | [`SuiteSummary`] and its text/JSON rendering |
//!
//! ```rust,ignore
//! let summary = kdf_conformance::run(&RunnerConfig::from_env())?;
//! print!("{}", summary.render_text());
//! std::process::exit(summary.exit_status().code());
//! ```

pub mod error;
pub mod fixture;
pub mod runner;
pub mod summary;

pub use error::ConformanceError;
pub use fixture::{discover, Category, Corpus, ExpectedKind, Expectation, Fixture};
pub use runner::{compare, evaluate, run, run_with, FixtureResult, Observed, RunnerConfig, Verdict};
pub use summary::{CategoryCounts, SuiteSummary};

/// Path to the fixture corpus shipped with this crate.
pub fn bundled_fixtures() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}
