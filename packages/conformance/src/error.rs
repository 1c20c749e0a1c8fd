use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a conformance run before any verdict can be given.
///
/// A fixture that misbehaves is not one of these: it is recorded as a FAIL
/// row and the run continues.
#[derive(Debug, Error)]
pub enum ConformanceError {
    #[error("fixture root {} is not a directory", .0.display())]
    MissingRoot(PathBuf),

    #[error("cannot walk fixture root: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad expectation metadata in {}: {message}", path.display())]
    Metadata { path: PathBuf, message: String },

    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
