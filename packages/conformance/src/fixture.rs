//! Fixture discovery and expectation metadata.
//!
//! A fixture root looks like this:
//!
//! ```text
//! fixtures/
//!   valid/    v001_minimal.json
//!   invalid/  i007_path_chain_not_real.json
//!             i007_path_chain_not_real.expect.json
//!   edge/     e002_needs_review_drift.json
//! ```
//!
//! Fixtures placed directly in the root are categorised by filename prefix
//! instead (`i<digits>_` invalid, `e<digits>_` edge, anything else valid).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use kdf::ViolationKind;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::ConformanceError;

const FIXTURE_EXT: &str = ".json";
const SIDECAR_EXT: &str = ".expect.json";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The three fixture families. Ordering is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Valid,
    Invalid,
    Edge,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Valid, Category::Invalid, Category::Edge];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Valid => "valid",
            Category::Invalid => "invalid",
            Category::Edge => "edge",
        }
    }

    /// The category a subdirectory of the fixture root stands for.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// The category of a fixture sitting directly in the root.
    pub fn from_file_name(name: &str) -> Self {
        if has_numbered_prefix(name, 'i') {
            Category::Invalid
        } else if has_numbered_prefix(name, 'e') {
            Category::Edge
        } else {
            Category::Valid
        }
    }

    /// What a fixture in this category must do when no sidecar says otherwise.
    pub fn default_expectation(self) -> Expectation {
        match self {
            Category::Valid | Category::Edge => Expectation::Pass,
            Category::Invalid => Expectation::Fail { kind: None },
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `i007_x.json` has the numbered prefix `i`; `index.json` does not.
fn has_numbered_prefix(name: &str, letter: char) -> bool {
    let Some(rest) = name.strip_prefix(letter) else {
        return false;
    };
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && rest[digits..].starts_with('_')
}

// ---------------------------------------------------------------------------
// Expectation
// ---------------------------------------------------------------------------

/// A violation kind a failing fixture must produce, or a structural rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    Violation(ViolationKind),
    /// The validator refuses the artifact outright (malformed JSON shape,
    /// cyclic graph, unparsable node path).
    Malformed,
}

impl ExpectedKind {
    pub const MALFORMED: &'static str = "Malformed";
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedKind::Violation(kind) => write!(f, "{kind}"),
            ExpectedKind::Malformed => f.write_str(Self::MALFORMED),
        }
    }
}

impl std::str::FromStr for ExpectedKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::MALFORMED {
            return Ok(ExpectedKind::Malformed);
        }
        s.parse::<ViolationKind>().map(ExpectedKind::Violation)
    }
}

/// What a fixture's run must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Pass,
    /// Must fail; with `kind` set, that kind must be among those reported.
    Fail { kind: Option<ExpectedKind> },
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Pass => f.write_str("pass"),
            Expectation::Fail { kind: None } => f.write_str("fail"),
            Expectation::Fail { kind: Some(kind) } => write!(f, "fail:{kind}"),
        }
    }
}

impl Serialize for Expectation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Pass,
    Fail,
}

/// On-disk form of `<stem>.expect.json`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Sidecar {
    outcome: Outcome,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Read the sidecar at `path`, or fall back to the category default when it
/// does not exist. Returns the expectation and the sidecar's description.
pub fn load_expectation(
    category: Category,
    path: &Path,
) -> Result<(Expectation, Option<String>), ConformanceError> {
    if !path.is_file() {
        return Ok((category.default_expectation(), None));
    }
    let text = fs::read_to_string(path).map_err(|source| ConformanceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let metadata_error = |message: String| ConformanceError::Metadata {
        path: path.to_path_buf(),
        message,
    };
    let sidecar: Sidecar = serde_json::from_str(&text).map_err(|e| metadata_error(e.to_string()))?;

    let kind = sidecar
        .kind
        .as_deref()
        .map(str::parse::<ExpectedKind>)
        .transpose()
        .map_err(metadata_error)?;

    let expectation = match (sidecar.outcome, kind) {
        (Outcome::Pass, Some(kind)) => {
            return Err(metadata_error(format!("outcome \"pass\" cannot name a kind ({kind})")))
        }
        (Outcome::Pass, None) => Expectation::Pass,
        (Outcome::Fail, kind) => Expectation::Fail { kind },
    };

    match (category, expectation) {
        (Category::Valid, Expectation::Fail { .. }) => Err(metadata_error(
            "a valid fixture cannot be expected to fail".into(),
        )),
        (Category::Invalid, Expectation::Pass) => Err(metadata_error(
            "an invalid fixture cannot be expected to pass".into(),
        )),
        _ => Ok((expectation, sidecar.description)),
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// One artifact in the corpus and what it must do.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub path: PathBuf,
    /// File name, used as the row label.
    pub name: String,
    pub category: Category,
    pub expectation: Expectation,
    pub description: Option<String>,
}

/// Everything found under a fixture root.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Sorted by category, then file name.
    pub fixtures: Vec<Fixture>,
    /// Category directories that exist but hold no fixtures.
    pub empty_categories: Vec<Category>,
}

/// Find every fixture under `root` and load its expectation.
///
/// Metadata errors abort discovery; nothing is run against a corpus whose
/// expectations cannot be trusted.
pub fn discover(root: &Path) -> Result<Corpus, ConformanceError> {
    if !root.is_dir() {
        return Err(ConformanceError::MissingRoot(root.to_path_buf()));
    }

    let mut category_dirs = Vec::new();
    let mut fixtures = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();

        if entry.file_type().is_dir() {
            match Category::from_dir_name(&name) {
                Some(category) if entry.depth() == 1 => category_dirs.push(category),
                _ => tracing::debug!("skipping directory {}", entry.path().display()),
            }
            continue;
        }
        if !entry.file_type().is_file() || !name.ends_with(FIXTURE_EXT) || name.ends_with(SIDECAR_EXT) {
            continue;
        }

        let category = if entry.depth() == 1 {
            Category::from_file_name(&name)
        } else {
            let parent = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .and_then(Category::from_dir_name);
            match parent {
                Some(category) => category,
                None => continue,
            }
        };

        let stem = &name[..name.len() - FIXTURE_EXT.len()];
        let sidecar = entry.path().with_file_name(format!("{stem}{SIDECAR_EXT}"));
        let (expectation, description) = load_expectation(category, &sidecar)?;

        fixtures.push(Fixture {
            path: entry.into_path(),
            name,
            category,
            expectation,
            description,
        });
    }

    fixtures.sort_by(|a, b| (a.category, &a.name).cmp(&(b.category, &b.name)));
    let empty_categories = category_dirs
        .into_iter()
        .filter(|c| !fixtures.iter().any(|f| f.category == *c))
        .collect();

    tracing::debug!(root = %root.display(), fixtures = fixtures.len(), "fixture discovery finished");
    Ok(Corpus {
        fixtures,
        empty_categories,
    })
}
