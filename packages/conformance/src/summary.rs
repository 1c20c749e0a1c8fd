use kdf::render::render_violation;
use kdf::ExitStatus;
use serde::Serialize;

use crate::fixture::Category;
use crate::runner::FixtureResult;

pub const SUITE_LABEL: &str = "KDF Conformance Suite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub category: Category,
    pub passed: usize,
    pub failed: usize,
}

/// The outcome of a conformance run.
///
/// Contains no timings or absolute paths, so an unchanged corpus always
/// produces an identical summary.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteSummary {
    pub ok: bool,
    pub counts: Vec<CategoryCounts>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub empty_categories: Vec<Category>,
    pub fixtures: Vec<FixtureResult>,
}

impl SuiteSummary {
    pub fn new(fixtures: Vec<FixtureResult>, empty_categories: Vec<Category>) -> Self {
        let counts = Category::ALL
            .into_iter()
            .map(|category| {
                let rows = fixtures.iter().filter(|f| f.category == category);
                let (passed, failed) = rows.fold((0, 0), |(p, f), row| {
                    if row.passed() {
                        (p + 1, f)
                    } else {
                        (p, f + 1)
                    }
                });
                CategoryCounts {
                    category,
                    passed,
                    failed,
                }
            })
            .collect();
        let ok = !fixtures.is_empty() && empty_categories.is_empty() && fixtures.iter().all(FixtureResult::passed);
        Self {
            ok,
            counts,
            empty_categories,
            fixtures,
        }
    }

    pub fn passed(&self) -> usize {
        self.counts.iter().map(|c| c.passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.counts.iter().map(|c| c.failed).sum()
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.ok {
            ExitStatus::Success
        } else {
            ExitStatus::Failure
        }
    }

    /// Human-readable report.
    ///
    /// ```text
    /// [PASS] KDF Conformance Suite
    ///
    /// == VALID ==
    /// [PASS] v001_minimal.json
    ///
    /// == INVALID ==
    /// [PASS] i007_path_chain_not_real.json (failed as expected: BrokenChain)
    ///
    /// == EDGE ==
    /// [PASS] e002_needs_review_drift.json (class=needs_review)
    ///
    /// valid: 1 passed, 0 failed
    /// ...
    /// ```
    pub fn render_text(&self) -> String {
        let mut out = format!("[{}] {SUITE_LABEL}\n", verdict_tag(self.ok));

        if self.fixtures.is_empty() && self.empty_categories.is_empty() {
            out.push_str("\n(no fixtures found)\n");
        }

        for category in Category::ALL {
            let rows: Vec<_> = self.fixtures.iter().filter(|f| f.category == category).collect();
            let empty = self.empty_categories.contains(&category);
            if rows.is_empty() && !empty {
                continue;
            }
            out.push_str(&format!("\n== {} ==\n", category.as_str().to_uppercase()));
            if empty {
                out.push_str(&format!("(no fixtures found in {category}/)\n"));
            }
            for row in rows {
                out.push_str(&render_row(row));
            }
        }

        out.push('\n');
        for c in &self.counts {
            out.push_str(&format!("{}: {} passed, {} failed\n", c.category, c.passed, c.failed));
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn verdict_tag(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}

fn render_row(row: &FixtureResult) -> String {
    let mut out = format!("[{}] {}", verdict_tag(row.passed()), row.name);
    match (row.passed(), row.category) {
        (true, Category::Valid) => {}
        (true, Category::Edge) => {
            if let Some(class) = row.status_class {
                out.push_str(&format!(" (class={class})"));
            }
        }
        _ => out.push_str(&format!(" ({})", row.detail)),
    }
    out.push('\n');
    for v in &row.violations {
        out.push_str("  - ");
        out.push_str(&render_violation(v));
        out.push('\n');
    }
    out
}
