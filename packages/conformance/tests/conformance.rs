//! End-to-end conformance tests.
//!
//! The bundled corpus under `fixtures/` must be fully conformant, and the
//! runner's discovery, comparison and aggregation logic is exercised against
//! throwaway corpora written into temporary directories.
//!
//! # Coverage
//!
//! | Test | Behaviour |
//! |------|-----------|
//! | `bundled_corpus_is_conformant` | every shipped fixture meets its expectation |
//! | `bundled_corpus_summary_is_idempotent` | two runs produce identical JSON |
//! | `parallel_and_sequential_runs_agree` | `jobs` does not change the summary |
//! | `path_chain_not_real_fails_with_broken_chain` | named scenario |
//! | `duplicate_atom_id_fails_with_duplicate_atom_id` | named scenario |
//! | `conflicting_atoms_pass` | named scenario |
//! | `flat_root_uses_filename_prefixes` | category from `i`/`e` prefixes |
//! | `wrong_kind_is_a_mismatch` | fail-with-kind comparison |
//! | `edge_kind_must_match_exactly` | edge fixtures reject extra kinds |
//! | `unexpected_pass_is_a_mismatch` | invalid fixture that validates |
//! | `unreadable_fixture_fails_but_suite_continues` | per-fixture isolation |
//! | `empty_category_directory_fails_suite` | empty `edge/` |
//! | `empty_root_is_not_ok` | empty corpus |
//! | `missing_root_is_an_error` | no fixture root |
//! | `bad_sidecar_is_a_metadata_error` | malformed `.expect.json` |
//! | `valid_fixture_cannot_expect_failure` | contradictory metadata |

use std::fs;
use std::path::Path;

use kdf_conformance::{
    bundled_fixtures, run, Category, ConformanceError, FixtureResult, RunnerConfig, SuiteSummary, Verdict,
};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run_bundled() -> SuiteSummary {
    run(&RunnerConfig::new(bundled_fixtures())).unwrap()
}

fn row<'a>(summary: &'a SuiteSummary, name: &str) -> &'a FixtureResult {
    summary
        .fixtures
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("fixture {name} not in summary"))
}

/// A small artifact with no anchors that validates cleanly.
fn clean_artifact() -> Value {
    json!({
        "kdf_version": "0.1",
        "document_nodes": [
            {"id": "doc1", "type": "document", "parent_id": null},
            {"id": "s1", "type": "section", "parent_id": "doc1"}
        ],
        "atoms": [{"id": "a1", "text": "The section exists.", "node_path": "document:doc1/section:s1"}],
        "evidence": [{"atom_id": "a1", "validation": {"status": "unverified"}}]
    })
}

fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

// ---------------------------------------------------------------------------
// Bundled corpus
// ---------------------------------------------------------------------------

#[test]
fn bundled_corpus_is_conformant() {
    let summary = run_bundled();
    let failures: Vec<_> = summary
        .fixtures
        .iter()
        .filter(|f| !f.passed())
        .map(|f| format!("{}: {}", f.name, f.detail))
        .collect();
    assert!(failures.is_empty(), "non-conformant fixtures: {failures:#?}");
    assert!(summary.ok);
    assert_eq!(summary.exit_status().code(), 0);
    for counts in &summary.counts {
        assert!(counts.passed > 0, "no fixtures in {}", counts.category);
    }
    assert!(summary.fixtures.iter().all(|f| f.digest.is_some()));
}

#[test]
fn bundled_corpus_summary_is_idempotent() {
    let first = run_bundled().to_json().unwrap();
    let second = run_bundled().to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let parallel = run(&RunnerConfig::new(bundled_fixtures()).with_jobs(4)).unwrap();
    let sequential = run(&RunnerConfig::new(bundled_fixtures()).with_jobs(1)).unwrap();
    assert_eq!(parallel.render_text(), sequential.render_text());
    assert_eq!(parallel.to_json().unwrap(), sequential.to_json().unwrap());
}

#[test]
fn rows_are_ordered_by_category_then_name() {
    let summary = run_bundled();
    let keys: Vec<_> = summary
        .fixtures
        .iter()
        .map(|f| (f.category, f.name.clone()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn path_chain_not_real_fails_with_broken_chain() {
    let summary = run_bundled();
    let row = row(&summary, "i007_path_chain_not_real.json");
    assert_eq!(row.verdict, Verdict::Pass);
    assert_eq!(row.kinds, vec!["BrokenChain"]);
}

#[test]
fn duplicate_atom_id_fails_with_duplicate_atom_id() {
    let summary = run_bundled();
    let row = row(&summary, "i008_duplicate_atom_id.json");
    assert_eq!(row.verdict, Verdict::Pass);
    assert_eq!(row.kinds, vec!["DuplicateAtomId"]);
}

#[test]
fn conflicting_atoms_pass() {
    let summary = run_bundled();
    let row = row(&summary, "e003_conflicting_atoms.json");
    assert_eq!(row.verdict, Verdict::Pass);
    assert!(row.kinds.is_empty());
}

#[test]
fn cyclic_fixture_is_reported_as_malformed() {
    let summary = run_bundled();
    assert_eq!(row(&summary, "i010_cyclic_parents.json").kinds, vec!["Malformed"]);
}

#[test]
fn rendered_text_has_header_and_sections() {
    let text = run_bundled().render_text();
    assert!(text.starts_with("[PASS] KDF Conformance Suite\n"));
    for section in ["== VALID ==", "== INVALID ==", "== EDGE =="] {
        assert!(text.contains(section), "missing {section}");
    }
    assert!(text.contains("[PASS] e002_needs_review_drift.json (class=needs_review)"));
}

// ---------------------------------------------------------------------------
// Throwaway corpora
// ---------------------------------------------------------------------------

#[test]
fn flat_root_uses_filename_prefixes() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("v001_clean.json"), &clean_artifact());

    let mut broken = clean_artifact();
    broken["atoms"][0]["node_path"] = json!("document:doc1/section:s9");
    write_json(&dir.path().join("i001_unresolved.json"), &broken);

    let mut edge = clean_artifact();
    edge["atoms"][0]["node_path"] = json!("doc:doc1/section:s1");
    write_json(&dir.path().join("e001_alias.json"), &edge);

    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    assert!(summary.ok, "{}", summary.render_text());
    let categories: Vec<_> = summary.fixtures.iter().map(|f| (f.name.as_str(), f.category)).collect();
    assert_eq!(
        categories,
        vec![
            ("v001_clean.json", Category::Valid),
            ("i001_unresolved.json", Category::Invalid),
            ("e001_alias.json", Category::Edge),
        ]
    );
}

#[test]
fn wrong_kind_is_a_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let mut broken = clean_artifact();
    broken["atoms"][0]["node_path"] = json!("document:doc1/section:s9");
    write_json(&dir.path().join("invalid/i001.json"), &broken);
    write_json(
        &dir.path().join("invalid/i001.expect.json"),
        &json!({"outcome": "fail", "kind": "BrokenChain"}),
    );

    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    assert!(!summary.ok);
    let row = row(&summary, "i001.json");
    assert_eq!(row.verdict, Verdict::Fail);
    assert_eq!(row.detail, "expected BrokenChain, observed UnresolvedSegment");
    assert_eq!(summary.exit_status().code(), 2);
}

#[test]
fn edge_kind_must_match_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let mut sibling = clean_artifact();
    sibling["document_nodes"]
        .as_array_mut()
        .unwrap()
        .push(json!({"id": "s2", "type": "section", "parent_id": "doc1"}));
    sibling["atoms"][0]["node_path"] = json!("table:s1/section:s2");
    let expect = json!({"outcome": "fail", "kind": "BrokenChain"});
    write_json(&dir.path().join("valid/v001.json"), &clean_artifact());
    write_json(&dir.path().join("invalid/i001_sib.json"), &sibling);
    write_json(&dir.path().join("invalid/i001_sib.expect.json"), &expect);
    write_json(&dir.path().join("edge/e001_sib.json"), &sibling);
    write_json(&dir.path().join("edge/e001_sib.expect.json"), &expect);

    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    assert!(!summary.ok);

    let invalid = row(&summary, "i001_sib.json");
    assert_eq!(invalid.verdict, Verdict::Pass);
    assert_eq!(invalid.kinds, vec!["TypeMismatch", "BrokenChain"]);

    let edge = row(&summary, "e001_sib.json");
    assert_eq!(edge.verdict, Verdict::Fail);
    assert_eq!(edge.detail, "expected exactly BrokenChain, observed TypeMismatch, BrokenChain");
    assert_eq!(edge.violations.len(), 2);
}

#[test]
fn unexpected_pass_is_a_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("invalid/i001_not_broken.json"), &clean_artifact());

    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    assert!(!summary.ok);
    assert_eq!(row(&summary, "i001_not_broken.json").detail, "expected FAIL");
}

#[test]
fn failing_valid_fixture_lists_violations() {
    let dir = tempfile::tempdir().unwrap();
    let mut broken = clean_artifact();
    broken["atoms"][0]["node_path"] = json!("document:doc1/document:s1");
    write_json(&dir.path().join("valid/v001.json"), &broken);

    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    let row = row(&summary, "v001.json");
    assert_eq!(row.verdict, Verdict::Fail);
    assert_eq!(row.violations.len(), 1);
    assert!(summary
        .render_text()
        .contains("[FAIL] v001.json (expected PASS, got 1 violation(s))\n  - TypeMismatch (structure): "));
}

#[test]
fn unreadable_fixture_fails_but_suite_continues() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("valid")).unwrap();
    fs::write(dir.path().join("valid/v001_truncated.json"), "{\"kdf_version\": ").unwrap();
    write_json(&dir.path().join("valid/v002_clean.json"), &clean_artifact());

    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    assert!(!summary.ok);
    let truncated = row(&summary, "v001_truncated.json");
    assert_eq!(truncated.verdict, Verdict::Fail);
    assert!(truncated.detail.starts_with("internal error: invalid JSON"));
    assert_eq!(row(&summary, "v002_clean.json").verdict, Verdict::Pass);
}

#[test]
fn empty_category_directory_fails_suite() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("valid/v001.json"), &clean_artifact());
    fs::create_dir_all(dir.path().join("edge")).unwrap();

    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    assert!(!summary.ok);
    assert_eq!(summary.empty_categories, vec![Category::Edge]);
    assert!(summary.fixtures.iter().all(FixtureResult::passed));
}

#[test]
fn empty_root_is_not_ok() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    assert!(!summary.ok);
    assert!(summary.fixtures.is_empty());
}

#[test]
fn sidecars_and_unrelated_directories_are_not_fixtures() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("valid/v001.json"), &clean_artifact());
    write_json(&dir.path().join("notes/readme.json"), &json!({"hello": "world"}));
    write_json(&dir.path().join("valid/v001.expect.json"), &json!({"outcome": "pass"}));

    let summary = run(&RunnerConfig::new(dir.path())).unwrap();
    assert_eq!(summary.fixtures.len(), 1);
    assert!(summary.ok);
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = run(&RunnerConfig::new(dir.path().join("nope"))).unwrap_err();
    assert!(matches!(err, ConformanceError::MissingRoot(_)));
}

#[test]
fn bad_sidecar_is_a_metadata_error() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("invalid/i001.json"), &clean_artifact());
    write_json(
        &dir.path().join("invalid/i001.expect.json"),
        &json!({"outcome": "fail", "kind": "NoSuchKind"}),
    );
    let err = run(&RunnerConfig::new(dir.path())).unwrap_err();
    assert!(matches!(err, ConformanceError::Metadata { .. }));
}

#[test]
fn valid_fixture_cannot_expect_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("valid/v001.json"), &clean_artifact());
    write_json(&dir.path().join("valid/v001.expect.json"), &json!({"outcome": "fail"}));
    let err = run(&RunnerConfig::new(dir.path())).unwrap_err();
    assert!(err.to_string().contains("a valid fixture cannot be expected to fail"));
}
