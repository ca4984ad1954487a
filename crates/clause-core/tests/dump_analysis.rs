//! End-to-end analysis of serialized translation units

use std::path::Path;

use clause_core::config::Config;
use clause_core::syntax::SyntaxTree;
use clause_core::{AnalysisEngine, ResultsCollection, Severity};
use insta::assert_json_snapshot;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/fixtures");

fn load_fixture(name: &str) -> SyntaxTree {
    let path = Path::new(FIXTURES_DIR).join(name);
    SyntaxTree::from_path(&path)
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", path.display(), e))
}

#[test]
fn fixture_diagnostics() {
    let tree = load_fixture("format_string.tu.json");
    let engine = AnalysisEngine::with_config(&Config::default()).unwrap();
    let results = ResultsCollection::new();

    engine.analyze(&tree, &results);

    let diagnostics = results.into_inner();
    assert_json_snapshot!(diagnostics);
}

#[test]
fn only_defined_functions_are_explored() {
    let tree = load_fixture("format_string.tu.json");
    let engine = AnalysisEngine::with_config(&Config::default()).unwrap();
    let results = ResultsCollection::new();

    let summary = engine.analyze(&tree, &results);

    assert_eq!(summary.exploration.functions, 1);
    assert!(results.snapshot().iter().all(|d| d.file == "src/main.c"));
}

#[test]
fn disabled_standard_is_skipped() {
    let tree = load_fixture("format_string.tu.json");
    let mut config = Config::default();
    config.rules.cwe = Some(false);
    config
        .rules
        .severity
        .insert("pointer-integer-cast".to_string(), clause_core::config::SeverityValue::Error);
    let engine = AnalysisEngine::with_config(&config).unwrap();
    let results = ResultsCollection::new();

    engine.analyze(&tree, &results);

    let diagnostics = results.into_inner();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule_id, "misra-c2012-11.4");
    assert_eq!(diagnostics[0].severity, Severity::Error);
}

#[test]
fn shared_results_across_threads() {
    let tree = load_fixture("format_string.tu.json");
    let engine = AnalysisEngine::with_config(&Config::default()).unwrap();
    let results = ResultsCollection::new();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| engine.analyze(&tree, &results));
        }
    });

    // Each run deduplicates on its own.
    assert_eq!(results.len(), 8);
}
