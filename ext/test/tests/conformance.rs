//! Conformance suite over the YAML fixture corpus.
//!
//! Each fixture compiles one rule set and flows declarative subjects
//! through it. Failures are collected per corpus directory and
//! reported together.

#![cfg(feature = "fixtures")]

use std::fs;
use std::path::PathBuf;

use snare_test::fixture::Fixture;

fn run_corpus(dir: &str) {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(dir);

    let mut cases = 0usize;
    let mut failures = Vec::new();

    let entries = fs::read_dir(&root).unwrap_or_else(|e| panic!("{}: {e}", root.display()));
    for entry in entries {
        let path = entry.expect("fixture dir entry").path();
        if !path.extension().map_or(false, |e| e == "yaml" || e == "yml") {
            continue;
        }
        let yaml = fs::read_to_string(&path).expect("fixture file is readable");
        let fixtures =
            Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        for fixture in fixtures {
            let results = fixture
                .run()
                .unwrap_or_else(|e| panic!("'{}' did not compile: {e}", fixture.name));
            for result in results {
                cases += 1;
                if !result.passed {
                    failures.push(format!(
                        "{} / {}: expected {:?}, got {:?}",
                        fixture.name, result.case_name, result.expected, result.actual
                    ));
                }
            }
        }
    }

    assert!(cases > 0, "no fixture cases under {}", root.display());
    assert!(
        failures.is_empty(),
        "{} of {} cases failed:\n{}",
        failures.len(),
        cases,
        failures.join("\n")
    );
}

#[test]
fn test_hooks() {
    run_corpus("01_hooks");
}

#[test]
fn test_scopes() {
    run_corpus("02_scopes");
}

#[test]
fn test_groups() {
    run_corpus("03_groups");
}

#[test]
fn test_errors() {
    run_corpus("04_errors");
}
