//! Runs the JSON fixture cases under `fixtures/`.
//!
//! ```text
//! cargo run -p dev-test-runner [NAME-REGEX]
//! ```
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use json_shape::{Catalog, DeriveOptions, SchemaDeriver, SchemaRegistry, ValidationError, Validator};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Fixture {
    catalog: Value,
    #[serde(default)]
    cases: Vec<Case>,
    #[serde(default)]
    schemas: Vec<SchemaCase>,
}

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    record: String,
    input: Value,
    #[serde(default)]
    accumulate: bool,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Expect(Value),
    /// `[field, actual, expected]` per failing field
    Errors(Vec<(String, String, String)>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaCase {
    name: String,
    #[serde(default)]
    records: Vec<String>,
    #[serde(default)]
    default_value_none: bool,
    expect: Value,
}

fn fixture_paths() -> Result<Vec<PathBuf>> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let mut paths = std::fs::read_dir(&dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
    paths.sort();
    Ok(paths)
}

fn run_case(catalog: &Catalog, case: &Case) -> Result<Option<String>> {
    let record = catalog
        .record(&case.record)
        .with_context(|| format!("unknown record `{}`", case.record))?;
    let validator = Validator::new();
    let outcome = if case.accumulate {
        validator.validate_value_all(record, case.input.clone())
    } else {
        validator.validate_value(record, case.input.clone()).map_err(|e| vec![e])
    };
    let mismatch = match (&case.outcome, outcome) {
        (Outcome::Expect(expected), Ok(actual)) => {
            let actual = Value::Object(actual);
            (*expected != actual).then(|| format!("expected {expected}, got {actual}"))
        }
        (Outcome::Errors(expected), Err(actual)) => {
            let expected: Vec<ValidationError> =
                expected.iter().map(|(f, a, e)| ValidationError::new(f, a, e)).collect();
            (expected != actual).then(|| format!("expected errors {expected:?}, got {actual:?}"))
        }
        (Outcome::Expect(_), Err(errors)) => Some(format!("unexpected failure: {errors:?}")),
        (Outcome::Errors(_), Ok(actual)) => Some(format!("unexpected success: {}", Value::Object(actual))),
    };
    Ok(mismatch)
}

fn run_schema(catalog: &Catalog, case: &SchemaCase) -> Result<Option<String>> {
    let registry = SchemaRegistry::new();
    let deriver = SchemaDeriver::new(&registry)
        .with_options(DeriveOptions { default_value_none: case.default_value_none });
    if case.records.is_empty() {
        catalog.records().for_each(|record| {
            deriver.derive(record);
        });
    } else {
        for name in &case.records {
            let record = catalog.record(name).with_context(|| format!("unknown record `{name}`"))?;
            deriver.derive(record);
        }
    }
    let actual = registry.to_document();
    Ok((actual != case.expect).then(|| format!("expected {}, got {actual}", case.expect)))
}

fn run(filter: Option<&Regex>) -> Result<(usize, usize)> {
    let (mut passed, mut failed) = (0, 0);
    let mut report = |label: String, mismatch: Option<String>| match mismatch {
        None => {
            passed += 1;
            println!("{} {label}", "PASS".green());
        }
        Some(why) => {
            failed += 1;
            println!("{} {label}\n     {why}", "FAIL".red().bold());
        }
    };

    for path in fixture_paths()? {
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let src = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let fixture: Fixture = json_shape::path_de::from_str_with_path(&src)
            .with_context(|| format!("malformed fixture {}", path.display()))?;
        let catalog = Catalog::from_value(fixture.catalog)
            .with_context(|| format!("invalid catalog in {}", path.display()))?;

        for case in &fixture.cases {
            let label = format!("{stem}::{}", case.name);
            if filter.is_some_and(|re| !re.is_match(&label)) {
                continue;
            }
            report(label, run_case(&catalog, case)?);
        }
        for case in &fixture.schemas {
            let label = format!("{stem}::schema::{}", case.name);
            if filter.is_some_and(|re| !re.is_match(&label)) {
                continue;
            }
            report(label, run_schema(&catalog, case)?);
        }
    }
    Ok((passed, failed))
}

fn main() -> ExitCode {
    let filter = match std::env::args().nth(1).map(|pattern| Regex::new(&pattern)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid filter: {error}");
            return ExitCode::FAILURE;
        }
    };
    match run(filter.as_ref()) {
        Ok((passed, failed)) => {
            println!("\n{passed} passed, {failed} failed");
            if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
