//! CLI: catalog → (schema | validate)
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::{Map, Value};

use crate::catalog::Catalog;
use crate::coerce::{ValidateOptions, Validator};
use crate::error::ValidationError;
use crate::ir::RecordDef;
use crate::schema::{DeriveOptions, SchemaDeriver, SchemaRegistry};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// derive JSON schema components from record declarations, or validate and coerce JSON documents against them
#[derive(Parser, Debug)]
#[command(name = "json-shape", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the component document for records of a catalog
    Schema(SchemaOut),
    /// coerce each input document into a record; print instances on stdout, failures on stderr
    Validate(ValidateRun),
}

#[derive(Args, Debug, Clone)]
struct CatalogSettings {
    /// JSON catalog with `enums` and `records` declarations
    #[arg(long, short)]
    catalog: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    catalog_settings: CatalogSettings,

    /// record to document; repeatable (all records if omitted)
    #[arg(long = "record")]
    records: Vec<String>,

    /// emit defaults as null and give nullable fields `default: null`
    #[arg(long)]
    default_none: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct ValidateRun {
    #[command(flatten)]
    catalog_settings: CatalogSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// record each document is validated as
    #[arg(long)]
    record: String,

    /// report every failing field instead of stopping at the first
    #[arg(long)]
    accumulate: bool,

    /// coerce top-level Optional fields against their inner type
    #[arg(long)]
    check_optional: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

/// One input document and where it came from.
#[derive(Debug)]
struct Document {
    origin: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CatalogSettings {
    fn load(&self) -> Result<Catalog> {
        let bytes = std::fs::read(&self.catalog)
            .with_context(|| format!("failed to read catalog {}", self.catalog.display()))?;
        let catalog = Catalog::from_slice(&bytes)
            .with_context(|| format!("invalid catalog {}", self.catalog.display()))?;
        tracing::info!(path = %self.catalog.display(), records = catalog.records().count(), "catalog loaded");
        Ok(catalog)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for pattern in &self.input {
            if pattern == "-" {
                let mut source = String::new();
                std::io::stdin().read_to_string(&mut source).context("failed to read stdin")?;
                self.split_source("<stdin>", &source, &mut documents)?;
                continue;
            }
            for path in resolve_file_path_patterns([pattern])? {
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read source file {}", path.display()))?;
                self.split_source(&path.to_string_lossy(), &source, &mut documents)?;
            }
        }
        tracing::debug!(count = documents.len(), "documents loaded");
        Ok(documents)
    }

    fn split_source(&self, origin: &str, source: &str, out: &mut Vec<Document>) -> Result<()> {
        if !self.ndjson {
            let value = serde_json::from_str(source)
                .with_context(|| format!("failed to parse JSON source file ({origin})"))?;
            return self.select(origin.to_string(), value, out);
        }
        for (index, line) in source.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let origin = format!("{origin}:{}", index + 1);
            let value = serde_json::from_str(line).with_context(|| format!("failed to parse NDJSON line ({origin})"))?;
            self.select(origin, value, out)?;
        }
        Ok(())
    }

    /// Apply `--json-pointer` then `--jq-expr`.
    fn select(&self, origin: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => match value.pointer(pointer) {
                Some(node) => node.clone(),
                None => bail!("JSON pointer {pointer} selects nothing in {origin}"),
            },
        };
        match self.jq_expr.as_deref() {
            None => out.push(Document { origin, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {origin}"))?;
                for (index, value) in results.into_iter().enumerate() {
                    out.push(Document { origin: format!("{origin}#{index}"), value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Schema(target) => {
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(ExitCode::SUCCESS);
                }
                target.run()
            }
            Command::Validate(target) => {
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(ExitCode::SUCCESS);
                }
                target.run()
            }
        }
    }
}

impl SchemaOut {
    fn run(&self) -> Result<ExitCode> {
        let catalog = self.catalog_settings.load()?;
        let selected: Vec<&Arc<RecordDef>> = if self.records.is_empty() {
            catalog.records().collect()
        } else {
            self.records
                .iter()
                .map(|name| lookup_record(&catalog, name))
                .collect::<Result<_>>()?
        };

        let registry = SchemaRegistry::new();
        let deriver = SchemaDeriver::new(&registry)
            .with_options(DeriveOptions { default_value_none: self.default_none });
        for record in selected {
            deriver.derive(record);
        }

        let document = serde_json::to_string_pretty(&registry.to_document())?;
        write_output(self.out.as_deref(), &document)?;
        Ok(ExitCode::SUCCESS)
    }
}

impl ValidateRun {
    fn run(&self) -> Result<ExitCode> {
        let catalog = self.catalog_settings.load()?;
        let record = lookup_record(&catalog, &self.record)?;
        let documents = self.input_settings.load_documents()?;
        let validator = Validator::new().with_options(ValidateOptions { check_optional: self.check_optional });

        let outcomes: Vec<Result<Map<String, Value>, Vec<ValidationError>>> = documents
            .par_iter()
            .map(|doc| {
                if self.accumulate {
                    validator.validate_value_all(record, doc.value.clone())
                } else {
                    validator.validate_value(record, doc.value.clone()).map_err(|err| vec![err])
                }
            })
            .collect();

        let mut failed = 0usize;
        for (doc, outcome) in documents.iter().zip(outcomes) {
            match outcome {
                Ok(instance) => println!("{}", serde_json::to_string(&Value::Object(instance))?),
                Err(errors) => {
                    failed += 1;
                    for err in errors {
                        eprintln!("{} {} {}", doc.origin.bold(), err.code().yellow(), err.to_string().red());
                    }
                }
            }
        }
        tracing::info!(documents = documents.len(), failed, record = record.name(), "validation finished");

        Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn lookup_record<'c>(catalog: &'c Catalog, name: &str) -> Result<&'c Arc<RecordDef>> {
    match catalog.record(name) {
        Some(record) => Ok(record),
        None => {
            let known: Vec<&str> = catalog.record_names().collect();
            bail!("unknown record `{name}` (catalog declares: {})", known.join(", "))
        }
    }
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(ndjson: bool, json_pointer: Option<&str>, jq_expr: Option<&str>) -> InputSettings {
        InputSettings {
            ndjson,
            json_pointer: json_pointer.map(String::from),
            jq_expr: jq_expr.map(String::from),
            input: Vec::new(),
        }
    }

    #[test]
    fn ndjson_lines_become_documents() {
        let mut docs = Vec::new();
        settings(true, None, None)
            .split_source("in.ndjson", "{\"a\": 1}\n\n{\"a\": 2}\n", &mut docs)
            .unwrap();
        let origins: Vec<&str> = docs.iter().map(|d| d.origin.as_str()).collect();
        assert_eq!(origins, ["in.ndjson:1", "in.ndjson:3"]);
    }

    #[test]
    fn pointer_then_jq() {
        let mut docs = Vec::new();
        settings(false, Some("/data"), Some(".[]"))
            .split_source("in.json", r#"{"data": [{"n": 1}, {"n": 2}]}"#, &mut docs)
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].origin, "in.json#1");
        assert_eq!(docs[1].value, serde_json::json!({"n": 2}));
    }

    #[test]
    fn missing_pointer_is_an_error() {
        let mut docs = Vec::new();
        let result = settings(false, Some("/nope"), None).split_source("in.json", "{}", &mut docs);
        assert!(result.is_err());
    }

    #[test]
    fn empty_glob_is_an_error() {
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = CommandLineInterface::try_parse_from([
            "json-shape", "validate", "--catalog", "c.json", "--record", "User", "-i", "a.json", "--accumulate",
        ])
        .unwrap();
        assert!(matches!(cli.cmd, Command::Validate(ref run) if run.accumulate && run.record == "User"));
    }
}
