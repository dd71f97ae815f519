//! Type-driven schema derivation and value coercion for JSON records.
//!
//! A [`RecordDef`] declares named, typed fields. From it you can
//! - derive a JSON-Schema-like component ([`SchemaDeriver`]), registering nested
//!   records in a [`SchemaRegistry`]
//! - validate and coerce an input object into an instance ([`Validator`], [`Record`])
//!
//! Both walk the declared types through the same [`classify`] step.
pub mod catalog;
pub mod classify;
pub mod cli;
pub mod coerce;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod jq_exec;
pub mod path_de;
pub mod record;
pub mod schema;

pub use catalog::{Bindings, Catalog};
pub use classify::{classify, Classified, Shape};
pub use coerce::{ValidateOptions, Validator};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use error::{CatalogError, ValidationError};
pub use ir::{DefaultFactory, DefaultValue, EnumDef, FieldDecl, FieldHook, RecordDef, Scalar, ScalarKind, Ty};
pub use record::Record;
pub use schema::{DeriveOptions, Registration, SchemaDeriver, SchemaRegistry};
