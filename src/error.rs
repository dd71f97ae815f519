//! Error types.
//!
//! Validation has exactly one failure kind (`WRONG_TYPE`, code `VC001`),
//! always attributed to a single field. Declaration problems found while
//! loading a catalog are reported as [`CatalogError`].

use serde_json::Value;
use thiserror::Error;

use crate::ir::{json_kind, Ty};
use crate::path_de::PathError;

/// A field value whose runtime type does not agree with its declared type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field_name}: '{actual_type}' instead of '{expected_type}'.")]
pub struct ValidationError {
    pub field_name: String,
    pub actual_type: String,
    pub expected_type: String,
}

impl ValidationError {
    pub const CODE: &'static str = "VC001";

    pub fn new(
        field_name: impl Into<String>,
        actual_type: impl Into<String>,
        expected_type: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            actual_type: actual_type.into(),
            expected_type: expected_type.into(),
        }
    }

    pub fn wrong_type(field_name: impl Into<String>, actual: &Value, expected: &Ty) -> Self {
        Self::new(field_name, json_kind(actual), expected.to_string())
    }

    pub fn code(&self) -> &'static str {
        Self::CODE
    }

    /// Status an HTTP layer should answer with (400 Bad Request).
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Error while loading or resolving record declarations.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Decode(#[from] PathError),

    #[error("type syntax error in `{text}` at offset {offset}: {message}")]
    Syntax { text: String, offset: usize, message: String },

    #[error("`{head}[...]` takes {expected} type argument(s), found {found}")]
    GenericArity { head: String, expected: &'static str, found: usize },

    #[error("unknown generic type `{head}`")]
    UnknownGeneric { head: String },

    #[error("record `{record}` field `{field}`: {source}")]
    InField { record: String, field: String, source: Box<CatalogError> },

    #[error("record `{record}` field `{field}` declares both `default` and `default_factory`")]
    ConflictingDefaults { record: String, field: String },

    #[error("record `{record}` field `{field}`: unknown default factory `{factory}`")]
    UnknownFactory { record: String, field: String, factory: String },

    #[error("enum `{name}` member #{index} is not a scalar")]
    InvalidEnumMember { name: String, index: usize },

    #[error("`{name}` is declared as both an enum and a record")]
    AmbiguousName { name: String },

    #[error("record `{record}` is recursive: {}", path.join(" -> "))]
    RecursiveRecord { record: String, path: Vec<String> },

    #[error("record `{record}`: hook registered for undeclared field `{field}`")]
    UnknownHookField { record: String, field: String },
}

impl CatalogError {
    /// Attach field context to errors raised while reading one field's type.
    pub(crate) fn in_field(self, record: &str, field: &str) -> Self {
        match self {
            err @ (CatalogError::Syntax { .. }
            | CatalogError::GenericArity { .. }
            | CatalogError::UnknownGeneric { .. }) => CatalogError::InField {
                record: record.to_string(),
                field: field.to_string(),
                source: Box::new(err),
            },
            other => other,
        }
    }
}
