//! Validation & coercion of runtime values against declared types.
//!
//! Runs once per record instance. Each declared field, in declaration order:
//!
//! 1. top-level `Optional[...]` fields are left as they are (escape hatch),
//!    unless [`ValidateOptions::check_optional`] is set; bare `Any` accepts anything
//! 2. everything else is coerced recursively through [`classify`]
//! 3. the record's hook for the field, if any, gets the coerced value and
//!    returns the final one
//!
//! Container-kind mismatches (a list field holding a string, say) are not
//! errors: the value is kept and a diagnostic is reported. Only leaves that
//! cannot be coerced raise [`ValidationError`].
pub mod num;
pub mod text;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::classify::{classify, Classified, Shape};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::ValidationError;
use crate::ir::{json_kind, FieldDecl, RecordDef, Scalar, ScalarKind, Ty};

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Coerce top-level `Optional` fields against their inner type instead of skipping them.
    pub check_optional: bool,
}

#[derive(Clone)]
pub struct Validator {
    options: ValidateOptions,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for Validator {
    fn default() -> Self {
        Self { options: ValidateOptions::default(), sink: Arc::new(TracingSink) }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn options(&self) -> ValidateOptions {
        self.options
    }

    /// Validate a whole document as an instance of `record`. A non-object
    /// document fails against the record name.
    pub fn validate_value(&self, record: &RecordDef, value: Value) -> Result<Map<String, Value>, ValidationError> {
        self.validate_fields(record, root_object(record, value)?)
    }

    /// Fail-fast validation: the first failing field aborts.
    pub fn validate_fields(
        &self,
        record: &RecordDef,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let mut out = Map::new();
        for (decl, value) in self.assign(record, input) {
            let value = self.validate_field(record, decl, value)?;
            out.insert(decl.name.clone(), value);
        }
        Ok(out)
    }

    /// Like [`Validator::validate_fields`] but keeps going and returns every
    /// failing field. Nested records still stop at their first failure.
    pub fn validate_all(
        &self,
        record: &RecordDef,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, Vec<ValidationError>> {
        let mut out = Map::new();
        let mut errors = Vec::new();
        for (decl, value) in self.assign(record, input) {
            match self.validate_field(record, decl, value) {
                Ok(value) => {
                    out.insert(decl.name.clone(), value);
                }
                Err(err) => errors.push(err),
            }
        }
        if errors.is_empty() { Ok(out) } else { Err(errors) }
    }

    pub fn validate_value_all(
        &self,
        record: &RecordDef,
        value: Value,
    ) -> Result<Map<String, Value>, Vec<ValidationError>> {
        let input = root_object(record, value).map_err(|err| vec![err])?;
        self.validate_all(record, input)
    }

    /// Pair each declaration with its input value, falling back to the
    /// field default (or null). Undeclared keys are dropped.
    fn assign<'d>(&self, record: &'d RecordDef, mut input: Map<String, Value>) -> Vec<(&'d FieldDecl, Value)> {
        let assigned: Vec<(&FieldDecl, Value)> = record
            .fields()
            .map(|decl| {
                let value = input.remove(&decl.name).unwrap_or_else(|| decl.instance_default());
                (decl, value)
            })
            .collect();
        for field in input.keys() {
            self.sink.report(Diagnostic::UnknownField {
                record: record.name().to_string(),
                field: field.clone(),
            });
        }
        assigned
    }

    fn validate_field(&self, record: &RecordDef, decl: &FieldDecl, value: Value) -> Result<Value, ValidationError> {
        let Classified { nullable, shape } = classify(&decl.ty);
        let value = match shape {
            Shape::Any => value,
            _ if nullable && !self.options.check_optional => {
                self.sink.report(Diagnostic::UncheckedField {
                    field: decl.name.clone(),
                    declared: decl.ty.to_string(),
                });
                value
            }
            _ if nullable && value.is_null() => value,
            _ => self.coerce_shape(&decl.name, &decl.ty, shape, value)?,
        };
        match record.hook(&decl.name) {
            Some(hook) => hook(value, decl),
            None => Ok(value),
        }
    }

    /// Coerce `value` against `ty`; `field` names the record field for errors.
    pub fn coerce(&self, field: &str, ty: &Ty, value: Value) -> Result<Value, ValidationError> {
        let Classified { nullable, shape } = classify(ty);
        if nullable && value.is_null() {
            return Ok(value);
        }
        self.coerce_shape(field, ty, shape, value)
    }

    fn coerce_shape(&self, field: &str, ty: &Ty, shape: Shape<'_>, value: Value) -> Result<Value, ValidationError> {
        match shape {
            Shape::Any => Ok(value),

            Shape::Primitive(kind) => {
                // widen again: a parsed string may be an integer literal on a float field
                let value = num::widen_integer(kind, text::normalize_string(kind, num::normalize_number(kind, value)));
                if kind_matches(kind, &value) {
                    Ok(value)
                } else {
                    Err(ValidationError::wrong_type(field, &value, ty))
                }
            }

            Shape::Enum(def) => {
                let kind = def.kind();
                let value = num::widen_integer(kind, text::normalize_string(kind, num::widen_integer(kind, value)));
                match Scalar::from_json(&value) {
                    Some(scalar) if def.contains(&scalar) => Ok(value),
                    _ => Err(ValidationError::wrong_type(field, &value, ty)),
                }
            }

            Shape::List(item) => match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|v| self.coerce(field, item, v))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                other => Ok(self.container_mismatch(field, ty, other)),
            },

            Shape::Tuple(elems) => match value {
                Value::Array(items) if items.len() == elems.len() => items
                    .into_iter()
                    .zip(elems)
                    .map(|(v, t)| self.coerce(field, t, v))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                Value::Array(items) => {
                    self.sink.report(Diagnostic::TupleArityMismatch {
                        field: field.to_string(),
                        expected: elems.len(),
                        actual: items.len(),
                    });
                    Ok(Value::Array(items))
                }
                other => Ok(self.container_mismatch(field, ty, other)),
            },

            Shape::Map { key, value: value_ty } => match value {
                Value::Object(entries) => {
                    let mut out = Map::new();
                    for (k, v) in entries {
                        let k = self.coerce_key(field, key, k)?;
                        let v = self.coerce(field, value_ty, v)?;
                        // last one wins
                        if out.insert(k.clone(), v).is_some() {
                            self.sink.report(Diagnostic::MapKeyCollision { field: field.to_string(), key: k });
                        }
                    }
                    Ok(Value::Object(out))
                }
                other => Ok(self.container_mismatch(field, ty, other)),
            },

            Shape::Record(def) => match value {
                Value::Object(fields) => self.validate_fields(def, fields).map(Value::Object),
                other => Err(ValidationError::wrong_type(field, &other, ty)),
            },

            // objects are accepted without checking which variant they match
            Shape::Union(variants) => {
                if value.is_object() || variants.iter().any(|t| variant_admits(t, &value)) {
                    Ok(value)
                } else {
                    Err(ValidationError::wrong_type(field, &value, ty))
                }
            }
        }
    }

    /// Object keys are strings; coerce them as scalars and render them back.
    fn coerce_key(&self, field: &str, key_ty: &Ty, key: String) -> Result<String, ValidationError> {
        match self.coerce(field, key_ty, Value::String(key))? {
            Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }

    fn container_mismatch(&self, field: &str, ty: &Ty, value: Value) -> Value {
        self.sink.report(Diagnostic::ContainerKindMismatch {
            field: field.to_string(),
            expected: ty.to_string(),
            actual: json_kind(&value),
        });
        value
    }
}

fn root_object(record: &RecordDef, value: Value) -> Result<Map<String, Value>, ValidationError> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(ValidationError::new(record.name(), json_kind(&other), record.name())),
    }
}

fn kind_matches(kind: ScalarKind, value: &Value) -> bool {
    match kind {
        ScalarKind::String => value.is_string(),
        ScalarKind::Integer | ScalarKind::Float => value.is_number(),
        ScalarKind::Boolean => value.is_boolean(),
    }
}

/// Kind-level match of a value against one union variant; no coercion, no recursion.
fn variant_admits(ty: &Ty, value: &Value) -> bool {
    let Classified { nullable, shape } = classify(ty);
    if value.is_null() {
        return nullable || matches!(shape, Shape::Any);
    }
    match shape {
        Shape::Any => true,
        Shape::Primitive(kind) => kind_matches(kind, value),
        Shape::List(_) | Shape::Tuple(_) => value.is_array(),
        Shape::Map { .. } | Shape::Record(_) => value.is_object(),
        Shape::Enum(def) => Scalar::from_json(value).is_some_and(|s| def.contains(&s)),
        Shape::Union(inner) => inner.iter().any(|t| variant_admits(t, value)),
    }
}

// ------------------------------- Tests ------------------------------------ //
