//! Record and enum declarations loaded from JSON.
//!
//! ```json
//! {
//!   "enums":   { "Status": ["IN_PROGRESS", "DONE"] },
//!   "records": {
//!     "Error":    { "fields": { "code": "str", "message": "str" } },
//!     "Response": { "fields": {
//!       "status": { "type": "str", "default": "fail" },
//!       "error":  "Optional[Error]",
//!       "tags":   { "type": "list[str]", "default_factory": "list" }
//!     } }
//!   }
//! }
//! ```
//!
//! Records may reference each other in any order. Recursive references are
//! rejected. Names that are neither builtin, enum nor record resolve to
//! [`Ty::Opaque`] and validate as strings.
pub mod parse;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{CatalogError, ValidationError};
use crate::ir::{DefaultFactory, EnumDef, FieldDecl, FieldHook, RecordDef, Scalar, Ty};
use crate::path_de;

pub use parse::{parse_type, TypeSyntax};

// ————————————————————————————————————————————————————————————————————————————
// FILE FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    enums: IndexMap<String, Vec<Value>>,
    #[serde(default)]
    records: IndexMap<String, RecordSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordSpec {
    #[serde(default)]
    fields: IndexMap<String, FieldSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldSpec {
    Short(String),
    Full(FullFieldSpec),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FullFieldSpec {
    #[serde(rename = "type")]
    ty: String,
    /// `Some(Value::Null)` for an explicit `"default": null`.
    #[serde(default, deserialize_with = "present")]
    default: Option<Value>,
    #[serde(default)]
    default_factory: Option<String>,
}

fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(de).map(Some)
}

impl FieldSpec {
    fn type_text(&self) -> &str {
        match self {
            FieldSpec::Short(ty) => ty,
            FieldSpec::Full(full) => &full.ty,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BINDINGS
// ————————————————————————————————————————————————————————————————————————————

/// Code that a JSON catalog can only refer to by name: per-field hooks and
/// custom default factories.
#[derive(Clone, Default)]
pub struct Bindings {
    hooks: Vec<(String, String, FieldHook)>,
    factories: HashMap<String, DefaultFactory>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook<F>(mut self, record: impl Into<String>, field: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Value, &FieldDecl) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        self.hooks.push((record.into(), field.into(), Arc::new(hook)));
        self
    }

    /// Make `"default_factory": "<name>"` available to catalogs.
    pub fn factory<F>(mut self, name: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        self.factories.insert(name.clone(), DefaultFactory::custom(name, make));
        self
    }

    fn lookup_factory(&self, name: &str) -> Option<DefaultFactory> {
        match name {
            "list" => Some(DefaultFactory::EmptyList),
            "dict" => Some(DefaultFactory::EmptyMap),
            other => self.factories.get(other).cloned(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CATALOG
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Default)]
pub struct Catalog {
    enums: IndexMap<String, Arc<EnumDef>>,
    records: IndexMap<String, Arc<RecordDef>>, // declaration order
}

impl Catalog {
    pub fn parse_str(src: &str) -> Result<Self, CatalogError> {
        Self::parse_str_with(src, &Bindings::default())
    }

    pub fn parse_str_with(src: &str, bindings: &Bindings) -> Result<Self, CatalogError> {
        Self::build(path_de::from_str_with_path(src)?, bindings)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CatalogError> {
        Self::from_slice_with(bytes, &Bindings::default())
    }

    pub fn from_slice_with(bytes: &[u8], bindings: &Bindings) -> Result<Self, CatalogError> {
        Self::build(path_de::from_slice_with_path(bytes)?, bindings)
    }

    pub fn from_value(value: Value) -> Result<Self, CatalogError> {
        Self::from_value_with(value, &Bindings::default())
    }

    pub fn from_value_with(value: Value, bindings: &Bindings) -> Result<Self, CatalogError> {
        Self::build(path_de::from_value_with_path(value)?, bindings)
    }

    fn build(file: CatalogFile, bindings: &Bindings) -> Result<Self, CatalogError> {
        let mut enums = IndexMap::new();
        for (name, members) in file.enums {
            if file.records.contains_key(&name) {
                return Err(CatalogError::AmbiguousName { name });
            }
            let members = members
                .iter()
                .enumerate()
                .map(|(index, member)| {
                    Scalar::from_json(member)
                        .ok_or_else(|| CatalogError::InvalidEnumMember { name: name.clone(), index })
                })
                .collect::<Result<Vec<_>, _>>()?;
            enums.insert(name.clone(), Arc::new(EnumDef { name, members }));
        }

        for (record, field, _) in &bindings.hooks {
            if !file.records.contains_key(record) {
                return Err(CatalogError::UnknownHookField { record: record.clone(), field: field.clone() });
            }
        }

        let mut resolver = Resolver {
            enums: &enums,
            specs: &file.records,
            bindings,
            done: HashMap::new(),
            stack: Vec::new(),
        };
        for (name, spec) in &file.records {
            resolver.record(name, spec)?;
        }
        let mut done = resolver.done;
        let records = file
            .records
            .keys()
            .filter_map(|name| done.remove(name).map(|def| (name.clone(), def)))
            .collect();

        Ok(Self { enums, records })
    }

    pub fn record(&self, name: &str) -> Option<&Arc<RecordDef>> {
        self.records.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&Arc<EnumDef>> {
        self.enums.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<RecordDef>> {
        self.records.values()
    }

    pub fn record_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Resolve a type expression against this catalog's enums and records.
    pub fn resolve_type(&self, text: &str) -> Result<Ty, CatalogError> {
        let syntax = parse_type(text)?;
        resolve_with(&syntax, &mut |name| {
            Ok(self
                .enums
                .get(name)
                .map(|def| Ty::Enum(def.clone()))
                .or_else(|| self.records.get(name).map(|def| Ty::Record(def.clone()))))
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLUTION
// ————————————————————————————————————————————————————————————————————————————

struct Resolver<'a> {
    enums: &'a IndexMap<String, Arc<EnumDef>>,
    specs: &'a IndexMap<String, RecordSpec>,
    bindings: &'a Bindings,
    done: HashMap<String, Arc<RecordDef>>,
    stack: Vec<String>, // records being resolved, outermost first
}

impl Resolver<'_> {
    fn record(&mut self, name: &str, spec: &RecordSpec) -> Result<Arc<RecordDef>, CatalogError> {
        if let Some(def) = self.done.get(name) {
            return Ok(def.clone());
        }
        if let Some(start) = self.stack.iter().position(|open| open == name) {
            let mut path = self.stack[start..].to_vec();
            path.push(name.to_string());
            return Err(CatalogError::RecursiveRecord { record: name.to_string(), path });
        }

        self.stack.push(name.to_string());
        let mut builder = RecordDef::builder(name);
        for (field, field_spec) in &spec.fields {
            let decl = self.field(name, field, field_spec)?;
            builder = builder.field(decl);
        }
        self.stack.pop();

        for (record, field, hook) in &self.bindings.hooks {
            if record == name {
                builder = builder.shared_hook(field.clone(), hook.clone());
            }
        }
        let def = builder.build()?;
        tracing::debug!(record = name, fields = def.len(), "resolved record");
        self.done.insert(name.to_string(), def.clone());
        Ok(def)
    }

    fn field(&mut self, record: &str, field: &str, spec: &FieldSpec) -> Result<FieldDecl, CatalogError> {
        let ty = parse_type(spec.type_text())
            .and_then(|syntax| self.ty(&syntax))
            .map_err(|err| err.in_field(record, field))?;
        let decl = FieldDecl::new(field, ty);
        let FieldSpec::Full(full) = spec else {
            return Ok(decl);
        };
        match (&full.default, &full.default_factory) {
            (Some(_), Some(_)) => Err(CatalogError::ConflictingDefaults {
                record: record.to_string(),
                field: field.to_string(),
            }),
            (Some(value), None) => Ok(decl.with_default(value.clone())),
            (None, Some(factory)) => match self.bindings.lookup_factory(factory) {
                Some(factory) => Ok(decl.with_factory(factory)),
                None => Err(CatalogError::UnknownFactory {
                    record: record.to_string(),
                    field: field.to_string(),
                    factory: factory.clone(),
                }),
            },
            (None, None) => Ok(decl),
        }
    }

    fn ty(&mut self, syntax: &TypeSyntax) -> Result<Ty, CatalogError> {
        let specs = self.specs;
        resolve_with(syntax, &mut |name| {
            if let Some(def) = self.enums.get(name) {
                Ok(Some(Ty::Enum(def.clone())))
            } else if let Some(spec) = specs.get(name) {
                self.record(name, spec).map(|def| Some(Ty::Record(def)))
            } else {
                Ok(None)
            }
        })
    }
}

/// Builtins first, then `lookup` for user-declared names, then [`Ty::Opaque`].
fn resolve_with<F>(syntax: &TypeSyntax, lookup: &mut F) -> Result<Ty, CatalogError>
where
    F: FnMut(&str) -> Result<Option<Ty>, CatalogError>,
{
    match syntax {
        TypeSyntax::Name(name) => match name.as_str() {
            "str" => Ok(Ty::string()),
            "int" => Ok(Ty::integer()),
            "float" => Ok(Ty::float()),
            "bool" => Ok(Ty::boolean()),
            "Any" | "any" => Ok(Ty::Any),
            "list" | "List" => Ok(Ty::list(Ty::Any)),
            "dict" | "Dict" => Ok(Ty::map(Ty::string(), Ty::Any)),
            other => Ok(lookup(other)?.unwrap_or_else(|| Ty::Opaque(other.to_string()))),
        },
        TypeSyntax::Apply { head, args } => {
            let arity = |expected: &'static str| CatalogError::GenericArity {
                head: head.clone(),
                expected,
                found: args.len(),
            };
            let mut resolved = args.iter().map(|arg| resolve_with(arg, lookup));
            match (head.as_str(), args.len()) {
                ("Optional", 1) => Ok(Ty::optional(next(&mut resolved)?)),
                ("Optional", _) => Err(arity("1")),
                ("list" | "List" | "Sequence", 1) => Ok(Ty::list(next(&mut resolved)?)),
                ("list" | "List" | "Sequence", _) => Err(arity("1")),
                // homogeneous variable-length tuple
                ("tuple" | "Tuple", 2) if args[1] == TypeSyntax::Name("...".into()) => {
                    Ok(Ty::list(next(&mut resolved)?))
                }
                ("tuple" | "Tuple", _) => Ok(Ty::tuple(resolved.collect::<Result<Vec<_>, _>>()?)),
                ("dict" | "Dict" | "Mapping", 2) => {
                    let key = next(&mut resolved)?;
                    Ok(Ty::map(key, next(&mut resolved)?))
                }
                ("dict" | "Dict" | "Mapping", _) => Err(arity("2")),
                ("Union", _) => Ok(Ty::union(resolved.collect::<Result<Vec<_>, _>>()?)),
                _ => Err(CatalogError::UnknownGeneric { head: head.clone() }),
            }
        }
    }
}

fn next(resolved: &mut impl Iterator<Item = Result<Ty, CatalogError>>) -> Result<Ty, CatalogError> {
    resolved.next().unwrap_or(Ok(Ty::Any))
}

// ------------------------------- Tests ------------------------------------ //
