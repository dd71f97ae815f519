// Declared type expressions and record descriptors. Built once, shared via Arc.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::{Number, Value};

use crate::error::{CatalogError, ValidationError};

// ————————————————————————————————————————————————————————————————————————————
// SCALARS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl ScalarKind {
    /// JSON Schema `type` keyword. Integers and floats are both `number`.
    pub fn json_type(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer | ScalarKind::Float => "number",
            ScalarKind::Boolean => "boolean",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarKind::Integer | ScalarKind::Float)
    }
}

/// A scalar enum member. Floats go through `OrderedFloat` so members hash and compare.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(OrderedFloat<f64>),
    Boolean(bool),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::String(_) => ScalarKind::String,
            Scalar::Integer(_) => ScalarKind::Integer,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Boolean(_) => ScalarKind::Boolean,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::String(s) => Value::from(s.clone()),
            Scalar::Integer(i) => Value::from(*i),
            Scalar::Float(f) => Number::from_f64(f.0).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Boolean(b) => Value::from(*b),
        }
    }

    /// `None` for null, arrays, objects and integers outside `i64`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Bool(b) => Some(Scalar::Boolean(*b)),
            Value::Number(n) if n.is_f64() => n.as_f64().map(|f| Scalar::Float(OrderedFloat(f))),
            Value::Number(n) => n.as_i64().map(Scalar::Integer),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self { Scalar::String(s.to_string()) }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self { Scalar::String(s) }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self { Scalar::Integer(i) }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self { Scalar::Float(OrderedFloat(f)) }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self { Scalar::Boolean(b) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<Scalar>, // declaration order
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        Self { name: name.into(), members: members.into_iter().map(Into::into).collect() }
    }

    /// Kind of the first member. Mixed-kind enums are not supported; an empty
    /// enum is treated as a string enum.
    pub fn kind(&self) -> ScalarKind {
        self.members.first().map(Scalar::kind).unwrap_or(ScalarKind::String)
    }

    pub fn contains(&self, scalar: &Scalar) -> bool {
        self.members.contains(scalar)
    }

    pub fn member_values(&self) -> Vec<Value> {
        self.members.iter().map(Scalar::to_json).collect()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub enum Ty {
    Primitive(ScalarKind),
    Optional(Box<Ty>),       // one level of nullability
    List(Box<Ty>),
    Tuple(Vec<Ty>),          // fixed arity
    Map(Box<Ty>, Box<Ty>),   // key, value
    Enum(Arc<EnumDef>),
    Union(Vec<Ty>),
    Record(Arc<RecordDef>),
    Any,
    Opaque(String),          // unrecognized declared name; classified as string
}

impl Ty {
    pub fn string() -> Self { Ty::Primitive(ScalarKind::String) }
    pub fn integer() -> Self { Ty::Primitive(ScalarKind::Integer) }
    pub fn float() -> Self { Ty::Primitive(ScalarKind::Float) }
    pub fn boolean() -> Self { Ty::Primitive(ScalarKind::Boolean) }

    /// `Optional(Optional(x))` collapses to `Optional(x)`.
    pub fn optional(inner: Ty) -> Self {
        match inner {
            Ty::Optional(_) => inner,
            other => Ty::Optional(Box::new(other)),
        }
    }

    pub fn list(item: Ty) -> Self { Ty::List(Box::new(item)) }

    pub fn tuple(elems: impl IntoIterator<Item = Ty>) -> Self {
        Ty::Tuple(elems.into_iter().collect())
    }

    pub fn map(key: Ty, value: Ty) -> Self { Ty::Map(Box::new(key), Box::new(value)) }

    /// A single-variant union is just that variant.
    pub fn union(variants: impl IntoIterator<Item = Ty>) -> Self {
        let mut variants: Vec<Ty> = variants.into_iter().collect();
        if variants.len() == 1 {
            return variants.remove(0);
        }
        Ty::Union(variants)
    }

    pub fn record(def: Arc<RecordDef>) -> Self { Ty::Record(def) }

    pub fn enumeration(def: EnumDef) -> Self { Ty::Enum(Arc::new(def)) }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, tys: &[Ty]) -> fmt::Result {
            for (i, ty) in tys.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{ty}")?;
            }
            Ok(())
        }
        match self {
            Ty::Primitive(kind) => write!(f, "{}", kind.name()),
            Ty::Optional(inner) => write!(f, "optional[{inner}]"),
            Ty::List(item) => write!(f, "list[{item}]"),
            Ty::Tuple(elems) => {
                write!(f, "tuple[")?;
                join(f, elems)?;
                write!(f, "]")
            }
            Ty::Map(key, value) => write!(f, "map[{key}, {value}]"),
            Ty::Enum(def) => write!(f, "{}", def.name),
            Ty::Union(variants) => {
                write!(f, "union[")?;
                join(f, variants)?;
                write!(f, "]")
            }
            Ty::Record(def) => write!(f, "{}", def.name()),
            Ty::Any => write!(f, "any"),
            Ty::Opaque(name) => write!(f, "{name}"),
        }
    }
}

/// Runtime kind of a JSON value, as reported in validation errors.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FIELDS & DEFAULTS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
pub enum DefaultFactory {
    EmptyList,
    EmptyMap,
    Custom { name: String, make: Arc<dyn Fn() -> Value + Send + Sync> },
}

impl DefaultFactory {
    pub fn custom<F>(name: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        DefaultFactory::Custom { name: name.into(), make: Arc::new(make) }
    }

    pub fn name(&self) -> &str {
        match self {
            DefaultFactory::EmptyList => "list",
            DefaultFactory::EmptyMap => "dict",
            DefaultFactory::Custom { name, .. } => name,
        }
    }

    pub fn produce(&self) -> Value {
        match self {
            DefaultFactory::EmptyList => Value::Array(Vec::new()),
            DefaultFactory::EmptyMap => Value::Object(serde_json::Map::new()),
            DefaultFactory::Custom { make, .. } => make(),
        }
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefaultFactory({})", self.name())
    }
}

/// At most one of an explicit default or a factory; the enum makes that structural.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    Value(Value),             // explicit, may be null
    Factory(DefaultFactory),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Factory(factory) => factory.produce(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Ty,
    pub default: Option<DefaultValue>, // None: no default at all
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        Self { name: name.into(), ty, default: None }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    pub fn with_factory(mut self, factory: DefaultFactory) -> Self {
        self.default = Some(DefaultValue::Factory(factory));
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Value assigned when an instance omits this field.
    pub fn instance_default(&self) -> Value {
        self.default.as_ref().map(DefaultValue::produce).unwrap_or(Value::Null)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RECORDS
// ————————————————————————————————————————————————————————————————————————————

/// Per-field hook run after generic coercion; its return value becomes the field value.
pub type FieldHook = Arc<dyn Fn(Value, &FieldDecl) -> Result<Value, ValidationError> + Send + Sync>;

pub struct RecordDef {
    name: String,
    fields: IndexMap<String, FieldDecl>,
    hooks: HashMap<String, FieldHook>,
}

impl RecordDef {
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder { name: name.into(), fields: IndexMap::new(), hooks: HashMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn hook(&self, field: &str) -> Option<&FieldHook> {
        self.hooks.get(field)
    }

    /// `$ref` target of this record's registered component.
    pub fn component_ref(&self) -> String {
        format!("#/components/schemas/{}", self.name)
    }
}

impl fmt::Debug for RecordDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<&String> = self.hooks.keys().collect();
        hooks.sort();
        f.debug_struct("RecordDef")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("hooks", &hooks)
            .finish()
    }
}

pub struct RecordBuilder {
    name: String,
    fields: IndexMap<String, FieldDecl>,
    hooks: HashMap<String, FieldHook>,
}

impl RecordBuilder {
    /// Redeclaring a field replaces it in place.
    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.insert(decl.name.clone(), decl);
        self
    }

    pub fn hook<F>(self, field: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Value, &FieldDecl) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        self.shared_hook(field, Arc::new(hook))
    }

    pub fn shared_hook(mut self, field: impl Into<String>, hook: FieldHook) -> Self {
        self.hooks.insert(field.into(), hook);
        self
    }

    pub fn build(self) -> Result<Arc<RecordDef>, CatalogError> {
        let mut orphans: Vec<&String> =
            self.hooks.keys().filter(|field| !self.fields.contains_key(*field)).collect();
        orphans.sort();
        if let Some(field) = orphans.first() {
            return Err(CatalogError::UnknownHookField {
                record: self.name.clone(),
                field: field.to_string(),
            });
        }
        Ok(Arc::new(RecordDef { name: self.name, fields: self.fields, hooks: self.hooks }))
    }
}
