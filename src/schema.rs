//! Schema derivation: record declarations → JSON-Schema-like components.
//!
//! Every field goes through [`classify`], so the emitted fragment always
//! describes the shape the validator enforces. Nested records are emitted as
//! `$ref`s and registered under their own name in the [`SchemaRegistry`]
//! (once per name, first registration wins).
//!
//! Nullability and defaults are decorated the same way for every shape:
//! - `nullable: true` for `Optional` fields
//! - `default` when the field has an effective default
//! - with [`DeriveOptions::default_value_none`], defaults are emitted as
//!   `null` and every nullable field gets `default: null`
pub mod registry;

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::classify::{classify, Classified, Shape};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::ir::{DefaultFactory, DefaultValue, FieldDecl, RecordDef, Ty};

pub use registry::{Registration, SchemaRegistry};

// ------------------------------- Policy ---------------------------------- //

#[derive(Debug, Clone, Copy, Default)]
pub struct DeriveOptions {
    /// Documentation profiles that must not leak real default values.
    pub default_value_none: bool,
}

const ANY_ARMS: [&str; 5] = ["string", "number", "boolean", "array", "object"];

// ------------------------------- Deriver --------------------------------- //

pub struct SchemaDeriver<'r> {
    registry: &'r SchemaRegistry,
    options: DeriveOptions,
    sink: Arc<dyn DiagnosticSink>,
}

impl<'r> SchemaDeriver<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry, options: DeriveOptions::default(), sink: Arc::new(TracingSink) }
    }

    pub fn with_options(mut self, options: DeriveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.registry
    }

    /// Derive the component for `record`, register it under its name and return it.
    pub fn derive(&self, record: &RecordDef) -> Value {
        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();
        for field in record.fields() {
            properties.insert(field.name.clone(), self.field_schema(field));
            if !field.has_default() {
                required.push(Value::from(field.name.clone()));
            }
        }

        let mut component = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            component["required"] = Value::Array(required);
        }

        if self.registry.register(record.name(), component.clone()) == Registration::Conflict {
            self.sink.report(Diagnostic::DuplicateComponent { name: record.name().to_string() });
        }
        component
    }

    /// Fragment for one declared field, defaults included.
    pub fn field_schema(&self, field: &FieldDecl) -> Value {
        self.type_schema(&field.ty, schema_default(field.default.as_ref()))
    }

    /// Fragment for a type at an element/variant position (no defaults).
    pub fn element_schema(&self, ty: &Ty) -> Value {
        self.type_schema(ty, None)
    }

    fn type_schema(&self, ty: &Ty, default: Option<Value>) -> Value {
        let Classified { nullable, shape } = classify(ty);
        // lists only carry array defaults (the empty-list factory, or an explicit array)
        let default = match shape {
            Shape::List(_) => default.filter(Value::is_array),
            _ => default,
        };
        let mut o = self.shape_schema(shape);
        self.decorate(&mut o, nullable, default);
        o
    }

    fn shape_schema(&self, shape: Shape<'_>) -> Value {
        match shape {
            Shape::Primitive(kind) => json!({ "type": kind.json_type() }),

            // value shape is not captured
            Shape::Map { .. } => json!({ "type": "object" }),

            Shape::Enum(def) => json!({
                "type": def.kind().json_type(),
                "enum": def.member_values(),
            }),

            Shape::Record(def) => {
                self.derive(def);
                json!({ "$ref": def.component_ref(), "type": "object" })
            }

            Shape::List(item) => json!({
                "type": "array",
                "items": { "allOf": [self.element_schema(item)] },
            }),

            Shape::Tuple(elems) => json!({
                "type": "array",
                "items": {
                    "oneOf": elems.iter().map(|t| self.element_schema(t)).collect::<Vec<_>>(),
                    "minItems": elems.len(),
                    "maxItems": elems.len(),
                },
            }),

            Shape::Any => json!({
                "anyOf": ANY_ARMS.iter().map(|t| json!({ "type": t })).collect::<Vec<_>>(),
            }),

            // record variants register themselves through element_schema
            Shape::Union(variants) => json!({
                "type": "object",
                "oneOf": variants.iter().map(|t| self.element_schema(t)).collect::<Vec<_>>(),
            }),
        }
    }

    fn decorate(&self, o: &mut Value, nullable: bool, default: Option<Value>) {
        if nullable {
            o["nullable"] = Value::Bool(true);
        }
        match default {
            Some(_) if self.options.default_value_none => o["default"] = Value::Null,
            Some(value) => o["default"] = value,
            None if nullable && self.options.default_value_none => o["default"] = Value::Null,
            None => {}
        }
    }
}

/// Default as documented: explicit non-null values and the builtin factories.
/// Custom factories are not run at documentation time.
fn schema_default(default: Option<&DefaultValue>) -> Option<Value> {
    match default? {
        DefaultValue::Value(Value::Null) => None,
        DefaultValue::Value(value) => Some(value.clone()),
        DefaultValue::Factory(factory @ (DefaultFactory::EmptyList | DefaultFactory::EmptyMap)) => {
            Some(factory.produce())
        }
        DefaultValue::Factory(DefaultFactory::Custom { .. }) => None,
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::ir::{EnumDef, FieldDecl, RecordDef, Ty};

    fn address() -> Arc<RecordDef> {
        RecordDef::builder("Address")
            .field(FieldDecl::new("city", Ty::string()))
            .field(FieldDecl::new("zip", Ty::optional(Ty::string())).with_default(Value::Null))
            .build()
            .unwrap()
    }

    #[test]
    fn primitive_fields() {
        let def = RecordDef::builder("Item")
            .field(FieldDecl::new("name", Ty::string()))
            .field(FieldDecl::new("price", Ty::float()).with_default(json!(9.5)))
            .field(FieldDecl::new("count", Ty::optional(Ty::integer())))
            .field(FieldDecl::new("active", Ty::boolean()).with_default(json!(false)))
            .build()
            .unwrap();
        let reg = SchemaRegistry::new();
        let schema = SchemaDeriver::new(&reg).derive(&def);
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "price": { "type": "number", "default": 9.5 },
                    "count": { "type": "number", "nullable": true },
                    "active": { "type": "boolean", "default": false },
                },
                "required": ["name", "count"],
            })
        );
        assert_eq!(reg.get("Item"), Some(schema));
    }

    #[test]
    fn deriving_twice_is_stable() {
        let def = address();
        let reg = SchemaRegistry::new();
        let sink = Arc::new(CollectingSink::new());
        let deriver = SchemaDeriver::new(&reg).with_sink(sink.clone());
        let first = deriver.derive(&def);
        let after_first = reg.snapshot();
        let second = deriver.derive(&def);
        assert_eq!(first, second);
        assert_eq!(reg.snapshot(), after_first);
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn nested_records_become_refs_registered_once() {
        let addr = address();
        let def = RecordDef::builder("Customer")
            .field(FieldDecl::new("home", Ty::record(addr.clone())))
            .field(FieldDecl::new("work", Ty::optional(Ty::record(addr.clone()))))
            .field(FieldDecl::new("past", Ty::list(Ty::record(addr))).with_factory(DefaultFactory::EmptyList))
            .build()
            .unwrap();
        let reg = SchemaRegistry::new();
        let schema = SchemaDeriver::new(&reg).derive(&def);

        assert_eq!(
            schema["properties"]["home"],
            json!({ "$ref": "#/components/schemas/Address", "type": "object" })
        );
        assert_eq!(
            schema["properties"]["work"],
            json!({ "$ref": "#/components/schemas/Address", "type": "object", "nullable": true })
        );
        assert_eq!(
            schema["properties"]["past"],
            json!({
                "type": "array",
                "items": { "allOf": [{ "$ref": "#/components/schemas/Address", "type": "object" }] },
                "default": [],
            })
        );
        assert_eq!(reg.names(), ["Address", "Customer"]);
    }

    #[test]
    fn enum_tuple_map_any() {
        let def = RecordDef::builder("Shape")
            .field(FieldDecl::new("status", Ty::enumeration(EnumDef::new("Status", ["DONE", "ERROR"]))))
            .field(FieldDecl::new("level", Ty::enumeration(EnumDef::new("Level", [1i64, 2]))))
            .field(FieldDecl::new("pair", Ty::tuple([Ty::integer(), Ty::string()])))
            .field(FieldDecl::new("meta", Ty::optional(Ty::map(Ty::string(), Ty::Any))))
            .field(FieldDecl::new("extra", Ty::Any).with_default(json!("x")))
            .build()
            .unwrap();
        let reg = SchemaRegistry::new();
        let props = SchemaDeriver::new(&reg).derive(&def)["properties"].clone();

        assert_eq!(props["status"], json!({ "type": "string", "enum": ["DONE", "ERROR"] }));
        assert_eq!(props["level"], json!({ "type": "number", "enum": [1, 2] }));
        assert_eq!(
            props["pair"],
            json!({
                "type": "array",
                "items": {
                    "oneOf": [{ "type": "number" }, { "type": "string" }],
                    "minItems": 2,
                    "maxItems": 2,
                },
            })
        );
        assert_eq!(props["meta"], json!({ "type": "object", "nullable": true }));
        assert_eq!(props["extra"]["anyOf"].as_array().unwrap().len(), 5);
        assert_eq!(props["extra"]["default"], json!("x"));
    }

    #[test]
    fn union_registers_record_variants() {
        let a = RecordDef::builder("A").field(FieldDecl::new("a", Ty::string())).build().unwrap();
        let b = RecordDef::builder("B").field(FieldDecl::new("b", Ty::integer())).build().unwrap();
        let def = RecordDef::builder("Holder")
            .field(FieldDecl::new("either", Ty::union([Ty::record(a), Ty::record(b)])))
            .build()
            .unwrap();
        let reg = SchemaRegistry::new();
        let schema = SchemaDeriver::new(&reg).derive(&def);
        assert_eq!(
            schema["properties"]["either"],
            json!({
                "type": "object",
                "oneOf": [
                    { "$ref": "#/components/schemas/A", "type": "object" },
                    { "$ref": "#/components/schemas/B", "type": "object" },
                ],
            })
        );
        assert!(reg.contains("A") && reg.contains("B"));
    }

    #[test]
    fn default_none_policy_hides_defaults() {
        let def = RecordDef::builder("Profile")
            .field(FieldDecl::new("lang", Ty::string()).with_default(json!("en")))
            .field(FieldDecl::new("nick", Ty::optional(Ty::string())))
            .field(FieldDecl::new("tags", Ty::list(Ty::string())).with_factory(DefaultFactory::EmptyList))
            .field(FieldDecl::new("age", Ty::integer()))
            .build()
            .unwrap();
        let reg = SchemaRegistry::new();
        let props = SchemaDeriver::new(&reg)
            .with_options(DeriveOptions { default_value_none: true })
            .derive(&def)["properties"]
            .clone();
        assert_eq!(props["lang"], json!({ "type": "string", "default": null }));
        assert_eq!(props["nick"], json!({ "type": "string", "nullable": true, "default": null }));
        assert_eq!(props["tags"]["default"], Value::Null);
        assert_eq!(props["age"], json!({ "type": "number" }));
    }

    #[test]
    fn custom_factories_and_null_defaults_are_not_documented() {
        let def = RecordDef::builder("Event")
            .field(FieldDecl::new("id", Ty::string()).with_factory(DefaultFactory::custom("uuid", || json!("generated"))))
            .field(FieldDecl::new("note", Ty::optional(Ty::string())).with_default(Value::Null))
            .build()
            .unwrap();
        let reg = SchemaRegistry::new();
        let schema = SchemaDeriver::new(&reg).derive(&def);
        assert_eq!(schema["properties"]["id"], json!({ "type": "string" }));
        assert_eq!(schema["properties"]["note"], json!({ "type": "string", "nullable": true }));
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn name_collision_is_reported_not_raised() {
        let first = RecordDef::builder("Thing").field(FieldDecl::new("a", Ty::string())).build().unwrap();
        let other = RecordDef::builder("Thing").field(FieldDecl::new("b", Ty::integer())).build().unwrap();
        let reg = SchemaRegistry::new();
        let sink = Arc::new(CollectingSink::new());
        let deriver = SchemaDeriver::new(&reg).with_sink(sink.clone());
        deriver.derive(&first);
        deriver.derive(&other);
        assert!(reg.get("Thing").unwrap()["properties"].get("a").is_some());
        assert_eq!(sink.diagnostics(), vec![Diagnostic::DuplicateComponent { name: "Thing".into() }]);
    }

    #[test]
    fn unrecognized_types_document_as_strings() {
        let def = RecordDef::builder("Stamp")
            .field(FieldDecl::new("at", Ty::Opaque("datetime".into())))
            .build()
            .unwrap();
        let reg = SchemaRegistry::new();
        let schema = SchemaDeriver::new(&reg).derive(&def);
        assert_eq!(schema["properties"]["at"], json!({ "type": "string" }));
    }
}
