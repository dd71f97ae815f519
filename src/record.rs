use std::sync::Arc;

use serde_json::{Map, Value};

use crate::coerce::Validator;
use crate::error::ValidationError;
use crate::ir::RecordDef;

/// A validated record instance: coerced field values in declaration order.
#[derive(Debug, Clone)]
pub struct Record {
    def: Arc<RecordDef>,
    fields: Map<String, Value>,
}

impl Record {
    /// Validate `fields` with a default [`Validator`].
    pub fn new(def: Arc<RecordDef>, fields: Map<String, Value>) -> Result<Self, ValidationError> {
        Self::with_validator(def, fields, &Validator::default())
    }

    pub fn with_validator(
        def: Arc<RecordDef>,
        fields: Map<String, Value>,
        validator: &Validator,
    ) -> Result<Self, ValidationError> {
        let fields = validator.validate_fields(&def, fields)?;
        Ok(Self { def, fields })
    }

    pub fn from_value(def: Arc<RecordDef>, value: Value) -> Result<Self, ValidationError> {
        Self::from_value_with(def, value, &Validator::default())
    }

    pub fn from_value_with(def: Arc<RecordDef>, value: Value, validator: &Validator) -> Result<Self, ValidationError> {
        let fields = validator.validate_value(&def, value)?;
        Ok(Self { def, fields })
    }

    pub fn definition(&self) -> &Arc<RecordDef> {
        &self.def
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FieldDecl, Ty};
    use serde_json::json;

    fn point() -> Arc<RecordDef> {
        RecordDef::builder("Point")
            .field(FieldDecl::new("x", Ty::integer()))
            .field(FieldDecl::new("y", Ty::integer()).with_default(json!(0)))
            .build()
            .unwrap()
    }

    #[test]
    fn construction_validates() {
        let rec = Record::from_value(point(), json!({"x": "3"})).unwrap();
        assert_eq!(rec.get("x"), Some(&json!(3)));
        assert_eq!(rec.get("y"), Some(&json!(0)));
        assert_eq!(rec.definition().name(), "Point");
        assert_eq!(rec.into_value(), json!({"x": 3, "y": 0}));
    }

    #[test]
    fn construction_fails_on_bad_field() {
        let err = Record::from_value(point(), json!({"x": "three"})).unwrap_err();
        assert_eq!(err.field_name, "x");
        assert_eq!(err.code(), "VC001");
    }

    #[test]
    fn field_order_follows_declaration() {
        let mut input = Map::new();
        input.insert("y".into(), json!(2));
        input.insert("x".into(), json!(1));
        let rec = Record::new(point(), input).unwrap();
        let keys: Vec<&String> = rec.fields().keys().collect();
        assert_eq!(keys, ["x", "y"]);
    }
}
