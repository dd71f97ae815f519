//! Shape classification shared by schema derivation and validation.
//!
//! Both traversals call [`classify`] and dispatch on the returned [`Shape`];
//! neither inspects a [`Ty`] on its own. The decision order:
//!
//! 1. `Optional` is unwrapped once and reported as `nullable`. A second
//!    `Optional` under it is not unwrapped and falls through to step 8.
//! 2. containers: list, tuple, map
//! 3. boolean, before anything numeric
//! 4. enum
//! 5. any
//! 6. union of two or more variants (a one-variant union is its variant)
//! 7. record
//! 8. residual scalars: integer/float, everything else is a string

use std::sync::Arc;

use crate::ir::{EnumDef, RecordDef, ScalarKind, Ty};

#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Primitive(ScalarKind),
    List(&'a Ty),
    Tuple(&'a [Ty]),
    Map { key: &'a Ty, value: &'a Ty },
    Enum(&'a EnumDef),
    Any,
    Union(&'a [Ty]),
    Record(&'a Arc<RecordDef>),
}

#[derive(Debug, Clone, Copy)]
pub struct Classified<'a> {
    pub nullable: bool,
    pub shape: Shape<'a>,
}

pub fn classify(ty: &Ty) -> Classified<'_> {
    let (nullable, ty) = match ty {
        Ty::Optional(inner) => (true, inner.as_ref()),
        other => (false, other),
    };

    let shape = match ty {
        // 2) containers
        Ty::List(item) => Shape::List(item),
        Ty::Tuple(elems) => Shape::Tuple(elems),
        Ty::Map(key, value) => Shape::Map { key, value },
        // 3) bool is never numeric
        Ty::Primitive(ScalarKind::Boolean) => Shape::Primitive(ScalarKind::Boolean),
        // 4-7)
        Ty::Enum(def) => Shape::Enum(def),
        Ty::Any => Shape::Any,
        Ty::Union(variants) if variants.len() >= 2 => Shape::Union(variants),
        Ty::Union(variants) if variants.len() == 1 => {
            let inner = classify(&variants[0]);
            return Classified { nullable: nullable || inner.nullable, shape: inner.shape };
        }
        Ty::Record(def) => Shape::Record(def),
        // 8) residual
        Ty::Primitive(kind @ (ScalarKind::Integer | ScalarKind::Float)) => Shape::Primitive(*kind),
        Ty::Primitive(ScalarKind::String)
        | Ty::Opaque(_)
        | Ty::Optional(_)
        | Ty::Union(_) => Shape::Primitive(ScalarKind::String),
    };

    Classified { nullable, shape }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EnumDef, FieldDecl};

    fn primitive(ty: &Ty) -> Option<ScalarKind> {
        match classify(ty).shape {
            Shape::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    #[test]
    fn optional_unwraps_once() {
        let optional = Ty::optional(Ty::integer());
        let c = classify(&optional);
        assert!(c.nullable);
        assert!(matches!(c.shape, Shape::Primitive(ScalarKind::Integer)));

        // raw double wrap: the inner Optional is residual
        let double = Ty::Optional(Box::new(Ty::Optional(Box::new(Ty::integer()))));
        let c = classify(&double);
        assert!(c.nullable);
        assert!(matches!(c.shape, Shape::Primitive(ScalarKind::String)));
    }

    #[test]
    fn boolean_is_not_numeric() {
        assert_eq!(primitive(&Ty::boolean()), Some(ScalarKind::Boolean));
        assert_eq!(ScalarKind::Boolean.json_type(), "boolean");
        assert_eq!(ScalarKind::Integer.json_type(), "number");
        assert_eq!(ScalarKind::Float.json_type(), "number");
    }

    #[test]
    fn unrecognized_names_fall_back_to_string() {
        assert_eq!(primitive(&Ty::Opaque("datetime".into())), Some(ScalarKind::String));
        assert_eq!(primitive(&Ty::Union(vec![])), Some(ScalarKind::String));
    }

    #[test]
    fn containers_decompose() {
        let tuple = Ty::tuple([Ty::integer(), Ty::string()]);
        match classify(&tuple).shape {
            Shape::Tuple(elems) => assert_eq!(elems.len(), 2),
            other => panic!("expected tuple, got {other:?}"),
        }
        let map = Ty::map(Ty::string(), Ty::float());
        match classify(&map).shape {
            Shape::Map { key, value } => {
                assert_eq!(key.to_string(), "string");
                assert_eq!(value.to_string(), "float");
            }
            other => panic!("expected map, got {other:?}"),
        }
        assert!(matches!(classify(&Ty::list(Ty::Any)).shape, Shape::List(Ty::Any)));
    }

    #[test]
    fn unions_enums_records() {
        let status = Ty::enumeration(EnumDef::new("Status", ["DONE", "ERROR"]));
        assert!(matches!(classify(&status).shape, Shape::Enum(def) if def.name == "Status"));

        let union = Ty::union([Ty::string(), Ty::integer()]);
        assert!(matches!(classify(&union).shape, Shape::Union(v) if v.len() == 2));

        let one = Ty::Union(vec![Ty::optional(Ty::float())]);
        let c = classify(&one);
        assert!(c.nullable);
        assert!(matches!(c.shape, Shape::Primitive(ScalarKind::Float)));

        let def = RecordDef::builder("Point").field(FieldDecl::new("x", Ty::float())).build().unwrap();
        let point = Ty::optional(Ty::record(def));
        let c = classify(&point);
        assert!(c.nullable);
        assert!(matches!(c.shape, Shape::Record(d) if d.name() == "Point"));
    }
}
