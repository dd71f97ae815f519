use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// Same name, same fragment: no-op.
    Unchanged,
    /// Same name, different fragment: the stored one is kept.
    Conflict,
}

/// Named schema components. Append-only: a name, once registered, never changes.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    components: Mutex<IndexMap<String, Value>>, // registration order
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Value>> {
        // entries are inserted whole, so a poisoned map is still consistent
        self.components.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, name: &str, fragment: Value) -> Registration {
        let mut components = self.lock();
        match components.get(name) {
            None => {
                components.insert(name.to_string(), fragment);
                Registration::Inserted
            }
            Some(existing) if *existing == fragment => Registration::Unchanged,
            Some(_) => Registration::Conflict,
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.lock().clone()
    }

    /// `{"components": {"schemas": {...}}}`, in registration order.
    pub fn to_document(&self) -> Value {
        let schemas: Map<String, Value> =
            self.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        json!({ "components": { "schemas": schemas } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let reg = SchemaRegistry::new();
        let frag = json!({"type": "object", "properties": {"a": {"type": "string"}}});
        assert_eq!(reg.register("A", frag.clone()), Registration::Inserted);
        let before = reg.snapshot();
        assert_eq!(reg.register("A", frag.clone()), Registration::Unchanged);
        assert_eq!(reg.snapshot(), before);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn first_registration_wins() {
        let reg = SchemaRegistry::new();
        reg.register("A", json!({"type": "object"}));
        assert_eq!(reg.register("A", json!({"type": "string"})), Registration::Conflict);
        assert_eq!(reg.get("A"), Some(json!({"type": "object"})));
    }

    #[test]
    fn document_keeps_registration_order() {
        let reg = SchemaRegistry::new();
        reg.register("Zeta", json!({}));
        reg.register("Alpha", json!({}));
        let doc = reg.to_document();
        let names: Vec<&String> = doc["components"]["schemas"].as_object().unwrap().keys().collect();
        assert_eq!(names, ["Zeta", "Alpha"]);
        assert_eq!(reg.names(), ["Zeta", "Alpha"]);
    }

    #[test]
    fn concurrent_registration_inserts_once() {
        let reg = SchemaRegistry::new();
        let inserted = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| reg.register("Shared", json!({"type": "object"}))))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join())
                .filter(|outcome| matches!(outcome, Ok(Registration::Inserted)))
                .count()
        });
        assert_eq!(inserted, 1);
        assert_eq!(reg.len(), 1);
    }
}
