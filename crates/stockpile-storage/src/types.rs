use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document as held by a store: its identifier plus the field map.
///
/// The identifier is kept outside `fields`; callers that expose it on the
/// wire add it themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Value,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Shallow-merges `patch` into `target`, the way a `$set` of every top-level
/// field behaves. Non-object patches replace nothing.
pub(crate) fn merge_fields(target: &mut Value, patch: &Value) {
    if let (Value::Object(dst), Value::Object(src)) = (target, patch) {
        for (k, v) in src {
            dst.insert(k.clone(), v.clone());
        }
    }
}

impl StoredDocument {
    /// Applies an update payload to this document in place.
    pub fn apply_update(&mut self, patch: &Value) {
        if !self.fields.is_object() {
            self.fields = Value::Object(Map::new());
        }
        merge_fields(&mut self.fields, patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_update_overwrites_top_level_fields_only() {
        let mut doc = StoredDocument::new(
            "1",
            json!({"name": "Pen", "price": 1.5, "createdAt": "2024-01-01T00:00:00Z"}),
        );
        doc.apply_update(&json!({"price": 2.0, "updatedAt": "2024-01-02T00:00:00Z"}));
        assert_eq!(
            doc.fields,
            json!({
                "name": "Pen",
                "price": 2.0,
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-02T00:00:00Z"
            })
        );
    }

    #[test]
    fn apply_update_repairs_non_object_body() {
        let mut doc = StoredDocument::new("1", json!(null));
        doc.apply_update(&json!({"a": 1}));
        assert_eq!(doc.fields, json!({"a": 1}));
    }
}
