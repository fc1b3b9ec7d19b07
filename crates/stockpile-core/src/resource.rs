//! The contract every cached resource kind implements.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, ValidationError};

/// Field under which the store-assigned identifier is exposed.
pub const ID_FIELD: &str = "_id";
/// Timestamp set when a record is created.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Timestamp set on every update.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Checks a write payload before it reaches any store.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// A resource kind stored in one document collection and cached under its own
/// key prefix.
///
/// `KIND` and `COLLECTION` must be unique across kinds: entity keys are
/// `{KIND}:{id}` and the collection key is `{COLLECTION}:all`.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Payload accepted by create and update.
    type Input: Serialize + DeserializeOwned + Validate + Send + Sync;

    /// Singular name, e.g. `product`.
    const KIND: &'static str;

    /// Collection name, e.g. `products`.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn cache_key(id: &str) -> String {
        format!("{}:{id}", Self::KIND)
    }

    fn collection_cache_key() -> String {
        format!("{}:all", Self::COLLECTION)
    }

    /// Builds a record from a stored document body and its identifier.
    fn from_document(id: &str, fields: Value) -> Result<Self, CoreError> {
        let mut fields = match fields {
            Value::Object(map) => map,
            other => {
                return Err(CoreError::invalid_document(
                    Self::COLLECTION,
                    format!("expected an object, found {other}"),
                ));
            }
        };
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| CoreError::invalid_document(Self::COLLECTION, e.to_string()))
    }
}
