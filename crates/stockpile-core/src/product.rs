use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ValidationError;
use crate::resource::{Resource, Validate};

/// A product in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

/// Body of `POST /products` and `PUT /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

impl Validate for ProductInput {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::new(
                "price",
                "must be a non-negative number",
            ));
        }
        if self.stock < 0 {
            return Err(ValidationError::new("stock", "must not be negative"));
        }
        Ok(())
    }
}

impl Resource for Product {
    type Input = ProductInput;

    const KIND: &'static str = "product";
    const COLLECTION: &'static str = "products";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(name: &str, price: f64, stock: i64) -> ProductInput {
        ProductInput {
            name: name.into(),
            price,
            stock,
        }
    }

    #[test]
    fn validates_required_fields() {
        assert!(input("Pen", 1.5, 100).validate().is_ok());
        assert_eq!(input("  ", 1.5, 1).validate().unwrap_err().field, "name");
        assert_eq!(input("Pen", -1.0, 1).validate().unwrap_err().field, "price");
        assert_eq!(
            input("Pen", f64::NAN, 1).validate().unwrap_err().field,
            "price"
        );
        assert_eq!(input("Pen", 1.0, -3).validate().unwrap_err().field, "stock");
    }

    #[test]
    fn serializes_with_wire_names() {
        let product = Product {
            id: "p1".into(),
            name: "Pen".into(),
            price: 2.0,
            stock: 90,
            created_at: Some(time::macros::datetime!(2024-05-01 10:00 UTC)),
            updated_at: None,
        };
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "p1",
                "name": "Pen",
                "price": 2.0,
                "stock": 90,
                "createdAt": "2024-05-01T10:00:00Z"
            })
        );
        let back: Product = serde_json::from_value(value).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn input_requires_all_fields() {
        let err = serde_json::from_value::<ProductInput>(json!({"name": "Pen", "price": 1.5}));
        assert!(err.is_err());
    }
}
