use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A normalized product discovered on a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Canonical product identifier, the deduplication key
    pub id: String,

    /// Human-readable product name
    pub title: String,

    /// Absolute product URL
    pub url: String,

    /// Category the record was discovered under
    pub category: String,

    /// Absolute image URLs
    #[serde(default)]
    pub images: BTreeSet<String>,

    /// Size/color options, when the site models them separately
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,

    /// Site-specific fields (price, description, vendor, timestamps...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductRecord {
    /// Create a record with no images, variants or extra fields
    pub fn new(id: String, title: String, url: String, category: String) -> Self {
        Self {
            id,
            title,
            url,
            category,
            images: BTreeSet::new(),
            variants: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Insert an extra field, skipping nulls
    pub fn set_extra(&mut self, key: &str, value: Value) {
        if !value.is_null() {
            self.extra.insert(key.to_string(), value);
        }
    }
}

/// One purchasable option of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: String,
    pub price: Option<f64>,
    pub size: Option<String>,
    pub sku: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_fields_are_flattened() {
        let mut record = ProductRecord::new(
            "42".to_string(),
            "Linen Shirt".to_string(),
            "https://shop.example/products/linen-shirt".to_string(),
            "shirts".to_string(),
        );
        record.set_extra("vendor", json!("Acme"));
        record.set_extra("price", Value::Null);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["vendor"], "Acme");
        assert!(value.get("price").is_none());
        assert!(value.get("variants").is_none());
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn test_unknown_fields_land_in_extra() {
        let value = json!({
            "id": "7",
            "title": "Cap",
            "url": "https://shop.example/p/7",
            "category": "hats",
            "images": ["https://shop.example/a.jpg"],
            "scraped_at": "2024-01-01T00:00:00Z"
        });
        let record: ProductRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.images.len(), 1);
        assert_eq!(record.extra["scraped_at"], "2024-01-01T00:00:00Z");
        assert!(record.variants.is_empty());
    }
}
