//! Product data published as an inline JSON object inside a script element.
//!
//! Shopify storefronts announce the current collection to their analytics
//! pixels with a call like
//!
//! ```text
//! webPixelsManagerAPI.publish("collection_viewed", {"collection": {...}});
//! ```
//!
//! The object lists one entry per variant, so entries sharing a parent
//! product are folded into a single record.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{ConfigError, EmbeddedScriptConfig};
use crate::parsers::{Extraction, MalformedPayload, PageContext, html};
use crate::results::{ProductRecord, Variant};
use crate::utils::{id_string, major_units, normalize_image_url, resolve_url};

#[derive(Debug, Clone)]
pub struct EmbeddedScriptExtractor {
    script_id: String,
    marker: Regex,
    image_width: u32,
}

#[derive(Debug, Deserialize)]
struct PixelVariant {
    id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    price: Option<PixelPrice>,
    #[serde(default)]
    image: Option<PixelImage>,
    product: PixelProduct,
}

#[derive(Debug, Deserialize)]
struct PixelPrice {
    #[serde(default)]
    amount: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PixelImage {
    #[serde(default)]
    src: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PixelProduct {
    id: Value,
    title: String,
    url: String,
    #[serde(default)]
    vendor: Option<String>,
}

impl EmbeddedScriptExtractor {
    pub fn new(config: &EmbeddedScriptConfig) -> Result<Self, ConfigError> {
        let marker = RegexBuilder::new(&config.marker_pattern)
            .dot_matches_new_line(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: config.marker_pattern.clone(),
                source,
            })?;

        Ok(Self {
            script_id: config.script_id.clone(),
            marker,
            image_width: config.image_width,
        })
    }

    pub fn extract(&self, payload: &str, ctx: &PageContext) -> Result<Extraction, MalformedPayload> {
        let script = html::script_text_by_id(payload, &self.script_id)
            .ok_or_else(|| MalformedPayload::MissingBlock(format!("script#{}", self.script_id)))?;

        let json = self
            .marker
            .captures(&script)
            .and_then(|caps| caps.get(1))
            .ok_or(MalformedPayload::MarkerNotFound)?
            .as_str();

        let data: Value = serde_json::from_str(json)?;
        let variants = data
            .pointer("/collection/productVariants")
            .and_then(Value::as_array)
            .ok_or_else(|| MalformedPayload::MissingField("collection.productVariants".to_string()))?;

        let records = self.group_variants(variants, ctx);
        ::log::debug!(
            "Grouped {} variants into {} products",
            variants.len(),
            records.len()
        );

        Ok(Extraction {
            records,
            raw: vec![data],
            signal_more: true,
            total_count: None,
            next_cursor: None,
        })
    }

    /// Folds variant entries into one record per parent product, in first-seen order
    fn group_variants(&self, variants: &[Value], ctx: &PageContext) -> Vec<ProductRecord> {
        let mut records: Vec<ProductRecord> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for raw in variants {
            let variant: PixelVariant = match serde_json::from_value(raw.clone()) {
                Ok(v) => v,
                Err(e) => {
                    ::log::debug!("Skipping malformed variant entry: {}", e);
                    continue;
                }
            };
            let Some(product_id) = id_string(&variant.product.id) else {
                ::log::debug!("Skipping variant without a product id");
                continue;
            };

            let slot = match index.get(&product_id) {
                Some(&slot) => slot,
                None => {
                    let url = resolve_url(ctx.base_url, &variant.product.url)
                        .unwrap_or_else(|| variant.product.url.clone());
                    let mut record = ProductRecord::new(
                        product_id.clone(),
                        variant.product.title.clone(),
                        url,
                        ctx.category.to_string(),
                    );
                    if let Some(vendor) = &variant.product.vendor {
                        record.set_extra("vendor", Value::String(vendor.clone()));
                    }
                    records.push(record);
                    index.insert(product_id, records.len() - 1);
                    records.len() - 1
                }
            };
            let record = &mut records[slot];

            record.variants.push(Variant {
                variant_id: id_string(&variant.id).unwrap_or_default(),
                price: variant
                    .price
                    .as_ref()
                    .and_then(|p| major_units(p.amount.as_ref())),
                size: variant.title,
                sku: variant.sku.filter(|s| !s.is_empty()),
            });

            if let Some(src) = variant.image.and_then(|i| i.src) {
                if let Some(image) = normalize_image_url(ctx.base_url, &src, self.image_width) {
                    record.images.insert(image);
                }
            }
        }

        records
    }
}
