use serde_json::Value;

use crate::config::StructuredDataConfig;
use crate::parsers::{Extraction, MalformedPayload, PageContext, html};
use crate::results::ProductRecord;
use crate::utils::{decode_entities, id_from_url, normalize_image_url, resolve_url};

const LD_JSON: &str = "application/ld+json";

/// Reads `ItemList` blocks from `application/ld+json` scripts
#[derive(Debug, Clone)]
pub struct StructuredDataExtractor {
    item_type: String,
    required_attribute: Option<String>,
    paginated: bool,
    image_width: u32,
}

impl StructuredDataExtractor {
    pub fn new(config: &StructuredDataConfig) -> Self {
        Self {
            item_type: config.item_type.clone(),
            required_attribute: config.required_attribute.clone(),
            paginated: config.paginated,
            image_width: config.image_width,
        }
    }

    pub fn extract(&self, payload: &str, ctx: &PageContext) -> Result<Extraction, MalformedPayload> {
        let blocks = html::script_blocks(payload, LD_JSON, self.required_attribute.as_deref());

        let mut lists = Vec::new();
        for block in blocks {
            match serde_json::from_str::<Value>(&block) {
                Ok(data) if data.get("@type").and_then(Value::as_str) == Some(self.item_type.as_str()) => {
                    lists.push(data);
                }
                Ok(_) => {}
                Err(e) => ::log::debug!("Skipping unparsable ld+json block: {}", e),
            }
        }

        if lists.is_empty() {
            return Err(MalformedPayload::MissingBlock(format!(
                "{} @type={}",
                LD_JSON, self.item_type
            )));
        }

        let mut extraction = Extraction {
            signal_more: self.paginated,
            ..Extraction::default()
        };
        for list in lists {
            let items = list
                .get("itemListElement")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for item in items {
                match self.to_record(item, ctx) {
                    Some(record) => {
                        extraction.records.push(record);
                        extraction.raw.push(item.clone());
                    }
                    None => ::log::debug!("Skipping list element without a usable URL"),
                }
            }
        }

        Ok(extraction)
    }

    fn to_record(&self, item: &Value, ctx: &PageContext) -> Option<ProductRecord> {
        let raw_url = item.get("url").and_then(Value::as_str)?;
        let id = id_from_url(raw_url)?;
        let url = resolve_url(ctx.base_url, raw_url)?;
        let title = item
            .get("name")
            .and_then(Value::as_str)
            .map(decode_entities)
            .unwrap_or_default();

        let mut record = ProductRecord::new(id, title, url, ctx.category.to_string());

        if let Some(image) = item
            .get("image")
            .and_then(Value::as_str)
            .and_then(|src| normalize_image_url(ctx.base_url, src, self.image_width))
        {
            record.images.insert(image);
        }
        if let Some(description) = item.get("description").and_then(Value::as_str) {
            record.set_extra("description", Value::String(decode_entities(description)));
        }
        if let Some(position) = item.get("position") {
            record.set_extra("position", position.clone());
        }

        Some(record)
    }
}
