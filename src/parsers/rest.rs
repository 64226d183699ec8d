use serde_json::Value;

use crate::config::RestPageConfig;
use crate::parsers::{Extraction, MalformedPayload, PageContext};
use crate::results::ProductRecord;
use crate::utils::{
    fill_template, id_string, major_units, minor_units_to_major, normalize_image_url,
    parse_list_string, resolve_url,
};

/// Maps the elements of a JSON product array onto records
#[derive(Debug, Clone)]
pub struct RestPageExtractor {
    config: RestPageConfig,
}

impl RestPageExtractor {
    pub fn new(config: &RestPageConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn extract(&self, payload: &str, ctx: &PageContext) -> Result<Extraction, MalformedPayload> {
        let data: Value = serde_json::from_str(payload)?;

        let items = data
            .pointer(&self.config.items_pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| MalformedPayload::MissingField(self.config.items_pointer.clone()))?;

        let total_count = self
            .config
            .total_pointer
            .as_deref()
            .and_then(|pointer| data.pointer(pointer))
            .and_then(Value::as_u64);

        let next_cursor = self
            .config
            .next_cursor_pointer
            .as_deref()
            .and_then(|pointer| data.pointer(pointer))
            .and_then(id_string);

        let signal_more = match total_count {
            Some(total) => ((ctx.records_so_far + items.len()) as u64) < total,
            None => self.config.next_cursor_pointer.is_none() || next_cursor.is_some(),
        };

        let mut extraction = Extraction {
            signal_more,
            total_count,
            next_cursor,
            ..Extraction::default()
        };
        for item in items {
            match self.to_record(item, ctx) {
                Some(record) => extraction.records.push(record),
                None => ::log::debug!(
                    "Skipping item without {} or URL fields",
                    self.config.id_field
                ),
            }
            extraction.raw.push(item.clone());
        }

        Ok(extraction)
    }

    fn to_record(&self, item: &Value, ctx: &PageContext) -> Option<ProductRecord> {
        let cfg = &self.config;
        let id = item.get(&cfg.id_field).and_then(id_string)?;
        let path = fill_template(&cfg.url_template, item)?;
        let url = resolve_url(ctx.base_url, &path)?;
        let title = item
            .get(&cfg.title_field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut record = ProductRecord::new(id, title, url, ctx.category.to_string());

        for field in &cfg.image_fields {
            let sources = match item.get(field) {
                Some(Value::String(src)) => vec![src.as_str()],
                Some(Value::Array(srcs)) => srcs.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            for src in sources {
                if let Some(image) = normalize_image_url(ctx.base_url, src, cfg.image_width) {
                    record.images.insert(image);
                }
            }
        }

        for field in &cfg.extra_fields {
            if let Some(value) = item.get(field) {
                record.set_extra(field, value.clone());
            }
        }

        for field in &cfg.list_fields {
            let items = match item.get(field) {
                Some(Value::String(text)) => Value::from(parse_list_string(text)),
                Some(Value::Array(items)) => Value::Array(items.clone()),
                _ => Value::Array(Vec::new()),
            };
            record.set_extra(field, items);
        }

        // Normalized price wins over a raw copy of the same field
        if let Some(field) = &cfg.price_field {
            let price = if cfg.price_in_minor_units {
                minor_units_to_major(item.get(field))
            } else {
                major_units(item.get(field))
            };
            match price {
                Some(price) => record.set_extra(field, Value::from(price)),
                None => {
                    record.extra.remove(field.as_str());
                }
            }
        }

        record.set_extra("scraped_at", ctx.scraped_at_value());
        Some(record)
    }
}
