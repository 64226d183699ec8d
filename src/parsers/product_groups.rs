//! Catalog APIs that nest products as
//! `productGroups[].elements[].commercialComponents[]`, with prices in
//! minor units and templated image URLs.

use serde_json::Value;

use crate::config::ProductGroupsConfig;
use crate::parsers::{Extraction, MalformedPayload, PageContext};
use crate::results::ProductRecord;
use crate::utils::{fill_template, id_string, minor_units_to_major, normalize_image_url, resolve_url};

#[derive(Debug, Clone)]
pub struct ProductGroupsExtractor {
    url_template: String,
    image_width: u32,
}

impl ProductGroupsExtractor {
    pub fn new(config: &ProductGroupsConfig) -> Self {
        Self {
            url_template: config.url_template.clone(),
            image_width: config.image_width,
        }
    }

    pub fn extract(&self, payload: &str, ctx: &PageContext) -> Result<Extraction, MalformedPayload> {
        let data: Value = serde_json::from_str(payload)?;

        let groups = data
            .get("productGroups")
            .and_then(Value::as_array)
            .ok_or_else(|| MalformedPayload::MissingField("productGroups".to_string()))?;

        let elements = groups
            .iter()
            .filter_map(|group| group.get("elements").and_then(Value::as_array))
            .flatten()
            .collect::<Vec<&Value>>();

        if !elements.iter().any(|e| e.get("commercialComponents").is_some()) {
            return Err(MalformedPayload::MissingField(
                "productGroups[].elements[].commercialComponents".to_string(),
            ));
        }

        let mut extraction = Extraction {
            signal_more: true,
            ..Extraction::default()
        };
        let components = elements
            .iter()
            .filter_map(|e| e.get("commercialComponents").and_then(Value::as_array))
            .flatten();

        for component in components {
            if component.get("type").and_then(Value::as_str) != Some("Product") {
                continue;
            }
            match self.to_record(component, ctx) {
                Some(record) => {
                    extraction.records.push(record);
                    extraction.raw.push(component.clone());
                }
                None => ::log::debug!("Skipping component missing an id or SEO data"),
            }
        }

        Ok(extraction)
    }

    fn to_record(&self, component: &Value, ctx: &PageContext) -> Option<ProductRecord> {
        let id = component.get("id").and_then(id_string)?;
        let path = fill_template(&self.url_template, component.get("seo")?)?;
        let url = resolve_url(ctx.base_url, &path)?;
        let title = component
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unnamed Product")
            .to_string();

        let mut record = ProductRecord::new(id, title, url, ctx.category.to_string());

        let media = component
            .pointer("/detail/colors")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|color| color.get("xmedia").and_then(Value::as_array))
            .flatten();
        for item in media {
            if let Some(image) = item
                .get("url")
                .and_then(Value::as_str)
                .and_then(|src| normalize_image_url(ctx.base_url, src, self.image_width))
            {
                record.images.insert(image);
            }
        }

        if let Some(price) = minor_units_to_major(component.get("price")) {
            record.set_extra("price", Value::from(price));
        }
        record.set_extra("scraped_at", ctx.scraped_at_value());

        Some(record)
    }
}
