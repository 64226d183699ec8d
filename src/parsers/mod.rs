pub mod embedded;
pub mod html;
pub mod ld_json;
pub mod product_groups;
pub mod rest;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, ExtractorConfig};
use crate::results::ProductRecord;

/// Why a payload yielded no usable product data
#[derive(Debug, Error)]
pub enum MalformedPayload {
    #[error("no script block matching {0}")]
    MissingBlock(String),

    #[error("data marker not found in script block")]
    MarkerNotFound,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing field {0}")]
    MissingField(String),
}

/// Per-page inputs an extractor needs besides the payload itself
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    /// Category label assigned to every record on the page
    pub category: &'a str,

    /// Origin relative URLs are resolved against
    pub base_url: &'a Url,

    /// Records already counted toward this category's total
    pub records_so_far: usize,

    /// Timestamp stamped on records by extractors that record one
    pub scraped_at: DateTime<Utc>,
}

impl PageContext<'_> {
    pub fn scraped_at_value(&self) -> Value {
        Value::String(self.scraped_at.to_rfc3339())
    }
}

/// What one payload produced
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Normalized records, in page order
    pub records: Vec<ProductRecord>,

    /// Untransformed fragments the records were built from
    pub raw: Vec<Value>,

    /// Whether the listing appears to continue past this page
    pub signal_more: bool,

    /// Total product count reported by the payload
    pub total_count: Option<u64>,

    /// Continuation token for the next request
    pub next_cursor: Option<String>,
}

/// Record-extraction strategy, chosen by site configuration
#[derive(Debug, Clone)]
pub enum Extractor {
    EmbeddedScript(embedded::EmbeddedScriptExtractor),
    StructuredData(ld_json::StructuredDataExtractor),
    RestPage(rest::RestPageExtractor),
    ProductGroups(product_groups::ProductGroupsExtractor),
}

impl Extractor {
    /// Build the extractor described by `config`
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        let extractor = match config {
            ExtractorConfig::EmbeddedScript(cfg) => {
                Extractor::EmbeddedScript(embedded::EmbeddedScriptExtractor::new(cfg)?)
            }
            ExtractorConfig::StructuredData(cfg) => {
                Extractor::StructuredData(ld_json::StructuredDataExtractor::new(cfg))
            }
            ExtractorConfig::RestPage(cfg) => Extractor::RestPage(rest::RestPageExtractor::new(cfg)),
            ExtractorConfig::ProductGroups(cfg) => {
                Extractor::ProductGroups(product_groups::ProductGroupsExtractor::new(cfg))
            }
        };
        Ok(extractor)
    }

    /// Convert one raw payload into product records
    pub fn extract(&self, payload: &str, ctx: &PageContext) -> Result<Extraction, MalformedPayload> {
        match self {
            Extractor::EmbeddedScript(e) => e.extract(payload, ctx),
            Extractor::StructuredData(e) => e.extract(payload, ctx),
            Extractor::RestPage(e) => e.extract(payload, ctx),
            Extractor::ProductGroups(e) => e.extract(payload, ctx),
        }
    }
}
