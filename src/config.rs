use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::utils::DEFAULT_IMAGE_WIDTH;

/// Errors raised while loading or validating a site configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("invalid {name} header value {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Complete description of one retail site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Short site name, used in logs
    pub name: String,

    /// Origin that relative product and image URLs are resolved against
    pub base_url: String,

    /// Categories to walk, in order
    pub categories: Vec<CategoryConfig>,

    /// How product records are pulled out of a payload
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub http: HttpConfig,

    pub output: OutputConfig,
}

/// A category label and the listing endpoint it is seeded from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub url: String,
}

/// Extraction strategy, selected per site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractorConfig {
    /// JSON object embedded in a script element behind a textual marker
    EmbeddedScript(EmbeddedScriptConfig),

    /// `application/ld+json` item list blocks
    StructuredData(StructuredDataConfig),

    /// JSON API page with a product array and a total count
    RestPage(RestPageConfig),

    /// JSON API page grouping products into commercial components
    ProductGroups(ProductGroupsConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedScriptConfig {
    /// `id` attribute of the script element holding the data
    #[serde(default = "default_script_id")]
    pub script_id: String,

    /// Regex whose first capture group is the JSON object
    #[serde(default = "default_marker_pattern")]
    pub marker_pattern: String,

    #[serde(default = "default_image_width")]
    pub image_width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredDataConfig {
    /// Declared `@type` of the blocks to consume
    #[serde(default = "default_item_type")]
    pub item_type: String,

    /// Only consider script elements carrying this attribute
    #[serde(default)]
    pub required_attribute: Option<String>,

    /// Whether the listing spans several pages
    #[serde(default)]
    pub paginated: bool,

    #[serde(default = "default_image_width")]
    pub image_width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestPageConfig {
    /// JSON pointer to the product array
    #[serde(default = "default_items_pointer")]
    pub items_pointer: String,

    /// JSON pointer to the total product count
    #[serde(default = "default_total_pointer")]
    pub total_pointer: Option<String>,

    /// JSON pointer to the next continuation token, for cursor pagination
    #[serde(default)]
    pub next_cursor_pointer: Option<String>,

    pub id_field: String,

    pub title_field: String,

    /// Product path with `{field}` placeholders, e.g. `/products/{handle}`
    pub url_template: String,

    /// Fields holding image references
    #[serde(default)]
    pub image_fields: Vec<String>,

    #[serde(default)]
    pub price_field: Option<String>,

    /// Whether `price_field` is expressed in minor units (cents)
    #[serde(default)]
    pub price_in_minor_units: bool,

    /// Fields copied verbatim into the record
    #[serde(default)]
    pub extra_fields: Vec<String>,

    /// Fields holding stringified lists such as `"['Beige']"`
    #[serde(default)]
    pub list_fields: Vec<String>,

    #[serde(default = "default_image_width")]
    pub image_width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroupsConfig {
    /// Product path filled from the component's `seo` object
    #[serde(default = "default_product_url_template")]
    pub url_template: String,

    #[serde(default = "default_image_width")]
    pub image_width: u32,
}

/// How successive pages are requested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default)]
    pub mode: PaginationMode,

    /// Query parameter carrying the page number or cursor token
    #[serde(default = "default_page_param")]
    pub param: String,

    /// First page number
    #[serde(default = "default_start_page")]
    pub start_page: u32,

    /// Page size, sent as `limit_param` when set
    #[serde(default)]
    pub limit: Option<u32>,

    #[serde(default = "default_limit_param")]
    pub limit_param: String,

    /// Parameters sent with every request
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// Parameter carrying the current epoch milliseconds, when the site wants one
    #[serde(default)]
    pub cache_buster_param: Option<String>,

    /// Pause between successful pages
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// 1-based page numbers
    #[default]
    Pages,
    /// Opaque continuation tokens read from each payload
    Cursor,
}

/// Retry policy for transient fetch failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Consecutive failures on one page before the category gives up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random extra delay as a percentage of the backoff delay
    #[serde(default)]
    pub jitter_percent: u64,
}

/// Request settings for the HTTP fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    #[serde(default)]
    pub referer: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where and how results are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file; with `timestamped` the stem gets a run timestamp suffix
    pub path: PathBuf,

    #[serde(default)]
    pub timestamped: bool,

    /// Load prior output and only append new identifiers
    #[serde(default = "default_true")]
    pub resume: bool,

    /// Also write the untransformed payload fragments here
    #[serde(default)]
    pub raw_path: Option<PathBuf>,

    /// Save after every completed category, not only at run end
    #[serde(default)]
    pub save_each_category: bool,

    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
}

impl SiteConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.base()?;
        Ok(config)
    }

    /// Parsed base origin
    pub fn base(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            mode: PaginationMode::default(),
            param: default_page_param(),
            start_page: default_start_page(),
            limit: None,
            limit_param: default_limit_param(),
            query: BTreeMap::new(),
            cache_buster_param: None,
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_percent: 0,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept: default_accept(),
            referer: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OutputConfig {
    /// Create an output configuration with default values
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timestamped: false,
            resume: true,
            raw_path: None,
            save_each_category: false,
            write_attempts: default_write_attempts(),
        }
    }
}

fn default_script_id() -> String {
    "web-pixels-manager-setup".to_string()
}

fn default_marker_pattern() -> String {
    r#"webPixelsManagerAPI\.publish\("collection_viewed",\s*(\{.*?\})\);"#.to_string()
}

fn default_item_type() -> String {
    "ItemList".to_string()
}

fn default_items_pointer() -> String {
    "/data/products".to_string()
}

fn default_total_pointer() -> Option<String> {
    Some("/data/total_count".to_string())
}

fn default_product_url_template() -> String {
    "/in/en/{keyword}-p{seoProductId}.html".to_string()
}

fn default_image_width() -> u32 {
    DEFAULT_IMAGE_WIDTH
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_limit_param() -> String {
    "limit".to_string()
}

fn default_page_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

fn default_accept() -> String {
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_write_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}
