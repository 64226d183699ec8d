mod embedded_tests;
mod ld_json_tests;

use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use crate::parsers::PageContext;

pub(crate) fn base_url() -> Url {
    Url::parse("https://www.shop.example").unwrap()
}

pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub(crate) fn context<'a>(base: &'a Url, category: &'a str) -> PageContext<'a> {
    PageContext {
        category,
        base_url: base,
        records_so_far: 0,
        scraped_at: fixed_time(),
    }
}
