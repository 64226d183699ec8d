use super::{base_url, context};
use crate::config::EmbeddedScriptConfig;
use crate::parsers::{Extractor, MalformedPayload, embedded::EmbeddedScriptExtractor};

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        let config: EmbeddedScriptConfig = serde_json::from_str("{}").unwrap();
        Extractor::EmbeddedScript(EmbeddedScriptExtractor::new(&config).unwrap())
    }

    fn page(collection_json: &str) -> String {
        format!(
            r#"<html><head>
<script id="web-pixels-manager-setup">
  (function() {{
    webPixelsManagerAPI.publish("collection_viewed", {});
  }})();
</script>
</head><body></body></html>"#,
            collection_json
        )
    }

    #[test]
    fn test_variants_group_under_parent() {
        let html = page(
            r#"{"collection": {"id": "c1", "productVariants": [
                {"id": "V1", "title": "S", "sku": "TEE-S",
                 "price": {"amount": 799.0, "currencyCode": "INR"},
                 "image": {"src": "//cdn.shop.example/files/tee.jpg"},
                 "product": {"id": "P1", "title": "Oversized Tee", "url": "/products/oversized-tee", "vendor": "Acme"}},
                {"id": "V2", "title": "M", "sku": "TEE-M",
                 "price": {"amount": 799.0, "currencyCode": "INR"},
                 "image": {"src": "//cdn.shop.example/files/tee.jpg"},
                 "product": {"id": "P1", "title": "Renamed Tee", "url": "/products/other", "vendor": "Acme"}},
                {"id": 31, "title": "32", "sku": "",
                 "price": {"amount": 1299.0},
                 "image": {"src": null},
                 "product": {"id": 2, "title": "Cargo Pants", "url": "/products/cargo", "vendor": "Acme"}}
            ]}}"#,
        );
        let base = base_url();
        let extraction = extractor().extract(&html, &context(&base, "new_arrivals")).unwrap();

        assert_eq!(extraction.records.len(), 2);
        assert!(extraction.signal_more);

        let tee = &extraction.records[0];
        assert_eq!(tee.id, "P1");
        assert_eq!(tee.title, "Oversized Tee");
        assert_eq!(tee.url, "https://www.shop.example/products/oversized-tee");
        assert_eq!(tee.category, "new_arrivals");
        assert_eq!(tee.variants.len(), 2);
        assert_eq!(tee.variants[0].size.as_deref(), Some("S"));
        assert_eq!(tee.variants[1].size.as_deref(), Some("M"));
        assert_eq!(tee.variants[0].price, Some(799.0));
        assert_eq!(tee.images.len(), 1);
        assert!(tee.images.contains("https://cdn.shop.example/files/tee.jpg"));
        assert_eq!(tee.extra["vendor"], "Acme");

        let pants = &extraction.records[1];
        assert_eq!(pants.id, "2");
        assert_eq!(pants.variants[0].variant_id, "31");
        assert_eq!(pants.variants[0].sku, None);
        assert!(pants.images.is_empty());
    }

    #[test]
    fn test_missing_script_is_malformed() {
        let base = base_url();
        let result = extractor().extract("<html><body>No data</body></html>", &context(&base, "all"));
        assert!(matches!(result, Err(MalformedPayload::MissingBlock(_))));
    }

    #[test]
    fn test_missing_marker_is_malformed() {
        let html = r#"<html><head><script id="web-pixels-manager-setup">init();</script></head></html>"#;
        let base = base_url();
        let result = extractor().extract(html, &context(&base, "all"));
        assert!(matches!(result, Err(MalformedPayload::MarkerNotFound)));
    }

    #[test]
    fn test_bad_json_is_malformed() {
        let html = page(r#"{"collection": {"productVariants": [,]}}"#);
        let base = base_url();
        let result = extractor().extract(&html, &context(&base, "all"));
        assert!(matches!(result, Err(MalformedPayload::InvalidJson(_))));
    }

    #[test]
    fn test_empty_collection_yields_no_records() {
        let html = page(r#"{"collection": {"productVariants": []}}"#);
        let base = base_url();
        let extraction = extractor().extract(&html, &context(&base, "all")).unwrap();
        assert!(extraction.records.is_empty());
    }
}
