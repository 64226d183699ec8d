use super::{base_url, context};
use crate::config::StructuredDataConfig;
use crate::parsers::{Extractor, MalformedPayload, ld_json::StructuredDataExtractor};

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(required_attribute: Option<&str>) -> Extractor {
        let config = StructuredDataConfig {
            item_type: "ItemList".to_string(),
            required_attribute: required_attribute.map(|s| s.to_string()),
            paginated: false,
            image_width: 1024,
        };
        Extractor::StructuredData(StructuredDataExtractor::new(&config))
    }

    const PAGE: &str = r#"<html><head>
<script type="application/ld+json" tt-ninja>{"@type": "Organization", "name": "Shop"}</script>
<script type="application/ld+json" tt-ninja>{not json</script>
<script type="application/ld+json" tt-ninja>
{
  "@type": "ItemList",
  "itemListElement": [
    {"position": 1, "name": "Men&#39;s Shirt &amp; Tie", "url": "/products/mens-shirt?variant=9",
     "description": " The &quot;classic&quot; cut ", "image": "//cdn.shop.example/shirt.jpg"},
    {"position": 2, "name": "Chinos", "url": "https://www.shop.example/products/chinos",
     "description": "Cotton", "image": "/files/chinos.jpg"},
    {"position": 3, "name": "No URL"}
  ]
}
</script>
<script type="application/ld+json">{"@type": "ItemList", "itemListElement": [
    {"position": 1, "name": "Untagged", "url": "/products/untagged"}]}</script>
</head><body></body></html>"#;

    #[test]
    fn test_item_list_elements_map_to_records() {
        let base = base_url();
        let extraction = extractor(Some("tt-ninja"))
            .extract(PAGE, &context(&base, "shirts"))
            .unwrap();

        assert_eq!(extraction.records.len(), 2);
        assert!(!extraction.signal_more);

        let shirt = &extraction.records[0];
        assert_eq!(shirt.id, "mens-shirt");
        assert_eq!(shirt.title, "Men's Shirt & Tie");
        assert_eq!(shirt.url, "https://www.shop.example/products/mens-shirt?variant=9");
        assert_eq!(shirt.extra["description"], "The \"classic\" cut");
        assert_eq!(shirt.extra["position"], 1);
        assert!(shirt.images.contains("https://cdn.shop.example/shirt.jpg"));

        let chinos = &extraction.records[1];
        assert_eq!(chinos.id, "chinos");
        assert!(chinos.images.contains("https://www.shop.example/files/chinos.jpg"));
    }

    #[test]
    fn test_without_attribute_filter_all_lists_are_read() {
        let base = base_url();
        let extraction = extractor(None).extract(PAGE, &context(&base, "shirts")).unwrap();
        let ids: Vec<&str> = extraction.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["mens-shirt", "chinos", "untagged"]);
    }

    #[test]
    fn test_no_item_list_is_malformed() {
        let html = r#"<html><script type="application/ld+json">{"@type": "BreadcrumbList"}</script></html>"#;
        let base = base_url();
        let result = extractor(None).extract(html, &context(&base, "shirts"));
        assert!(matches!(result, Err(MalformedPayload::MissingBlock(_))));
    }
}
