use scraper::{Html, Selector};

/// Returns the text of the first `<script>` whose `id` matches
pub fn script_text_by_id(html: &str, id: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(&format!("script[id=\"{}\"]", id)).ok()?;

    doc.select(&selector)
        .next()
        .map(|e| e.text().collect::<String>())
}

/// Returns the text of every `<script>` with the given `type`,
/// optionally restricted to those carrying `required_attribute`
pub fn script_blocks(html: &str, script_type: &str, required_attribute: Option<&str>) -> Vec<String> {
    let doc = Html::parse_document(html);
    let selector_str = match required_attribute {
        Some(attr) => format!("script[type=\"{}\"][{}]", script_type, attr),
        None => format!("script[type=\"{}\"]", script_type),
    };
    let Ok(selector) = Selector::parse(&selector_str) else {
        ::log::warn!("Unusable script selector: {}", selector_str);
        return Vec::new();
    };

    let blocks = doc
        .select(&selector)
        .map(|e| e.text().collect::<String>())
        .collect::<Vec<String>>();

    ::log::debug!("Found {} script blocks matching {}", blocks.len(), selector_str);
    blocks
}
