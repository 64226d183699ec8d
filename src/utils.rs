use serde_json::Value;
use url::Url;

/// Canonical width substituted into templated image URLs
pub const DEFAULT_IMAGE_WIDTH: u32 = 1024;

/// Resolves a possibly relative reference against the site's base origin.
///
/// Protocol-relative references (`//cdn.example.com/a.jpg`) pick up the
/// base scheme. Returns `None` for empty or unparsable references.
pub fn resolve_url(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    base.join(reference).ok().map(|u| u.to_string())
}

/// Substitutes the `{width}` placeholder used by templated image URLs
pub fn expand_image_template(url: &str, width: u32) -> String {
    url.replace("{width}", &width.to_string())
}

/// Resolves an image reference and fills in its width placeholder
pub fn normalize_image_url(base: &Url, reference: &str, width: u32) -> Option<String> {
    let expanded = expand_image_template(reference, width);
    // `{` and `}` would be percent-encoded by the URL parser, so expand first
    resolve_url(base, &expanded)
}

/// Converts a price in minor currency units (cents) to major units.
///
/// Null, zero, missing and non-numeric prices map to `None`, never to zero.
pub fn minor_units_to_major(price: Option<&Value>) -> Option<f64> {
    let cents = price?.as_f64()?;
    if cents == 0.0 {
        return None;
    }
    Some(cents / 100.0)
}

/// Reads a price already expressed in major units (number or numeric string)
pub fn major_units(price: Option<&Value>) -> Option<f64> {
    let amount = match price? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if amount == 0.0 { None } else { Some(amount) }
}

/// Decodes the handful of HTML entities that leak into structured data
pub fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .trim()
        .to_string()
}

/// Derives an identifier from the trailing path segment of a product URL
pub fn id_from_url(url: &str) -> Option<String> {
    let last = url.rsplit('/').next()?;
    let id = last.split('?').next()?.split('#').next()?;
    if id.is_empty() { None } else { Some(id.to_string()) }
}

/// Renders a JSON identifier (string or number) as a string
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Splits a stringified list such as `"['Beige', 'Navy']"` into its items
pub fn parse_list_string(text: &str) -> Vec<String> {
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(|item| item.trim_matches(|c| c == ' ' || c == '\'' || c == '"'))
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

/// Fills `{name}` placeholders from the fields of a JSON object.
///
/// Returns `None` if any placeholder has no matching scalar field.
pub fn fill_template(template: &str, fields: &Value) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let end = rest[start..].find('}')? + start;
        let key = &rest[start + 1..end];
        let value = match fields.get(key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        out.push_str(&value);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://www.shop.example").unwrap()
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(minor_units_to_major(Some(&json!(19900))), Some(199.0));
        assert_eq!(minor_units_to_major(Some(&json!(1999))), Some(19.99));
        assert_eq!(minor_units_to_major(Some(&Value::Null)), None);
        assert_eq!(minor_units_to_major(Some(&json!(0))), None);
        assert_eq!(minor_units_to_major(Some(&json!("abc"))), None);
        assert_eq!(minor_units_to_major(None), None);
    }

    #[test]
    fn test_major_units() {
        assert_eq!(major_units(Some(&json!(1299.5))), Some(1299.5));
        assert_eq!(major_units(Some(&json!("899.00"))), Some(899.0));
        assert_eq!(major_units(Some(&json!(0.0))), None);
        assert_eq!(major_units(Some(&json!(null))), None);
    }

    #[test]
    fn test_image_template() {
        assert_eq!(
            expand_image_template("https://img.example.com/p/{width}/a.jpg", DEFAULT_IMAGE_WIDTH),
            "https://img.example.com/p/1024/a.jpg"
        );
        assert_eq!(
            normalize_image_url(&base(), "//cdn.example.com/{width}/b.jpg", 1024).as_deref(),
            Some("https://cdn.example.com/1024/b.jpg")
        );
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url(&base(), "/products/tee").as_deref(),
            Some("https://www.shop.example/products/tee")
        );
        assert_eq!(
            resolve_url(&base(), "https://other.example/x").as_deref(),
            Some("https://other.example/x")
        );
        assert_eq!(resolve_url(&base(), "  "), None);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities(" Men&#39;s Tee &amp; Cap &quot;Classic&quot; "),
            "Men's Tee & Cap \"Classic\""
        );
    }

    #[test]
    fn test_id_from_url() {
        assert_eq!(
            id_from_url("https://shop.example/products/blue-tee?variant=12").as_deref(),
            Some("blue-tee")
        );
        assert_eq!(id_from_url("/products/cap").as_deref(), Some("cap"));
        assert_eq!(id_from_url("https://shop.example/products/"), None);
    }

    #[test]
    fn test_parse_list_string() {
        assert_eq!(parse_list_string("['Beige']"), vec!["Beige"]);
        assert_eq!(parse_list_string("['Beige', 'Navy']"), vec!["Beige", "Navy"]);
        assert!(parse_list_string("[]").is_empty());
    }

    #[test]
    fn test_fill_template() {
        let seo = json!({"keyword": "linen-shirt", "seoProductId": 123456});
        assert_eq!(
            fill_template("/in/en/{keyword}-p{seoProductId}.html", &seo).as_deref(),
            Some("/in/en/linen-shirt-p123456.html")
        );
        assert_eq!(fill_template("/p/{missing}", &seo), None);
        assert_eq!(fill_template("/static", &seo).as_deref(), Some("/static"));
    }

    #[test]
    fn test_id_string() {
        assert_eq!(id_string(&json!(8812)).as_deref(), Some("8812"));
        assert_eq!(id_string(&json!("gid-1")).as_deref(), Some("gid-1"));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&json!(null)), None);
    }
}
