use anyhow::{anyhow, bail, Context, Result};
use scraper::{Html, Selector};
use serde_json::Value;

const LD_JSON: &str = r#"script[type="application/ld+json"]"#;

static NULL: Value = Value::Null;

/// Every entry of every structured-data block, in document order.
///
/// Arrays and `@graph` containers are flattened. A page without any block, or with a
/// block that isn't JSON, is an error.
pub fn entries(html: &Html) -> Result<Vec<Value>> {
    let selector = Selector::parse(LD_JSON).map_err(|e| anyhow!("{e:?}"))?;

    let mut entries = vec![];
    let mut blocks = 0;
    for script in html.select(&selector) {
        blocks += 1;
        let raw: String = script.text().collect();
        let value: Value = serde_json::from_str(raw.trim())
            .with_context(|| format!("Malformed structured-data block #{blocks}"))?;
        flatten(value, &mut entries);
    }

    if blocks == 0 {
        bail!("No structured-data block found");
    }
    Ok(entries)
}

fn flatten(value: Value, entries: &mut Vec<Value>) {
    match value {
        Value::Array(values) => values.into_iter().for_each(|v| flatten(v, entries)),
        Value::Object(mut map) if map.contains_key("@graph") => {
            if let Some(graph) = map.remove("@graph") {
                flatten(graph, entries);
            }
        }
        value => entries.push(value),
    }
}

/// The first entry carrying `key`, wherever it sits in the blocks.
pub fn find<'a>(entries: &'a [Value], key: &str) -> Result<&'a Value> {
    entries
        .iter()
        .find(|entry| entry.get(key).is_some())
        .ok_or_else(|| anyhow!("No structured-data entry with `{key}`"))
}

/// Product metadata read from the entry carrying a `sku`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMeta {
    pub id: u64,
    pub image: String,
    pub title: String,
    pub category: String,
    pub price: f64,
}

impl ProductMeta {
    pub fn from_entries(entries: &[Value]) -> Result<Self> {
        let entry = find(entries, "sku")?;

        let id = match &entry["sku"] {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| anyhow!("Invalid sku {}", entry["sku"]))?;

        let offer = match &entry["offers"] {
            Value::Array(offers) => offers.first().unwrap_or(&NULL),
            offer => offer,
        };
        let price = match &offer["price"] {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| anyhow!("Missing or invalid price for sku {id}"))?;

        let image = match &entry["image"] {
            Value::Array(images) => images.first().and_then(Value::as_str),
            image => image.as_str(),
        };

        Ok(Self {
            id,
            image: image.unwrap_or_default().to_string(),
            title: string_at(entry, "name"),
            category: string_at(entry, "@type"),
            price,
        })
    }
}

fn string_at(entry: &Value, key: &str) -> String {
    entry[key].as_str().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(blocks: &[&str]) -> Html {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{b}</script>"#))
            .collect();
        Html::parse_document(&format!("<html><head>{scripts}</head><body></body></html>"))
    }

    #[test]
    fn sku_entry_is_searched_not_indexed() {
        let html = page(&[r#"[
            {"@type": "Organization", "name": "Tesco"},
            {"@type": "BreadcrumbList", "itemListElement": []},
            {"@type": "WebPage"},
            {"@type": "Product", "sku": "254656543", "name": "Plenty Kitchen Roll",
             "image": ["https://img.tesco.com/1.jpeg"], "offers": {"price": "2.75"}}
        ]"#]);
        let meta = ProductMeta::from_entries(&entries(&html).unwrap()).unwrap();
        assert_eq!(
            meta,
            ProductMeta {
                id: 254656543,
                image: "https://img.tesco.com/1.jpeg".into(),
                title: "Plenty Kitchen Roll".into(),
                category: "Product".into(),
                price: 2.75,
            }
        );
    }

    #[test]
    fn graph_and_numbers_are_accepted() {
        let html = page(&[
            r#"{"@type": "Organization"}"#,
            r#"{"@graph": [{"sku": 42, "offers": [{"price": 1.5}], "image": "i.jpg"}]}"#,
        ]);
        let meta = ProductMeta::from_entries(&entries(&html).unwrap()).unwrap();
        assert_eq!(meta.id, 42);
        assert_eq!(meta.price, 1.5);
        assert_eq!(meta.image, "i.jpg");
        assert_eq!(meta.title, "");
    }

    #[test]
    fn missing_price_fails_the_record() {
        let html = page(&[r#"[{"sku": "1", "offers": {}}]"#]);
        let err = ProductMeta::from_entries(&entries(&html).unwrap()).unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn missing_block_is_an_error() {
        let html = Html::parse_document("<html><body>nothing</body></html>");
        assert!(entries(&html).is_err());
    }

    #[test]
    fn malformed_block_is_an_error() {
        let html = page(&["[{]"]);
        assert!(entries(&html).is_err());
    }
}
