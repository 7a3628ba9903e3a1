use std::collections::HashSet;

use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::locator::{resolve, Locator};
use crate::structured;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListingStrategy {
    /// Read the `itemListElement` entry of the structured-data blocks
    #[default]
    StructuredData,
    /// Scan the raw markup for product URLs
    UrlPattern,
}

pub struct Listing {
    strategy: ListingStrategy,
    product_url: Regex,
    next_page: Locator,
}

impl Listing {
    pub fn new(strategy: ListingStrategy, product_url_pattern: &str) -> Result<Self> {
        Ok(Self {
            strategy,
            product_url: Regex::new(product_url_pattern)?,
            next_page: Locator::attr(r#"link[rel="next"]"#, "href")?,
        })
    }

    /// Product URLs to schedule, in page order.
    pub fn product_urls(&self, page: &str, html: &Html, origin: &Url) -> Result<Vec<String>> {
        match self.strategy {
            ListingStrategy::StructuredData => from_item_list(html, origin),
            ListingStrategy::UrlPattern => self.from_markup(page, origin),
        }
    }

    pub fn next_page(&self, html: &Html, origin: &Url) -> Result<Option<String>> {
        self.next_page
            .first(html)
            .map(|href| resolve(origin, &href))
            .transpose()
    }

    fn from_markup(&self, page: &str, origin: &Url) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut urls = vec![];
        for m in self.product_url.find_iter(page) {
            let url = resolve(origin, m.as_str())?;
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
        Ok(urls)
    }
}

fn from_item_list(html: &Html, origin: &Url) -> Result<Vec<String>> {
    let entries = structured::entries(html)?;
    // Breadcrumbs are item lists too
    let item_list = entries
        .iter()
        .find(|entry| entry["@type"] == "ItemList" && entry.get("itemListElement").is_some())
        .map_or_else(|| structured::find(&entries, "itemListElement"), Ok)?;
    let item_list = &item_list["itemListElement"];
    let items = item_list
        .as_array()
        .ok_or_else(|| anyhow!("`itemListElement` isn't a list: {item_list}"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let url = item
                .get("url")
                .or_else(|| item.get("item").and_then(|it| it.get("url")))
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("Item #{} of `itemListElement` has no url", i + 1))?;
            resolve(origin, url)
        })
        .collect()
}
