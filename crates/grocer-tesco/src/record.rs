use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// One product with every review found across its review pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub description: String,
    pub manufacturer_address: String,
    pub return_address: String,
    pub net_contents: String,
    pub product_id: u64,
    pub product_url: String,
    pub image: String,
    pub title: String,
    pub category: String,
    pub price: f64,
    /// Keyed by a 1-based index running across all review pages.
    pub reviews: BTreeMap<u32, Review>,
    /// Keyed by the 1-based tile position on the product page.
    pub recommended_products: BTreeMap<u32, Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub text: Option<String>,
    pub stars: Stars,
}

/// A star rating, serialized as an integer or as `""` when the page shows none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stars {
    Rated(u32),
    Missing,
}

impl Stars {
    /// Reads the leading numeral of a rating text, `"Rated 4 out of 5 stars"` is 4.
    pub fn parse(fragment: Option<&str>) -> Self {
        let Some(fragment) = fragment else {
            return Self::Missing;
        };
        let digits: String = fragment
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect();
        match digits.parse() {
            Ok(stars) => Self::Rated(stars),
            Err(_) => {
                log::debug!("No rating in star fragment {fragment:?}");
                Self::Missing
            }
        }
    }
}

impl Serialize for Stars {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Rated(stars) => serializer.serialize_u32(*stars),
            Self::Missing => serializer.serialize_str(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub title: Option<String>,
    pub url: Option<String>,
}
