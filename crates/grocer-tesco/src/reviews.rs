use std::collections::BTreeMap;

use anyhow::Result;
use scraper::Html;
use url::Url;

use crate::locator::{resolve, try_in_order, Locator};
use crate::record::{Review, Stars};

const SECTIONS: &str = "#review-data article.content section.sc-dNLxif.dUMnMc";
const NEXT_PAGE: &str = "a.sc-ktHwxA.iYjymA.styled__TextButtonLink-ipdqot-0.GMOgz";

/// Reviews gathered so far for one product, handed from a review page to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewChain {
    reviews: BTreeMap<u32, Review>,
    offset: u32,
    product_url: Option<String>,
}

impl ReviewChain {
    /// Pins the canonical product URL to the first page of the chain.
    pub fn anchored(mut self, url: &str) -> Self {
        self.product_url.get_or_insert_with(|| url.to_string());
        self
    }

    /// Appends a page of reviews after the ones already gathered.
    pub fn with_page(mut self, page: Vec<Review>) -> Self {
        for review in page {
            self.offset += 1;
            self.reviews.insert(self.offset, review);
        }
        self
    }

    pub fn product_url(&self) -> Option<&str> {
        self.product_url.as_deref()
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn into_reviews(self) -> BTreeMap<u32, Review> {
        self.reviews
    }
}

/// Locators of the i-th review section, with fallbacks for the fields whose markup varies.
struct SectionLocators {
    title: Locator,
    author: [Locator; 2],
    date: [Locator; 2],
    text: [Locator; 2],
    stars: Locator,
}

impl SectionLocators {
    fn nth(i: usize) -> Result<Self> {
        let section = format!("#review-data article.content section:nth-of-type({i})");
        Ok(Self {
            title: Locator::text(&format!("{section} > h4"))?,
            author: [
                Locator::text(&format!("{section} > p:nth-of-type(1) > span:nth-of-type(1)"))?,
                Locator::text(&format!("{section} > p:nth-of-type(1)"))?,
            ],
            date: [
                Locator::text(&format!("{section} > p:nth-of-type(1) > span:nth-of-type(2)"))?,
                Locator::text(&format!("{section} > p:nth-of-type(2) > span"))?,
            ],
            text: [
                Locator::text(&format!("{section} > p:nth-of-type(2)"))?,
                Locator::text(&format!("{section} > p:nth-of-type(3)"))?,
            ],
            stars: Locator::text(&format!("{section} div:nth-of-type(1) span:nth-of-type(1)"))?,
        })
    }

    fn review(&self, html: &Html) -> Review {
        Review {
            title: self.title.first(html),
            author: try_in_order(html, &self.author),
            date: try_in_order(html, &self.date),
            text: try_in_order(html, &self.text),
            stars: Stars::parse(self.stars.first(html).as_deref()),
        }
    }
}

pub struct Reviews {
    sections: Locator,
    next_page: Locator,
}

impl Reviews {
    pub fn new() -> Result<Self> {
        Ok(Self {
            sections: Locator::text(SECTIONS)?,
            next_page: Locator::attr(NEXT_PAGE, "href")?,
        })
    }

    /// The reviews shown on this page, in page order.
    pub fn extract(&self, html: &Html) -> Result<Vec<Review>> {
        let count = self.sections.count(html);
        (1..=count)
            .map(|i| Ok(SectionLocators::nth(i)?.review(html)))
            .collect()
    }

    pub fn next_page(&self, html: &Html, origin: &Url) -> Result<Option<String>> {
        self.next_page
            .first(html)
            .map(|href| resolve(origin, &href))
            .transpose()
    }
}
