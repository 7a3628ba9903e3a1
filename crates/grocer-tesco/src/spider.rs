use anyhow::{Context, Result};
use grocer_crawler::{Request, Scrapable, ScrapingContext};
use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::listing::{Listing, ListingStrategy};
use crate::product::Product;
use crate::record::ProductRecord;
use crate::reviews::{ReviewChain, Reviews};
use crate::sink::RecordSink;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TescoConfig {
    #[serde(default = "default_start_urls")]
    pub start_urls: Vec<String>,

    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default)]
    pub listing_strategy: ListingStrategy,

    #[serde(default = "default_product_url_pattern")]
    pub product_url_pattern: String,
}

impl Default for TescoConfig {
    fn default() -> Self {
        Self {
            start_urls: default_start_urls(),
            origin: default_origin(),
            listing_strategy: ListingStrategy::default(),
            product_url_pattern: default_product_url_pattern(),
        }
    }
}

fn default_start_urls() -> Vec<String> {
    vec![
        "https://www.tesco.com/groceries/en-GB/shop/household/kitchen-roll-and-tissues/all".into(),
        "https://www.tesco.com/groceries/en-GB/shop/pets/cat-food-and-accessories/all".into(),
    ]
}

fn default_origin() -> String {
    String::from("https://www.tesco.com")
}

fn default_product_url_pattern() -> String {
    String::from(r"(?:https://www\.tesco\.com)?/groceries/en-GB/products/\d+")
}

/// What a fetched page is, and the state carried to it.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A category listing page
    Listing,
    /// A product page or one of its review pages
    Reviews(ReviewChain),
    /// The canonical product page, fetched again once all reviews are gathered
    Details(ReviewChain),
}

/// Pages to fetch next and the record completed by a page, if any.
#[derive(Debug, Default)]
pub struct Outcome {
    pub follow: Vec<Request<Step>>,
    pub record: Option<ProductRecord>,
}

pub struct TescoSpider {
    start_urls: Vec<String>,
    origin: Url,
    listing: Listing,
    reviews: Reviews,
    product: Product,
}

impl TescoSpider {
    pub fn new(config: &TescoConfig) -> Result<Self> {
        Ok(Self {
            start_urls: config.start_urls.clone(),
            origin: Url::parse(&config.origin)
                .with_context(|| format!("Invalid origin {}", config.origin))?,
            listing: Listing::new(config.listing_strategy, &config.product_url_pattern)?,
            reviews: Reviews::new()?,
            product: Product::new()?,
        })
    }

    pub fn start_requests(&self) -> Vec<Request<Step>> {
        self.start_urls
            .iter()
            .map(|url| Request::new(url.clone(), Step::Listing))
            .collect()
    }

    /// Handles the page fetched from `url` for `step`.
    pub fn process(&self, page: &str, url: &str, step: Step) -> Result<Outcome> {
        let html = Html::parse_document(page);
        let mut outcome = Outcome::default();

        match step {
            Step::Listing => {
                for product_url in self.listing.product_urls(page, &html, &self.origin)? {
                    outcome.follow.push(Request::new(
                        product_url,
                        Step::Reviews(ReviewChain::default()),
                    ));
                }
                if let Some(next) = self.listing.next_page(&html, &self.origin)? {
                    outcome.follow.push(Request::new(next, Step::Listing));
                }
            }
            Step::Reviews(chain) => {
                let chain = chain
                    .anchored(url)
                    .with_page(self.reviews.extract(&html)?);
                match self.reviews.next_page(&html, &self.origin)? {
                    Some(next) => outcome.follow.push(Request::new(next, Step::Reviews(chain))),
                    None => {
                        let product_url = chain.product_url().unwrap_or(url).to_string();
                        if product_url == url {
                            outcome.record =
                                Some(self.product.extract(&html, url, chain, &self.origin)?);
                        } else {
                            // Product fields are read from the canonical page
                            outcome
                                .follow
                                .push(Request::new(product_url, Step::Details(chain)));
                        }
                    }
                }
            }
            Step::Details(chain) => {
                outcome.record = Some(self.product.extract(&html, url, chain, &self.origin)?);
            }
        }

        Ok(outcome)
    }

    /// Extracts a lone product page with the reviews it shows, without following any link.
    pub fn product_page(&self, page: &str, url: &str) -> Result<ProductRecord> {
        let html = Html::parse_document(page);
        let chain = ReviewChain::default()
            .anchored(url)
            .with_page(self.reviews.extract(&html)?);
        self.product.extract(&html, url, chain, &self.origin)
    }
}

#[derive(Debug, Clone)]
pub struct TescoScraperConfig {
    pub spider: TescoConfig,
    pub sink: RecordSink,
}

pub struct TescoScraper {
    spider: TescoSpider,
    sink: RecordSink,
}

impl Scrapable for TescoScraper {
    type Config = TescoScraperConfig;
    type Meta = Step;

    fn new(config: &TescoScraperConfig) -> Result<Self> {
        Ok(Self {
            spider: TescoSpider::new(&config.spider)?,
            sink: config.sink.clone(),
        })
    }

    fn seed(&self) -> Vec<Request<Step>> {
        self.spider.start_requests()
    }

    fn scrap(&mut self, page: String, step: Step, ctx: ScrapingContext<Step>) -> Result<()> {
        let url = ctx.location().get();
        let Outcome { follow, record } = self.spider.process(&page, &url, step)?;
        for req in follow {
            log::debug!("Following {} from {url}", req.url);
            ctx.send(req);
        }
        if let Some(record) = record {
            self.sink.send(record);
        }
        Ok(())
    }

    fn finalizer(&mut self) {
        self.sink.close();
    }
}
