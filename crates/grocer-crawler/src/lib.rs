mod config;
mod crawler;
mod robots;
mod scrapable;

pub use config::{CrawlerConfig, OnError, Throttle};
pub use crawler::crawl_site;
pub use scrapable::{CountedTx, PageLocation, Request, Scrapable, ScrapingContext};

pub use anyhow;
