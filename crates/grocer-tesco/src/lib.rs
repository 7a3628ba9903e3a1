pub mod listing;
pub mod locator;
pub mod product;
pub mod record;
pub mod reviews;
pub mod sink;
mod spider;
pub mod structured;

pub use record::{ProductRecord, Recommendation, Review, Stars};
pub use sink::{JsonArrayWriter, RecordSink};
pub use spider::{Outcome, Step, TescoConfig, TescoScraper, TescoScraperConfig, TescoSpider};

pub use anyhow;
