use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

pub trait Scrapable {
    type Config: Clone + Send + 'static;

    /// State carried from the page that scheduled a request to the handler of its response.
    type Meta: Send + 'static;

    fn new(config: &Self::Config) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn seed(&self) -> Vec<Request<Self::Meta>>;

    fn scrap(
        &mut self,
        page: String,
        meta: Self::Meta,
        ctx: ScrapingContext<Self::Meta>,
    ) -> anyhow::Result<()>;

    fn finalizer(&mut self) {}
}

/// A page to fetch along with the state its handler will receive.
#[derive(Debug, Clone, PartialEq)]
pub struct Request<M> {
    pub url: String,
    pub meta: M,
}

impl<M> Request<M> {
    pub fn new(url: impl Into<String>, meta: M) -> Self {
        Self {
            url: url.into(),
            meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLocation {
    Url(String),
    Path(PathBuf),
}

impl PageLocation {
    pub fn get(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug)]
pub struct CountedTx<M> {
    tx: mpsc::UnboundedSender<Request<M>>,
    counter: Arc<AtomicUsize>,
}

impl<M> Clone for CountedTx<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            counter: self.counter.clone(),
        }
    }
}

impl<M> CountedTx<M> {
    pub fn new(tx: mpsc::UnboundedSender<Request<M>>, counter: Arc<AtomicUsize>) -> Self {
        Self { tx, counter }
    }

    pub fn send(&self, req: Request<M>) {
        // Counted before the send so the crawl can't look finished while it's in flight
        self.counter.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.tx.send(req) {
            self.counter.fetch_sub(1, Ordering::SeqCst);
            log::error!("Couldn't send request for {}", e.0.url);
        }
    }
}

/// What a scraper knows about the page being scraped, and how it schedules more pages.
#[derive(Debug)]
pub struct ScrapingContext<M> {
    location: Rc<PageLocation>,
    tx_req: CountedTx<M>,
}

impl<M> ScrapingContext<M> {
    pub fn new(location: Rc<PageLocation>, tx_req: CountedTx<M>) -> Self {
        Self { location, tx_req }
    }

    pub fn location(&self) -> Rc<PageLocation> {
        self.location.clone()
    }

    pub fn send(&self, req: Request<M>) {
        self.tx_req.send(req)
    }
}
