use std::future::Future;
use std::io::prelude::*;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Error, Result};
use flate2::read::GzDecoder;
use futures::stream::{self, LocalBoxStream};
use futures::{future, try_join, StreamExt};
use lazy_static::lazy_static;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::{CrawlerConfig, OnError};
use crate::robots::RobotsCache;
use crate::scrapable::{CountedTx, PageLocation, Request, Scrapable, ScrapingContext};

lazy_static! {
    static ref HTTP_CLI: reqwest::Client = reqwest::ClientBuilder::new()
        .gzip(true)
        .deflate(true)
        .build()
        .expect("Couldn't build HTTP client");
}

#[derive(Debug, Clone)]
pub(crate) struct Downloaded {
    pub(crate) page: String,
    pub(crate) location: PageLocation,
}

#[derive(Debug)]
struct Page<M> {
    page: String,
    location: PageLocation,
    meta: M,
}

pub(crate) async fn download(config: &CrawlerConfig, url: &str) -> Result<Downloaded> {
    let resp = HTTP_CLI
        .get(url)
        .header(USER_AGENT, &config.user_agent)
        .send()
        .await?
        .error_for_status()?;

    // Redirects are followed, the page is located where it was served from
    let location = PageLocation::Url(resp.url().to_string());

    let page = match resp.headers().get(CONTENT_TYPE) {
        Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
            let compressed = resp.bytes().await?;
            let mut gz = GzDecoder::new(&compressed[..]);
            let mut page = String::new();
            gz.read_to_string(&mut page)?;
            page
        }
        _ => resp.text().await?,
    };

    Ok(Downloaded { page, location })
}

fn until_err<T, E>(
    err: &mut &mut Result<(), E>,
    item: Result<T, E>,
) -> impl Future<Output = Option<T>> {
    match item {
        Ok(item) => future::ready(Some(item)),
        Err(e) => {
            **err = Err(e);
            future::ready(None)
        }
    }
}

fn paced<'a, M: 'a>(
    requests: UnboundedReceiverStream<Request<M>>,
    period: Option<Duration>,
) -> LocalBoxStream<'a, Request<M>> {
    match period {
        None => requests.boxed_local(),
        Some(period) => tokio_stream::StreamExt::throttle(requests, period).boxed_local(),
    }
}

pub async fn crawl_site<T>(
    crawler_conf: &CrawlerConfig,
    scraper_conf: &T::Config,
) -> anyhow::Result<()>
where
    T: Scrapable,
{
    crawler_conf.validate()?;
    let period = crawler_conf.throttle.map(|t| t.period()).transpose()?;
    // Fails before any worker starts
    let seeds = <T as Scrapable>::new(scraper_conf)?.seed();

    let pages_in = Arc::new(AtomicUsize::new(0));
    let pages_out = Arc::new(AtomicUsize::new(0));

    let (tx_stop, rx_stop) = crossbeam_channel::unbounded::<()>();
    let (tx_req, rx_req) = mpsc::unbounded_channel::<Request<T::Meta>>();
    let (tx_page, rx_page) =
        crossbeam_channel::bounded::<Page<T::Meta>>(crawler_conf.page_buffer);

    let tx_req = CountedTx::new(tx_req, pages_in.clone());

    // Workers

    let mut workers = vec![];
    for id in 0..crawler_conf.num_workers {
        let rx_stop = rx_stop.clone();
        let tx_stop = tx_stop.clone();
        let rx_page = rx_page.clone();
        let tx_req = tx_req.clone();
        let pages_out = pages_out.clone();
        let scraper_conf = scraper_conf.clone();
        let crawler_conf = crawler_conf.clone();
        let worker = thread::Builder::new()
            .name(format!("{id}"))
            .spawn(move || {
                let mut scraper = <T as Scrapable>::new(&scraper_conf)?;
                loop {
                    crossbeam_channel::select! {
                        recv(rx_page) -> page => {
                            if let Ok(Page { page, location, meta }) = page {
                                let location = Rc::new(location);
                                let ctx = ScrapingContext::new(location.clone(), tx_req.clone());
                                match scraper.scrap(page, meta, ctx) {
                                    Ok(()) => (),
                                    Err(e) => match crawler_conf.on_scrap_error {
                                        OnError::SkipAndLog => {
                                            log::error!("Skipping scrap for page {location:?} got: {e:#}");
                                        }
                                        OnError::Fail => {
                                            for _ in 0..crawler_conf.num_workers {
                                                tx_stop.send(()).ok();
                                            }
                                            return Err(e.context(format!("Couldn't scrap page {location:?}")));
                                        }
                                    },
                                }
                                pages_out.fetch_add(1, Ordering::SeqCst);
                            } else {
                                break
                            }
                        },
                        recv(rx_stop) -> _ => break
                    }
                }
                Ok::<(), Error>(())
            })?;
        workers.push(worker);
    }
    drop(rx_page);
    let workers = async move {
        tokio::task::spawn_blocking(|| {
            for w in workers {
                w.join().map_err(|_| anyhow!("Worker thread panicked"))??;
            }
            Ok::<(), Error>(())
        })
        .await?
    };

    // Downloader

    let robots = crawler_conf.obey_robots.then(RobotsCache::default);
    let robots = &robots;
    let pages_in_c = pages_in.clone();
    let requests = paced(UnboundedReceiverStream::new(rx_req), period);
    let downloader = async move {
        let stream = requests
            .zip(stream::repeat_with(move || pages_in_c.clone()))
            .map(|(Request { url, meta }, pages_in)| async move {
                if let Some(robots) = robots {
                    if !robots.allowed(crawler_conf, &url).await {
                        log::info!("Skipping URL disallowed by robots.txt: {url}");
                        pages_in.fetch_sub(1, Ordering::SeqCst);
                        return Ok(None);
                    }
                }
                log::debug!("Downloading {url}");
                match download(crawler_conf, &url).await {
                    Ok(Downloaded { page, location }) => Ok(Some(Page {
                        page,
                        location,
                        meta,
                    })),
                    Err(e) => {
                        pages_in.fetch_sub(1, Ordering::SeqCst);
                        Err(e.context(format!("Couldn't download {url}")))
                    }
                }
            })
            .buffer_unordered(crawler_conf.concurrent_downloads);

        match crawler_conf.on_dl_error {
            OnError::Fail => {
                let mut err = Ok::<(), Error>(());
                stream
                    .scan(&mut err, until_err)
                    .filter_map(future::ready)
                    .map(|page| tx_page.send(page).ok())
                    .collect::<Vec<_>>()
                    .await;
                err
            }
            OnError::SkipAndLog => {
                stream
                    .filter_map(|dl| async move {
                        dl.map_err(|e| log::warn!("Skipping URL: {e:#}"))
                            .ok()
                            .flatten()
                    })
                    .map(|page| tx_page.send(page).ok())
                    .collect::<Vec<_>>()
                    .await;
                Ok(())
            }
        }
    };

    // Crawler

    for req in seeds {
        tx_req.send(req);
    }
    drop(tx_req);

    // Run all tasks

    let done: Pin<Box<dyn Future<Output = Result<()>>>> = Box::pin(async move {
        loop {
            if crawler_conf.handle_sigint {
                if timeout(Duration::from_secs(1), tokio::signal::ctrl_c())
                    .await
                    .is_ok()
                {
                    return Err(anyhow!("Interrupted"));
                }
            } else {
                sleep(Duration::from_secs(1)).await;
            }
            if pages_out.load(Ordering::SeqCst) == pages_in.load(Ordering::SeqCst) {
                for _ in 0..crawler_conf.num_workers {
                    tx_stop.send(()).ok();
                }
                return Ok(());
            }
        }
    });

    let res = try_join!(workers, downloader, done);
    <T as Scrapable>::new(scraper_conf)?.finalizer();
    res?;

    Ok(())
}
