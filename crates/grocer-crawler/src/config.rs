use std::cmp;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub obey_robots: bool,

    #[serde(default = "default_page_buffer")]
    pub page_buffer: usize,

    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,

    #[serde(default)]
    pub throttle: Option<Throttle>,

    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    #[serde(default = "default_on_dl_error")]
    pub on_dl_error: OnError,

    #[serde(default = "default_on_scrap_error")]
    pub on_scrap_error: OnError,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            obey_robots: false,
            page_buffer: default_page_buffer(),
            concurrent_downloads: default_concurrent_downloads(),
            throttle: None,
            num_workers: default_num_workers(),
            on_dl_error: default_on_dl_error(),
            on_scrap_error: default_on_scrap_error(),
            handle_sigint: default_handle_sigint(),
        }
    }
}

impl CrawlerConfig {
    /// Rejects settings that would stall the crawl before the first download.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_workers == 0 {
            anyhow::bail!("Invalid crawler config, `numWorkers` must be at least 1");
        }
        if self.page_buffer == 0 {
            anyhow::bail!("Invalid crawler config, `pageBuffer` must be at least 1");
        }
        if self.concurrent_downloads == 0 {
            anyhow::bail!("Invalid crawler config, `concurrentDownloads` must be at least 1");
        }
        if let Some(throttle) = self.throttle {
            throttle.period()?;
        }
        Ok(())
    }
}

fn default_user_agent() -> String {
    String::from(
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/81.0.4044.122 Safari/537.36",
    )
}

fn default_page_buffer() -> usize {
    10_000
}

fn default_concurrent_downloads() -> usize {
    100
}

fn default_num_workers() -> usize {
    cmp::max(1, num_cpus::get().saturating_sub(2))
}

fn default_on_dl_error() -> OnError {
    OnError::SkipAndLog
}

fn default_on_scrap_error() -> OnError {
    OnError::SkipAndLog
}

fn default_handle_sigint() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Throttle {
    /// The number of requests per second
    PerSecond(u32),
    /// The delay in seconds between requests
    Delay(f32),
}

impl Throttle {
    /// Time between two requests.
    pub fn period(&self) -> anyhow::Result<Duration> {
        match *self {
            Self::PerSecond(0) => {
                anyhow::bail!("Invalid crawler config, `throttle.perSecond` must be at least 1")
            }
            Self::PerSecond(n) => Ok(Duration::from_secs_f64(1. / f64::from(n))),
            Self::Delay(d) if d > 0.0 => Duration::try_from_secs_f32(d).map_err(|e| {
                anyhow::anyhow!("Invalid crawler config, `throttle.delay` of {d}s got: {e}")
            }),
            Self::Delay(d) => {
                anyhow::bail!("Invalid crawler config, `throttle.delay` must be positive, got {d}")
            }
        }
    }
}
