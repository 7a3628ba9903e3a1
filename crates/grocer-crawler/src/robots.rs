use std::collections::HashMap;

use texting_robots::{get_robots_url, Robot};
use tokio::sync::Mutex;

use crate::config::CrawlerConfig;
use crate::crawler::download;

/// Per-origin robots.txt rules, fetched on first use.
#[derive(Default)]
pub(crate) struct RobotsCache {
    robots: Mutex<HashMap<String, Option<Robot>>>,
}

impl RobotsCache {
    pub(crate) async fn allowed(&self, config: &CrawlerConfig, url: &str) -> bool {
        let robots_url = match get_robots_url(url) {
            Ok(robots_url) => robots_url,
            Err(e) => {
                log::warn!("Couldn't build robots.txt URL for {url} got: {e}");
                return true;
            }
        };

        if let Some(robot) = self.robots.lock().await.get(&robots_url) {
            return robot.as_ref().map_or(true, |robot| robot.allowed(url));
        }

        // Fetched unlocked, the first result inserted for an origin wins
        let robot = fetch_robot(config, &robots_url).await;
        let mut robots = self.robots.lock().await;
        let robot = robots.entry(robots_url).or_insert(robot);
        robot.as_ref().map_or(true, |robot| robot.allowed(url))
    }
}

async fn fetch_robot(config: &CrawlerConfig, robots_url: &str) -> Option<Robot> {
    let txt = match download(config, robots_url).await {
        Ok(page) => page.page,
        Err(e) => {
            log::warn!("Couldn't download {robots_url}, allowing all got: {e}");
            return None;
        }
    };
    match Robot::new(&config.user_agent, txt.as_bytes()) {
        Ok(robot) => Some(robot),
        Err(e) => {
            log::warn!("Couldn't parse {robots_url}, allowing all got: {e}");
            None
        }
    }
}
