use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use grocer_crawler::{crawl_site, CrawlerConfig, OnError, PageLocation};
use grocer_tesco::{RecordSink, TescoConfig, TescoScraper, TescoScraperConfig, TescoSpider};
use log::LevelFilter;
use tokio::runtime;

/// Tesco groceries crawler
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[command(name = "crawl")]
    Crawl(CrawlArgs),
    #[command(name = "scrap")]
    Scrap(ScrapArgs),
    #[command(hide = true)]
    Completion,
}

/// Crawl the category pages and write every product found to a JSON array
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// Path to the output file that will contain the products
    #[arg(long, short, default_value = "item.json")]
    pub output: PathBuf,
    /// Optional crawler yaml configuration file
    #[arg(env = "GROCER_CRAWLER_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// Optional spider yaml configuration file (start urls, origin, listing strategy)
    #[arg(env = "GROCER_SPIDER_CONFIG", long)]
    pub spider_config: Option<PathBuf>,
    /// Override crawler's user agent
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Skip URLs disallowed by robots.txt
    #[arg(long)]
    pub obey_robots: bool,
    /// Override crawler's page buffer size
    #[arg(long)]
    pub page_buffer: Option<usize>,
    /// Override crawler's maximum concurrent page downloads
    #[arg(long)]
    pub concurrent_downloads: Option<usize>,
    /// Override crawler's number of CPU workers used to parse pages
    #[arg(long)]
    pub num_workers: Option<usize>,
    /// No SIGINT handling, the output array won't be closed on interrupt
    #[arg(long)]
    pub no_sigint: bool,
    /// Override crawler's download error handling strategy
    #[arg(value_enum, long)]
    pub on_dl_error: Option<OnError>,
    /// Override crawler's scrap error handling strategy
    #[arg(value_enum, long)]
    pub on_scrap_error: Option<OnError>,
    /// Log level of the crawler and scraper
    #[arg(env = "LOG_LEVEL", long, default_value = "error")]
    pub log_level: LevelFilter,
    /// File receiving the logs
    #[arg(env = "LOG_FILE", long, default_value = "log.txt")]
    pub log_file: PathBuf,
    /// When quiet no logs are outputted
    #[arg(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CrawlArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(path) = &args.crawler_config {
            serde_yaml::from_reader(fs_err::File::open(path)?)?
        } else {
            CrawlerConfig::default()
        };
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if args.obey_robots {
            conf.obey_robots = true;
        }
        if let Some(page_buffer) = args.page_buffer {
            conf.page_buffer = page_buffer;
        }
        if let Some(concurrent_downloads) = args.concurrent_downloads {
            conf.concurrent_downloads = concurrent_downloads;
        }
        if let Some(num_workers) = args.num_workers {
            conf.num_workers = num_workers;
        }
        if let Some(on_dl_error) = args.on_dl_error {
            conf.on_dl_error = on_dl_error;
        }
        if let Some(on_scrap_error) = args.on_scrap_error {
            conf.on_scrap_error = on_scrap_error;
        }
        if args.no_sigint {
            conf.handle_sigint = false;
        }
        Ok(conf)
    }
}

fn spider_config(path: Option<&Path>) -> anyhow::Result<TescoConfig> {
    match path {
        Some(path) => Ok(serde_yaml::from_reader(fs_err::File::open(path)?)?),
        None => Ok(TescoConfig::default()),
    }
}

fn logger(level: LevelFilter, log_file: &Path) -> anyhow::Result<env_logger::Builder> {
    let log_file = fs_err::File::create(log_file)?;
    let mut builder = env_logger::Builder::new();
    builder
        .filter_module("grocer", level)
        .filter_module("grocer_crawler", level)
        .filter_module("grocer_tesco", level)
        .target(env_logger::Target::Pipe(Box::new(log_file)));
    Ok(builder)
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let crawler_conf = (&args).try_into()?;
    let scraper_conf = TescoScraperConfig {
        spider: spider_config(args.spider_config.as_deref())?,
        sink: RecordSink::create(&args.output)?,
    };
    log::info!(
        "Crawling {} into {}",
        scraper_conf.spider.start_urls.join(", "),
        args.output.display()
    );
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(crawl_site::<TescoScraper>(&crawler_conf, &scraper_conf))
}

/// Scrap a single product page, without its other review pages, and print it to stdout
#[derive(Debug, clap::Args)]
#[command(group = clap::ArgGroup::new("page").required(true))]
pub struct ScrapArgs {
    /// A local html page to scrap
    #[arg(group = "page", long)]
    pub file: Option<PathBuf>,
    /// A distant html page to scrap
    #[arg(group = "page", long)]
    pub url: Option<String>,
    /// Custom user agent to download the page
    #[arg(long, conflicts_with = "file")]
    pub ua: Option<String>,
    /// Optional spider yaml configuration file, its origin resolves relative links
    #[arg(env = "GROCER_SPIDER_CONFIG", long)]
    pub spider_config: Option<PathBuf>,
}

pub fn scrap(args: ScrapArgs) -> anyhow::Result<()> {
    let spider = TescoSpider::new(&spider_config(args.spider_config.as_deref())?)?;
    let (page, location) = if let Some(url) = args.url {
        let mut builder = reqwest::blocking::ClientBuilder::new();
        if let Some(ua) = args.ua {
            builder = builder.user_agent(ua);
        }
        let client = builder.build()?;
        let page = client.get(&url).send()?.error_for_status()?.text()?;
        (page, PageLocation::Url(url))
    } else if let Some(path) = args.file {
        let page = fs_err::read_to_string(&path)?;
        (page, PageLocation::Path(path))
    } else {
        anyhow::bail!("Missing `url` or `file`");
    };
    let record = spider.product_page(&page, &location.get())?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                logger(args.log_level, &args.log_file)?.try_init()?;
            }
            crawl(args)
        }
        SubCommand::Scrap(args) => {
            env_logger::Builder::new()
                .filter_module("grocer_tesco", LevelFilter::Warn)
                .init();
            scrap(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "grocer", &mut io::stdout());
            Ok(())
        }
    }
}
