use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use datahtml::crawler::{ChromeCrawler, Crawler, LocalCrawler};
use datahtml::site::{self, LinkSources};
use datahtml::storage::{SearchLink, UrlIndex};
use datahtml::wikidata::{self, WikidataClient};
use datahtml::youtube::{self, api};
use datahtml::{google, google_trends, news, sitemap, web, Config};

#[derive(Parser, Debug)]
#[command(name = "datahtml", about = "Scrape links, feeds and metadata from the web")]
struct Args {
    /// Config file (defaults to ~/.config/datahtml/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Download through the chrome rendering service
    #[arg(long, global = true)]
    chrome: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge the links of a site from its HTML, feeds and sitemaps
    Links {
        url: String,
        #[arg(long)]
        no_html: bool,
        #[arg(long)]
        no_rss: bool,
        #[arg(long)]
        sitemap: bool,
    },
    /// Find the RSS/Atom feeds of a page
    Feeds { url: String },
    /// List the sitemap URLs announced by robots.txt
    Sitemap {
        url: String,
        /// Skip child sitemaps older than this many days
        #[arg(long)]
        days: Option<i64>,
    },
    /// Extract the main article of a page
    Article { url: String },
    /// Google search results
    Google {
        #[arg(required = true)]
        words: Vec<String>,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Trending searches of a country
    Trends {
        #[arg(default_value = "US")]
        geo: String,
    },
    #[command(subcommand)]
    Wikidata(WikidataCommand),
    #[command(subcommand)]
    Youtube(YoutubeCommand),
    #[command(subcommand)]
    Index(IndexCommand),
}

#[derive(Subcommand, Debug)]
enum WikidataCommand {
    /// Entities matching a label
    Search {
        query: String,
        #[arg(long, default_value = "en")]
        lang: String,
    },
    /// One entity by id, with its social accounts
    Entity {
        id: String,
        #[arg(long, default_value = "en")]
        lang: String,
    },
}

#[derive(Subcommand, Debug)]
enum YoutubeCommand {
    /// Channel metadata scraped from its page
    Channel { id: String },
    /// Video metadata scraped from its page
    Video { id: String },
    /// Latest uploads from the channel feed
    Videos { id: String },
    /// Search through the Data API (needs YOUTUBE_KEY)
    Search { query: String },
    /// Most popular videos of a region through the Data API
    Popular {
        region: String,
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum IndexCommand {
    /// Index the merged links of a site
    Build { url: String },
    /// Search the index
    Search {
        query: String,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Rebuild the full-text index from stored links
    Rebuild,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = match path.or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => Config::default(),
    };
    Ok(config.apply_env())
}

fn build_crawler(config: &Config, chrome: bool) -> Result<Box<dyn Crawler>> {
    if chrome {
        let crawler =
            ChromeCrawler::from_config(config).context("Failed to create chrome crawler")?;
        return Ok(Box::new(crawler));
    }
    let crawler = LocalCrawler::from_config(config).context("Failed to create HTTP client")?;
    Ok(Box::new(crawler))
}

async fn open_index(config: &Config) -> Result<UrlIndex> {
    let path = match &config.index_path {
        Some(path) => path.clone(),
        None => Config::default_path()
            .and_then(|p| p.parent().map(|dir| dir.join("index.db")))
            .context("HOME environment variable not set and no index_path configured")?,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).context("Failed to create index directory")?;
    }
    let path = path.to_str().context("Index path is not valid UTF-8")?;
    UrlIndex::open(path)
        .await
        .with_context(|| format!("Failed to open URL index '{path}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config)?;
    tracing::debug!(config = ?config, "Configuration ready");
    let crawler = build_crawler(&config, args.chrome)?;
    let crawler = crawler.as_ref();

    match args.command {
        Command::Links {
            url,
            no_html,
            no_rss,
            sitemap,
        } => {
            let sources = LinkSources {
                html: !no_html,
                rss: !no_rss,
                sitemap,
                ..LinkSources::from_config(&config)
            };
            let links = site::extract_links(&url, crawler, sources)
                .await
                .with_context(|| format!("Failed to extract links from {url}"))?;
            print_json(&links)
        }
        Command::Feeds { url } => {
            let feeds = web::find_rss_links(&url, crawler, None)
                .await
                .with_context(|| format!("Failed to discover feeds of {url}"))?;
            let urls: Vec<&str> = feeds.iter().map(|f| f.url.as_str()).collect();
            print_json(&urls)
        }
        Command::Sitemap { url, days } => {
            let days = days.unwrap_or(config.sitemap_filter_days);
            let links = sitemap::build_sitemap(&url, crawler, days)
                .await
                .with_context(|| format!("Failed to build sitemap of {url}"))?;
            print_json(&links)
        }
        Command::Article { url } => {
            let article = news::ArticleData::from_url(&url, crawler)
                .await
                .with_context(|| format!("Failed to download article {url}"))?;
            print_json(&article)
        }
        Command::Google { words, lang } => {
            let result = google::search(&words.join(" "), crawler, lang.as_deref())
                .await
                .context("Google search failed")?;
            print_json(&result)
        }
        Command::Trends { geo } => {
            let trends = google_trends::download(&geo, crawler, None)
                .await
                .with_context(|| format!("Failed to download trends for {geo}"))?;
            print_json(&trends)
        }
        Command::Wikidata(cmd) => {
            let client = WikidataClient::default();
            match cmd {
                WikidataCommand::Search { query, lang } => {
                    let found = client
                        .search_entities(&query, crawler, &lang)
                        .await
                        .context("Wikidata search failed")?;
                    print_json(&found)
                }
                WikidataCommand::Entity { id, lang } => {
                    let entity = client
                        .get_entity(&id, crawler, &lang)
                        .await
                        .with_context(|| format!("Failed to get Wikidata entity {id}"))?;
                    let extra = wikidata::extract_extra(&entity.raw);
                    print_json(&serde_json::json!({ "entity": entity, "extra": extra }))
                }
            }
        }
        Command::Youtube(cmd) => match cmd {
            YoutubeCommand::Channel { id } => print_json(
                &youtube::channel(&id, crawler)
                    .await
                    .with_context(|| format!("Failed to scrape channel {id}"))?,
            ),
            YoutubeCommand::Video { id } => print_json(
                &youtube::video(&id, crawler)
                    .await
                    .with_context(|| format!("Failed to scrape video {id}"))?,
            ),
            YoutubeCommand::Videos { id } => print_json(
                &youtube::channel_videos(&id, crawler)
                    .await
                    .with_context(|| format!("Failed to read feed of channel {id}"))?,
            ),
            YoutubeCommand::Search { query } => {
                let client = api::Client::from_config(&config)
                    .context("YouTube API key missing (set YOUTUBE_KEY or youtube_key)")?;
                let rsp = client
                    .search(&api::create_search(&query))
                    .await
                    .context("YouTube search failed")?;
                print_json(&rsp)
            }
            YoutubeCommand::Popular { region, category } => {
                let client = api::Client::from_config(&config)
                    .context("YouTube API key missing (set YOUTUBE_KEY or youtube_key)")?;
                let rsp = client
                    .video(&api::create_video_popular(&region, category.as_deref()))
                    .await
                    .context("YouTube popular videos request failed")?;
                print_json(&rsp)
            }
        },
        Command::Index(cmd) => {
            let index = open_index(&config).await?;
            match cmd {
                IndexCommand::Build { url } => {
                    let sources = LinkSources::from_config(&config);
                    let merged = site::extract_links(&url, crawler, sources)
                        .await
                        .with_context(|| format!("Failed to extract links from {url}"))?;
                    let links: Vec<SearchLink> = merged
                        .iter()
                        .filter_map(|l| SearchLink::parse(&l.fullurl, &l.text).ok())
                        .collect();
                    let count = index.build(&links).await.context("Failed to index links")?;
                    println!("{count}");
                    Ok(())
                }
                IndexCommand::Search { query, domain, top } => {
                    let found = index
                        .search(&query, domain.as_deref(), top)
                        .await
                        .context("Index search failed")?;
                    print_json(&found)
                }
                IndexCommand::Rebuild => {
                    let count = index.rebuild().await.context("Failed to rebuild index")?;
                    println!("{count}");
                    Ok(())
                }
            }
        }
    }
}
