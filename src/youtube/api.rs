//! YouTube Data API v3 client (`search` and `videos` endpoints).
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::defaults::DEFAULT_TIMEOUT;
use crate::errors::{Error, Result};

pub const API_URL: &str = "https://youtube.googleapis.com/youtube/v3";

// ============================================================================
// Topics
// ============================================================================

/// Freebase topics accepted by the `topicId` search filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Music,
    ChristianMusic,
    ClassicalMusic,
    Country,
    ElectronicMusic,
    HipHopMusic,
    IndependentMusic,
    Jazz,
    MusicOfAsia,
    MusicOfLatinAmerica,
    PopMusic,
    Reggae,
    RhythmAndBlues,
    RockMusic,
    SoulMusic,
    Gaming,
    ActionGame,
    ActionAdventureGame,
    CasualGame,
    MusicVideoGame,
    PuzzleVideoGame,
    RacingVideoGame,
    RolePlayingVideoGame,
    SimulationVideoGame,
    SportsGame,
    StrategyVideoGame,
    Sports,
    AmericanFootball,
    Baseball,
    Basketball,
    Boxing,
    Cricket,
    Football,
    Golf,
    IceHockey,
    MixedMartialArts,
    Motorsport,
    Tennis,
    Volleyball,
    Entertainment,
    Humor,
    Movies,
    PerformingArts,
    ProfessionalWrestling,
    TvShows,
    Lifestyle,
    Fashion,
    Fitness,
    Food,
    Hobby,
    Pets,
    Beauty,
    Technology,
    Tourism,
    Vehicles,
    Society,
    Business,
    Health,
    Military,
    Politics,
    Religion,
    Knowledge,
}

impl Topic {
    pub fn id(&self) -> &'static str {
        match self {
            Topic::Music => "/m/04rlf",
            Topic::ChristianMusic => "/m/02mscn",
            Topic::ClassicalMusic => "/m/0ggq0m",
            Topic::Country => "/m/01lyv",
            Topic::ElectronicMusic => "/m/02lkt",
            Topic::HipHopMusic => "/m/0glt670",
            Topic::IndependentMusic => "/m/05rwpb",
            Topic::Jazz => "/m/03_d0",
            Topic::MusicOfAsia => "/m/028sqc",
            Topic::MusicOfLatinAmerica => "/m/0g293",
            Topic::PopMusic => "/m/064t9",
            Topic::Reggae => "/m/06cqb",
            Topic::RhythmAndBlues => "/m/06j6l",
            Topic::RockMusic => "/m/06by7",
            Topic::SoulMusic => "/m/0gywn",
            Topic::Gaming => "/m/0bzvm2",
            Topic::ActionGame => "/m/025zzc",
            Topic::ActionAdventureGame => "/m/02ntfj",
            Topic::CasualGame => "/m/0b1vjn",
            Topic::MusicVideoGame => "/m/02hygl",
            Topic::PuzzleVideoGame => "/m/04q1x3q",
            Topic::RacingVideoGame => "/m/01sjng",
            Topic::RolePlayingVideoGame => "/m/0403l3g",
            Topic::SimulationVideoGame => "/m/021bp2",
            Topic::SportsGame => "/m/022dc6",
            Topic::StrategyVideoGame => "/m/03hf_rm",
            Topic::Sports => "/m/06ntj",
            Topic::AmericanFootball => "/m/0jm_",
            Topic::Baseball => "/m/018jz",
            Topic::Basketball => "/m/018w8",
            Topic::Boxing => "/m/01cg",
            Topic::Cricket => "/m/09xp_",
            Topic::Football => "/m/02vx4",
            Topic::Golf => "/m/037hz",
            Topic::IceHockey => "/m/03tmr",
            Topic::MixedMartialArts => "/m/01h7lh",
            Topic::Motorsport => "/m/0410tth",
            Topic::Tennis => "/m/07bs0",
            Topic::Volleyball => "/m/07_53",
            Topic::Entertainment => "/m/02jjt",
            Topic::Humor => "/m/09kqc",
            Topic::Movies => "/m/02vxn",
            Topic::PerformingArts => "/m/05qjc",
            Topic::ProfessionalWrestling => "/m/066wd",
            Topic::TvShows => "/m/0f2f9",
            Topic::Lifestyle => "/m/019_rr",
            Topic::Fashion => "/m/032tl",
            Topic::Fitness => "/m/027x7n",
            Topic::Food => "/m/02wbm",
            Topic::Hobby => "/m/03glg",
            Topic::Pets => "/m/068hy",
            Topic::Beauty => "/m/041xxh",
            Topic::Technology => "/m/07c1v",
            Topic::Tourism => "/m/07bxq",
            Topic::Vehicles => "/m/07yv9",
            Topic::Society => "/m/098wr",
            Topic::Business => "/m/09s1f",
            Topic::Health => "/m/0kt51",
            Topic::Military => "/m/01h6rj",
            Topic::Politics => "/m/05qt0",
            Topic::Religion => "/m/06bvp",
            Topic::Knowledge => "/m/01k8wb",
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Parameters of `search.list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: String,
    pub part: String,
    pub event_type: Option<String>,
    pub max_results: u32,
    pub order: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page_token: Option<String>,
    #[serde(rename = "topicId")]
    pub topic: Option<Topic>,
    pub related_to_video_id: Option<String>,
    pub region_code: Option<String>,
    #[serde(rename = "relevanceLanguage")]
    pub lang: Option<String>,
}

impl SearchQuery {
    pub fn new(q: &str) -> Self {
        Self {
            q: q.to_owned(),
            part: "snippet".to_owned(),
            event_type: None,
            max_results: 50,
            order: "relevance".to_owned(),
            kind: None,
            page_token: None,
            topic: None,
            related_to_video_id: None,
            region_code: None,
            lang: None,
        }
    }
}

/// Parameters of `videos.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoQuery {
    pub part: String,
    /// Comma separated video ids
    pub id: Option<String>,
    pub max_results: u32,
    pub page_token: Option<String>,
    pub region_code: Option<String>,
    #[serde(rename = "videoCategoryId")]
    pub video_category: Option<String>,
    pub chart: Option<String>,
}

impl Default for VideoQuery {
    fn default() -> Self {
        Self {
            part: "snippet,contentDetails,statistics".to_owned(),
            id: None,
            max_results: 50,
            page_token: None,
            region_code: None,
            video_category: None,
            chart: None,
        }
    }
}

pub fn create_search(q: &str) -> SearchQuery {
    SearchQuery::new(q)
}

pub fn create_video(id: &str) -> VideoQuery {
    VideoQuery {
        id: Some(id.to_owned()),
        ..VideoQuery::default()
    }
}

/// Most popular videos of a region, optionally within a category.
pub fn create_video_popular(region: &str, video_category: Option<&str>) -> VideoQuery {
    VideoQuery {
        region_code: Some(region.to_owned()),
        video_category: video_category.map(str::to_owned),
        chart: Some("mostPopular".to_owned()),
        ..VideoQuery::default()
    }
}

/// Query parameters of a serialised query, `None` fields left out.
fn to_params<T: Serialize>(query: &T) -> Result<Vec<(String, String)>> {
    let Value::Object(map) = serde_json::to_value(query)? else {
        return Ok(Vec::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k, s)),
            other => Some((k, other.to_string())),
        })
        .collect())
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchItem {
    /// Video, channel or playlist id, whichever the result is
    pub id: String,
    pub kind: String,
    pub published_at: String,
    pub publish_time: Option<String>,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub channel_id: String,
    pub channel_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    pub next_page: Option<String>,
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoItem {
    pub id: String,
    pub kind: String,
    pub tags: Vec<String>,
    pub published_at: String,
    pub default_audio_lang: Option<String>,
    pub default_lang: Option<String>,
    pub title: String,
    pub thumbnail: Option<String>,
    pub channel_id: String,
    pub channel_title: String,
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoResponse {
    pub items: Vec<VideoItem>,
    pub next_page: Option<String>,
    pub total_results: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageInfo {
    total_results: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
    page_info: Option<RawPageInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSearchId {
    video_id: Option<String>,
    channel_id: Option<String>,
    playlist_id: Option<String>,
}

#[derive(Deserialize)]
struct RawThumbnail {
    url: String,
}

#[derive(Deserialize)]
struct RawThumbnails {
    default: Option<RawThumbnail>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawSnippet {
    published_at: String,
    publish_time: Option<String>,
    title: String,
    description: String,
    thumbnails: Option<RawThumbnails>,
    channel_id: String,
    channel_title: String,
    tags: Vec<String>,
    default_audio_language: Option<String>,
    default_language: Option<String>,
}

impl RawSnippet {
    fn thumbnail(&self) -> Option<String> {
        self.thumbnails
            .as_ref()
            .and_then(|t| t.default.as_ref())
            .map(|t| t.url.clone())
    }
}

#[derive(Deserialize)]
struct RawSearchItem {
    kind: String,
    id: RawSearchId,
    #[serde(default)]
    snippet: RawSnippet,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Deserialize)]
struct RawVideoItem {
    kind: String,
    id: String,
    #[serde(default)]
    snippet: RawSnippet,
    #[serde(default)]
    statistics: RawStatistics,
}

impl From<RawList<RawSearchItem>> for SearchResponse {
    fn from(raw: RawList<RawSearchItem>) -> Self {
        let items = raw
            .items
            .into_iter()
            .filter_map(|item| {
                let thumbnail = item.snippet.thumbnail();
                let s = item.snippet;
                Some(SearchItem {
                    id: item
                        .id
                        .video_id
                        .or(item.id.channel_id)
                        .or(item.id.playlist_id)?,
                    kind: item.kind,
                    published_at: s.published_at,
                    publish_time: s.publish_time,
                    title: s.title,
                    description: s.description,
                    thumbnail,
                    channel_id: s.channel_id,
                    channel_title: s.channel_title,
                })
            })
            .collect();
        SearchResponse {
            items,
            next_page: raw.next_page_token,
            total_results: raw.page_info.and_then(|p| p.total_results),
        }
    }
}

impl From<RawList<RawVideoItem>> for VideoResponse {
    fn from(raw: RawList<RawVideoItem>) -> Self {
        let items = raw
            .items
            .into_iter()
            .map(|item| {
                let thumbnail = item.snippet.thumbnail();
                let s = item.snippet;
                VideoItem {
                    id: item.id,
                    kind: item.kind,
                    tags: s.tags,
                    published_at: s.published_at,
                    default_audio_lang: s.default_audio_language,
                    default_lang: s.default_language,
                    title: s.title,
                    thumbnail,
                    channel_id: s.channel_id,
                    channel_title: s.channel_title,
                    view_count: item.statistics.view_count,
                    like_count: item.statistics.like_count,
                    comment_count: item.statistics.comment_count,
                }
            })
            .collect();
        VideoResponse {
            items,
            next_page: raw.next_page_token,
            total_results: raw.page_info.and_then(|p| p.total_results),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl Client {
    pub fn new(api_key: SecretString) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::CrawlHttp(e.to_string()))?;
        Ok(Self {
            http,
            base_url: API_URL.to_owned(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Reads the key from `YOUTUBE_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("YOUTUBE_KEY").map_err(|_| Error::MissingField("YOUTUBE_KEY"))?;
        Self::new(SecretString::from(key))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config
            .youtube_key
            .clone()
            .ok_or(Error::MissingField("youtube_key"))?;
        Ok(Self::new(SecretString::from(key))?.with_timeout(config.timeout()))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let raw: RawList<RawSearchItem> = self.get("search", to_params(query)?).await?;
        Ok(raw.into())
    }

    pub async fn video(&self, query: &VideoQuery) -> Result<VideoResponse> {
        let raw: RawList<RawVideoItem> = self.get("videos", to_params(query)?).await?;
        Ok(raw.into())
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<T> {
        let endpoint_url = format!("{}/{endpoint}", self.base_url);
        params.push(("key".to_owned(), self.api_key.expose_secret().to_owned()));
        let url = Url::parse_with_params(&endpoint_url, &params)
            .map_err(|_| Error::UrlParsing(endpoint_url.clone()))?;

        let request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send();
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| Error::Timeout(endpoint_url.clone()))?
            .map_err(|e| Error::from_reqwest(&endpoint_url, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(endpoint = %endpoint, status = status.as_u16(), "YouTube API error");
            return Err(Error::Crawling {
                url: endpoint_url,
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::from_reqwest(&endpoint_url, e))?;
        Ok(serde_json::from_slice(&body)?)
    }
}
