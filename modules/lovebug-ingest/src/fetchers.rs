// Source fetchers: Twitter recent search, plus an offline stand-in used
// when no API token is configured.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::info;

use crate::traits::SourceFetcher;

/// Raw fetched post before extraction.
#[derive(Debug, Clone)]
pub struct RawPost {
    pub id: String,
    pub text: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub image_urls: Vec<String>,
}

// --- Twitter ---

const RECENT_SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

/// Twitter v2 recent-search fetcher. One request per keyword, retweets
/// excluded, Korean-language posts from the last 24 hours only.
pub struct TwitterFetcher {
    http: reqwest::Client,
    bearer_token: String,
}

impl TwitterFetcher {
    pub fn new(bearer_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            bearer_token: bearer_token.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<ApiTweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    attachments: Option<Attachments>,
}

#[derive(Debug, Deserialize)]
struct Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<ApiUser>,
    #[serde(default)]
    media: Vec<ApiMedia>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct ApiMedia {
    media_key: String,
    url: Option<String>,
}

#[async_trait]
impl SourceFetcher for TwitterFetcher {
    async fn fetch_posts(&self, keyword: &str, limit: u32) -> Result<Vec<RawPost>> {
        info!(keyword, limit, "twitter: searching recent posts");

        let query = format!("{keyword} -is:retweet lang:ko");
        let start_time = (Utc::now() - Duration::hours(24))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        // The API rejects max_results outside 10..=100.
        let max_results = limit.clamp(10, 100).to_string();

        let response: SearchResponse = self
            .http
            .get(RECENT_SEARCH_URL)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,author_id,attachments"),
                ("expansions", "author_id,attachments.media_keys"),
                ("user.fields", "username"),
                ("media.fields", "url"),
                ("start_time", start_time.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("recent search request for '{keyword}'"))?
            .error_for_status()
            .with_context(|| format!("recent search rejected for '{keyword}'"))?
            .json()
            .await
            .with_context(|| format!("recent search body for '{keyword}'"))?;

        let now = Utc::now();
        let posts = response
            .data
            .into_iter()
            .filter(|t| !t.text.trim().is_empty())
            .map(|t| {
                let author = t.author_id.as_deref().and_then(|author_id| {
                    response
                        .includes
                        .users
                        .iter()
                        .find(|u| u.id == author_id)
                        .map(|u| u.username.clone())
                });

                let image_urls = t
                    .attachments
                    .as_ref()
                    .map(|a| {
                        a.media_keys
                            .iter()
                            .filter_map(|key| {
                                response
                                    .includes
                                    .media
                                    .iter()
                                    .find(|m| &m.media_key == key)
                                    .and_then(|m| m.url.clone())
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                RawPost {
                    id: t.id,
                    text: t.text,
                    author,
                    created_at: t.created_at.unwrap_or(now),
                    image_urls,
                }
            })
            .collect();

        // Stay under the per-app rate limit across keyword requests.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        Ok(posts)
    }
}

// --- Offline samples ---

/// Stand-in fetcher for environments without a Twitter token. Returns the
/// same fixture posts for every keyword; the pipeline deduplicates by post
/// id, so each run still yields one batch.
pub struct SampleFetcher;

impl SampleFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SampleFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for SampleFetcher {
    async fn fetch_posts(&self, _keyword: &str, _limit: u32) -> Result<Vec<RawPost>> {
        let now = Utc::now();
        Ok(vec![
            RawPost {
                id: "sample_1".to_string(),
                text: "강남역에서 러브버그 진짜 많네요... 차에 다 붙어있어요 ㅠㅠ".to_string(),
                author: Some("sample_user1".to_string()),
                created_at: now - Duration::minutes(30),
                image_urls: Vec::new(),
            },
            RawPost {
                id: "sample_2".to_string(),
                text: "홍대 근처에 붉은등우단털파리 떼가 있어요. 조심하세요!".to_string(),
                author: Some("sample_user2".to_string()),
                created_at: now - Duration::minutes(15),
                image_urls: Vec::new(),
            },
        ])
    }
}
