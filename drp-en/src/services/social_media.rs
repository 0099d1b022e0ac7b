//! Social signal aggregation for a disaster
//!
//! Volatile data, so genuine results carry the shortest TTL of any resolver
//! (15 minutes). The live provider is present only when a social API key is
//! configured; a configured provider's empty result is still a result and
//! does not fall through to the mock table. Each post not already carrying
//! an urgency is piped through the shared content analyzer.

use super::analyzer::{ContentAnalyzer, Urgency};
use super::{provider_http_client, Provider};
use chrono::{DateTime, Utc};
use drp_common::{CacheStore, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// TTL for genuine social-signal results
pub const SOCIAL_TTL: Duration = Duration::from_secs(15 * 60);

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

/// Keywords used when the caller supplies none
pub const DEFAULT_KEYWORDS: &[&str] = &["flood", "emergency", "disaster"];

/// Engagement counters attached to a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u32,
    pub retweets: u32,
    pub replies: u32,
}

/// One social media post, optionally enriched with analysis fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub id: String,
    pub content: String,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub engagement: Engagement,
    pub location: String,
    /// Present once the post has been analyzed; the enrichment step skips
    /// posts that already carry one
    pub urgency: Option<Urgency>,
    pub summary: Option<String>,
    pub resource_needs: Option<Vec<String>>,
}

/// Aggregated social signal for one disaster and keyword set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialSignal {
    pub posts: Vec<SocialPost>,
    pub total: usize,
    pub last_updated: DateTime<Utc>,
    pub provider: Provider,
}

/// Resolves keyword-filtered social posts for a disaster through the cache
#[derive(Clone)]
pub struct SocialSignalAggregator {
    http_client: reqwest::Client,
    cache: CacheStore,
    analyzer: ContentAnalyzer,
    api_key: Option<String>,
    fallback_ttl: Duration,
}

impl SocialSignalAggregator {
    pub fn new(
        cache: CacheStore,
        analyzer: ContentAnalyzer,
        api_key: Option<String>,
        fallback_ttl: Duration,
    ) -> Self {
        Self {
            http_client: provider_http_client(),
            cache,
            analyzer,
            api_key,
            fallback_ttl,
        }
    }

    /// Resolve social posts for `disaster_id` matching any of `keywords`.
    pub async fn resolve(&self, disaster_id: &str, keywords: &[String]) -> Result<SocialSignal> {
        if disaster_id.trim().is_empty() {
            return Err(Error::InvalidInput("disaster id is required".to_string()));
        }
        let keywords = effective_keywords(keywords);

        let key = cache_key(disaster_id, &keywords);
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(signal) = serde_json::from_value::<SocialSignal>(cached) {
                debug!(disaster_id = %disaster_id, "Social signal served from cache");
                return Ok(signal);
            }
        }

        let mut resolved = None;
        if self.api_key.is_some() {
            match self.live_search(&keywords).await {
                // An empty live result is still a genuine result
                Ok(posts) => {
                    resolved = Some(SocialSignal {
                        total: posts.len(),
                        posts,
                        last_updated: Utc::now(),
                        provider: Provider::Twitter,
                    });
                }
                Err(e) => {
                    warn!(disaster_id = %disaster_id, "Live social search failed: {}", e);
                }
            }
        }

        let mut signal = resolved.unwrap_or_else(|| {
            let posts = filter_posts(mock_posts(), &keywords);
            SocialSignal {
                total: posts.len(),
                posts,
                last_updated: Utc::now(),
                provider: Provider::Mock,
            }
        });

        self.enrich(&mut signal.posts).await;

        let ttl = if signal.provider.is_fallback() {
            self.fallback_ttl
        } else {
            SOCIAL_TTL
        };
        if let Ok(value) = serde_json::to_value(&signal) {
            self.cache.set(&key, &value, ttl).await;
        }

        info!(
            disaster_id = %disaster_id,
            total = signal.total,
            provider = %signal.provider,
            "Resolved social signal"
        );
        Ok(signal)
    }

    /// Analyze posts that do not already carry an urgency (idempotence guard
    /// against re-analyzing items restored from cache or preclassified mocks)
    async fn enrich(&self, posts: &mut [SocialPost]) {
        for post in posts.iter_mut() {
            if post.urgency.is_some() {
                continue;
            }
            match self.analyzer.analyze_content(&post.content).await {
                Ok(analysis) => {
                    post.urgency = Some(analysis.urgency);
                    post.summary = Some(analysis.summary);
                    post.resource_needs = Some(analysis.resource_needs);
                }
                Err(e) => warn!(post_id = %post.id, "Post analysis skipped: {}", e),
            }
        }
    }

    async fn live_search(&self, keywords: &[String]) -> anyhow::Result<Vec<SocialPost>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("social media API key not configured"))?;

        let query = keywords.join(" OR ");
        let response = self
            .http_client
            .get(SEARCH_URL)
            .bearer_auth(key)
            .query(&[("query", query.as_str()), ("max_results", "25")])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        Ok(body
            .data
            .into_iter()
            .map(|tweet| SocialPost {
                id: tweet.id,
                content: tweet.text,
                user: tweet.author_id.unwrap_or_else(|| "unknown".to_string()),
                timestamp: Utc::now(),
                engagement: Engagement::default(),
                location: String::new(),
                urgency: None,
                summary: None,
                resource_needs: None,
            })
            .collect())
    }
}

/// Offline mock-post table; preclassified, so enrichment leaves it untouched
fn mock_posts() -> Vec<SocialPost> {
    let now = Utc::now();
    let post = |id: &str,
                content: &str,
                user: &str,
                minutes_ago: i64,
                engagement: Engagement,
                location: &str,
                urgency: Urgency| SocialPost {
        id: id.to_string(),
        content: content.to_string(),
        user: user.to_string(),
        timestamp: now - chrono::Duration::minutes(minutes_ago),
        engagement,
        location: location.to_string(),
        urgency: Some(urgency),
        summary: None,
        resource_needs: None,
    };

    vec![
        post(
            "post_1",
            "#floodrelief Need food and water in Lower East Side Manhattan. Families stranded.",
            "citizen_helper1",
            0,
            Engagement { likes: 23, retweets: 15, replies: 7 },
            "Lower East Side, NYC",
            Urgency::High,
        ),
        post(
            "post_2",
            "Brooklyn Bridge area clear, emergency vehicles can pass through #disasterresponse",
            "nycresponse",
            15,
            Engagement { likes: 45, retweets: 28, replies: 3 },
            "Brooklyn Bridge, NYC",
            Urgency::Medium,
        ),
        post(
            "post_3",
            "Shelter open at PS 124 on Avenue B. Hot meals and blankets available #emergencyshelter",
            "redcross_ny",
            30,
            Engagement { likes: 67, retweets: 43, replies: 12 },
            "Avenue B, NYC",
            Urgency::Medium,
        ),
        post(
            "post_4",
            "URGENT: Medical assistance needed at 123 Delancey St. Elderly residents trapped on 3rd floor #SOS",
            "concerned_neighbor",
            5,
            Engagement { likes: 89, retweets: 72, replies: 25 },
            "Delancey St, NYC",
            Urgency::Critical,
        ),
    ]
}

/// Case-insensitive substring match over post content and location
fn filter_posts(posts: Vec<SocialPost>, keywords: &[String]) -> Vec<SocialPost> {
    posts
        .into_iter()
        .filter(|post| {
            let content = post.content.to_lowercase();
            let location = post.location.to_lowercase();
            keywords.iter().any(|keyword| {
                let keyword = keyword.to_lowercase();
                content.contains(&keyword) || location.contains(&keyword)
            })
        })
        .collect()
}

fn effective_keywords(keywords: &[String]) -> Vec<String> {
    let cleaned: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if cleaned.is_empty() {
        DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
    } else {
        cleaned
    }
}

/// Deterministic key: disaster id plus the sorted keyword set
fn cache_key(disaster_id: &str, keywords: &[String]) -> String {
    let mut sorted: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    sorted.sort();
    sorted.dedup();
    format!("social_media_{}_{}", disaster_id, sorted.join("_"))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
}
