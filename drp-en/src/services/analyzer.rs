//! Text and image analysis: urgency classification, resource-need tagging,
//! location extraction, and image-authenticity verdicts
//!
//! Gemini is the single primary strategy (present only when a key is
//! configured); every operation carries a deterministic offline strategy so
//! analysis always terminates with a usable, clearly-labeled result. This is
//! also the shared enrichment sub-step: the social and official aggregators
//! pipe each raw item through [`ContentAnalyzer::analyze_content`], keyed by
//! a hash of the item's text.

use super::{provider_http_client, Provider};
use drp_common::cache::fingerprint;
use drp_common::{CacheStore, Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// TTL for genuine analysis results
pub const ANALYSIS_TTL: Duration = Duration::from_secs(3600);

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// Location fallback when nothing more specific can be extracted
const DEFAULT_LOCATION: &str = "New York, NY";

/// Captures "City, ST" / "City Name, Country" shapes in free text
static LOCATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)*,\s*[A-Z]{2,})\b").unwrap());

/// Urgency classification derived from item text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

/// Structured analysis of one disaster-related text item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub summary: String,
    pub urgency: Urgency,
    pub resource_needs: Vec<String>,
    pub location_mentioned: Option<String>,
    pub provider: Provider,
}

/// Location extracted from a disaster description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLocation {
    pub location: String,
    pub provider: Provider,
}

/// Image authenticity verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVerdict {
    pub authentic: bool,
    pub confidence: f64,
    pub analysis: String,
    pub provider: Provider,
}

/// Gemini-backed analyzer with deterministic offline fallbacks
#[derive(Clone)]
pub struct ContentAnalyzer {
    http_client: reqwest::Client,
    cache: CacheStore,
    api_key: Option<String>,
    fallback_ttl: Duration,
}

impl ContentAnalyzer {
    pub fn new(cache: CacheStore, api_key: Option<String>, fallback_ttl: Duration) -> Self {
        Self {
            http_client: provider_http_client(),
            cache,
            api_key,
            fallback_ttl,
        }
    }

    /// Extract the most specific location named in a disaster description
    pub async fn extract_location(&self, text: &str) -> Result<ExtractedLocation> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("text is required".to_string()));
        }

        let key = format!("location_extract_{}", fingerprint(text));
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(result) = serde_json::from_value::<ExtractedLocation>(cached) {
                debug!("Location extraction served from cache");
                return Ok(result);
            }
        }

        let mut resolved = None;
        if self.api_key.is_some() {
            let prompt = format!(
                "Extract the most specific location mentioned in this disaster \
                 description. Return only the location name (city, state/country \
                 format if possible), nothing else: \"{}\"",
                text
            );
            match self.gemini_generate(&prompt).await {
                Ok(answer) => {
                    let location = answer.trim().to_string();
                    if !location.is_empty() {
                        resolved = Some(ExtractedLocation {
                            location,
                            provider: Provider::Gemini,
                        });
                    }
                }
                Err(e) => warn!("Gemini location extraction failed: {}", e),
            }
        }

        let result = resolved.unwrap_or_else(|| ExtractedLocation {
            location: offline_location(text),
            provider: Provider::Mock,
        });

        self.store(&key, &result).await;
        Ok(result)
    }

    /// Derive urgency, resource needs, and a summary from item text
    pub async fn analyze_content(&self, text: &str) -> Result<ContentAnalysis> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("text is required".to_string()));
        }

        let key = format!("content_analysis_{}", fingerprint(text));
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(result) = serde_json::from_value::<ContentAnalysis>(cached) {
                debug!("Content analysis served from cache");
                return Ok(result);
            }
        }

        let mut resolved = None;
        if self.api_key.is_some() {
            let prompt = format!(
                "Analyze the following text from a disaster report. Provide a JSON \
                 response with: 'summary' (one sentence), 'urgency' (critical, high, \
                 medium, or low), 'resource_needs' (array of specific resources), and \
                 'location_mentioned' (most specific location found, or null). \
                 Text: \"{}\"",
                text
            );
            match self.gemini_generate(&prompt).await {
                Ok(answer) => match parse_gemini_analysis(&answer) {
                    Ok(analysis) => resolved = Some(analysis),
                    Err(e) => warn!("Unparseable Gemini analysis: {}", e),
                },
                Err(e) => warn!("Gemini content analysis failed: {}", e),
            }
        }

        let result = resolved.unwrap_or_else(|| offline_analysis(text));
        self.store(&key, &result).await;
        Ok(result)
    }

    /// Judge the authenticity of a report image
    pub async fn verify_image(&self, image_url: &str, context: &str) -> Result<ImageVerdict> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return Err(Error::InvalidInput("image_url is required".to_string()));
        }

        let key = format!("image_verify_{}", fingerprint(image_url));
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(result) = serde_json::from_value::<ImageVerdict>(cached) {
                debug!("Image verification served from cache");
                return Ok(result);
            }
        }

        let mut resolved = None;
        if self.api_key.is_some() {
            let prompt = format!(
                "Analyze the image at {} for authenticity in the context of disaster \
                 reporting. Look for signs of manipulation, inconsistencies, or stock/old \
                 footage. Context: {}. Respond in JSON with keys: 'authentic' \
                 (true/false), 'confidence' (0-1), and 'analysis' (brief explanation).",
                image_url, context
            );
            match self.gemini_generate(&prompt).await {
                Ok(answer) => match parse_gemini_verdict(&answer) {
                    Ok(verdict) => resolved = Some(verdict),
                    Err(e) => warn!("Unparseable Gemini verdict: {}", e),
                },
                Err(e) => warn!("Gemini image verification failed: {}", e),
            }
        }

        let result = resolved.unwrap_or_else(offline_verdict);
        self.store(&key, &result).await;
        Ok(result)
    }

    async fn store<T: Serialize + TaggedResult>(&self, key: &str, result: &T) {
        let ttl = if result.provider().is_fallback() {
            self.fallback_ttl
        } else {
            ANALYSIS_TTL
        };
        if let Ok(value) = serde_json::to_value(result) {
            self.cache.set(key, &value, ttl).await;
        }
    }

    /// One Gemini text-generation round trip
    async fn gemini_generate(&self, prompt: &str) -> anyhow::Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Gemini API key not configured"))?;

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http_client
            .post(GEMINI_URL)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let body: GeminiResponse = response.json().await?;
        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow::anyhow!("Gemini response contained no candidates"))
    }
}

/// Common accessor so [`ContentAnalyzer::store`] can pick the TTL policy
trait TaggedResult {
    fn provider(&self) -> Provider;
}

impl TaggedResult for ContentAnalysis {
    fn provider(&self) -> Provider {
        self.provider
    }
}

impl TaggedResult for ExtractedLocation {
    fn provider(&self) -> Provider {
        self.provider
    }
}

impl TaggedResult for ImageVerdict {
    fn provider(&self) -> Provider {
        self.provider
    }
}

/// Offline location heuristic: landmark keywords, then a "City, ST" capture,
/// then a fixed default
fn offline_location(text: &str) -> String {
    if text.contains("NYC") || text.contains("Manhattan") {
        return "Manhattan, NYC".to_string();
    }
    if text.contains("LA") || text.contains("Angeles") {
        return "Los Angeles, CA".to_string();
    }
    if let Some(captured) = LOCATION_PATTERN.find(text) {
        return captured.as_str().to_string();
    }
    DEFAULT_LOCATION.to_string()
}

/// Offline analysis: keyword-scan urgency and resource tagging
fn offline_analysis(text: &str) -> ContentAnalysis {
    let lower = text.to_lowercase();

    let urgency = if ["urgent", "sos", "trapped", "critical", "life-threatening"]
        .iter()
        .any(|m| lower.contains(m))
    {
        Urgency::Critical
    } else if ["medical", "stranded", "evacuate", "injured"]
        .iter()
        .any(|m| lower.contains(m))
    {
        Urgency::High
    } else {
        Urgency::Medium
    };

    let mut resource_needs: Vec<String> = ["water", "food", "shelter", "blankets", "medical"]
        .iter()
        .filter(|need| lower.contains(*need))
        .map(|need| {
            if *need == "medical" {
                "medical aid".to_string()
            } else {
                need.to_string()
            }
        })
        .collect();
    if resource_needs.is_empty() {
        resource_needs = vec![
            "water".to_string(),
            "food".to_string(),
            "medical aid".to_string(),
        ];
    }

    ContentAnalysis {
        summary: "Offline summary: people may be in need of assistance.".to_string(),
        urgency,
        resource_needs,
        location_mentioned: LOCATION_PATTERN.find(text).map(|m| m.as_str().to_string()),
        provider: Provider::Mock,
    }
}

/// Offline verdict: a clearly-labeled placeholder pending manual review
fn offline_verdict() -> ImageVerdict {
    ImageVerdict {
        authentic: true,
        confidence: 0.5,
        analysis: "Offline verdict - manual review required".to_string(),
        provider: Provider::Mock,
    }
}

fn parse_gemini_analysis(answer: &str) -> anyhow::Result<ContentAnalysis> {
    #[derive(Deserialize)]
    struct RawAnalysis {
        summary: String,
        urgency: Urgency,
        #[serde(default)]
        resource_needs: Vec<String>,
        location_mentioned: Option<String>,
    }

    let raw: RawAnalysis = serde_json::from_str(strip_code_fences(answer))?;
    Ok(ContentAnalysis {
        summary: raw.summary,
        urgency: raw.urgency,
        resource_needs: raw.resource_needs,
        location_mentioned: raw.location_mentioned,
        provider: Provider::Gemini,
    })
}

fn parse_gemini_verdict(answer: &str) -> anyhow::Result<ImageVerdict> {
    #[derive(Deserialize)]
    struct RawVerdict {
        authentic: bool,
        confidence: f64,
        analysis: String,
    }

    let raw: RawVerdict = serde_json::from_str(strip_code_fences(answer))?;
    Ok(ImageVerdict {
        authentic: raw.authentic,
        confidence: raw.confidence,
        analysis: raw.analysis,
        provider: Provider::Gemini,
    })
}

/// Gemini wraps JSON answers in markdown code fences
fn strip_code_fences(answer: &str) -> &str {
    answer
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_location_prefers_landmark_keywords() {
        assert_eq!(offline_location("Flooding across Manhattan tonight"), "Manhattan, NYC");
        assert_eq!(offline_location("Wildfire near Los Angeles suburbs"), "Los Angeles, CA");
    }

    #[test]
    fn offline_location_captures_city_state_shapes() {
        assert_eq!(offline_location("Tornado touched down in Springfield, IL today"), "Springfield, IL");
    }

    #[test]
    fn offline_location_falls_back_to_default() {
        assert_eq!(offline_location("water rising fast"), DEFAULT_LOCATION);
    }

    #[test]
    fn offline_urgency_classification() {
        assert_eq!(offline_analysis("URGENT: family trapped on roof").urgency, Urgency::Critical);
        assert_eq!(offline_analysis("elderly resident stranded, needs medical attention").urgency, Urgency::High);
        assert_eq!(offline_analysis("road closed near the bridge").urgency, Urgency::Medium);
    }

    #[test]
    fn offline_resource_needs_reflect_text() {
        let analysis = offline_analysis("Need food and water in Lower East Side");
        assert!(analysis.resource_needs.contains(&"water".to_string()));
        assert!(analysis.resource_needs.contains(&"food".to_string()));
    }

    #[test]
    fn code_fences_are_stripped() {
        let fenced = "```json\n{\"authentic\": true}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"authentic\": true}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn gemini_analysis_parses_fenced_json() {
        let answer = "```json\n{\"summary\": \"Flood in progress.\", \"urgency\": \"high\", \
                      \"resource_needs\": [\"boats\"], \"location_mentioned\": \"Houston, TX\"}\n```";
        let analysis = parse_gemini_analysis(answer).unwrap();
        assert_eq!(analysis.urgency, Urgency::High);
        assert_eq!(analysis.provider, Provider::Gemini);
        assert_eq!(analysis.location_mentioned.as_deref(), Some("Houston, TX"));
    }
}
