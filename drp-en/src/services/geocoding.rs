//! Location resolution: location name -> coordinates
//!
//! Fallback chain: Google Maps (when a key is configured) -> OpenStreetMap
//! Nominatim (keyless) -> offline table of known city coordinates with a
//! fixed default. Coordinates are stable facts, so genuine results carry the
//! longest TTL of any resolver (24 hours).

use super::{provider_http_client, Provider};
use drp_common::{CacheStore, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// TTL for genuine geocoding results
pub const GEOCODE_TTL: Duration = Duration::from_secs(24 * 3600);

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Known-city coordinates used by the offline strategy
const KNOWN_CITIES: &[(&str, f64, f64)] = &[
    ("manhattan, nyc", 40.7831, -73.9712),
    ("new york, ny", 40.7128, -74.0060),
    ("los angeles, ca", 34.0522, -118.2437),
    ("chicago, il", 41.8781, -87.6298),
    ("houston, tx", 29.7604, -95.3698),
];

/// Coordinates used when the location matches no known city
const DEFAULT_COORDS: (f64, f64) = (40.7128, -74.0060);

/// A resolved geocode, tagged with the strategy that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
    pub provider: Provider,
}

/// External strategies attempted in priority order before the offline table
#[derive(Debug, Clone, Copy)]
enum GeocodeStrategy {
    Google,
    Nominatim,
}

/// Resolves location names to coordinates through the cache
#[derive(Clone)]
pub struct LocationResolver {
    http_client: reqwest::Client,
    cache: CacheStore,
    google_api_key: Option<String>,
    nominatim_url: String,
    fallback_ttl: Duration,
}

impl LocationResolver {
    pub fn new(
        cache: CacheStore,
        google_api_key: Option<String>,
        nominatim_url: String,
        fallback_ttl: Duration,
    ) -> Self {
        Self {
            http_client: provider_http_client(),
            cache,
            google_api_key,
            nominatim_url,
            fallback_ttl,
        }
    }

    /// Resolve a location name to coordinates.
    ///
    /// Always terminates with a result: external failures advance the chain
    /// and the offline table cannot fail. Only an empty location name is an
    /// error.
    pub async fn resolve(&self, location_name: &str) -> Result<GeocodeResult> {
        let name = location_name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("location name is required".to_string()));
        }

        let key = cache_key(name);
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(result) = serde_json::from_value::<GeocodeResult>(cached) {
                debug!(location = %name, "Geocode served from cache");
                return Ok(result);
            }
        }

        let mut chain = Vec::new();
        if self.google_api_key.is_some() {
            chain.push(GeocodeStrategy::Google);
        }
        chain.push(GeocodeStrategy::Nominatim);

        let mut resolved = None;
        for strategy in chain {
            match self.attempt(strategy, name).await {
                Ok(Some(result)) => {
                    resolved = Some(result);
                    break;
                }
                Ok(None) => {
                    warn!(location = %name, ?strategy, "Geocoding strategy returned no results");
                }
                Err(e) => {
                    warn!(location = %name, ?strategy, "Geocoding strategy failed: {}", e);
                }
            }
        }

        let result = resolved.unwrap_or_else(|| offline_geocode(name));

        let ttl = if result.provider.is_fallback() {
            self.fallback_ttl
        } else {
            GEOCODE_TTL
        };
        if let Ok(value) = serde_json::to_value(&result) {
            self.cache.set(&key, &value, ttl).await;
        }

        info!(
            location = %name,
            provider = %result.provider,
            lat = result.lat,
            lng = result.lng,
            "Geocoded location"
        );
        Ok(result)
    }

    async fn attempt(
        &self,
        strategy: GeocodeStrategy,
        name: &str,
    ) -> anyhow::Result<Option<GeocodeResult>> {
        match strategy {
            GeocodeStrategy::Google => self.google(name).await,
            GeocodeStrategy::Nominatim => self.nominatim(name).await,
        }
    }

    async fn google(&self, name: &str) -> anyhow::Result<Option<GeocodeResult>> {
        let key = self
            .google_api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Google Maps API key not configured"))?;

        let response = self
            .http_client
            .get(GOOGLE_GEOCODE_URL)
            .query(&[("address", name), ("key", key)])
            .send()
            .await?
            .error_for_status()?;

        let body: GoogleGeocodeResponse = response.json().await?;
        Ok(body.results.into_iter().next().map(|r| GeocodeResult {
            lat: r.geometry.location.lat,
            lng: r.geometry.location.lng,
            formatted_address: r.formatted_address,
            provider: Provider::Google,
        }))
    }

    async fn nominatim(&self, name: &str) -> anyhow::Result<Option<GeocodeResult>> {
        let response = self
            .http_client
            .get(&self.nominatim_url)
            .query(&[("q", name), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?;

        let places: Vec<NominatimPlace> = response.json().await?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(GeocodeResult {
            lat: place.lat.parse()?,
            lng: place.lon.parse()?,
            formatted_address: place.display_name,
            provider: Provider::Osm,
        }))
    }
}

/// Terminal offline strategy: known-city table, then a fixed default
fn offline_geocode(name: &str) -> GeocodeResult {
    let normalized = name.to_lowercase();
    let (lat, lng) = KNOWN_CITIES
        .iter()
        .find(|(city, _, _)| *city == normalized)
        .map(|(_, lat, lng)| (*lat, *lng))
        .unwrap_or(DEFAULT_COORDS);

    GeocodeResult {
        lat,
        lng,
        formatted_address: name.to_string(),
        provider: Provider::Mock,
    }
}

/// Deterministic key over the normalized location text
fn cache_key(name: &str) -> String {
    let normalized: Vec<String> = name
        .to_lowercase()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    format!("geocode_{}", normalized.join("_"))
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResponse {
    #[serde(default)]
    results: Vec<GoogleGeocodeHit>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeHit {
    formatted_address: String,
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
}

#[derive(Debug, Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_normalizes_case_and_whitespace() {
        assert_eq!(cache_key("Lower  East Side"), "geocode_lower_east_side");
        assert_eq!(cache_key("lower east side"), "geocode_lower_east_side");
    }

    #[test]
    fn offline_table_matches_known_cities() {
        let result = offline_geocode("Manhattan, NYC");
        assert_eq!(result.lat, 40.7831);
        assert_eq!(result.provider, Provider::Mock);
    }

    #[test]
    fn offline_default_keeps_requested_address() {
        let result = offline_geocode("Atlantis");
        assert_eq!((result.lat, result.lng), DEFAULT_COORDS);
        assert_eq!(result.formatted_address, "Atlantis");
    }
}
