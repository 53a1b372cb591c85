//! Address geocoding for listing coordinates.
//!
//! Wraps a Nominatim-compatible search endpoint. Lookups are fail-soft:
//! any transport error, non-200 status, or malformed/empty response yields
//! `(None, None)` and the listing is saved without coordinates.

use reqwest::Client;
use serde::Deserialize;

pub struct Geocoder {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
}

impl Geocoder {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .user_agent("campus-hub")
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
        }
    }

    /// Look up a street address and return (latitude, longitude)
    pub async fn geocode(&self, address: &str) -> (Option<f64>, Option<f64>) {
        if address.is_empty() {
            return (None, None);
        }

        let response = match self
            .client
            .get(&self.base_url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Geocoding request failed for '{}': {}", address, e);
                return (None, None);
            }
        };

        if !response.status().is_success() {
            log::warn!(
                "Geocoder returned {} for '{}'",
                response.status(),
                address
            );
            return (None, None);
        }

        let hits: Vec<GeocodeHit> = match response.json().await {
            Ok(h) => h,
            Err(e) => {
                log::warn!("Malformed geocoder response for '{}': {}", address, e);
                return (None, None);
            }
        };

        match hits.first() {
            Some(hit) => {
                let lat = hit.lat.parse::<f64>().ok();
                let lon = hit.lon.parse::<f64>().ok();
                (lat, lon)
            }
            None => (None, None),
        }
    }
}
