use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{GeocoderConfig, GeocoderProvider};
use crate::models::Location;

/// Mean earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3963.2;

const MAPQUEST_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoder API key is not configured")]
    MissingApiKey,

    #[error("Geocoder request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-form address; `Ok(None)` when nothing matched.
    async fn geocode(&self, address: &str) -> Result<Option<Location>, GeocodeError>;
}

pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _address: &str) -> Result<Option<Location>, GeocodeError> {
        Ok(None)
    }
}

pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: LatLng,
    #[serde(default)]
    street: String,
    /// City
    #[serde(default)]
    admin_area5: String,
    /// State
    #[serde(default)]
    admin_area3: String,
    #[serde(default)]
    postal_code: String,
    /// Country code
    #[serde(default)]
    admin_area1: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

impl From<MapQuestLocation> for Location {
    fn from(loc: MapQuestLocation) -> Self {
        let state_zip = [loc.admin_area3.as_str(), loc.postal_code.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let formatted = [loc.street.as_str(), loc.admin_area5.as_str(), state_zip.as_str(), loc.admin_area1.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        Location {
            kind: "Point".to_string(),
            coordinates: [loc.lat_lng.lng, loc.lat_lng.lat],
            formatted_address: non_empty(formatted),
            street: non_empty(loc.street),
            city: non_empty(loc.admin_area5),
            state: non_empty(loc.admin_area3),
            zipcode: non_empty(loc.postal_code),
            country: non_empty(loc.admin_area1),
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Location>, GeocodeError> {
        let response: MapQuestResponse = self
            .client
            .get(MAPQUEST_URL)
            .query(&[("key", self.api_key.as_str()), ("location", address), ("maxResults", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let first = response
            .results
            .into_iter()
            .next()
            .and_then(|r| r.locations.into_iter().next());
        Ok(first.map(Location::from))
    }
}

pub fn from_config(config: &GeocoderConfig) -> Result<Box<dyn Geocoder>, GeocodeError> {
    Ok(match config.provider {
        GeocoderProvider::Disabled => Box::new(DisabledGeocoder),
        GeocoderProvider::Mapquest => Box::new(MapQuestGeocoder {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone().ok_or(GeocodeError::MissingApiKey)?,
        }),
    })
}
