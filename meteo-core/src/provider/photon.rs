//! Photon geocoding search.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    client::{HttpClient, RequestParams},
    error::RequestError,
    model::{Coord, GeocodeResult},
    query::QueryParams,
};

pub const DEFAULT_BASE_URL: &str = "http://photon.komoot.de/api";
const DEFAULT_LIMIT: u32 = 40;

#[derive(Debug, Clone)]
pub struct PhotonClient {
    lang: String,
    base_url: String,
    limit: u32,
    http: HttpClient,
}

impl PhotonClient {
    pub fn new(http: HttpClient) -> Self {
        Self {
            lang: "en".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: DEFAULT_LIMIT,
            http,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search places matching `q`, biased towards `near` when given.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        q: &str,
        near: Option<Coord>,
    ) -> Result<Vec<GeocodeResult>, RequestError> {
        let query = QueryParams::new()
            .set("q", q)
            .set_opt("lat", near.map(|c| c.lat))
            .set_opt("lon", near.map(|c| c.lon))
            .set("lang", self.lang.as_str())
            .set("limit", self.limit);

        let response: PhotonResponse = self
            .http
            .get_json(RequestParams::get(self.base_url.as_str()).with_query(query))
            .await?;

        let results = map_features(response.features)?;
        debug!(count = results.len(), "geocoding results");
        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct PhotonResponse {
    features: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: Value,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// `[lon, lat]`
    pub coordinates: Vec<f64>,
}

/// One result per feature, coordinates reordered to lat/lon.
pub fn map_features(features: Vec<Feature>) -> Result<Vec<GeocodeResult>, RequestError> {
    features
        .into_iter()
        .map(|feature| {
            let &[lon, lat, ..] = feature.geometry.coordinates.as_slice() else {
                return Err(RequestError::malformed(format!(
                    "feature coordinates must start with [lon, lat], got {:?}",
                    feature.geometry.coordinates
                )));
            };

            Ok(GeocodeResult {
                name: feature
                    .properties
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                sys: feature.properties,
                coord: Coord { lat, lon },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(body: Value) -> Feature {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn swaps_coordinates() {
        let results = map_features(vec![feature(json!({
            "properties": { "name": "Grenoble", "osm_key": "place" },
            "geometry": { "type": "Point", "coordinates": [10.0, 20.0] }
        }))])
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].coord, Coord { lat: 20.0, lon: 10.0 });
        assert_eq!(results[0].name.as_deref(), Some("Grenoble"));
        assert_eq!(results[0].sys["osm_key"], "place");
    }

    #[test]
    fn keeps_every_feature() {
        let results = map_features(vec![
            feature(json!({
                "properties": { "name": "Mont Blanc", "osm_key": "natural" },
                "geometry": { "coordinates": [6.86, 45.83] }
            })),
            feature(json!({
                "properties": { "osm_key": "highway" },
                "geometry": { "coordinates": [5.7, 45.1] }
            })),
        ])
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].name, None);
    }

    #[test]
    fn altitude_is_ignored() {
        let results = map_features(vec![feature(json!({
            "properties": { "name": "Aiguille du Midi" },
            "geometry": { "type": "Point", "coordinates": [10.0, 20.0, 1500.0] }
        }))])
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].coord, Coord { lat: 20.0, lon: 10.0 });
    }

    #[test]
    fn short_coordinates_are_malformed() {
        let err = map_features(vec![feature(json!({
            "properties": {},
            "geometry": { "coordinates": [1.0] }
        }))])
        .unwrap_err();
        assert!(matches!(err, RequestError::MalformedResponse(_)));
    }
}
