//! Parking source reading OpenStreetMap through the Overpass API.
//!
//! OSM is the richest source for the municipal lots: ways carry real
//! polygon outlines, capacity tags, and fee information that the
//! commercial APIs lack. The response is pre-filtered and pre-deduped
//! here with a wider bounding box and a tighter 20 m threshold, so the
//! aggregator only sees plausible, distinct lots.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use bancarella_core::{
    aggregate::quality_score,
    geo::{haversine_m, likely_in_water},
    model::{Coordinate, ParkingCandidate},
    ports::{ParkingSourcePort, PortError},
};

const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Server-side query timeout is 45 s; the client allows a little slack
/// on top for transfer.
const FETCH_TIMEOUT: Duration = Duration::from_secs(50);

/// Everything tagged as parking within 3 km of the market square.
/// The radius is wider than the aggregator's own cut so border lots are
/// not lost to centroid rounding.
const QUERY: &str = r#"[out:json][timeout:45];
(
  node["amenity"="parking"](around:3000,43.7885,7.6060);
  way["amenity"="parking"](around:3000,43.7885,7.6060);
  relation["amenity"="parking"](around:3000,43.7885,7.6060);
  node["parking"](around:3000,43.7885,7.6060);
  way["parking"](around:3000,43.7885,7.6060);
);
out geom;"#;

// Wider than the town box used by the aggregator: OSM data is precise
// enough that the slopes above the old town are worth keeping.
const OSM_LAT_MIN: f64 = 43.7750;
const OSM_LAT_MAX: f64 = 43.8100;
const OSM_LNG_MIN: f64 = 7.5850;
const OSM_LNG_MAX: f64 = 7.6600;

/// Same-source duplicates (a node inside its own way) sit closer than
/// cross-source ones, so the pre-dedup threshold is tighter than the
/// aggregator's 30 m.
const PRE_DEDUP_DISTANCE_M: f64 = 20.0;

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassPoint>,
    #[serde(default)]
    nodes: Vec<u64>,
    #[serde(default)]
    geometry: Vec<OverpassPoint>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct OverpassPoint {
    lat: f64,
    lon: f64,
}

/// Parking source querying the public Overpass endpoint.
pub struct OverpassParkingSource {
    client: Client,
    url: String,
}

impl OverpassParkingSource {
    /// Create a source bound to the public Overpass endpoint.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            url: String::from(OVERPASS_URL),
        }
    }

    /// Create a source using a custom endpoint (tests, mirror instances).
    #[must_use]
    pub fn with_url(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ParkingSourcePort for OverpassParkingSource {
    fn source(&self) -> &'static str {
        "osm"
    }

    async fn candidates(&self) -> Result<Vec<ParkingCandidate>, PortError> {
        let response = self
            .client
            .post(&self.url)
            .form(&[("data", QUERY)])
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<OverpassResponse>()
            .await?;

        let candidates = candidates_from(response.elements);
        info!(count = candidates.len(), "overpass candidates fetched");
        Ok(candidates)
    }
}

/// Turn raw Overpass elements into pre-filtered, pre-deduped candidates.
#[must_use]
fn candidates_from(elements: Vec<OverpassElement>) -> Vec<ParkingCandidate> {
    // Bare nodes referenced by ways carry no tags but are needed to
    // resolve way outlines when `out geom` was stripped by a mirror.
    let node_map: HashMap<u64, Coordinate> = elements
        .iter()
        .filter(|element| element.kind == "node")
        .filter_map(|element| {
            let (lat, lon) = (element.lat?, element.lon?);
            Some((element.id, Coordinate::new(lat, lon)))
        })
        .collect();

    let mut candidates: Vec<ParkingCandidate> = elements
        .iter()
        .filter(|element| is_parking(element))
        .filter_map(|element| to_candidate(element, &node_map))
        .filter(|candidate| within_osm_bounds(candidate.coordinate))
        .filter(|candidate| !likely_in_water(candidate.coordinate))
        .collect();

    pre_deduplicate(&mut candidates);
    candidates
}

fn is_parking(element: &OverpassElement) -> bool {
    if element.kind != "node" && element.kind != "way" {
        return false;
    }
    element.tags.get("amenity").map(String::as_str) == Some("parking")
        || element.tags.contains_key("parking")
}

fn within_osm_bounds(point: Coordinate) -> bool {
    point.lat >= OSM_LAT_MIN
        && point.lat <= OSM_LAT_MAX
        && point.lng >= OSM_LNG_MIN
        && point.lng <= OSM_LNG_MAX
}

/// Resolve a way outline: prefer the inline `geometry` from `out geom`,
/// fall back to resolving the node references. Outlines with fewer than
/// three distinct points are discarded; kept rings are closed.
fn resolve_polygon(
    element: &OverpassElement,
    node_map: &HashMap<u64, Coordinate>,
) -> Option<Vec<Coordinate>> {
    let mut points: Vec<Coordinate> = if element.geometry.is_empty() {
        element
            .nodes
            .iter()
            .filter_map(|id| node_map.get(id).copied())
            .collect()
    } else {
        element
            .geometry
            .iter()
            .map(|point| Coordinate::new(point.lat, point.lon))
            .collect()
    };

    if points.len() < 3 {
        return None;
    }

    let first = points.first().copied()?;
    let last = points.last().copied()?;
    if (first.lat - last.lat).abs() > f64::EPSILON || (first.lng - last.lng).abs() > f64::EPSILON {
        points.push(first);
    }
    Some(points)
}

/// Mean of the ring points, skipping the duplicated closing point.
fn centroid(polygon: &[Coordinate]) -> Option<Coordinate> {
    let ring = polygon.split_last().map_or(polygon, |(_, open)| open);
    if ring.is_empty() {
        return None;
    }
    #[allow(
        clippy::cast_precision_loss,
        reason = "ring sizes are tiny relative to f64 precision"
    )]
    let count = ring.len() as f64;
    let lat = ring.iter().map(|point| point.lat).sum::<f64>() / count;
    let lng = ring.iter().map(|point| point.lng).sum::<f64>() / count;
    Some(Coordinate::new(lat, lng))
}

fn to_candidate(
    element: &OverpassElement,
    node_map: &HashMap<u64, Coordinate>,
) -> Option<ParkingCandidate> {
    let tags = &element.tags;
    let is_way = element.kind == "way";

    let geometry = if is_way {
        resolve_polygon(element, node_map)
    } else {
        None
    };

    let coordinate = geometry.as_deref().and_then(centroid).or_else(|| {
        element
            .lat
            .zip(element.lon)
            .map(|(lat, lon)| Coordinate::new(lat, lon))
            .or_else(|| {
                element
                    .center
                    .map(|point| Coordinate::new(point.lat, point.lon))
            })
    })?;

    let named = tags.get("name").or_else(|| tags.get("operator"));
    let has_name = named.is_some();
    let street = tags.get("addr:street");
    let name = named.cloned().unwrap_or_else(|| {
        street.map_or_else(
            || String::from("Parcheggio"),
            |street| format!("Parcheggio {street}"),
        )
    });

    let address = match (street, tags.get("addr:housenumber")) {
        (Some(street), Some(number)) => format!("{street} {number}, Ventimiglia"),
        (Some(street), None) => format!("{street}, Ventimiglia"),
        _ => String::from("Ventimiglia"),
    };

    let paid = tags.get("fee").map(|fee| fee == "yes");
    let capacity = tags
        .get("capacity")
        .or_else(|| tags.get("spaces"))
        .and_then(|value| value.trim().parse::<u32>().ok());

    let mut type_tags = vec![String::from("parking")];
    if let Some(kind) = tags.get("parking") {
        type_tags.push(kind.clone());
    }

    Some(ParkingCandidate {
        id: format!("osm-{}", element.id),
        source: "osm",
        name,
        address,
        coordinate,
        geometry,
        type_tags,
        rating: None,
        paid,
        capacity,
        accessible: tags.get("wheelchair").map(String::as_str) == Some("yes"),
        has_name,
        has_parking_tag: true,
        is_way,
    })
}

/// Collapse same-lot duplicates (a tagged node sitting inside its own
/// way). Richer candidates survive.
fn pre_deduplicate(candidates: &mut Vec<ParkingCandidate>) {
    candidates.sort_by(|a, b| quality_score(b).cmp(&quality_score(a)));

    let mut kept: Vec<ParkingCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates.drain(..) {
        let duplicate = kept.iter().any(|existing| {
            haversine_m(existing.coordinate, candidate.coordinate) < PRE_DEDUP_DISTANCE_M
        });
        if !duplicate {
            kept.push(candidate);
        }
    }
    *candidates = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Vec<OverpassElement> {
        serde_json::from_str::<OverpassResponse>(body)
            .expect("valid payload")
            .elements
    }

    #[test]
    fn way_with_inline_geometry_becomes_a_closed_polygon() {
        let body = r#"{
            "elements": [{
                "type": "way",
                "id": 42,
                "geometry": [
                    { "lat": 43.7880, "lon": 7.6050 },
                    { "lat": 43.7882, "lon": 7.6054 },
                    { "lat": 43.7878, "lon": 7.6056 }
                ],
                "tags": {
                    "amenity": "parking",
                    "name": "Parcheggio Mercato",
                    "fee": "yes",
                    "capacity": "120",
                    "wheelchair": "yes"
                }
            }]
        }"#;

        let candidates = candidates_from(parse(body));
        assert_eq!(candidates.len(), 1);

        let lot = candidates.first().expect("candidate");
        assert_eq!(lot.id, "osm-42");
        assert_eq!(lot.name, "Parcheggio Mercato");
        assert_eq!(lot.paid, Some(true));
        assert_eq!(lot.capacity, Some(120));
        assert!(lot.accessible);
        assert!(lot.is_way);

        let polygon = lot.geometry.as_deref().expect("polygon");
        assert_eq!(polygon.len(), 4);
        let first = polygon.first().expect("point");
        let last = polygon.last().expect("point");
        assert!((first.lat - last.lat).abs() < f64::EPSILON);
        assert!((first.lng - last.lng).abs() < f64::EPSILON);
    }

    #[test]
    fn way_without_geometry_resolves_its_node_references() {
        let body = r#"{
            "elements": [
                { "type": "node", "id": 1, "lat": 43.7880, "lon": 7.6050 },
                { "type": "node", "id": 2, "lat": 43.7882, "lon": 7.6054 },
                { "type": "node", "id": 3, "lat": 43.7878, "lon": 7.6056 },
                {
                    "type": "way",
                    "id": 7,
                    "nodes": [1, 2, 3],
                    "tags": { "amenity": "parking" }
                }
            ]
        }"#;

        let candidates = candidates_from(parse(body));
        assert_eq!(candidates.len(), 1);
        let lot = candidates.first().expect("candidate");
        assert!(lot.geometry.is_some());
        // Centroid lands inside the triangle, near the market square.
        assert!((lot.coordinate.lat - 43.7880).abs() < 0.001);
    }

    #[test]
    fn degenerate_way_is_dropped_without_a_center() {
        let body = r#"{
            "elements": [{
                "type": "way",
                "id": 9,
                "geometry": [
                    { "lat": 43.7880, "lon": 7.6050 },
                    { "lat": 43.7882, "lon": 7.6054 }
                ],
                "tags": { "amenity": "parking" }
            }]
        }"#;

        assert!(candidates_from(parse(body)).is_empty());
    }

    #[test]
    fn name_falls_back_through_operator_and_street() {
        let body = r#"{
            "elements": [
                {
                    "type": "node", "id": 1, "lat": 43.7890, "lon": 7.6100,
                    "tags": { "amenity": "parking", "operator": "Comune di Ventimiglia" }
                },
                {
                    "type": "node", "id": 2, "lat": 43.7900, "lon": 7.6150,
                    "tags": { "amenity": "parking", "addr:street": "Via Roma" }
                },
                {
                    "type": "node", "id": 3, "lat": 43.7950, "lon": 7.6200,
                    "tags": { "amenity": "parking" }
                }
            ]
        }"#;

        let candidates = candidates_from(parse(body));
        let by_id = |id: &str| {
            candidates
                .iter()
                .find(|candidate| candidate.id == id)
                .expect("candidate")
        };

        let operated = by_id("osm-1");
        assert_eq!(operated.name, "Comune di Ventimiglia");
        assert!(operated.has_name);

        let street_only = by_id("osm-2");
        assert_eq!(street_only.name, "Parcheggio Via Roma");
        assert!(!street_only.has_name);
        assert_eq!(street_only.address, "Via Roma, Ventimiglia");

        let bare = by_id("osm-3");
        assert_eq!(bare.name, "Parcheggio");
        assert_eq!(bare.address, "Ventimiglia");
    }

    #[test]
    fn out_of_bounds_and_open_sea_elements_are_cut() {
        let body = r#"{
            "elements": [
                {
                    "type": "node", "id": 1, "lat": 43.9000, "lon": 7.6100,
                    "tags": { "amenity": "parking" }
                },
                {
                    "type": "node", "id": 2, "lat": 43.7790, "lon": 7.5900,
                    "tags": { "amenity": "parking" }
                }
            ]
        }"#;

        assert!(candidates_from(parse(body)).is_empty());
    }

    #[test]
    fn pre_dedup_keeps_the_richer_of_two_close_elements() {
        // ~10 m apart: the named node should survive, the bare one fold.
        let body = r#"{
            "elements": [
                {
                    "type": "node", "id": 1, "lat": 43.78900, "lon": 7.6100,
                    "tags": { "amenity": "parking" }
                },
                {
                    "type": "node", "id": 2, "lat": 43.78909, "lon": 7.6100,
                    "tags": { "amenity": "parking", "name": "Parcheggio Stazione" }
                }
            ]
        }"#;

        let candidates = candidates_from(parse(body));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates.first().expect("candidate").id, "osm-2");
    }

    #[test]
    fn parking_subtag_is_carried_into_type_tags() {
        let body = r#"{
            "elements": [{
                "type": "node", "id": 5, "lat": 43.7890, "lon": 7.6100,
                "tags": { "parking": "surface" }
            }]
        }"#;

        let candidates = candidates_from(parse(body));
        let lot = candidates.first().expect("candidate");
        assert!(lot.type_tags.iter().any(|tag| tag == "surface"));
        assert!(lot.has_parking_tag);
    }
}
