//! Parking source backed by the Google Places API.
//!
//! The text search finds more of the real lots around the market than a
//! bare nearby search with `type=parking`, so both run: three query
//! variants plus one nearby search, joined concurrently and merged on
//! place id, with one follow-up page for the primary query. Results come
//! back as raw candidates; all filtering and classification happens in
//! the core aggregator.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use bancarella_core::{
    geo::{MARKET_CENTER, MAX_MARKET_DISTANCE_M},
    model::{Coordinate, ParkingCandidate},
    ports::{ParkingSourcePort, PortError},
};

const TEXT_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
const NEARBY_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// Server-side key without referer restrictions.
const API_KEY_VAR: &str = "GOOGLE_PLACES_API_KEY";

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// A `next_page_token` only becomes valid a moment after it is issued.
const PAGE_TOKEN_DELAY: Duration = Duration::from_secs(2);

/// Query variants; "porto" catches the harbour lots that plain
/// "parcheggio" misses.
const TEXT_QUERIES: [&str; 3] = [
    "parcheggio Ventimiglia",
    "porto Ventimiglia",
    "parking Ventimiglia",
];

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    error_message: Option<String>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    #[serde(default)]
    name: String,
    geometry: Option<PlaceGeometry>,
    vicinity: Option<String>,
    formatted_address: Option<String>,
    rating: Option<f32>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceGeometry {
    location: PlaceLocation,
}

#[derive(Debug, Deserialize)]
struct PlaceLocation {
    lat: f64,
    lng: f64,
}

/// Parking source querying Google Places around the market center.
pub struct PlacesParkingSource {
    client: Client,
    api_key: String,
}

impl PlacesParkingSource {
    /// Create a source from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::MissingApiKey`] when no key is configured —
    /// a deployment problem, deliberately distinct from "zero results".
    pub fn from_env(client: Client) -> Result<Self, PortError> {
        let api_key = env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(PortError::MissingApiKey(API_KEY_VAR))?;
        Ok(Self { client, api_key })
    }

    /// Create a source with an explicit key (tests, alternate config).
    #[must_use]
    pub fn with_key(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    async fn fetch(&self, url: &str, params: Vec<(&str, String)>) -> Result<PlacesResponse, PortError> {
        let response = self
            .client
            .get(url)
            .query(&params)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<PlacesResponse>()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl ParkingSourcePort for PlacesParkingSource {
    fn source(&self) -> &'static str {
        "google"
    }

    async fn candidates(&self) -> Result<Vec<ParkingCandidate>, PortError> {
        let location = format!("{},{}", MARKET_CENTER.lat, MARKET_CENTER.lng);
        let radius = format!("{MAX_MARKET_DISTANCE_M:.0}");

        let mut requests = Vec::with_capacity(TEXT_QUERIES.len() + 1);
        for query in TEXT_QUERIES {
            requests.push(self.fetch(
                TEXT_SEARCH_URL,
                vec![
                    ("query", query.to_owned()),
                    ("location", location.clone()),
                    ("radius", radius.clone()),
                    ("key", self.api_key.clone()),
                ],
            ));
        }
        requests.push(self.fetch(
            NEARBY_SEARCH_URL,
            vec![
                ("location", location),
                ("radius", radius),
                ("type", String::from("parking")),
                ("key", self.api_key.clone()),
            ],
        ));

        let responses = try_join_all(requests).await?;

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut follow_up = None;
        for (index, response) in responses.into_iter().enumerate() {
            let token = merge_page(response, &mut seen, &mut candidates);
            // Only the primary query gets a follow-up page; the other
            // searches overlap it almost entirely.
            if index == 0 {
                follow_up = token;
            }
        }

        if let Some(token) = follow_up {
            tokio::time::sleep(PAGE_TOKEN_DELAY).await;
            let page = self
                .fetch(
                    TEXT_SEARCH_URL,
                    vec![("pagetoken", token), ("key", self.api_key.clone())],
                )
                .await?;
            merge_page(page, &mut seen, &mut candidates);
        }

        info!(count = candidates.len(), "places candidates fetched");
        Ok(candidates)
    }
}

/// Merge one result page into the running candidate list, skipping
/// already-seen place ids. Returns the page's continuation token.
fn merge_page(
    response: PlacesResponse,
    seen: &mut HashSet<String>,
    candidates: &mut Vec<ParkingCandidate>,
) -> Option<String> {
    if response.status != "OK" {
        // ZERO_RESULTS is routine for the narrower queries.
        warn!(
            status = %response.status,
            error = response.error_message.as_deref().unwrap_or(""),
            "places search returned no usable results"
        );
        return None;
    }
    for place in response.results {
        if seen.insert(place.place_id.clone()) {
            if let Some(candidate) = to_candidate(place) {
                candidates.push(candidate);
            }
        }
    }
    response.next_page_token
}

/// Map one place into a raw candidate; places without a geometry are
/// dropped here since nothing downstream can use them.
fn to_candidate(place: PlaceResult) -> Option<ParkingCandidate> {
    let location = place.geometry?.location;

    let address = place
        .formatted_address
        .or(place.vicinity)
        .filter(|address| !address.trim().is_empty())
        .unwrap_or_else(|| String::from("Indirizzo non disponibile"));

    let has_parking_tag = place.types.iter().any(|tag| tag.contains("parking"));

    Some(ParkingCandidate {
        id: format!("google_{}", place.place_id),
        source: "google",
        has_name: !place.name.trim().is_empty(),
        name: place.name,
        address,
        coordinate: Coordinate::new(location.lat, location.lng),
        geometry: None,
        type_tags: place.types,
        rating: place.rating,
        paid: None,
        capacity: None,
        accessible: false,
        has_parking_tag,
        is_way: false,
    })
}
