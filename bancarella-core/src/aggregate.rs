//! Merges raw candidates from every parking source into one ranked list.
//!
//! The pipeline is deliberately strict: external text searches around a
//! coastal border town return banks, beaches, and the odd French result,
//! so candidates pass geographic cuts, a type denylist, and a name
//! denylist before classification and deduplication.

use std::sync::Arc;

use chrono::NaiveDateTime;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::geo::{
    distance_from_market, haversine_m, likely_in_water, within_town_bounds, MARKET_CENTER,
    MAX_MARKET_DISTANCE_M,
};
use crate::model::{Parking, ParkingCandidate, ParkingReport, ParkingType};
use crate::ports::ParkingSourcePort;
use crate::pricing::{estimate_availability, estimate_pricing, fee_string, traffic_multiplier};

/// Two candidates closer than this are considered the same lot.
const DEDUP_THRESHOLD_M: f64 = 30.0;

/// Authoritative source types that are never parking, keyword or not.
const EXCLUDED_TYPES: [&str; 27] = [
    "bank",
    "atm",
    "finance",
    "accounting",
    "store",
    "shopping_mall",
    "supermarket",
    "grocery_or_supermarket",
    "restaurant",
    "food",
    "cafe",
    "bar",
    "lodging",
    "hotel",
    "bed_and_breakfast",
    "pharmacy",
    "hospital",
    "doctor",
    "school",
    "university",
    "church",
    "place_of_worship",
    "museum",
    "tourist_attraction",
    "amusement_park",
    "train_station",
    "transit_station",
];

/// Further type fragments rejected outright. `port` stays allowed: the
/// harbour lots are real parking.
const EXCLUDED_TYPES_EXTRA: [&str; 6] = [
    "bus_station",
    "marina",
    "beach",
    "car_rental",
    "car_repair",
    "car_wash",
];

/// Name fragments that indicate a non-parking business. Overridden when
/// the name also carries a parking keyword.
const EXCLUDED_KEYWORDS: [&str; 40] = [
    "banca",
    "bank",
    "banco",
    "credito",
    "negozio",
    "shop",
    "store",
    "supermercato",
    "supermarket",
    "ristorante",
    "restaurant",
    "bar",
    "caffè",
    "cafe",
    "hotel",
    "albergo",
    "b&b",
    "bed and breakfast",
    "farmacia",
    "pharmacy",
    "ospedale",
    "hospital",
    "scuola",
    "school",
    "chiesa",
    "church",
    "cattedrale",
    "museo",
    "museum",
    "teatro",
    "theater",
    "cinema",
    "ufficio",
    "office",
    "agenzia",
    "stazione",
    "station",
    "marina",
    "spiaggia",
    "beach",
];

/// Bank brands rejected even when "parcheggio" appears in the name.
const BANK_NAMES: [&str; 5] = [
    "bper",
    "banca popolare",
    "intesa",
    "unicredit",
    "credito",
];

/// Specific establishments that keep showing up in the searches but are
/// a marina and a car dealer, not parking.
const DENYLISTED_NAMES: [&str; 2] = ["cala del forte", "alex car"];

const PARKING_KEYWORDS: [&str; 2] = ["parking", "parcheggio"];

const MUNICIPAL_INDICATORS: [&str; 3] = ["comunale", "municipal", "comune"];

/// Why a candidate was rejected; used for debug logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Water,
    TooFar,
    OutOfBounds,
    ExcludedType,
    ExcludedKeyword,
    DenylistedName,
    BankName,
}

fn rejection(candidate: &ParkingCandidate) -> Option<Rejection> {
    let point = candidate.coordinate;
    if !point.lat.is_finite() || !point.lng.is_finite() {
        return Some(Rejection::OutOfBounds);
    }
    if likely_in_water(point) {
        return Some(Rejection::Water);
    }
    if distance_from_market(point) > MAX_MARKET_DISTANCE_M {
        return Some(Rejection::TooFar);
    }
    if !within_town_bounds(point) {
        return Some(Rejection::OutOfBounds);
    }

    let name = candidate.name.to_lowercase();

    let has_excluded_type = candidate.type_tags.iter().any(|tag| {
        EXCLUDED_TYPES
            .iter()
            .chain(EXCLUDED_TYPES_EXTRA.iter())
            .any(|excluded| tag.contains(excluded))
    });
    if has_excluded_type {
        return Some(Rejection::ExcludedType);
    }

    let has_parking_keyword = PARKING_KEYWORDS
        .iter()
        .any(|keyword| name.contains(keyword));
    let has_excluded_keyword = EXCLUDED_KEYWORDS
        .iter()
        .any(|keyword| name.contains(keyword));
    if has_excluded_keyword && !has_parking_keyword {
        return Some(Rejection::ExcludedKeyword);
    }

    if DENYLISTED_NAMES.iter().any(|denied| name.contains(denied)) {
        return Some(Rejection::DenylistedName);
    }

    // Banks stay out even with "parcheggio" in the branch name.
    if BANK_NAMES.iter().any(|bank| name.contains(bank)) {
        return Some(Rejection::BankName);
    }

    None
}

/// Municipal when the name says so, private otherwise.
fn classify(name: &str) -> ParkingType {
    let name = name.to_lowercase();
    if MUNICIPAL_INDICATORS
        .iter()
        .any(|indicator| name.contains(indicator))
    {
        ParkingType::Municipal
    } else {
        ParkingType::Private
    }
}

/// Explicit fee tag wins; otherwise a rating above 3 is used as a weak
/// proxy for "likely paid". Unknown stays unknown.
fn infer_paid(candidate: &ParkingCandidate) -> Option<bool> {
    if candidate.paid.is_some() {
        return candidate.paid;
    }
    candidate.rating.map(|rating| rating > 3.0)
}

/// Richer candidates win dedup ties: named lots, known capacity, real
/// geometry, parking-specific tags, and ways over bare nodes.
#[must_use]
pub fn quality_score(candidate: &ParkingCandidate) -> u32 {
    let mut score = 0;
    if candidate.has_name {
        score += 3;
    }
    if candidate.capacity.is_some() {
        score += 2;
    }
    if candidate.geometry.as_ref().is_some_and(|polygon| !polygon.is_empty()) {
        score += 2;
    }
    if candidate.has_parking_tag {
        score += 1;
    }
    if candidate.is_way {
        score += 1;
    }
    score
}

/// Keep the best candidate of every near-duplicate cluster: scan in
/// quality order and drop anything within [`DEDUP_THRESHOLD_M`] of an
/// already kept centroid.
fn deduplicate(mut candidates: Vec<ParkingCandidate>) -> Vec<ParkingCandidate> {
    candidates.sort_by(|a, b| quality_score(b).cmp(&quality_score(a)));

    let mut kept: Vec<ParkingCandidate> = Vec::new();
    for candidate in candidates {
        let duplicate = kept
            .iter()
            .any(|other| haversine_m(candidate.coordinate, other.coordinate) < DEDUP_THRESHOLD_M);
        if duplicate {
            debug!(id = %candidate.id, "dropping near-duplicate candidate");
        } else {
            kept.push(candidate);
        }
    }
    kept
}

fn to_parking(candidate: ParkingCandidate, at: NaiveDateTime) -> Parking {
    let distance = distance_from_market(candidate.coordinate);
    let kind = classify(&candidate.name);
    let paid = infer_paid(&candidate);
    let pricing = estimate_pricing(kind, paid, at);
    let fee = fee_string(paid, pricing.as_ref());

    let (available_spots, total_spots) = match candidate.capacity {
        // Exact capacity from the source; assume steady 60% occupancy.
        Some(capacity) => {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "floored fraction of a u32 capacity"
            )]
            let available = (f64::from(capacity) * 0.6).floor() as u32;
            (available, capacity)
        }
        None => estimate_availability(at),
    };

    let hours = if candidate.source == "osm" {
        String::from("24/7")
    } else {
        String::from("Orari da verificare")
    };

    Parking {
        id: candidate.id,
        name: candidate.name,
        address: candidate.address,
        kind,
        paid,
        fee,
        hours,
        available_spots,
        total_spots,
        location: candidate.coordinate,
        geometry: candidate.geometry,
        accessible: candidate.accessible,
        rating: candidate.rating,
        distance,
        pricing,
    }
}

/// Filtering, deduplication, classification, and ranking over every
/// registered parking source.
pub struct ParkingAggregator {
    sources: Vec<Arc<dyn ParkingSourcePort>>,
}

impl ParkingAggregator {
    /// Build an aggregator over the given sources.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn ParkingSourcePort>>) -> Self {
        Self { sources }
    }

    /// Run the full pipeline at the given wall-clock time.
    ///
    /// Sources are queried concurrently; a failing source contributes a
    /// warning instead of an error, so an empty report is a valid
    /// outcome and not proof that no parking exists.
    pub async fn collect(&self, at: NaiveDateTime) -> ParkingReport {
        let fetches = self.sources.iter().map(|source| source.candidates());
        let results = join_all(fetches).await;

        let mut candidates = Vec::new();
        let mut warnings = Vec::new();

        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(batch) => {
                    debug!(source = source.source(), count = batch.len(), "source responded");
                    candidates.extend(batch);
                }
                Err(error) => {
                    warn!(source = source.source(), %error, "parking source degraded");
                    warnings.push(format!("{}: {error}", source.source()));
                }
            }
        }

        let parkings = self.pipeline(candidates, at);

        ParkingReport {
            parkings,
            warnings,
            origin: MARKET_CENTER,
            generated_at: at,
        }
    }

    /// Synchronous part of the aggregation, separated for testability.
    #[must_use]
    pub fn pipeline(&self, candidates: Vec<ParkingCandidate>, at: NaiveDateTime) -> Vec<Parking> {
        let total = candidates.len();

        let surviving: Vec<ParkingCandidate> = candidates
            .into_iter()
            .filter(|candidate| match rejection(candidate) {
                Some(reason) => {
                    debug!(id = %candidate.id, ?reason, "candidate rejected");
                    false
                }
                None => true,
            })
            .collect();

        debug!(
            total,
            surviving = surviving.len(),
            multiplier = traffic_multiplier(at),
            "parking filter pass done"
        );

        let mut parkings: Vec<Parking> = deduplicate(surviving)
            .into_iter()
            .map(|candidate| to_parking(candidate, at))
            .collect();

        parkings.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        parkings
    }
}
