//! Great-circle distance and the hardcoded geography around the market.

use crate::model::Coordinate;

/// Fixed reference point: the Friday market square in Ventimiglia.
pub const MARKET_CENTER: Coordinate = Coordinate::new(43.7885, 7.6060);

/// Maximum distance from the market for a candidate to be considered.
pub const MAX_MARKET_DISTANCE_M: f64 = 2_000.0;

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

// Tight box around the market area; anything outside is noise from the
// text searches (Latte, Bevera, the French side of the border).
const TOWN_LAT_MIN: f64 = 43.775;
const TOWN_LAT_MAX: f64 = 43.800;
const TOWN_LNG_MIN: f64 = 7.590;
const TOWN_LNG_MAX: f64 = 7.625;

/// Haversine distance in metres between two coordinates.
#[must_use]
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Metres from the market center.
#[must_use]
pub fn distance_from_market(point: Coordinate) -> f64 {
    haversine_m(MARKET_CENTER, point)
}

/// Whether a point falls inside the town bounding box around the market.
#[must_use]
pub fn within_town_bounds(point: Coordinate) -> bool {
    point.lat >= TOWN_LAT_MIN
        && point.lat <= TOWN_LAT_MAX
        && point.lng >= TOWN_LNG_MIN
        && point.lng <= TOWN_LNG_MAX
}

/// Whether a point is clearly in open sea off the coastline.
///
/// Ventimiglia sits on the coast, so external search results regularly
/// drift into the water; only unambiguous open-sea rectangles are cut.
#[must_use]
pub fn likely_in_water(point: Coordinate) -> bool {
    if point.lat < 43.785 && point.lng < 7.600 {
        return true;
    }
    // South-west of the harbour
    if point.lat < 43.786 && point.lng < 7.595 {
        return true;
    }
    // South-east, past the Nervia mouth
    point.lat < 43.780 && point.lng > 7.620
}
