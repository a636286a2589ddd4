//! Domain data structures for events, parking, weather, and the admin area.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Canonical display spelling of the target municipality.
pub const MUNICIPALITY: &str = "Ventimiglia";

/// Literal marker used in the sheet instead of a start date for
/// schedule-only rows.
pub const RECURRING_MARKER: &str = "ricorrente";

/// Placeholder title for rows whose event name is empty after cleanup.
pub const UNNAMED_EVENT: &str = "Evento senza nome";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// One raw row from the sheet feed or the curated list, before any date
/// expansion. Every field mirrors the untyped CSV contract: empty string
/// means absent.
pub struct RawEventRecord {
    /// Source row identifier, e.g. `event-3`.
    pub id: String,
    /// Municipality column, not yet normalized.
    pub municipality: String,
    /// Event name as published.
    pub title: String,
    /// Category/type label ("Mercato", "Concerto", ...).
    pub category: String,
    /// Free-text recurrence rule, e.g. `2° e 4° sabato`.
    pub recurrence: String,
    /// Start date text, `DD/MM[/YYYY]` or [`RECURRING_MARKER`].
    pub start_text: String,
    /// End date text, same format as `start_text`.
    pub end_text: String,
    /// Month hint column (unused by expansion, kept for display).
    pub month_text: String,
    /// Time-of-day text; empty means all-day.
    pub time_text: String,
    /// Venue/location text.
    pub location: String,
    /// Organizer text.
    pub organizer: String,
    /// Merchandise sector text.
    pub sectors: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One concrete calendar instance of an event. Produced fresh on every
/// catalog build and never mutated.
pub struct Occurrence {
    /// Composite key: source record id plus start timestamp.
    pub id: String,
    /// Canonical municipality spelling.
    pub municipality: String,
    /// Cleaned display title.
    pub title: String,
    /// Category label.
    pub category: String,
    /// Venue text.
    pub location: String,
    /// Organizer text.
    pub organizer: String,
    /// Original time-of-day text.
    pub time_text: String,
    /// Concrete start date.
    pub start: NaiveDate,
    /// Concrete end date; equals `start` for single-day events.
    pub end: NaiveDate,
    /// True when the record carries no usable time of day.
    pub all_day: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// WGS84 coordinate pair.
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Construct a coordinate from latitude/longitude degrees.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Ownership classification of a parking facility.
pub enum ParkingType {
    /// Operated by the municipality, generally cheaper.
    Municipal,
    /// Privately operated.
    Private,
}

#[derive(Debug, Clone)]
/// One raw point of interest from an external source, before filtering.
/// Ephemeral: fetched per request and never persisted.
pub struct ParkingCandidate {
    /// Source-prefixed identifier, e.g. `google_...` or `osm-...`.
    pub id: String,
    /// Source marker (`google` or `osm`).
    pub source: &'static str,
    /// Display name after the provider's fallback chain.
    pub name: String,
    /// Best-effort address string.
    pub address: String,
    /// Centroid used for filtering and deduplication.
    pub coordinate: Coordinate,
    /// Closed lot outline when the source returned one (OSM ways).
    pub geometry: Option<Vec<Coordinate>>,
    /// Raw category tags from the source.
    pub type_tags: Vec<String>,
    /// Average user rating, when the source exposes one.
    pub rating: Option<f32>,
    /// Explicit fee tag; `None` when the source has no fee information.
    pub paid: Option<bool>,
    /// Exact capacity from the source tags, when present.
    pub capacity: Option<u32>,
    /// Wheelchair accessibility flag.
    pub accessible: bool,
    /// True when the source had a real name (not a synthesized fallback).
    pub has_name: bool,
    /// True when the element carried a parking-specific tag.
    pub has_parking_tag: bool,
    /// True for OSM ways/relations (polygon sources outrank bare nodes).
    pub is_way: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Dynamic pricing estimate attached to paid (or possibly paid) parking.
pub struct Pricing {
    /// Base hourly rate in euro.
    pub hourly_rate: f64,
    /// Base daily rate in euro.
    pub daily_rate: f64,
    /// Hourly rate scaled by the current traffic multiplier.
    pub current_hourly_rate: f64,
    /// Daily rate scaled by the current traffic multiplier.
    pub current_daily_rate: f64,
    /// Scalar derived from time of day and weekday.
    pub traffic_multiplier: f64,
    /// When the estimate was computed.
    pub last_updated: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A cleaned, deduplicated parking record ready for the map/list widget.
/// Constructed once per request, ranked by distance, never stored.
pub struct Parking {
    /// Source-prefixed identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Best-effort address.
    pub address: String,
    #[serde(rename = "type")]
    /// Municipal or private classification.
    pub kind: ParkingType,
    /// Paid flag; `None` means unknown.
    pub paid: Option<bool>,
    /// Human fee string ("Gratuito", "2.25€/h (alta domanda)", ...).
    pub fee: String,
    /// Opening hours hint.
    pub hours: String,
    /// Estimated free spots.
    pub available_spots: u32,
    /// Estimated or exact total spots.
    pub total_spots: u32,
    /// Centroid coordinate.
    pub location: Coordinate,
    /// Closed lot outline, when known.
    pub geometry: Option<Vec<Coordinate>>,
    /// Wheelchair accessibility flag.
    pub accessible: bool,
    /// Average user rating, when known.
    pub rating: Option<f32>,
    /// Metres from the market center.
    pub distance: f64,
    /// Dynamic pricing block; absent for known-free parking.
    pub pricing: Option<Pricing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Aggregation result: ranked parking plus degradation warnings.
/// An empty `parkings` list with warnings is a valid, recoverable outcome.
pub struct ParkingReport {
    /// Parking entries sorted by ascending distance from the market.
    pub parkings: Vec<Parking>,
    /// One message per source that failed and was skipped.
    pub warnings: Vec<String>,
    /// Search origin used for every distance in the report.
    pub origin: Coordinate,
    /// When the report was assembled.
    pub generated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Municipal news entry managed through the admin area.
pub struct NewsItem {
    /// Numeric-string identifier assigned by the store.
    pub id: String,
    /// Headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Publication date.
    pub published_at: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Market stall operator managed through the operator area.
pub struct Operator {
    /// Numeric-string identifier assigned by the store.
    pub id: String,
    /// Business name.
    pub name: String,
    /// Merchandise category.
    pub category: String,
    /// Short description.
    pub description: String,
    /// Stall number on the market plan.
    pub stall_number: String,
    /// Whether the stall is currently marked open.
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Current conditions snapshot.
pub struct WeatherSnapshot {
    /// Temperature in °C.
    pub temperature: f64,
    /// Localized condition label.
    pub condition: String,
    /// Icon slug for the widget.
    pub icon: String,
    /// Relative humidity in percent.
    pub humidity: u32,
    /// Wind speed in km/h.
    pub wind_speed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One hour of forecast.
pub struct HourlyForecast {
    /// Forecast hour.
    pub time: NaiveDateTime,
    /// Temperature in °C.
    pub temperature: f64,
    /// Localized condition label.
    pub condition: String,
    /// Icon slug.
    pub icon: String,
    /// Expected precipitation in mm.
    pub precipitation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One day of forecast.
pub struct DailyForecast {
    /// Forecast day.
    pub date: NaiveDate,
    /// Daily maximum in °C.
    pub max_temp: f64,
    /// Daily minimum in °C.
    pub min_temp: f64,
    /// Localized condition label.
    pub condition: String,
    /// Icon slug.
    pub icon: String,
    /// Expected precipitation in mm.
    pub precipitation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Weather payload for the widget; `source` distinguishes live data from
/// the mock fallback.
pub struct WeatherReport {
    /// Current conditions.
    pub current: WeatherSnapshot,
    /// Next 24 hours.
    pub hourly: Vec<HourlyForecast>,
    /// Next 3 days.
    pub daily: Vec<DailyForecast>,
    /// `openweathermap` or `mock`.
    pub source: String,
}
