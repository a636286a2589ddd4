//! Time-of-day/day-of-week heuristics for parking price and availability.
//!
//! Friday morning is market time in Ventimiglia, so it dominates both
//! scales. All functions take the wall-clock time as a parameter so the
//! heuristics stay deterministic under test.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

use crate::model::{ParkingType, Pricing};

/// Base hourly rate for municipal lots, in euro.
const MUNICIPAL_HOURLY: f64 = 1.5;
/// Base daily rate for municipal lots, in euro.
const MUNICIPAL_DAILY: f64 = 10.0;
/// Base hourly rate for private lots, in euro.
const PRIVATE_HOURLY: f64 = 2.0;
/// Base daily rate for private lots, in euro.
const PRIVATE_DAILY: f64 = 12.0;

/// Baseline lot size used when a source reports no capacity.
const BASE_TOTAL_SPOTS: u32 = 50;
/// Baseline free spots before the traffic factor is applied.
const BASE_AVAILABLE_SPOTS: u32 = 30;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Traffic multiplier for the given wall-clock time.
///
/// Baseline 1.0; rush windows raise it, night lowers it, and Friday
/// market hours multiply it further. Rounded to 2 decimals.
#[must_use]
pub fn traffic_multiplier(at: NaiveDateTime) -> f64 {
    let hour = at.hour();
    let weekday = at.weekday();
    let is_friday = weekday == Weekday::Fri;
    let is_weekend = weekday == Weekday::Sat || weekday == Weekday::Sun;

    let mut multiplier: f64 = 1.0;

    if (7..=9).contains(&hour) {
        multiplier = 1.3;
    } else if (12..=14).contains(&hour) {
        multiplier = 1.2;
    } else if (17..=19).contains(&hour) {
        multiplier = 1.4;
    } else if hour >= 22 || hour <= 6 {
        multiplier = 0.9;
    }

    if is_friday && (6..=14).contains(&hour) {
        multiplier *= 1.5;
    }

    if is_weekend && (10..=18).contains(&hour) {
        multiplier = multiplier.max(1.2);
    }

    round2(multiplier)
}

/// Occupancy factor for the same windows, tuned for availability rather
/// than price (lower = fuller).
fn occupancy_factor(at: NaiveDateTime) -> f64 {
    let hour = at.hour();
    let is_friday = at.weekday() == Weekday::Fri;

    let mut factor = 1.0;

    if (7..=9).contains(&hour) {
        factor = 0.6;
    } else if (12..=14).contains(&hour) {
        factor = 0.7;
    } else if (17..=19).contains(&hour) {
        factor = 0.5;
    } else if hour >= 22 || hour <= 6 {
        factor = 0.9;
    }

    if is_friday && (6..=14).contains(&hour) {
        factor *= 0.4;
    }

    factor
}

/// Dynamic pricing estimate for a classified lot.
///
/// Known-free lots (`paid == Some(false)`) get no pricing block; unknown
/// fee status is treated as potentially paid.
#[must_use]
pub fn estimate_pricing(
    kind: ParkingType,
    paid: Option<bool>,
    at: NaiveDateTime,
) -> Option<Pricing> {
    if paid == Some(false) {
        return None;
    }

    let (hourly_rate, daily_rate) = match kind {
        ParkingType::Municipal => (MUNICIPAL_HOURLY, MUNICIPAL_DAILY),
        ParkingType::Private => (PRIVATE_HOURLY, PRIVATE_DAILY),
    };

    let multiplier = traffic_multiplier(at);

    Some(Pricing {
        hourly_rate,
        daily_rate,
        current_hourly_rate: round2(hourly_rate * multiplier),
        current_daily_rate: round2(daily_rate * multiplier),
        traffic_multiplier: multiplier,
        last_updated: at,
    })
}

/// Estimated (available, total) spots for a lot without capacity data.
#[must_use]
pub fn estimate_availability(at: NaiveDateTime) -> (u32, u32) {
    let factor = occupancy_factor(at);
    let available = (f64::from(BASE_AVAILABLE_SPOTS) * factor).floor();
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "floored product of small positive constants"
    )]
    let available = available.max(0.0) as u32;
    (available, BASE_TOTAL_SPOTS)
}

/// Human fee string for the list widget.
#[must_use]
pub fn fee_string(paid: Option<bool>, pricing: Option<&Pricing>) -> String {
    if paid == Some(false) {
        return String::from("Gratuito");
    }
    match pricing {
        Some(block) => {
            let mut fee = format!("{:.2}€/h", block.current_hourly_rate);
            if block.traffic_multiplier > 1.0 {
                fee.push_str(" (alta domanda)");
            }
            fee
        }
        None => String::from("Indefinito"),
    }
}
