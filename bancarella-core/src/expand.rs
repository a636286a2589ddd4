//! Expansion of one raw event row into concrete date spans.
//!
//! Two independent branches feed the result: a free-text recurrence rule
//! ("2° e 4° sabato") and an explicit `DD/MM[/YYYY]` date span. A record
//! may carry both; their outputs are concatenated without deduplication,
//! matching how the published calendar behaves.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::model::{RawEventRecord, RECURRING_MARKER};

/// Forward horizon for recurring rules, in months.
const HORIZON_MONTHS: u32 = 12;

/// Italian weekday names, Sunday first to match `num_days_from_sunday`.
const DAY_NAMES: [&str; 7] = [
    "domenica",
    "lunedì",
    "martedì",
    "mercoledì",
    "giovedì",
    "venerdì",
    "sabato",
];

const DAY_NAMES_SHORT: [&str; 7] = ["dom", "lun", "mar", "mer", "gio", "ven", "sab"];

// The sheet stores "°" but Google Sheets sometimes exports it as "^".
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[°^]").expect("valid ordinal regex"));

/// Expand one record into `(start, end)` spans within 12 months of
/// `reference`. Malformed text never errors; the offending branch just
/// produces nothing.
#[must_use]
pub fn expand_record(record: &RawEventRecord, reference: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut spans = Vec::new();

    expand_recurrence(&record.recurrence, reference, &mut spans);
    expand_explicit(&record.start_text, &record.end_text, reference, &mut spans);

    spans
}

/// Weekday index (Sunday = 0) mentioned in the rule text, full names
/// first, then the 3-letter abbreviations.
fn find_weekday(text: &str) -> Option<u32> {
    for (index, name) in DAY_NAMES.iter().enumerate() {
        if text.contains(name) {
            return u32::try_from(index).ok();
        }
    }
    for (index, name) in DAY_NAMES_SHORT.iter().enumerate() {
        if text.contains(name) {
            return u32::try_from(index).ok();
        }
    }
    None
}

/// All ordinal markers in the rule text ("2° e 4°" -> [2, 4]),
/// deduplicated and sorted. Only 1..=5 make sense within a month.
fn find_ordinals(text: &str) -> Vec<u32> {
    let mut ordinals: Vec<u32> = ORDINAL_RE
        .captures_iter(text)
        .filter_map(|capture| capture.get(1)?.as_str().parse::<u32>().ok())
        .filter(|number| (1..=5).contains(number))
        .collect();
    ordinals.sort_unstable();
    ordinals.dedup();
    ordinals
}

fn expand_recurrence(
    recurrence: &str,
    reference: NaiveDate,
    spans: &mut Vec<(NaiveDate, NaiveDate)>,
) {
    let text = recurrence.trim().to_lowercase();
    if text.is_empty() {
        return;
    }

    let Some(target_day) = find_weekday(&text) else {
        return;
    };
    let ordinals = find_ordinals(&text);

    for offset in 0..HORIZON_MONTHS {
        let month0 = reference.month0() + offset;
        let year = reference.year() + i32::try_from(month0 / 12).unwrap_or(0);
        let month = month0 % 12 + 1;

        // Every date of the target weekday in this month, ascending.
        let matches: Vec<NaiveDate> = (1..=31)
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .filter(|date| date.weekday().num_days_from_sunday() == target_day)
            .collect();

        if ordinals.is_empty() {
            for date in &matches {
                if *date >= reference {
                    spans.push((*date, *date));
                }
            }
        } else {
            for ordinal in &ordinals {
                // 1-based position; a month with no 5th Saturday just
                // skips it rather than rolling over.
                let Some(date) = matches.get(*ordinal as usize - 1) else {
                    continue;
                };
                if *date >= reference {
                    spans.push((*date, *date));
                }
            }
        }
    }
}

/// `(day, month, explicit year)` from `DD/MM[/YYYY]` text.
fn parse_date_text(text: &str) -> Option<(u32, u32, Option<i32>)> {
    let mut parts = text.trim().split('/');
    let day = parts.next()?.trim().parse().ok()?;
    let month = parts.next()?.trim().parse().ok()?;
    let year = match parts.next() {
        Some(segment) => Some(segment.trim().parse().ok()?),
        None => None,
    };
    Some((day, month, year))
}

fn expand_explicit(
    start_text: &str,
    end_text: &str,
    reference: NaiveDate,
    spans: &mut Vec<(NaiveDate, NaiveDate)>,
) {
    let start_text = start_text.trim();
    if start_text.is_empty() || start_text == RECURRING_MARKER {
        return;
    }

    let Some((start_day, start_month, start_year)) = parse_date_text(start_text) else {
        return;
    };
    let start_year = start_year.unwrap_or_else(|| reference.year());
    let Some(start) = NaiveDate::from_ymd_opt(start_year, start_month, start_day) else {
        return;
    };

    // End defaults to the start's components, including its year.
    let end = match parse_date_text(end_text) {
        Some((end_day, end_month, end_year)) => {
            let end_year = end_year.unwrap_or(start_year);
            match NaiveDate::from_ymd_opt(end_year, end_month, end_day) {
                Some(date) => date,
                None => return,
            }
        }
        None => start,
    };

    if end >= reference {
        spans.push((start, end));
    }
}
