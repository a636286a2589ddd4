//! Builds the displayed occurrence list for the calendar widget.
//!
//! Two independent producers feed one sink: the curated list of official
//! municipal events (fixed dates, republished yearly) and the rows of the
//! published sheet. The curated occurrences always come first; downstream
//! consumers do their own display-time sorting and filtering.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::expand::expand_record;
use crate::model::{Occurrence, RawEventRecord, MUNICIPALITY, UNNAMED_EVENT};

/// All-day marker used by the curated list instead of a clock time.
const ALL_DAY_TEXT: &str = "Tutto il giorno";

struct CuratedEvent {
    title: &'static str,
    category: &'static str,
    date_text: &'static str,
    time_text: &'static str,
    location: &'static str,
    organizer: &'static str,
}

/// Official events published by the municipality. Single fixed dates,
/// `DD/MM`; the year rolls forward once the date has passed.
const CURATED_EVENTS: [CuratedEvent; 17] = [
    CuratedEvent {
        title: "Fiera di San Giuseppe",
        category: "Manifestazione",
        date_text: "17/03",
        time_text: "Tutto il giorno",
        location: "Centro storico Ventimiglia",
        organizer: "Comune di Ventimiglia",
    },
    CuratedEvent {
        title: "Teatro Comunale - Delirio a due",
        category: "Spettacolo",
        date_text: "03/03",
        time_text: "21:00",
        location: "Teatro Comunale Ventimiglia",
        organizer: "Teatro Comunale",
    },
    CuratedEvent {
        title: "Il Mago di Oz nel paese delle Meraviglie",
        category: "Spettacolo",
        date_text: "07/04",
        time_text: "16:00",
        location: "Teatro Comunale Ventimiglia",
        organizer: "Teatro Comunale",
    },
    CuratedEvent {
        title: "La Passione di Maria",
        category: "Manifestazione",
        date_text: "11/05",
        time_text: "21:00",
        location: "Centro Polivalente San Francesco - Ventimiglia Alta",
        organizer: "Giorgia Brusco",
    },
    CuratedEvent {
        title: "Concerto - Festeggiamo la mamma",
        category: "Concerto",
        date_text: "11/05",
        time_text: "21:00",
        location: "Teatro Comunale Ventimiglia",
        organizer: "Orchestra Filarmonica Giovanile Città di Ventimiglia",
    },
    CuratedEvent {
        title: "Amore, c'è un morto in salotto",
        category: "Spettacolo",
        date_text: "18/05",
        time_text: "21:00",
        location: "Teatro Comunale Ventimiglia",
        organizer: "Teatro Comunale",
    },
    CuratedEvent {
        title: "Conoscere e sapere - Storia, Arte, Racconti",
        category: "Manifestazione",
        date_text: "06/07",
        time_text: "21:00",
        location: "Ventimiglia",
        organizer: "Comune di Ventimiglia",
    },
    CuratedEvent {
        title: "Musica nei Castelli di Liguria - NAPO canta DE ANDRÈ",
        category: "Concerto",
        date_text: "10/07",
        time_text: "21:15",
        location: "Teatro Romano - Area Archeologica di Nervia",
        organizer: "Teatro Pubblico Ligure",
    },
    CuratedEvent {
        title: "Concerto \"Note di Mare\"",
        category: "Concerto",
        date_text: "11/07",
        time_text: "21:00",
        location: "Porto di Ventimiglia",
        organizer: "Comune di Ventimiglia",
    },
    CuratedEvent {
        title: "Festival \"albintimilium theatrum fest\"",
        category: "Spettacolo teatrale",
        date_text: "11/07",
        time_text: "21:00",
        location: "Teatro Romano di Ventimiglia",
        organizer: "Teatro Pubblico Ligure",
    },
    CuratedEvent {
        title: "Pasta & Basta Street Basket",
        category: "Manifestazione",
        date_text: "13/07",
        time_text: "Tutto il giorno",
        location: "Porto di Cala del Forte",
        organizer: "Comune di Ventimiglia",
    },
    CuratedEvent {
        title: "Melodie dal Piccolo Schermo",
        category: "Concerto",
        date_text: "18/07",
        time_text: "21:00",
        location: "Piazza della Cattedrale - Ventimiglia Alta",
        organizer: "Banda Musicale \"Città di Ventimiglia\"",
    },
    CuratedEvent {
        title: "Sulle orme del Corsaro Nero",
        category: "Manifestazione",
        date_text: "20/07",
        time_text: "17:00-24:00",
        location: "Centro storico di Ventimiglia",
        organizer: "Comune di Ventimiglia",
    },
    CuratedEvent {
        title: "Giovani Solisti in Concerto",
        category: "Concerto",
        date_text: "22/07",
        time_text: "21:00",
        location: "Chiostro di Sant'Agostino - Ventimiglia",
        organizer: "Giovane orchestra note libere",
    },
    CuratedEvent {
        title: "Massimo Wertmuller - IL VIAGGIO DI ENEA",
        category: "Spettacolo teatrale",
        date_text: "07/08",
        time_text: "21:00",
        location: "Teatro Romano di Ventimiglia",
        organizer: "Teatro Pubblico Ligure",
    },
    CuratedEvent {
        title: "Siamo tutti cittadini del mondo",
        category: "Conferenza",
        date_text: "04/10",
        time_text: "TBD",
        location: "Ventimiglia",
        organizer: "Comune di Ventimiglia",
    },
    CuratedEvent {
        title: "Gran Gala' dell'Operetta",
        category: "Spettacolo",
        date_text: "24/11",
        time_text: "17:30",
        location: "Teatro Comunale Ventimiglia",
        organizer: "Teatro Comunale",
    },
];

/// Composite occurrence id: record id plus the start's unix timestamp.
fn occurrence_id(record_id: &str, start: NaiveDate) -> String {
    let timestamp = start.and_time(NaiveTime::MIN).and_utc().timestamp();
    format!("{record_id}-{timestamp}")
}

/// Strip the sheet's sort-order hack: a leading run of `0` characters
/// with optional following whitespace ("00 Mercatino" -> "Mercatino").
fn clean_title(raw: &str) -> String {
    raw.trim_start_matches('0').trim().to_owned()
}

/// One occurrence per curated event. Dates already past the reference
/// roll forward one year, since the list is republished annually.
fn curated_occurrences(reference: NaiveDate) -> Vec<Occurrence> {
    let mut occurrences = Vec::with_capacity(CURATED_EVENTS.len());

    for (index, event) in CURATED_EVENTS.iter().enumerate() {
        let mut parts = event.date_text.split('/');
        let Some(day) = parts.next().and_then(|part| part.parse::<u32>().ok()) else {
            continue;
        };
        let Some(month) = parts.next().and_then(|part| part.parse::<u32>().ok()) else {
            continue;
        };

        let Some(mut start) = NaiveDate::from_ymd_opt(reference.year(), month, day) else {
            continue;
        };
        if start < reference {
            let Some(rolled) = NaiveDate::from_ymd_opt(reference.year() + 1, month, day) else {
                continue;
            };
            start = rolled;
        }

        let record_id = format!("ventimiglia-{index}");
        occurrences.push(Occurrence {
            id: occurrence_id(&record_id, start),
            municipality: MUNICIPALITY.to_owned(),
            title: event.title.to_owned(),
            category: event.category.to_owned(),
            location: event.location.to_owned(),
            organizer: event.organizer.to_owned(),
            time_text: event.time_text.to_owned(),
            start,
            end: start,
            all_day: event.time_text.is_empty() || event.time_text == ALL_DAY_TEXT,
        });
    }

    occurrences
}

/// Build the full displayed occurrence sequence: curated events first,
/// then every surviving sheet row expanded through [`expand_record`].
///
/// The output is insertion-ordered; "upcoming only" style views are a
/// display-time concern (see [`upcoming`]).
#[must_use]
pub fn build_catalog(records: &[RawEventRecord], reference: NaiveDate) -> Vec<Occurrence> {
    let mut occurrences = curated_occurrences(reference);

    for record in records {
        let municipality = record.municipality.trim();
        if municipality.is_empty() && record.title.trim().is_empty() {
            continue;
        }
        if !municipality.eq_ignore_ascii_case(MUNICIPALITY) {
            continue;
        }

        let mut title = clean_title(&record.title);
        if title.is_empty() {
            title = record.category.trim().to_owned();
        }
        if title.is_empty() {
            title = UNNAMED_EVENT.to_owned();
        }

        for (start, end) in expand_record(record, reference) {
            occurrences.push(Occurrence {
                id: occurrence_id(&record.id, start),
                municipality: MUNICIPALITY.to_owned(),
                title: title.clone(),
                category: record.category.clone(),
                location: record.location.clone(),
                organizer: record.organizer.clone(),
                time_text: record.time_text.clone(),
                start,
                end,
                all_day: record.time_text.trim().is_empty(),
            });
        }
    }

    occurrences
}

/// Display-time helper: occurrences starting on/after `today`, ascending
/// by start date, capped to `limit`.
#[must_use]
pub fn upcoming(occurrences: &[Occurrence], today: NaiveDate, limit: usize) -> Vec<Occurrence> {
    let mut future: Vec<Occurrence> = occurrences
        .iter()
        .filter(|occurrence| occurrence.start >= today)
        .cloned()
        .collect();
    future.sort_by_key(|occurrence| occurrence.start);
    future.truncate(limit);
    future
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn sheet_row(id: &str, municipality: &str, title: &str, start_text: &str) -> RawEventRecord {
        RawEventRecord {
            id: id.to_owned(),
            municipality: municipality.to_owned(),
            title: title.to_owned(),
            category: String::from("Mercato"),
            start_text: start_text.to_owned(),
            ..RawEventRecord::default()
        }
    }

    #[test]
    fn curated_events_come_first_and_roll_past_dates_forward() {
        let occurrences = build_catalog(&[], date(2024, 6, 1));
        assert_eq!(occurrences.len(), CURATED_EVENTS.len());

        let fiera = occurrences.first().expect("curated event");
        assert_eq!(fiera.title, "Fiera di San Giuseppe");
        // 17/03 has already passed on 2024-06-01.
        assert_eq!(fiera.start, date(2025, 3, 17));
        assert!(fiera.all_day);

        let operetta = occurrences.last().expect("curated event");
        assert_eq!(operetta.start, date(2024, 11, 24));
        assert!(!operetta.all_day);
    }

    #[test]
    fn uppercase_municipality_is_canonicalized_and_title_cleaned() {
        let row = sheet_row("event-0", "VENTIMIGLIA", "00 Mercatino", "15/03");
        let occurrences = build_catalog(&[row], date(2024, 1, 1));

        let mercatino = occurrences
            .iter()
            .find(|occurrence| occurrence.title == "Mercatino")
            .expect("sheet occurrence");
        assert_eq!(mercatino.municipality, "Ventimiglia");
        assert_eq!(mercatino.start, date(2024, 3, 15));
        assert_eq!(mercatino.end, date(2024, 3, 15));
        assert!(mercatino.all_day);
        assert!(mercatino.id.starts_with("event-0-"));
    }

    #[test]
    fn other_municipalities_never_reach_the_expander() {
        let row = sheet_row("event-1", "Bordighera", "Mercato settimanale", "15/03");
        let occurrences = build_catalog(&[row], date(2024, 1, 1));
        assert_eq!(occurrences.len(), CURATED_EVENTS.len());
    }

    #[test]
    fn empty_title_falls_back_to_category_then_placeholder() {
        let with_category = sheet_row("event-2", "Ventimiglia", "000", "15/03");
        let occurrences = build_catalog(&[with_category], date(2024, 1, 1));
        assert!(occurrences.iter().any(|occurrence| occurrence.title == "Mercato"));

        let mut bare = sheet_row("event-3", "Ventimiglia", "0 ", "15/03");
        bare.category = String::new();
        let occurrences = build_catalog(&[bare], date(2024, 1, 1));
        assert!(occurrences.iter().any(|occurrence| occurrence.title == UNNAMED_EVENT));
    }

    #[test]
    fn rebuilding_with_same_input_is_idempotent() {
        let rows = vec![
            sheet_row("event-0", "Ventimiglia", "00 Mercatino", "15/03"),
            {
                let mut row = sheet_row("event-1", "ventimiglia", "Antiquariato", "");
                row.recurrence = String::from("2° e 4° sabato");
                row
            },
        ];
        let reference = date(2024, 1, 1);

        let first = build_catalog(&rows, reference);
        let second = build_catalog(&rows, reference);

        let keys = |occurrences: &[Occurrence]| -> Vec<(String, NaiveDate, NaiveDate)> {
            occurrences
                .iter()
                .map(|occurrence| (occurrence.title.clone(), occurrence.start, occurrence.end))
                .collect()
        };
        assert_eq!(keys(&first), keys(&second));
    }

    #[test]
    fn upcoming_filters_sorts_and_caps() {
        let rows = vec![{
            let mut row = sheet_row("event-0", "Ventimiglia", "Mercato del venerdì", "");
            row.recurrence = String::from("venerdì");
            row
        }];
        let occurrences = build_catalog(&rows, date(2024, 1, 1));

        let next = upcoming(&occurrences, date(2024, 6, 1), 5);
        assert_eq!(next.len(), 5);
        let mut previous = date(2024, 6, 1);
        for occurrence in &next {
            assert!(occurrence.start >= previous);
            previous = occurrence.start;
        }
    }
}
