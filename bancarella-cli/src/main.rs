//! Command line companion for the Ventimiglia Friday market: prints the
//! upcoming events, the ranked parking list, and the weather snapshot.

#![allow(
    clippy::print_stdout,
    reason = "printing the report is this binary's whole job"
)]

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use reqwest::Client;
use tracing::warn;

use bancarella_core::{
    aggregate::ParkingAggregator,
    model::Parking,
    ports::ParkingSourcePort,
    service::MarketService,
};
use bancarella_provider_overpass::OverpassParkingSource;
use bancarella_provider_places::PlacesParkingSource;
use bancarella_provider_sheets::SheetsEventSource;
use bancarella_provider_weather::WeatherProvider;

const UPCOMING_LIMIT: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // HTTP + service setup
    let client = Client::builder().user_agent("bancarella/0.1").build()?;

    let mut parking_sources: Vec<Arc<dyn ParkingSourcePort>> =
        vec![Arc::new(OverpassParkingSource::new(client.clone()))];
    match PlacesParkingSource::from_env(client.clone()) {
        Ok(places) => parking_sources.push(Arc::new(places)),
        Err(error) => warn!(%error, "places source disabled"),
    }

    let service = MarketService::new(
        Arc::new(SheetsEventSource::new(client.clone())),
        ParkingAggregator::new(parking_sources),
    );
    let weather = WeatherProvider::from_env(client);

    let now = Local::now().naive_local();
    let today = now.date();

    println!("Bancarella — mercato di Ventimiglia, {today}");
    println!();

    let upcoming = service.upcoming_events(today, UPCOMING_LIMIT).await?;
    println!("Prossimi eventi:");
    if upcoming.is_empty() {
        println!("  (nessun evento in programma)");
    }
    for event in &upcoming {
        let when = if event.start == event.end {
            event.start.to_string()
        } else {
            format!("{} → {}", event.start, event.end)
        };
        let time = if event.all_day {
            String::from("tutto il giorno")
        } else {
            event.time_text.clone()
        };
        println!("  {when}  {title}  ({time})", title = event.title);
        if !event.location.is_empty() {
            println!("      {}", event.location);
        }
    }
    println!();

    let report = service.parking_report(now).await;
    println!("Parcheggi ({} trovati):", report.parkings.len());
    for parking in &report.parkings {
        println!("  {}", format_parking(parking));
    }
    for warning in &report.warnings {
        println!("  ! {warning}");
    }
    println!();

    let weather = weather.report(now).await;
    println!(
        "Meteo: {condition}, {temperature}°C, umidità {humidity}%, vento {wind} km/h [{source}]",
        condition = weather.current.condition,
        temperature = weather.current.temperature,
        humidity = weather.current.humidity,
        wind = weather.current.wind_speed,
        source = weather.source,
    );

    Ok(())
}

fn format_parking(parking: &Parking) -> String {
    format!(
        "{name} — {distance:.0} m, {fee}, {free}/{total} posti liberi",
        name = parking.name,
        distance = parking.distance,
        fee = parking.fee,
        free = parking.available_spots,
        total = parking.total_spots,
    )
}
