//! Traits describing provider capabilities and the shared error type.

use async_trait::async_trait;
use chrono::ParseError as ChronoParseError;
use reqwest::Error as ReqwestError;

use crate::model::{ParkingCandidate, RawEventRecord};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to provider backends.
///
/// The taxonomy matters to callers: [`PortError::MissingApiKey`] is a
/// deployment problem and must stay distinguishable from an upstream
/// failure that merely degrades to zero results.
pub enum PortError {
    /// Network layer failed (includes client-side timeouts).
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Failed to parse a date from a provider response.
    #[error("Date parse error: {0}")]
    Parse(#[from] ChronoParseError),
    /// Provider returned a body we could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Required API key is not configured.
    #[error("API key not configured: set {0}")]
    MissingApiKey(&'static str),
    /// Store operation addressed an unknown id.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Store operation is missing a required field.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Internal provider error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Source of raw event rows for the catalog builder.
///
/// A failing event source aborts the whole catalog build: partial
/// calendars are never shown.
pub trait EventSourcePort: Send + Sync {
    /// Fetch and parse every row the source currently publishes.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the feed cannot be fetched or parsed.
    async fn records(&self) -> Result<Vec<RawEventRecord>, PortError>;
}

#[async_trait]
/// Source of raw parking candidates for the aggregator.
///
/// Unlike event sources, a failing parking source degrades to a warning:
/// the aggregator keeps whatever the other sources returned.
pub trait ParkingSourcePort: Send + Sync {
    /// Short source label used in ids, logs, and warnings.
    fn source(&self) -> &'static str;

    /// Fetch raw candidates near the market.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider request fails, times
    /// out, or returns a malformed body.
    async fn candidates(&self) -> Result<Vec<ParkingCandidate>, PortError>;
}
