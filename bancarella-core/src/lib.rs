//! Core types and service wiring for the Bancarella market companion.

/// Parking source fan-out, filtering, deduplication, and ranking.
pub mod aggregate;
/// Event catalog builder combining the curated list with the sheet feed.
pub mod catalog;
/// Recurring-event date expansion.
pub mod expand;
/// Great-circle distance and the geographic bounds around the market.
pub mod geo;
/// Domain models shared by all providers.
pub mod model;
/// Traits describing the provider interfaces.
pub mod ports;
/// Traffic-based pricing and availability heuristics.
pub mod pricing;
/// High-level service facade used by clients.
pub mod service;
/// In-memory store backing the admin area.
pub mod store;

pub use aggregate::*;
pub use catalog::*;
pub use expand::*;
pub use geo::*;
pub use model::*;
pub use ports::*;
pub use pricing::*;
pub use service::*;
pub use store::*;
