//! PostgreSQL-backed repository implementations.

pub mod hazard_events;
