//! Repository ports. Adapters live under `database::infrastructure`.

pub mod hazard_events;
