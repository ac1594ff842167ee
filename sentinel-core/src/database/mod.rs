pub mod infrastructure;
pub mod ports;

#[cfg(feature = "database")]
pub mod postgres;

pub use infrastructure::memory::InMemoryHazardEventRepository;
#[cfg(feature = "database")]
pub use infrastructure::postgres::PostgresHazardEventRepository;
pub use ports::hazard_events::{BatchOp, HazardEventRepository, WriteBatch};
#[cfg(feature = "database")]
pub use postgres::{PoolSettings, PostgresDatabase};
