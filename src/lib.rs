pub mod clock;
pub mod inconsistency;
pub mod io;
pub mod store;

pub use clock::{ProductionClock, SimulatedClock, StoreClock, Timestamp};
pub use inconsistency::{
    ConfigError, InconsistencyConfig, InconsistencyStats, InconsistentObjectStore,
};
pub use io::{ProductionRng, Rng, SimulatedRng};
pub use store::{InMemoryObjectStore, ObjectStore, StoreError, StoreResult};
