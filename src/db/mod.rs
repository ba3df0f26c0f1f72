pub mod fixture_queries;
pub mod fixture_store;
pub mod memory;

pub use fixture_queries::PgFixtureStore;
pub use fixture_store::{ConflictQuery, Constraint, FixtureStore, FixtureTx, Selection, StoreError};
pub use memory::{MemoryFixtureStore, MemoryState};
