// Library interface for testing

// Declare all modules
pub mod config;
pub mod constants;
pub mod converters;
pub mod db;
pub mod medicine;
pub mod queries;
pub mod repository;
pub mod schedule;
pub mod schema;
pub mod state;

// Re-export the expected database version for convenience
pub use constants::EXPECTED_DB_VERSION;
pub use db::{DynError, LiveQuery, MedicineDb, Subscription, SyncDb};
pub use medicine::Medicine;
pub use repository::MedicineRepository;
pub use schedule::Schedule;
pub use state::{MedicineListState, MedicineObserver};
