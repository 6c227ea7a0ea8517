//! Class store implementations for classbatch.

pub mod admission;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use admission::{AdmissionStore, Measurement, StudentRecord};
pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
