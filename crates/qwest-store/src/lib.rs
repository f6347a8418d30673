//! qwest-store: snapshot persistence and store backends.
//!
//! Turns live sessions into versioned snapshots and back, validating
//! every snapshot before it becomes a live session again. Ships an
//! in-memory backend for tests and a filesystem backend for the CLI.

pub mod config;
pub mod fs;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use config::QwestConfig;
pub use fs::FileStore;
pub use memory::MemoryStore;
pub use snapshot::{SessionSnapshot, SCHEMA_VERSION};
pub use store::{BankRegistry, SessionStore, SessionSummary};
