pub mod config_io;
pub mod database;
pub mod json_store;
pub mod lock;
pub mod paths;
pub mod store;
pub mod watcher;

pub use database::Database;
pub use json_store::JsonStore;
pub use store::{ExportBundle, MemoryStore, Store, StoreError};
