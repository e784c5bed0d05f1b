mod api;
pub mod backend;
mod store;

pub use api::{StorageBackend, Table};
pub use store::{ProtectionStore, StoreError};
