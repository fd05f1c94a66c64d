//! Entity store contract and the in-memory reference backend.

mod memory;
mod traits;

pub use memory::InMemoryEntityStore;
pub use traits::{EntityStore, StorageError};
