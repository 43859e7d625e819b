//! Infrastructure layer: persistence backends and catalog seeding.

pub mod seed;
pub mod store;


pub use store::{
    CatalogStore, DispatchStore, InMemoryStore, SqliteStore, StoreError, StoreResult,
};
