//! Infrastructure layer: row store gateway, read/write paths, configuration.

pub mod catalog;
pub mod config;
pub mod store;

mod integration_tests;

pub use catalog::{CatalogError, CatalogService};
pub use config::{AppConfig, ConfigError};
pub use store::{InMemoryRowStore, PgRowStore, ProductRow, RowStore, RowTx, StoreError};
