//! Row store gateway.
//!
//! The read and write paths talk to the `product` and `variant` tables only
//! through these traits, so the same service code runs against Postgres in
//! production and against [`InMemoryRowStore`] in tests.
//!
//! ## Transactions
//!
//! [`RowStore::begin`] opens a READ COMMITTED transaction. Its statements run
//! strictly in call order and become visible to other readers only after
//! [`RowTx::commit`]. Dropping a transaction without committing rolls it back
//! and releases its connection, so every exit path (including `?` and panics)
//! returns the connection to the pool.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use catalogql_core::{ProductId, VariantId};
use catalogql_products::{InventoryEntry, Product, ProductAttributes, Variant};

pub mod in_memory;
pub mod postgres;
pub mod schema;

pub use in_memory::InMemoryRowStore;
pub use postgres::PgRowStore;

/// A `product` row without its variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub id: ProductId,
    pub attributes: ProductAttributes,
}

impl ProductRow {
    pub fn into_product(self, variants: Vec<Variant>) -> Product {
        Product {
            id: self.id,
            attributes: self.attributes,
            variants,
        }
    }
}

/// Row store operation error.
///
/// These are **infrastructure errors** (statement failures, timeouts, pool
/// exhaustion) as opposed to domain errors (validation, lookups).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found in {0}")]
    NotFound(String),

    #[error("database error in {operation}: {message}")]
    Database { operation: String, message: String },

    #[error("statement timed out in {0}")]
    Timeout(String),

    #[error("row store unavailable: {0}")]
    Unavailable(String),

    /// Failure injected by a test double.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl StoreError {
    pub fn database(operation: &str, message: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Read access plus transaction demarcation over the catalog tables.
#[async_trait]
pub trait RowStore: Send + Sync {
    type Tx: RowTx;

    /// Point lookup of one product row.
    async fn find_product(&self, id: ProductId) -> Result<Option<ProductRow>, StoreError>;

    /// Product rows with exactly this category, ordered by id.
    async fn list_products(&self, category: &str) -> Result<Vec<ProductRow>, StoreError>;

    /// Variant rows of all given products in one statement, ordered by
    /// `(product_id, id)`.
    async fn variants_for(&self, product_ids: &[ProductId]) -> Result<Vec<Variant>, StoreError>;

    /// Open a READ COMMITTED transaction.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// Statements the write path issues inside one transaction.
#[async_trait]
pub trait RowTx: Send {
    async fn insert_product(&mut self, attributes: &ProductAttributes) -> Result<ProductId, StoreError>;

    /// Lock a product row for the rest of the transaction. Returns `false` if
    /// the row does not exist.
    async fn lock_product(&mut self, id: ProductId) -> Result<bool, StoreError>;

    /// Write the attributes present in `changes` with a single statement.
    /// A no-op when nothing is present.
    async fn update_product(&mut self, id: ProductId, changes: &ProductAttributes) -> Result<(), StoreError>;

    /// Current variant rows of a product as seen by this transaction, ordered by id.
    async fn variants_for_update(&mut self, product_id: ProductId) -> Result<Vec<Variant>, StoreError>;

    async fn insert_variant(
        &mut self,
        product_id: ProductId,
        entry: &InventoryEntry,
    ) -> Result<VariantId, StoreError>;

    async fn update_variant_stock(&mut self, id: VariantId, stock: i32) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> RowStore for Arc<S>
where
    S: RowStore + ?Sized,
{
    type Tx = S::Tx;

    async fn find_product(&self, id: ProductId) -> Result<Option<ProductRow>, StoreError> {
        (**self).find_product(id).await
    }

    async fn list_products(&self, category: &str) -> Result<Vec<ProductRow>, StoreError> {
        (**self).list_products(category).await
    }

    async fn variants_for(&self, product_ids: &[ProductId]) -> Result<Vec<Variant>, StoreError> {
        (**self).variants_for(product_ids).await
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }
}
