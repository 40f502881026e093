//! Product read and write paths.
//!
//! `CatalogService` composes a [`RowStore`] with the pure domain rules from
//! `catalogql-products`:
//!
//! ```text
//! create: validate → begin → insert product → insert variants (input order) → commit
//! update: validate → begin → lock product → update present columns
//!                  → [read variants → plan reconciliation → update stock / insert] → commit
//!                  → re-read committed product
//! ```
//!
//! Any statement failure inside a write rolls the whole transaction back and
//! surfaces as [`CatalogError::Transaction`]. Validation happens before a
//! transaction is opened, so bad input never holds a connection.

use std::collections::HashMap;

use tracing::{debug, error, info, instrument, warn};

use catalogql_core::{ProductId, VariantId};
use catalogql_products::{reconcile, Product, ProductDraft, ProductPatch, Variant};

use crate::store::{RowStore, RowTx};

mod error;

pub use error::CatalogError;

/// Read/write paths over an injected row store.
#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S> CatalogService<S>
where
    S: RowStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Point lookup by wire id (decimal string).
    #[instrument(skip(self), err)]
    pub async fn get_product(&self, id: &str) -> Result<Product, CatalogError> {
        let id: ProductId = id.parse()?;
        self.load_product(id).await
    }

    /// Point lookup by typed id, with the product's variants attached.
    pub async fn load_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let row = self
            .store
            .find_product(id)
            .await
            .map_err(|e| CatalogError::store("find_product", e))?
            .ok_or(CatalogError::NotFound)?;

        let variants = self
            .store
            .variants_for(&[id])
            .await
            .map_err(|e| CatalogError::store("variants_for", e))?;

        Ok(row.into_product(variants))
    }

    /// All products with exactly this category, each with its variants.
    ///
    /// Variants for the whole page are fetched with one statement.
    #[instrument(skip(self), err)]
    pub async fn list_products(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        let rows = self
            .store
            .list_products(category)
            .await
            .map_err(|e| CatalogError::store("list_products", e))?;
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<ProductId> = rows.iter().map(|r| r.id).collect();
        let variants = self
            .store
            .variants_for(&ids)
            .await
            .map_err(|e| CatalogError::store("variants_for", e))?;

        let mut by_product: HashMap<ProductId, Vec<Variant>> = HashMap::new();
        for v in variants {
            by_product.entry(v.product_id).or_default().push(v);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let variants = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(variants)
            })
            .collect())
    }

    /// Create a product and its initial variants atomically.
    #[instrument(skip(self, draft), fields(variants = draft.inventory.len()), err)]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<ProductId, CatalogError> {
        draft.validate()?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| CatalogError::transaction("begin", e))?;

        match write_draft(&mut tx, &draft).await {
            Ok(id) => {
                tx.commit()
                    .await
                    .map_err(|e| CatalogError::transaction("commit", e))?;
                info!(product_id = %id, variants = draft.inventory.len(), "product created");
                Ok(id)
            }
            Err(e) => {
                error!(error = %e, "create_product failed; rolling back");
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, "rollback failed; connection discarded");
                }
                Err(e)
            }
        }
    }

    /// Apply a partial update and reconcile inventory atomically, then return
    /// the product as committed.
    #[instrument(skip(self, patch), fields(product_id = %patch.id), err)]
    pub async fn update_product(&self, patch: ProductPatch) -> Result<Product, CatalogError> {
        patch.validate()?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| CatalogError::transaction("begin", e))?;

        match apply_patch(&mut tx, &patch).await {
            Ok(()) => {
                tx.commit()
                    .await
                    .map_err(|e| CatalogError::transaction("commit", e))?;
            }
            Err(e) => {
                if !matches!(e, CatalogError::NotFound) {
                    error!(error = %e, "update_product failed; rolling back");
                }
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, "rollback failed; connection discarded");
                }
                return Err(e);
            }
        }

        self.load_product(patch.id).await
    }
}

async fn write_draft<T: RowTx>(tx: &mut T, draft: &ProductDraft) -> Result<ProductId, CatalogError> {
    let id = tx
        .insert_product(&draft.attributes)
        .await
        .map_err(|e| CatalogError::transaction("insert_product", e))?;

    for entry in &draft.inventory {
        tx.insert_variant(id, entry)
            .await
            .map_err(|e| CatalogError::transaction("insert_variant", e))?;
    }
    Ok(id)
}

async fn apply_patch<T: RowTx>(tx: &mut T, patch: &ProductPatch) -> Result<(), CatalogError> {
    let exists = tx
        .lock_product(patch.id)
        .await
        .map_err(|e| CatalogError::transaction("lock_product", e))?;
    if !exists {
        return Err(CatalogError::NotFound);
    }

    if patch.has_scalar_changes() {
        tx.update_product(patch.id, &patch.changes)
            .await
            .map_err(|e| CatalogError::transaction("update_product", e))?;
    }

    let Some(submitted) = &patch.inventory else {
        return Ok(());
    };

    let existing = tx
        .variants_for_update(patch.id)
        .await
        .map_err(|e| CatalogError::transaction("variants_for_update", e))?;
    let plan = reconcile::plan(&existing, submitted);
    debug!(
        existing = existing.len(),
        updates = plan.updates.len(),
        inserts = plan.inserts.len(),
        "inventory reconciliation planned"
    );

    for update in &plan.updates {
        set_stock(tx, update.variant_id, update.stock).await?;
    }
    for entry in &plan.inserts {
        tx.insert_variant(patch.id, entry)
            .await
            .map_err(|e| CatalogError::transaction("insert_variant", e))?;
    }
    Ok(())
}

async fn set_stock<T: RowTx>(tx: &mut T, id: VariantId, stock: i32) -> Result<(), CatalogError> {
    tx.update_variant_stock(id, stock)
        .await
        .map_err(|e| CatalogError::transaction("update_variant_stock", e))
}
