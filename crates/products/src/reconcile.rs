//! Inventory reconciliation.
//!
//! Merges a submitted inventory list into a product's existing variant rows:
//! a submitted entry whose (color_id, size) matches an existing row updates that
//! row's stock; an entry with no match becomes a new row. Existing rows absent
//! from the submission are left untouched (variants are never deleted).
//!
//! Planning is pure; the write path executes the plan inside one transaction.

use std::collections::HashMap;

use catalogql_core::VariantId;

use crate::variant::{InventoryEntry, Variant, VariantKey};

/// Set the stock of an existing variant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockUpdate {
    pub variant_id: VariantId,
    pub stock: i32,
}

/// Statements needed to bring the variant rows in line with a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub updates: Vec<StockUpdate>,
    pub inserts: Vec<InventoryEntry>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }
}

/// Plan the reconciliation of `submitted` against `existing`.
///
/// - Matching is a linear scan of `existing` in order; the first row with the
///   same key wins.
/// - No match means insert, including when `existing` is empty.
/// - A key repeated within `submitted` is planned once, with its last stock
///   value, at the position of its first occurrence.
pub fn plan(existing: &[Variant], submitted: &[InventoryEntry]) -> ReconcilePlan {
    let mut order: Vec<VariantKey> = Vec::with_capacity(submitted.len());
    let mut latest: HashMap<VariantKey, i32> = HashMap::with_capacity(submitted.len());

    for entry in submitted {
        let key = entry.key();
        if latest.insert(key.clone(), entry.stock).is_none() {
            order.push(key);
        }
    }

    let mut out = ReconcilePlan::default();
    for key in order {
        let stock = latest[&key];
        match existing.iter().find(|row| row.key() == key) {
            Some(row) => out.updates.push(StockUpdate {
                variant_id: row.id,
                stock,
            }),
            None => out.inserts.push(InventoryEntry {
                color_id: key.color_id,
                size: key.size,
                stock,
            }),
        }
    }
    out
}
