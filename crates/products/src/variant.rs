use serde::{Deserialize, Serialize};

use catalogql_core::{ColorId, DomainError, DomainResult, Entity, ProductId, VariantId};

/// A (color, size) stock-keeping unit belonging to one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub color_id: ColorId,
    pub size: String,
    pub stock: i32,
}

impl Variant {
    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.color_id, &self.size)
    }

    /// The submitted-inventory view of this row (drops the row identity).
    pub fn entry(&self) -> InventoryEntry {
        InventoryEntry {
            color_id: self.color_id,
            size: self.size.clone(),
            stock: self.stock,
        }
    }
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> VariantId {
        self.id
    }
}

/// One element of a submitted inventory list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub color_id: ColorId,
    pub size: String,
    pub stock: i32,
}

impl InventoryEntry {
    pub fn new(color_id: i64, size: impl Into<String>, stock: i32) -> Self {
        Self {
            color_id: ColorId::new(color_id),
            size: size.into(),
            stock,
        }
    }

    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.color_id, &self.size)
    }

    /// Stock is a count and sizes are labels; neither may be degenerate.
    pub fn validate(&self) -> DomainResult<()> {
        if self.stock < 0 {
            return Err(DomainError::validation(format!(
                "stock must be non-negative (color_id {}, size {:?}, stock {})",
                self.color_id, self.size, self.stock
            )));
        }
        if self.size.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "size must not be empty (color_id {})",
                self.color_id
            )));
        }
        Ok(())
    }
}

/// Natural deduplication key of a variant: at most one row per product per key.
///
/// Sizes compare exactly (no case folding or trimming).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    pub color_id: ColorId,
    pub size: String,
}

impl VariantKey {
    pub fn new(color_id: ColorId, size: &str) -> Self {
        Self {
            color_id,
            size: size.to_string(),
        }
    }
}
