//! Products domain module.
//!
//! This crate contains the catalog's business rules (attribute validation, the
//! inventory text codec, inventory reconciliation), implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod inventory;
pub mod product;
pub mod reconcile;
pub mod variant;

pub use inventory::{parse_inventory, render_inventory, render_inventory_summary};
pub use product::{FieldValue, Product, ProductAttributes, ProductColumn, ProductDraft, ProductPatch};
pub use reconcile::{ReconcilePlan, StockUpdate};
pub use variant::{InventoryEntry, Variant, VariantKey};
