use serde::{Deserialize, Serialize};

use catalogql_core::{DomainError, DomainResult, Entity, ProductId};

use crate::inventory;
use crate::variant::{InventoryEntry, Variant};

/// The ten scalar columns of a product row.
///
/// Every attribute is nullable. In a [`ProductPatch`] a `None` means "leave
/// unchanged"; in a [`ProductDraft`] it means the column is stored as NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttributes {
    pub category: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i32>,
    pub texture: Option<String>,
    pub wash: Option<String>,
    pub place: Option<String>,
    pub note: Option<String>,
    pub story: Option<String>,
    pub main_image: Option<String>,
}

/// Column names of the `product` table (excluding the id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductColumn {
    Category,
    Title,
    Description,
    Price,
    Texture,
    Wash,
    Place,
    Note,
    Story,
    MainImage,
}

impl ProductColumn {
    pub const ALL: [ProductColumn; 10] = [
        ProductColumn::Category,
        ProductColumn::Title,
        ProductColumn::Description,
        ProductColumn::Price,
        ProductColumn::Texture,
        ProductColumn::Wash,
        ProductColumn::Place,
        ProductColumn::Note,
        ProductColumn::Story,
        ProductColumn::MainImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductColumn::Category => "category",
            ProductColumn::Title => "title",
            ProductColumn::Description => "description",
            ProductColumn::Price => "price",
            ProductColumn::Texture => "texture",
            ProductColumn::Wash => "wash",
            ProductColumn::Place => "place",
            ProductColumn::Note => "note",
            ProductColumn::Story => "story",
            ProductColumn::MainImage => "main_image",
        }
    }
}

/// A value bound to one column of an update statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Int(i32),
}

impl ProductAttributes {
    /// Present attributes as `(column, value)` pairs, in [`ProductColumn::ALL`] order.
    pub fn assignments(&self) -> Vec<(ProductColumn, FieldValue)> {
        let mut out = Vec::new();
        for column in ProductColumn::ALL {
            let value = match column {
                ProductColumn::Price => self.price.map(FieldValue::Int),
                _ => self.text(column).map(|s| FieldValue::Text(s.to_string())),
            };
            if let Some(value) = value {
                out.push((column, value));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// Text value of a string column (`None` for `price` and for absent values).
    pub fn text(&self, column: ProductColumn) -> Option<&str> {
        let value = match column {
            ProductColumn::Category => &self.category,
            ProductColumn::Title => &self.title,
            ProductColumn::Description => &self.description,
            ProductColumn::Price => return None,
            ProductColumn::Texture => &self.texture,
            ProductColumn::Wash => &self.wash,
            ProductColumn::Place => &self.place,
            ProductColumn::Note => &self.note,
            ProductColumn::Story => &self.story,
            ProductColumn::MainImage => &self.main_image,
        };
        value.as_deref()
    }

    /// Overwrite the columns present in `changes`; absent columns keep their value.
    pub fn merge(&mut self, changes: &ProductAttributes) {
        for (column, value) in changes.assignments() {
            match (column, value) {
                (ProductColumn::Price, FieldValue::Int(price)) => self.price = Some(price),
                (column, FieldValue::Text(text)) => {
                    if let Some(slot) = self.text_slot(column) {
                        *slot = Some(text);
                    }
                }
                (_, FieldValue::Int(_)) => {}
            }
        }
    }

    fn text_slot(&mut self, column: ProductColumn) -> Option<&mut Option<String>> {
        let slot = match column {
            ProductColumn::Category => &mut self.category,
            ProductColumn::Title => &mut self.title,
            ProductColumn::Description => &mut self.description,
            ProductColumn::Texture => &mut self.texture,
            ProductColumn::Wash => &mut self.wash,
            ProductColumn::Place => &mut self.place,
            ProductColumn::Note => &mut self.note,
            ProductColumn::Story => &mut self.story,
            ProductColumn::MainImage => &mut self.main_image,
            ProductColumn::Price => return None,
        };
        Some(slot)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let Some(price) = self.price {
            if price < 0 {
                return Err(DomainError::validation(format!(
                    "price must be non-negative, got {price}"
                )));
            }
        }
        Ok(())
    }
}

/// A product row enriched with its variant rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub attributes: ProductAttributes,
    pub variants: Vec<Variant>,
}

impl Product {
    /// Inventory as embedded in a point lookup: full variant rows.
    pub fn inventory_json(&self) -> String {
        inventory::render_inventory(&self.variants)
    }

    /// Inventory as embedded in a category listing: `{color_id, size, stock}` only.
    pub fn inventory_summary_json(&self) -> String {
        inventory::render_inventory_summary(&self.variants)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input of the create operation: attributes plus the initial inventory, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub attributes: ProductAttributes,
    pub inventory: Vec<InventoryEntry>,
}

impl ProductDraft {
    pub fn validate(&self) -> DomainResult<()> {
        self.attributes.validate()?;
        for entry in &self.inventory {
            entry.validate()?;
        }
        Ok(())
    }
}

/// Input of the update operation.
///
/// Only the attributes present in `changes` are written. When `inventory` is
/// present it is reconciled against the product's current variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPatch {
    pub id: ProductId,
    pub changes: ProductAttributes,
    pub inventory: Option<Vec<InventoryEntry>>,
}

impl ProductPatch {
    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            changes: ProductAttributes::default(),
            inventory: None,
        }
    }

    pub fn with_changes(mut self, changes: ProductAttributes) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_inventory(mut self, inventory: Vec<InventoryEntry>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn assignments(&self) -> Vec<(ProductColumn, FieldValue)> {
        self.changes.assignments()
    }

    pub fn has_scalar_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.changes.validate()?;
        if let Some(inventory) = &self.inventory {
            for entry in inventory {
                entry.validate()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_attributes() -> ProductAttributes {
        ProductAttributes {
            category: Some("women".to_string()),
            title: Some("Linen shirt".to_string()),
            description: Some("Lightweight".to_string()),
            price: Some(799),
            texture: Some("linen".to_string()),
            wash: Some("hand wash".to_string()),
            place: Some("Portugal".to_string()),
            note: None,
            story: Some("Woven slowly".to_string()),
            main_image: Some("shirt.jpg".to_string()),
        }
    }

    #[test]
    fn assignments_only_list_present_fields_in_column_order() {
        let changes = ProductAttributes {
            main_image: Some("new.jpg".to_string()),
            price: Some(100),
            ..ProductAttributes::default()
        };

        let got = changes.assignments();
        assert_eq!(
            got,
            vec![
                (ProductColumn::Price, FieldValue::Int(100)),
                (ProductColumn::MainImage, FieldValue::Text("new.jpg".to_string())),
            ]
        );
    }

    #[test]
    fn empty_patch_has_no_scalar_changes() {
        let patch = ProductPatch::new(ProductId::new(1));
        assert!(!patch.has_scalar_changes());
        assert!(patch.assignments().is_empty());
    }

    #[test]
    fn merge_changes_only_present_columns() {
        let mut attrs = sample_attributes();
        let before = attrs.clone();

        attrs.merge(&ProductAttributes {
            price: Some(999),
            ..ProductAttributes::default()
        });

        assert_eq!(attrs.price, Some(999));
        assert_eq!(attrs.title, before.title);
        assert_eq!(attrs.category, before.category);
        assert_eq!(attrs.main_image, before.main_image);
        assert_eq!(attrs.note, None);
    }

    #[test]
    fn merge_writes_every_text_column() {
        let mut attrs = ProductAttributes::default();
        attrs.merge(&sample_attributes());
        assert_eq!(attrs, sample_attributes());
    }

    #[test]
    fn negative_price_is_rejected() {
        let attrs = ProductAttributes {
            price: Some(-5),
            ..ProductAttributes::default()
        };
        assert!(matches!(attrs.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn draft_validation_covers_inventory() {
        let draft = ProductDraft {
            attributes: sample_attributes(),
            inventory: vec![InventoryEntry::new(1, "M", 2), InventoryEntry::new(2, "L", -1)],
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn column_names_match_table() {
        let names: Vec<_> = ProductColumn::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "category",
                "title",
                "description",
                "price",
                "texture",
                "wash",
                "place",
                "note",
                "story",
                "main_image"
            ]
        );
    }
}
