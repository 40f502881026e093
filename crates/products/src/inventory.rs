//! Inventory text codec.
//!
//! On the wire an inventory is a string holding a JSON list of
//! `{color_id, size, stock}` objects. Clients historically send it with
//! single quotes (`[{'color_id': 1, 'size': 'M', 'stock': 5}]`), so decoding
//! tries strict JSON first and then retries with every `'` replaced by `"`.
//! A consequence of the lenient form: a single-quoted payload cannot carry an
//! apostrophe inside a value. Strict JSON has no such limit.

use serde::{Deserialize, Serialize};

use catalogql_core::{ColorId, DomainError, DomainResult};

use crate::variant::{InventoryEntry, Variant};

/// Integer that may arrive as a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LenientInt {
    Int(i64),
    Text(String),
}

impl LenientInt {
    fn resolve(self, field: &str, index: usize) -> DomainResult<i64> {
        match self {
            LenientInt::Int(v) => Ok(v),
            LenientInt::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                DomainError::validation(format!("inventory[{index}].{field}: {s:?} is not an integer"))
            }),
        }
    }
}

/// Size labels are usually text, but numeric sizes (`38`) are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LenientText {
    Text(String),
    Int(i64),
}

impl LenientText {
    fn resolve(self) -> String {
        match self {
            LenientText::Text(s) => s,
            LenientText::Int(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    color_id: LenientInt,
    size: LenientText,
    stock: LenientInt,
}

impl WireEntry {
    fn into_entry(self, index: usize) -> DomainResult<InventoryEntry> {
        let color_id = self.color_id.resolve("color_id", index)?;
        let stock = self.stock.resolve("stock", index)?;
        let stock = i32::try_from(stock).map_err(|_| {
            DomainError::validation(format!("inventory[{index}].stock: {stock} is out of range"))
        })?;

        let entry = InventoryEntry {
            color_id: ColorId::new(color_id),
            size: self.size.resolve(),
            stock,
        };
        entry.validate()?;
        Ok(entry)
    }
}

/// Decode an inventory string into validated entries, preserving order.
///
/// Blank input decodes to an empty list.
pub fn parse_inventory(text: &str) -> DomainResult<Vec<InventoryEntry>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let wire: Vec<WireEntry> = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(strict) => {
            let normalized = text.replace('\'', "\"");
            serde_json::from_str(&normalized).map_err(|_| {
                DomainError::validation(format!(
                    "inventory must be a JSON list of {{color_id, size, stock}}: {strict}"
                ))
            })?
        }
    };

    wire.into_iter()
        .enumerate()
        .map(|(index, w)| w.into_entry(index))
        .collect()
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    color_id: ColorId,
    size: &'a str,
    stock: i32,
}

/// Full variant rows: `[{id, product_id, color_id, size, stock}]`.
pub fn render_inventory(variants: &[Variant]) -> String {
    // Plain structs of integers and strings always serialize.
    serde_json::to_string(variants).unwrap_or_else(|_| String::from("[]"))
}

/// Key and stock only: `[{color_id, size, stock}]`.
pub fn render_inventory_summary(variants: &[Variant]) -> String {
    let rows: Vec<SummaryRow<'_>> = variants
        .iter()
        .map(|v| SummaryRow {
            color_id: v.color_id,
            size: &v.size,
            stock: v.stock,
        })
        .collect();
    serde_json::to_string(&rows).unwrap_or_else(|_| String::from("[]"))
}
