//! Table definitions for the catalog.
//!
//! `ensure_schema` is idempotent and runs at boot when auto-migration is
//! enabled. There is no unique constraint on `variant(product_id, color_id,
//! size)`: the write path keeps that key unique by locking the product row
//! before reconciling.

use sqlx::PgPool;
use tracing::info;

use super::StoreError;

pub const STATEMENTS: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS product (
        id          BIGSERIAL PRIMARY KEY,
        category    TEXT,
        title       TEXT,
        description TEXT,
        price       INTEGER,
        texture     TEXT,
        wash        TEXT,
        place       TEXT,
        note        TEXT,
        story       TEXT,
        main_image  TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS product_category_idx ON product (category)",
    r#"
    CREATE TABLE IF NOT EXISTS variant (
        id         BIGSERIAL PRIMARY KEY,
        product_id BIGINT  NOT NULL REFERENCES product (id),
        color_id   BIGINT  NOT NULL,
        size       TEXT    NOT NULL,
        stock      INTEGER NOT NULL CHECK (stock >= 0)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS variant_product_idx ON variant (product_id)",
];

/// Create the catalog tables and indexes if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StoreError::database("ensure_schema", e.to_string()))?;
    }
    info!(statements = STATEMENTS.len(), "catalog schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent() {
        for statement in STATEMENTS {
            assert!(statement.contains("IF NOT EXISTS"), "{statement}");
        }
    }

    #[test]
    fn variant_rows_reference_products_and_reject_negative_stock() {
        let variant = STATEMENTS[2];
        assert!(variant.contains("REFERENCES product (id)"));
        assert!(variant.contains("CHECK (stock >= 0)"));
    }
}
