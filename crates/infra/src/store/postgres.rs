//! Postgres-backed row store.
//!
//! Every statement is parameterized; values never reach SQL text.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (query canceled) | `57014` | `Timeout` (statement_timeout fired) |
//! | Database (other) | any | `Database` |
//! | PoolTimedOut / PoolClosed | N/A | `Unavailable` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Database` |

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{instrument, Span};

use catalogql_core::{ColorId, ProductId, VariantId};
use catalogql_products::{FieldValue, InventoryEntry, ProductAttributes, Variant};

use super::{ProductRow, RowStore, RowTx, StoreError};

const PRODUCT_COLUMNS: &str =
    "id, category, title, description, price, texture, wash, place, note, story, main_image";

/// Postgres-backed row store over the `product` and `variant` tables.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
///
/// ## Transactions
///
/// `begin()` checks out one pooled connection and pins it to the returned
/// [`PgRowTx`]. The connection goes back to the pool when the transaction is
/// committed, rolled back, or dropped (SQLx rolls back on drop).
#[derive(Debug, Clone)]
pub struct PgRowStore {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgRowStore {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    /// Open a connection pool and wrap it.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        statement_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(statement_timeout)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, statement_timeout))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RowStore for PgRowStore {
    type Tx = PgRowTx;

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn find_product(&self, id: ProductId) -> Result<Option<ProductRow>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product", e))?;

        row.map(|r| ProductRecord::from_row(&r).map(ProductRow::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_product", e))
    }

    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn list_products(&self, category: &str) -> Result<Vec<ProductRow>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE category = $1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        Span::current().record("row_count", rows.len());
        rows.iter()
            .map(|r| ProductRecord::from_row(r).map(ProductRow::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_product", e))
    }

    #[instrument(skip(self, product_ids), fields(products = product_ids.len()), err)]
    async fn variants_for(&self, product_ids: &[ProductId]) -> Result<Vec<Variant>, StoreError> {
        if product_ids.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<i64> = product_ids.iter().map(|id| id.get()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, product_id, color_id, size, stock
            FROM variant
            WHERE product_id = ANY($1)
            ORDER BY product_id ASC, id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("variants_for", e))?;

        decode_variants(&rows)
    }

    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<PgRowTx, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_isolation", e))?;

        // SET cannot take bind parameters; set_config is the parameterized form.
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(format!("{}ms", self.statement_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_statement_timeout", e))?;

        Ok(PgRowTx { tx })
    }
}

/// One READ COMMITTED transaction on a pinned pooled connection.
pub struct PgRowTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RowTx for PgRowTx {
    async fn insert_product(&mut self, attributes: &ProductAttributes) -> Result<ProductId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO product (
                category,
                title,
                description,
                price,
                texture,
                wash,
                place,
                note,
                story,
                main_image
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&attributes.category)
        .bind(&attributes.title)
        .bind(&attributes.description)
        .bind(attributes.price)
        .bind(&attributes.texture)
        .bind(&attributes.wash)
        .bind(&attributes.place)
        .bind(&attributes.note)
        .bind(&attributes.story)
        .bind(&attributes.main_image)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(ProductId::new(id))
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT id FROM product WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        Ok(row.is_some())
    }

    async fn update_product(&mut self, id: ProductId, changes: &ProductAttributes) -> Result<(), StoreError> {
        let Some(mut builder) = update_statement(id, changes) else {
            return Ok(());
        };

        let result = builder
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("update_product {id}")));
        }
        Ok(())
    }

    async fn variants_for_update(&mut self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, color_id, size, stock
            FROM variant
            WHERE product_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(product_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("variants_for_update", e))?;

        decode_variants(&rows)
    }

    async fn insert_variant(
        &mut self,
        product_id: ProductId,
        entry: &InventoryEntry,
    ) -> Result<VariantId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO variant (product_id, color_id, size, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(product_id.get())
        .bind(entry.color_id.get())
        .bind(&entry.size)
        .bind(entry.stock)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_variant", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("insert_variant", e))?;
        Ok(VariantId::new(id))
    }

    async fn update_variant_stock(&mut self, id: VariantId, stock: i32) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE variant SET stock = $1 WHERE id = $2")
            .bind(stock)
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_variant_stock", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("update_variant_stock {id}")));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

/// Compile the present attributes into one `UPDATE product SET ... WHERE id = $n`.
///
/// Returns `None` when no attribute is present.
fn update_statement(id: ProductId, changes: &ProductAttributes) -> Option<QueryBuilder<'static, Postgres>> {
    let assignments = changes.assignments();
    if assignments.is_empty() {
        return None;
    }

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE product SET ");
    {
        let mut set = builder.separated(", ");
        for (column, value) in assignments {
            set.push(column.as_str());
            set.push_unseparated(" = ");
            match value {
                FieldValue::Text(text) => set.push_bind_unseparated(text),
                FieldValue::Int(n) => set.push_bind_unseparated(n),
            };
        }
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.get());
    Some(builder)
}

fn decode_variants(rows: &[PgRow]) -> Result<Vec<Variant>, StoreError> {
    rows.iter()
        .map(|r| VariantRecord::from_row(r).map(Variant::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("decode_variant", e))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} (code {:?})", db_err.message(), db_err.code());
            match db_err.code().as_deref() {
                // query_canceled: raised when statement_timeout fires
                Some("57014") => StoreError::Timeout(operation.to_string()),
                _ => StoreError::database(operation, msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(operation.to_string()),
        other => StoreError::database(operation, other.to_string()),
    }
}

// SQLx row types

#[derive(Debug)]
struct ProductRecord {
    id: i64,
    category: Option<String>,
    title: Option<String>,
    description: Option<String>,
    price: Option<i32>,
    texture: Option<String>,
    wash: Option<String>,
    place: Option<String>,
    note: Option<String>,
    story: Option<String>,
    main_image: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRecord {
            id: row.try_get("id")?,
            category: row.try_get("category")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            texture: row.try_get("texture")?,
            wash: row.try_get("wash")?,
            place: row.try_get("place")?,
            note: row.try_get("note")?,
            story: row.try_get("story")?,
            main_image: row.try_get("main_image")?,
        })
    }
}

impl From<ProductRecord> for ProductRow {
    fn from(r: ProductRecord) -> Self {
        ProductRow {
            id: ProductId::new(r.id),
            attributes: ProductAttributes {
                category: r.category,
                title: r.title,
                description: r.description,
                price: r.price,
                texture: r.texture,
                wash: r.wash,
                place: r.place,
                note: r.note,
                story: r.story,
                main_image: r.main_image,
            },
        }
    }
}

#[derive(Debug)]
struct VariantRecord {
    id: i64,
    product_id: i64,
    color_id: i64,
    size: String,
    stock: i32,
}

impl<'r> FromRow<'r, PgRow> for VariantRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(VariantRecord {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            color_id: row.try_get("color_id")?,
            size: row.try_get("size")?,
            stock: row.try_get("stock")?,
        })
    }
}

impl From<VariantRecord> for Variant {
    fn from(r: VariantRecord) -> Self {
        Variant {
            id: VariantId::new(r.id),
            product_id: ProductId::new(r.product_id),
            color_id: ColorId::new(r.color_id),
            size: r.size,
            stock: r.stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Execute;

    #[test]
    fn update_statement_binds_only_present_fields() {
        let changes = ProductAttributes {
            title: Some("New title".to_string()),
            price: Some(1200),
            ..ProductAttributes::default()
        };

        let mut builder = update_statement(ProductId::new(5), &changes).unwrap();
        let query = builder.build();
        assert_eq!(
            query.sql(),
            "UPDATE product SET title = $1, price = $2 WHERE id = $3"
        );
    }

    #[test]
    fn update_statement_is_skipped_without_changes() {
        assert!(update_statement(ProductId::new(5), &ProductAttributes::default()).is_none());
    }

    #[test]
    fn pool_and_lookup_failures_map_to_store_errors() {
        assert!(matches!(
            map_sqlx_error("find_product", sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(msg) if msg.contains("find_product")
        ));
        assert!(matches!(
            map_sqlx_error("begin", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("lock_product", sqlx::Error::RowNotFound),
            StoreError::NotFound(op) if op == "lock_product"
        ));
        assert!(matches!(
            map_sqlx_error("list_products", sqlx::Error::Protocol("bad frame".into())),
            StoreError::Database { operation, .. } if operation == "list_products"
        ));
    }

    #[test]
    fn missing_row_inside_a_write_surfaces_as_not_found() {
        let err = crate::catalog::CatalogError::transaction(
            "update_variant_stock",
            map_sqlx_error("update_variant_stock", sqlx::Error::RowNotFound),
        );
        assert!(matches!(err, crate::catalog::CatalogError::NotFound));
    }
}
