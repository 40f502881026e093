use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use catalogql_core::{ProductId, VariantId};
use catalogql_products::{InventoryEntry, ProductAttributes, Variant};

use super::{ProductRow, RowStore, RowTx, StoreError};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, ProductAttributes>,
    variants: BTreeMap<VariantId, Variant>,
}

impl Tables {
    fn apply(&mut self, op: &Op) {
        match op {
            Op::InsertProduct { id, attributes } => {
                self.products.insert(*id, attributes.clone());
            }
            Op::UpdateProduct { id, changes } => {
                if let Some(attrs) = self.products.get_mut(id) {
                    attrs.merge(changes);
                }
            }
            Op::InsertVariant(variant) => {
                self.variants.insert(variant.id, variant.clone());
            }
            Op::UpdateStock { id, stock } => {
                if let Some(v) = self.variants.get_mut(id) {
                    v.stock = *stock;
                }
            }
        }
    }

    fn variants_of(&self, product_id: ProductId) -> Vec<Variant> {
        self.variants
            .values()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect()
    }
}

/// A staged write, applied to the shared tables on commit.
#[derive(Debug, Clone)]
enum Op {
    InsertProduct { id: ProductId, attributes: ProductAttributes },
    UpdateProduct { id: ProductId, changes: ProductAttributes },
    InsertVariant(Variant),
    UpdateStock { id: VariantId, stock: i32 },
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<Tables>,
    next_product: AtomicI64,
    next_variant: AtomicI64,
    variant_fault: Mutex<Option<usize>>,
    row_locks: Mutex<HashMap<ProductId, Arc<RowLock<()>>>>,
}

/// In-memory row store.
///
/// Intended for tests/dev. Not optimized for performance.
///
/// Ids come from counters that are consumed even when a transaction rolls
/// back, like database sequences. A transaction stages its writes in a journal;
/// reads inside it see the committed tables plus its own staged writes, and
/// commit applies the journal atomically under one write lock.
///
/// `lock_product` takes a per-product async lock that is held until the
/// transaction ends, mirroring `SELECT ... FOR UPDATE`.
#[derive(Debug, Clone)]
pub struct InMemoryRowStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                next_product: AtomicI64::new(1),
                next_variant: AtomicI64::new(1),
                variant_fault: Mutex::new(None),
                row_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Make every transaction begun from now on fail its `(n + 1)`-th variant
    /// insert. `None` clears the fault.
    pub fn fail_variant_inserts_after(&self, n: Option<usize>) {
        if let Ok(mut fault) = self.shared.variant_fault.lock() {
            *fault = n;
        }
    }

    fn row_lock(&self, id: ProductId) -> Result<Arc<RowLock<()>>, StoreError> {
        let mut locks = self
            .shared
            .row_locks
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(locks.entry(id).or_default().clone())
    }

    fn committed(&self) -> Result<Tables, StoreError> {
        self.shared
            .tables
            .read()
            .map(|t| t.clone())
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    type Tx = InMemoryTx;

    async fn find_product(&self, id: ProductId) -> Result<Option<ProductRow>, StoreError> {
        let tables = self
            .shared
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(tables.products.get(&id).map(|attributes| ProductRow {
            id,
            attributes: attributes.clone(),
        }))
    }

    async fn list_products(&self, category: &str) -> Result<Vec<ProductRow>, StoreError> {
        let tables = self
            .shared
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(tables
            .products
            .iter()
            .filter(|(_, attrs)| attrs.category.as_deref() == Some(category))
            .map(|(id, attrs)| ProductRow {
                id: *id,
                attributes: attrs.clone(),
            })
            .collect())
    }

    async fn variants_for(&self, product_ids: &[ProductId]) -> Result<Vec<Variant>, StoreError> {
        let tables = self
            .shared
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let mut rows: Vec<Variant> = tables
            .variants
            .values()
            .filter(|v| product_ids.contains(&v.product_id))
            .cloned()
            .collect();
        rows.sort_by_key(|v| (v.product_id, v.id));
        Ok(rows)
    }

    async fn begin(&self) -> Result<InMemoryTx, StoreError> {
        let fault = self
            .shared
            .variant_fault
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(InMemoryTx {
            store: self.clone(),
            journal: Vec::new(),
            variant_inserts: 0,
            fail_variant_inserts_after: *fault,
            held: HashMap::new(),
        })
    }
}

/// Transaction over [`InMemoryRowStore`]. Dropping it discards staged writes.
#[derive(Debug)]
pub struct InMemoryTx {
    store: InMemoryRowStore,
    journal: Vec<Op>,
    variant_inserts: usize,
    fail_variant_inserts_after: Option<usize>,
    held: HashMap<ProductId, OwnedMutexGuard<()>>,
}

impl InMemoryTx {
    /// Committed tables overlaid with this transaction's staged writes.
    fn view(&self) -> Result<Tables, StoreError> {
        let mut tables = self.store.committed()?;
        for op in &self.journal {
            tables.apply(op);
        }
        Ok(tables)
    }
}

#[async_trait]
impl RowTx for InMemoryTx {
    async fn insert_product(&mut self, attributes: &ProductAttributes) -> Result<ProductId, StoreError> {
        let id = ProductId::new(self.store.shared.next_product.fetch_add(1, Ordering::SeqCst));
        self.journal.push(Op::InsertProduct {
            id,
            attributes: attributes.clone(),
        });
        Ok(id)
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<bool, StoreError> {
        if !self.held.contains_key(&id) {
            let guard = self.store.row_lock(id)?.lock_owned().await;
            self.held.insert(id, guard);
        }
        Ok(self.view()?.products.contains_key(&id))
    }

    async fn update_product(&mut self, id: ProductId, changes: &ProductAttributes) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }
        if !self.view()?.products.contains_key(&id) {
            return Err(StoreError::NotFound(format!("update_product {id}")));
        }
        self.journal.push(Op::UpdateProduct {
            id,
            changes: changes.clone(),
        });
        Ok(())
    }

    async fn variants_for_update(&mut self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        Ok(self.view()?.variants_of(product_id))
    }

    async fn insert_variant(
        &mut self,
        product_id: ProductId,
        entry: &InventoryEntry,
    ) -> Result<VariantId, StoreError> {
        if let Some(limit) = self.fail_variant_inserts_after {
            if self.variant_inserts >= limit {
                return Err(StoreError::Injected(format!(
                    "variant insert #{} refused",
                    self.variant_inserts + 1
                )));
            }
        }
        if !self.view()?.products.contains_key(&product_id) {
            return Err(StoreError::database(
                "insert_variant",
                format!("product {product_id} does not exist (foreign key)"),
            ));
        }

        let id = VariantId::new(self.store.shared.next_variant.fetch_add(1, Ordering::SeqCst));
        self.journal.push(Op::InsertVariant(Variant {
            id,
            product_id,
            color_id: entry.color_id,
            size: entry.size.clone(),
            stock: entry.stock,
        }));
        self.variant_inserts += 1;
        Ok(id)
    }

    async fn update_variant_stock(&mut self, id: VariantId, stock: i32) -> Result<(), StoreError> {
        if !self.view()?.variants.contains_key(&id) {
            return Err(StoreError::NotFound(format!("update_variant_stock {id}")));
        }
        self.journal.push(Op::UpdateStock { id, stock });
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut tables = self
            .store
            .shared
            .tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        for op in &self.journal {
            tables.apply(op);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
