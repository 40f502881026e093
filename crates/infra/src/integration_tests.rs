//! Service-level tests for the catalog read and write paths.
//!
//! Tests: CatalogService → RowStore (in-memory) → CatalogService
//!
//! Verifies:
//! - Created products read back exactly as submitted
//! - Writes are all-or-nothing
//! - Partial updates touch only the columns given
//! - Inventory reconciliation updates in place and inserts new rows

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use catalogql_core::{ColorId, ProductId};
    use catalogql_products::{InventoryEntry, ProductAttributes, ProductDraft, ProductPatch};

    use crate::catalog::{CatalogError, CatalogService};
    use crate::store::{InMemoryRowStore, RowStore};

    fn setup() -> (CatalogService<Arc<InMemoryRowStore>>, Arc<InMemoryRowStore>) {
        let store = Arc::new(InMemoryRowStore::new());
        (CatalogService::new(store.clone()), store)
    }

    fn shirt(category: &str) -> ProductAttributes {
        ProductAttributes {
            category: Some(category.to_string()),
            title: Some("Linen shirt".to_string()),
            description: Some("Loose fit".to_string()),
            price: Some(1200),
            texture: Some("linen".to_string()),
            wash: Some("hand wash".to_string()),
            place: Some("Portugal".to_string()),
            note: None,
            story: Some("Woven on old looms".to_string()),
            main_image: Some("shirt.jpg".to_string()),
        }
    }

    fn draft(category: &str, inventory: Vec<InventoryEntry>) -> ProductDraft {
        ProductDraft {
            attributes: shirt(category),
            inventory,
        }
    }

    #[tokio::test]
    async fn created_product_reads_back_as_submitted() {
        let (catalog, _) = setup();
        let inventory = vec![InventoryEntry::new(1, "M", 5), InventoryEntry::new(2, "L", 0)];

        let id = catalog
            .create_product(draft("men", inventory.clone()))
            .await
            .unwrap();
        let product = catalog.get_product(&id.to_string()).await.unwrap();

        assert_eq!(product.id, id);
        assert_eq!(product.attributes, shirt("men"));
        let entries: Vec<_> = product.variants.iter().map(|v| v.entry()).collect();
        assert_eq!(entries, inventory);
        assert!(product.variants.iter().all(|v| v.product_id == id));
    }

    #[tokio::test]
    async fn failed_variant_insert_leaves_no_rows_behind() {
        let (catalog, store) = setup();
        store.fail_variant_inserts_after(Some(1));

        let err = catalog
            .create_product(draft(
                "women",
                vec![InventoryEntry::new(1, "S", 1), InventoryEntry::new(1, "M", 2)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Transaction {
                operation: "insert_variant",
                ..
            }
        ));
        assert!(catalog.list_products("women").await.unwrap().is_empty());
        assert!(store.find_product(ProductId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn price_only_update_keeps_other_columns() {
        let (catalog, _) = setup();
        let id = catalog
            .create_product(draft("men", vec![InventoryEntry::new(1, "M", 5)]))
            .await
            .unwrap();

        let patch = ProductPatch::new(id).with_changes(ProductAttributes {
            price: Some(999),
            ..Default::default()
        });
        let updated = catalog.update_product(patch).await.unwrap();

        let mut expected = shirt("men");
        expected.price = Some(999);
        assert_eq!(updated.attributes, expected);
        assert_eq!(updated.variants.len(), 1);
        assert_eq!(updated.variants[0].stock, 5);
    }

    #[tokio::test]
    async fn matching_inventory_updates_the_same_row() {
        let (catalog, _) = setup();
        let id = catalog
            .create_product(draft("men", vec![InventoryEntry::new(1, "M", 5)]))
            .await
            .unwrap();
        let before = catalog.load_product(id).await.unwrap();

        let patch = ProductPatch::new(id).with_inventory(vec![InventoryEntry::new(1, "M", 9)]);
        let after = catalog.update_product(patch).await.unwrap();

        assert_eq!(after.variants.len(), 1);
        assert_eq!(after.variants[0].id, before.variants[0].id);
        assert_eq!(after.variants[0].stock, 9);
    }

    #[tokio::test]
    async fn unmatched_inventory_adds_a_row_and_keeps_the_original() {
        let (catalog, _) = setup();
        let id = catalog
            .create_product(draft("men", vec![InventoryEntry::new(1, "M", 5)]))
            .await
            .unwrap();

        let patch = ProductPatch::new(id).with_inventory(vec![InventoryEntry::new(2, "M", 3)]);
        let after = catalog.update_product(patch).await.unwrap();

        let entries: Vec<_> = after.variants.iter().map(|v| v.entry()).collect();
        assert_eq!(
            entries,
            vec![InventoryEntry::new(1, "M", 5), InventoryEntry::new(2, "M", 3)]
        );
    }

    #[tokio::test]
    async fn inventory_update_on_product_without_variants_inserts_all() {
        let (catalog, _) = setup();
        let id = catalog.create_product(draft("kids", vec![])).await.unwrap();

        let submitted = vec![InventoryEntry::new(3, "S", 4), InventoryEntry::new(3, "M", 6)];
        let patch = ProductPatch::new(id).with_inventory(submitted.clone());
        let after = catalog.update_product(patch).await.unwrap();

        let entries: Vec<_> = after.variants.iter().map(|v| v.entry()).collect();
        assert_eq!(entries, submitted);
    }

    #[tokio::test]
    async fn repeating_an_inventory_update_is_idempotent() {
        let (catalog, _) = setup();
        let id = catalog
            .create_product(draft("men", vec![InventoryEntry::new(1, "M", 5)]))
            .await
            .unwrap();
        let submitted = vec![InventoryEntry::new(1, "M", 2), InventoryEntry::new(4, "XL", 8)];

        let once = catalog
            .update_product(ProductPatch::new(id).with_inventory(submitted.clone()))
            .await
            .unwrap();
        let twice = catalog
            .update_product(ProductPatch::new(id).with_inventory(submitted))
            .await
            .unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn failed_inventory_insert_rolls_back_column_changes() {
        let (catalog, store) = setup();
        let id = catalog
            .create_product(draft("men", vec![InventoryEntry::new(1, "M", 5)]))
            .await
            .unwrap();

        store.fail_variant_inserts_after(Some(0));
        let patch = ProductPatch::new(id)
            .with_changes(ProductAttributes {
                title: Some("Renamed".to_string()),
                ..Default::default()
            })
            .with_inventory(vec![InventoryEntry::new(1, "M", 1), InventoryEntry::new(7, "S", 1)]);
        let err = catalog.update_product(patch).await.unwrap_err();
        assert!(matches!(err, CatalogError::Transaction { .. }));

        store.fail_variant_inserts_after(None);
        let product = catalog.load_product(id).await.unwrap();
        assert_eq!(product.attributes.title.as_deref(), Some("Linen shirt"));
        assert_eq!(product.variants.len(), 1);
        assert_eq!(product.variants[0].stock, 5);
    }

    #[tokio::test]
    async fn list_filters_by_exact_category_with_variants() {
        let (catalog, _) = setup();
        let a = catalog
            .create_product(draft("men", vec![InventoryEntry::new(1, "M", 5)]))
            .await
            .unwrap();
        catalog
            .create_product(draft("women", vec![InventoryEntry::new(2, "S", 1)]))
            .await
            .unwrap();
        let b = catalog
            .create_product(draft("men", vec![InventoryEntry::new(3, "L", 2)]))
            .await
            .unwrap();

        let listed = catalog.list_products("men").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(listed[1].variants[0].color_id, ColorId::new(3));
        assert_eq!(
            listed[0].inventory_summary_json(),
            r#"[{"color_id":1,"size":"M","stock":5}]"#
        );

        assert!(catalog.list_products("Men").await.unwrap().is_empty());
        assert!(catalog.list_products("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids() {
        let (catalog, _) = setup();

        assert!(matches!(
            catalog.get_product("42").await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            catalog.get_product("abc").await,
            Err(CatalogError::Validation(_))
        ));

        let patch = ProductPatch::new(ProductId::new(42)).with_changes(ProductAttributes {
            price: Some(1),
            ..Default::default()
        });
        assert!(matches!(
            catalog.update_product(patch).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_write() {
        let (catalog, store) = setup();

        let err = catalog
            .create_product(draft("men", vec![InventoryEntry::new(1, "M", -1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(store.list_products("men").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn detail_inventory_carries_full_rows() {
        let (catalog, _) = setup();
        let id = catalog
            .create_product(draft("men", vec![InventoryEntry::new(1, "M", 5)]))
            .await
            .unwrap();
        let product = catalog.load_product(id).await.unwrap();
        let v = &product.variants[0];

        assert_eq!(
            product.inventory_json(),
            format!(
                r#"[{{"id":{},"product_id":{},"color_id":1,"size":"M","stock":5}}]"#,
                v.id, id
            )
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_never_duplicate_a_variant() {
        let (catalog, _) = setup();
        let id = catalog.create_product(draft("men", vec![])).await.unwrap();

        let mut handles = Vec::new();
        for stock in 0..8 {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(async move {
                let patch = ProductPatch::new(id)
                    .with_inventory(vec![InventoryEntry::new(1, "M", stock), InventoryEntry::new(2, "L", 1)]);
                catalog.update_product(patch).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let product = catalog.load_product(id).await.unwrap();
        let mut keys: Vec<_> = product.variants.iter().map(|v| v.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), product.variants.len());
        assert_eq!(product.variants.len(), 2);
    }
}
