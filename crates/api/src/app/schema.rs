//! GraphQL schema for the product catalog.
//!
//! ```graphql
//! { product(id: "1") { id title price inventory variants { color_id size stock } } }
//! { products(category: "men") { id title inventory } }
//! mutation { createProduct(title: "Shirt", price: 1200, inventory: "[{\"color_id\":1,\"size\":\"M\",\"stock\":5}]") { id } }
//! mutation { updateProduct(id: "1", price: 999) { id price } }
//! ```
//!
//! Field and argument names keep their snake_case column spellings
//! (`main_image`, `color_id`).

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Object, Result, Schema, SimpleObject};

use catalogql_core::{DomainError, Entity, ProductId};
use catalogql_products::{
    parse_inventory, Product, ProductAttributes, ProductDraft, ProductPatch, Variant,
};

use crate::app::errors::catalog_error;
use crate::app::services::AppServices;

pub type CatalogSchema = Schema<Query, Mutation, EmptySubscription>;

pub fn build_schema(services: Arc<AppServices>) -> CatalogSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .data(services)
        .limit_depth(6)
        .finish()
}

fn services<'a>(ctx: &Context<'a>) -> Result<&'a Arc<AppServices>> {
    ctx.data::<Arc<AppServices>>()
}

/// How a product's `inventory` string is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InventoryShape {
    /// Full variant rows: `{id, product_id, color_id, size, stock}`.
    Rows,
    /// `{color_id, size, stock}` only.
    Summary,
}

pub struct ProductNode {
    product: Product,
    shape: InventoryShape,
}

#[Object(name = "Product", rename_fields = "snake_case")]
impl ProductNode {
    async fn id(&self) -> String {
        self.product.wire_id()
    }

    async fn category(&self) -> Option<&str> {
        self.product.attributes.category.as_deref()
    }

    async fn title(&self) -> Option<&str> {
        self.product.attributes.title.as_deref()
    }

    async fn description(&self) -> Option<&str> {
        self.product.attributes.description.as_deref()
    }

    async fn price(&self) -> Option<i32> {
        self.product.attributes.price
    }

    async fn texture(&self) -> Option<&str> {
        self.product.attributes.texture.as_deref()
    }

    async fn wash(&self) -> Option<&str> {
        self.product.attributes.wash.as_deref()
    }

    async fn place(&self) -> Option<&str> {
        self.product.attributes.place.as_deref()
    }

    async fn note(&self) -> Option<&str> {
        self.product.attributes.note.as_deref()
    }

    async fn story(&self) -> Option<&str> {
        self.product.attributes.story.as_deref()
    }

    async fn main_image(&self) -> Option<&str> {
        self.product.attributes.main_image.as_deref()
    }

    /// Inventory as a JSON-encoded array string.
    async fn inventory(&self) -> String {
        match self.shape {
            InventoryShape::Rows => self.product.inventory_json(),
            InventoryShape::Summary => self.product.inventory_summary_json(),
        }
    }

    async fn variants(&self) -> Vec<VariantNode> {
        self.product.variants.iter().cloned().map(VariantNode).collect()
    }
}

pub struct VariantNode(Variant);

#[Object(name = "Variant", rename_fields = "snake_case")]
impl VariantNode {
    async fn id(&self) -> String {
        self.0.wire_id()
    }

    async fn color_id(&self) -> i64 {
        self.0.color_id.get()
    }

    async fn size(&self) -> &str {
        &self.0.size
    }

    async fn stock(&self) -> i32 {
        self.0.stock
    }
}

/// Identifier of a newly created product.
#[derive(SimpleObject)]
pub struct ProductRef {
    pub id: String,
}

pub struct Query;

#[Object]
impl Query {
    /// One product with its full variant rows.
    async fn product(&self, ctx: &Context<'_>, id: String) -> Result<Option<ProductNode>> {
        let product = services(ctx)?.get_product(&id).await.map_err(catalog_error)?;
        Ok(Some(ProductNode {
            product,
            shape: InventoryShape::Rows,
        }))
    }

    /// Every product whose category equals `category` exactly.
    async fn products(&self, ctx: &Context<'_>, category: String) -> Result<Vec<ProductNode>> {
        let products = services(ctx)?
            .list_products(&category)
            .await
            .map_err(catalog_error)?;
        Ok(products
            .into_iter()
            .map(|product| ProductNode {
                product,
                shape: InventoryShape::Summary,
            })
            .collect())
    }
}

pub struct Mutation;

#[Object(rename_args = "snake_case")]
impl Mutation {
    /// Create a product and its variants in one transaction.
    #[allow(clippy::too_many_arguments)]
    async fn create_product(
        &self,
        ctx: &Context<'_>,
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
        #[graphql(desc = "JSON array of {color_id, size, stock}")] inventory: Option<String>,
    ) -> Result<ProductRef> {
        let inventory = match inventory {
            Some(text) => parse_inventory(&text).map_err(|e| catalog_error(e.into()))?,
            None => Vec::new(),
        };
        let draft = ProductDraft {
            attributes: ProductAttributes {
                category,
                title,
                description,
                price,
                texture,
                wash,
                place,
                note,
                story,
                main_image,
            },
            inventory,
        };

        let id = services(ctx)?
            .create_product(draft)
            .await
            .map_err(catalog_error)?;
        Ok(ProductRef { id: id.to_string() })
    }

    /// Update the given columns and reconcile inventory in one transaction.
    ///
    /// Omitted arguments leave their columns unchanged. Submitted inventory
    /// entries update matching `(color_id, size)` variants or add new ones;
    /// variants not mentioned are kept.
    #[allow(clippy::too_many_arguments)]
    async fn update_product(
        &self,
        ctx: &Context<'_>,
        id: String,
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
        #[graphql(desc = "JSON array of {color_id, size, stock}")] inventory: Option<String>,
    ) -> Result<Option<ProductNode>> {
        let id: ProductId = id.parse().map_err(|e: DomainError| catalog_error(e.into()))?;
        let mut patch = ProductPatch::new(id).with_changes(ProductAttributes {
            category,
            title,
            description,
            price,
            texture,
            wash,
            place,
            note,
            story,
            main_image,
        });
        if let Some(text) = inventory {
            let entries = parse_inventory(&text).map_err(|e| catalog_error(e.into()))?;
            patch = patch.with_inventory(entries);
        }

        let product = services(ctx)?
            .update_product(patch)
            .await
            .map_err(catalog_error)?;
        Ok(Some(ProductNode {
            product,
            shape: InventoryShape::Rows,
        }))
    }
}
