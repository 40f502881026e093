use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use catalogql_core::ProductId;
use catalogql_infra::store::schema::ensure_schema;
use catalogql_infra::{AppConfig, CatalogError, CatalogService, InMemoryRowStore, PgRowStore, StoreError};
use catalogql_products::{Product, ProductDraft, ProductPatch};

type InMemoryCatalog = CatalogService<Arc<InMemoryRowStore>>;

type PostgresCatalog = CatalogService<PgRowStore>;

/// The catalog, wired to whichever row store the process booted with.
#[derive(Debug, Clone)]
pub enum AppServices {
    InMemory(InMemoryCatalog),
    Postgres(PostgresCatalog),
}

#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to connect to the database: {0}")]
    Connect(#[source] StoreError),

    #[error("failed to ensure the catalog schema: {0}")]
    Schema(#[source] StoreError),
}

/// Pick the row store from configuration: Postgres when a database URL is
/// configured, otherwise an in-memory store.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, BootError> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set; using the in-memory row store (data is lost on exit)");
        return Ok(build_in_memory_services());
    };

    let store = PgRowStore::connect(url, config.max_connections, config.statement_timeout)
        .await
        .map_err(BootError::Connect)?;

    if config.auto_migrate {
        ensure_schema(store.pool()).await.map_err(BootError::Schema)?;
    }

    info!(
        max_connections = config.max_connections,
        statement_timeout_ms = config.statement_timeout.as_millis() as u64,
        "using the Postgres row store"
    );
    Ok(AppServices::Postgres(CatalogService::new(store)))
}

pub fn build_in_memory_services() -> AppServices {
    AppServices::InMemory(CatalogService::new(Arc::new(InMemoryRowStore::new())))
}

impl AppServices {
    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory(_) => "in-memory",
            AppServices::Postgres(_) => "postgres",
        }
    }

    pub async fn get_product(&self, id: &str) -> Result<Product, CatalogError> {
        match self {
            AppServices::InMemory(catalog) => catalog.get_product(id).await,
            AppServices::Postgres(catalog) => catalog.get_product(id).await,
        }
    }

    pub async fn list_products(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        match self {
            AppServices::InMemory(catalog) => catalog.list_products(category).await,
            AppServices::Postgres(catalog) => catalog.list_products(category).await,
        }
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<ProductId, CatalogError> {
        match self {
            AppServices::InMemory(catalog) => catalog.create_product(draft).await,
            AppServices::Postgres(catalog) => catalog.create_product(draft).await,
        }
    }

    pub async fn update_product(&self, patch: ProductPatch) -> Result<Product, CatalogError> {
        match self {
            AppServices::InMemory(catalog) => catalog.update_product(patch).await,
            AppServices::Postgres(catalog) => catalog.update_product(patch).await,
        }
    }
}
