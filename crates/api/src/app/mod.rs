//! HTTP application wiring (axum router + GraphQL schema).
//!
//! - `services.rs`: row store selection and the catalog service
//! - `schema.rs`: GraphQL types, Query and Mutation
//! - `errors.rs`: catalog failures as coded GraphQL errors

use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::GraphQL;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tower::ServiceBuilder;

pub mod errors;
pub mod schema;
pub mod services;

pub const GRAPHQL_PATH: &str = "/graphql";

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let schema = schema::build_schema(services);

    Router::new()
        .route("/health", get(health))
        .route(GRAPHQL_PATH, get(graphiql).post_service(GraphQL::new(schema)))
        .layer(ServiceBuilder::new())
}

pub use services::AppServices;

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}
