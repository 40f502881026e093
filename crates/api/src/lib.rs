//! GraphQL API: schema, HTTP routing, and service wiring.

pub mod app;
