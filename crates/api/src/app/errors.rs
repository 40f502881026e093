use async_graphql::{Error, ErrorExtensions};
use tracing::error;

use catalogql_infra::CatalogError;

pub const NOT_FOUND: &str = "NOT_FOUND";
pub const BAD_USER_INPUT: &str = "BAD_USER_INPUT";
pub const TRANSACTION_FAILED: &str = "TRANSACTION_FAILED";
pub const INTERNAL: &str = "INTERNAL";

/// Map a catalog failure onto a GraphQL error carrying `extensions.code`.
///
/// Store details stay in the logs; clients only see the failed operation.
pub fn catalog_error(err: CatalogError) -> Error {
    match err {
        CatalogError::NotFound => coded(NOT_FOUND, "product not found"),
        CatalogError::Validation(msg) => coded(BAD_USER_INPUT, msg),
        CatalogError::Transaction { operation, source } => {
            error!(operation, error = %source, "write rolled back");
            coded(TRANSACTION_FAILED, "the write was rolled back").extend_with(|_, ext| {
                ext.set("operation", operation);
            })
        }
        CatalogError::Store { operation, source } => {
            error!(operation, error = %source, "read failed");
            coded(INTERNAL, "the catalog could not be read")
        }
    }
}

pub fn coded(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message.into()).extend_with(|_, ext| ext.set("code", code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalogql_infra::StoreError;

    fn code_of(err: &Error) -> Option<String> {
        let ext = err.extensions.as_ref()?;
        match ext.get("code")? {
            async_graphql::Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    #[test]
    fn each_failure_kind_has_its_own_code() {
        assert_eq!(code_of(&catalog_error(CatalogError::NotFound)).as_deref(), Some(NOT_FOUND));
        assert_eq!(
            code_of(&catalog_error(CatalogError::Validation("bad".into()))).as_deref(),
            Some(BAD_USER_INPUT)
        );
        assert_eq!(
            code_of(&catalog_error(CatalogError::Transaction {
                operation: "insert_variant",
                source: StoreError::Injected("boom".into()),
            }))
            .as_deref(),
            Some(TRANSACTION_FAILED)
        );
    }

    #[test]
    fn transaction_errors_hide_store_details() {
        let err = catalog_error(CatalogError::Transaction {
            operation: "commit",
            source: StoreError::database("commit", "password=hunter2"),
        });
        assert!(!err.message.contains("hunter2"));
    }
}
