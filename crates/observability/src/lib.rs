//! Process-wide tracing setup for the catalog service.

/// Install the global subscriber.
///
/// Repeated calls are no-ops, so tests and the binary can both call it.
pub fn init() {
    tracing::init();
}

/// Subscriber construction (filter, formatter).
pub mod tracing;
