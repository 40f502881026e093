//! Entity trait: records whose identity is assigned by the row store.

/// A persisted record addressed by a server-generated identifier.
pub trait Entity {
    /// Strongly-typed identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Identifier as exposed on the wire (decimal string).
    fn wire_id(&self) -> String {
        self.id().to_string()
    }
}
