//! Documents - Typed entities staged through a batch repository.
//!
//! ## Example
//!
//! ```ignore
//! use docbatch::Document;
//!
//! #[derive(Serialize, Deserialize, Default)]
//! #[serde(rename_all = "camelCase")]
//! struct Band {
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     pub id: Option<String>,
//!     pub name: String,
//!     pub formation_year: u32,
//! }
//!
//! impl Document for Band {
//!     fn id(&self) -> Option<&str> { self.id.as_deref() }
//!     fn set_id(&mut self, id: String) { self.id = Some(id); }
//! }
//! ```

use serde::Serialize;

/// Trait for entities that can be stored as documents.
///
/// The entity serializes to a JSON object; its storage location and rules
/// live in the [`SchemaRegistry`](crate::SchemaRegistry), not on the type.
pub trait Document: Serialize + 'static {
    /// The entity's identity, if it has one yet.
    fn id(&self) -> Option<&str>;

    /// Assign an identity. Called with a generated id when `create` sees
    /// an entity without one.
    fn set_id(&mut self, id: String);

    /// The id when present and non-empty.
    fn existing_id(&self) -> Option<&str> {
        self.id().filter(|id| !id.is_empty())
    }
}
