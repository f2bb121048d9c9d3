//! Process-wide settings shared by every repository built from a registry.

use serde::{Deserialize, Serialize};

/// Settings applied to every batch repository built from the same
/// [`SchemaRegistry`](crate::SchemaRegistry).
///
/// ```ignore
/// let config: OrmConfig = serde_json::from_str(r#"{ "validateModels": true }"#)?;
/// let registry = SchemaRegistry::new(config);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrmConfig {
    /// Run declared field rules on created/updated entities at commit time.
    pub validate_models: bool,
}

impl OrmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable deferred model validation.
    pub fn with_validate_models(mut self, enabled: bool) -> Self {
        self.validate_models = enabled;
        self
    }
}
