//! Schema - Where each document type is stored and which rules it must satisfy.
//!
//! Types are registered once at startup and the registry is passed by
//! reference to every batch repository.
//!
//! ## Example
//!
//! ```ignore
//! use docbatch::{CollectionSchema, Constraint, FieldRule, OrmConfig, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new(OrmConfig::new().with_validate_models(true))
//!     .with::<Band>(
//!         CollectionSchema::new("bands").rule(
//!             FieldRule::new("contactEmail", Constraint::Email)
//!                 .optional()
//!                 .with_message("Invalid email!"),
//!         ),
//!     );
//! ```

mod rule;
mod violation;

use std::any::{type_name, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::OrmConfig;
use crate::document::Document;

pub use rule::{Constraint, FieldRule};
pub use violation::{EntityViolation, FieldViolation, ValidationErrors};

/// Default name of the identity field in the storage representation.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Storage location and rules of one document type.
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    path: String,
    id_field: String,
    rules: Arc<Vec<FieldRule>>,
}

impl CollectionSchema {
    /// Schema for documents stored under `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            rules: Arc::new(Vec::new()),
        }
    }

    /// Store the identity under a field other than `"id"`.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Add a field rule.
    pub fn rule(mut self, rule: FieldRule) -> Self {
        Arc::make_mut(&mut self.rules).push(rule);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub(crate) fn shared_rules(&self) -> Arc<Vec<FieldRule>> {
        Arc::clone(&self.rules)
    }
}

/// Check a storage representation against a rule set, grouping failures
/// per field in rule declaration order.
pub fn check_document(rules: &[FieldRule], data: &Map<String, Value>) -> Vec<FieldViolation> {
    let mut fields: Vec<FieldViolation> = Vec::new();

    for rule in rules.iter().filter(|rule| !rule.check(data)) {
        let name = rule.constraint().name().to_string();
        match fields.iter_mut().find(|f| f.property == rule.property()) {
            Some(field) => {
                field.constraints.insert(name, rule.message());
            }
            None => fields.push(FieldViolation {
                property: rule.property().to_string(),
                constraints: BTreeMap::from([(name, rule.message())]),
            }),
        }
    }

    fields
}

/// Maps document types to their collection schema, plus shared settings.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    config: OrmConfig,
    schemas: HashMap<TypeId, CollectionSchema>,
}

impl SchemaRegistry {
    pub fn new(config: OrmConfig) -> Self {
        Self {
            config,
            schemas: HashMap::new(),
        }
    }

    /// Register the schema for `T`. Registering a type twice replaces its
    /// earlier schema.
    pub fn register<T: Document>(&mut self, schema: CollectionSchema) -> &mut Self {
        if let Some(previous) = self.schemas.insert(TypeId::of::<T>(), schema) {
            warn!(
                entity = type_name::<T>(),
                previous = previous.path(),
                "collection schema registered twice; keeping the latest"
            );
        }
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: Document>(mut self, schema: CollectionSchema) -> Self {
        self.register::<T>(schema);
        self
    }

    pub fn schema_for<T: Document>(&self) -> Option<&CollectionSchema> {
        self.schemas.get(&TypeId::of::<T>())
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    pub fn validate_models(&self) -> bool {
        self.config.validate_models
    }
}
