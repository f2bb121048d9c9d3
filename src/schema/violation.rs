//! Validation failures collected across every entity of a batch.

use std::collections::BTreeMap;
use std::fmt;

/// One field that failed one or more rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub property: String,
    /// Constraint name (e.g. `"isEmail"`) to message.
    pub constraints: BTreeMap<String, String>,
}

/// Every failing field of one staged entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityViolation {
    pub collection: String,
    pub id: String,
    pub fields: Vec<FieldViolation>,
}

impl EntityViolation {
    /// The failures of a single field, if it failed anything.
    pub fn field(&self, property: &str) -> Option<&FieldViolation> {
        self.fields.iter().find(|field| field.property == property)
    }

    /// All failed constraints of the entity, flattened across fields.
    pub fn constraints(&self) -> BTreeMap<&str, &str> {
        self.fields
            .iter()
            .flat_map(|field| field.constraints.iter())
            .map(|(name, message)| (name.as_str(), message.as_str()))
            .collect()
    }
}

/// Validation failures of every entity that failed, in staging order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entities: Vec<EntityViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: EntityViolation) {
        self.entities.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[EntityViolation] {
        &self.entities
    }

    /// The violation recorded for a given document, if it failed.
    pub fn for_document(&self, collection: &str, id: &str) -> Option<&EntityViolation> {
        self.entities
            .iter()
            .find(|entity| entity.collection == collection && entity.id == id)
    }
}

impl std::ops::Index<usize> for ValidationErrors {
    type Output = EntityViolation;

    fn index(&self, index: usize) -> &EntityViolation {
        &self.entities[index]
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for {} entities", self.entities.len())?;
        for entity in &self.entities {
            write!(f, "; {}/{}:", entity.collection, entity.id)?;
            for field in &entity.fields {
                let messages: Vec<&str> = field.constraints.values().map(String::as_str).collect();
                write!(f, " {} ({})", field.property, messages.join(", "))?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
