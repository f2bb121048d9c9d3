//! BatchRepository - Typed staging of one document type into a batch unit.

use std::any::type_name;
use std::marker::PhantomData;

use serde_json::{Map, Value};
use tracing::debug;

use super::id::generate_id;
use super::operation::{OperationKind, PendingValidation};
use super::unit::BatchUnit;
use crate::document::Document;
use crate::error::BatchError;
use crate::schema::{CollectionSchema, SchemaRegistry};
use crate::store::DocumentStore;

/// Options for write operations.
#[derive(Debug, Clone, Copy)]
pub struct WriteOpts {
    /// Whether to register the entity for validation (when the registry
    /// has validation enabled).
    pub validate: bool,
}

impl Default for WriteOpts {
    fn default() -> Self {
        Self { validate: true }
    }
}

impl WriteOpts {
    /// Create options that exempt the entity from validation.
    pub fn skip_validation() -> Self {
        Self { validate: false }
    }
}

/// Typed repository that stages writes for `T` into a shared [`BatchUnit`].
///
/// Nothing here performs I/O: writes become visible only after the unit's
/// `commit`. Several repositories (one per document type) may share a unit.
pub struct BatchRepository<'u, T, S: DocumentStore> {
    unit: &'u BatchUnit<S>,
    schema: CollectionSchema,
    validate: bool,
    _marker: PhantomData<fn(&T)>,
}

impl<'u, T: Document, S: DocumentStore> BatchRepository<'u, T, S> {
    pub fn new(unit: &'u BatchUnit<S>, registry: &SchemaRegistry) -> Result<Self, BatchError> {
        let schema = registry
            .schema_for::<T>()
            .cloned()
            .ok_or(BatchError::UnregisteredType(type_name::<T>()))?;

        Ok(Self {
            unit,
            schema,
            validate: registry.validate_models(),
            _marker: PhantomData,
        })
    }

    /// The unit this repository stages into.
    pub fn unit(&self) -> &'u BatchUnit<S> {
        self.unit
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Stage a create. An entity without an id gets a generated one,
    /// assigned to it only once the create is staged.
    pub fn create(&self, entity: &mut T) -> Result<(), BatchError> {
        self.create_with(entity, WriteOpts::default())
    }

    pub fn create_with(&self, entity: &mut T, opts: WriteOpts) -> Result<(), BatchError> {
        let (id, generated) = match entity.existing_id() {
            Some(id) => (id.to_string(), false),
            None => (generate_id(), true),
        };

        self.stage(OperationKind::Create, entity, &id, opts.validate)?;

        if generated {
            debug!(entity = type_name::<T>(), id = %id, "generated document id");
            entity.set_id(id);
        }
        Ok(())
    }

    /// Stage an update of an entity that already has an id.
    pub fn update(&self, entity: &T) -> Result<(), BatchError> {
        self.update_with(entity, WriteOpts::default())
    }

    pub fn update_with(&self, entity: &T, opts: WriteOpts) -> Result<(), BatchError> {
        let id = self.require_id(entity, OperationKind::Update)?;
        self.stage(OperationKind::Update, entity, &id, opts.validate)
    }

    /// Stage a delete. Deletes are never validated.
    pub fn delete(&self, entity: &T) -> Result<(), BatchError> {
        let id = self.require_id(entity, OperationKind::Delete)?;
        self.stage(OperationKind::Delete, entity, &id, false)
    }

    fn require_id(&self, entity: &T, kind: OperationKind) -> Result<String, BatchError> {
        entity.existing_id().map(str::to_string).ok_or_else(|| {
            BatchError::InvalidArgument(format!(
                "cannot {} {} without an id",
                kind,
                type_name::<T>()
            ))
        })
    }

    fn stage(
        &self,
        kind: OperationKind,
        entity: &T,
        id: &str,
        validate: bool,
    ) -> Result<(), BatchError> {
        let data = self.serialize(entity, id)?;
        let validation = (validate && self.validate).then(|| PendingValidation {
            path: self.schema.path().to_string(),
            id: id.to_string(),
            data: data.clone(),
            rules: self.schema.shared_rules(),
        });

        self.unit
            .stage(kind, self.schema.path(), id, Value::Object(data), validation)
    }

    /// Storage representation: the entity's fields plus the id field.
    fn serialize(&self, entity: &T, id: &str) -> Result<Map<String, Value>, BatchError> {
        match serde_json::to_value(entity)? {
            Value::Object(mut fields) => {
                fields.insert(
                    self.schema.id_field().to_string(),
                    Value::String(id.to_string()),
                );
                Ok(fields)
            }
            other => Err(BatchError::InvalidArgument(format!(
                "{} must serialize to an object, got {}",
                type_name::<T>(),
                kind_of(&other)
            ))),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
