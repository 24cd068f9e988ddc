//! Entity introspection.
//!
//! An introspector registers one object type per enabled entity type. The
//! engine does not discover entity types itself; [`StaticIntrospector`] takes
//! them from data, for example the `[[entity_types]]` tables of a project
//! file.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ComposeConfig;
use crate::Result;
use crate::error::ComposeError;
use crate::schema::{BuiltinScalar, FieldDescriptor, TypeRegistry};

/// Populates a registry from the enabled entity types.
pub trait EntityIntrospector: Send + Sync {
    /// Registers the types of every entity type enabled in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Introspection`] if an entity type cannot be
    /// described, or [`ComposeError::KindConflict`] if a type name is already
    /// registered as an interface.
    fn populate(
        &self,
        config: &ComposeConfig,
        registry: &mut TypeRegistry,
    ) -> Result<()>;
}

/// One field of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFieldDefinition {
    pub name: String,

    /// Type reference in SDL syntax, for example `[String!]`.
    #[serde(rename = "type")]
    pub ty: String,

    /// Storage name of the field. Fields without one are always exposed.
    #[serde(default)]
    pub machine_name: Option<String>,

    /// Value variant of the field.
    #[serde(default)]
    pub value: bool,

    #[serde(default)]
    pub description: String,
}

/// Shape of one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeDefinition {
    /// Configuration id, for example `node_article`.
    pub id: String,

    /// GraphQL type name, for example `NodeArticle`.
    pub type_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub interfaces: Vec<String>,

    #[serde(default)]
    pub fields: Vec<EntityFieldDefinition>,
}

/// Introspector over a fixed list of entity type definitions.
#[derive(Debug, Clone, Default)]
pub struct StaticIntrospector {
    definitions: Vec<EntityTypeDefinition>,
    /// Custom scalars fields may reference besides the built-in ones.
    scalars: BTreeSet<String>,
}

impl StaticIntrospector {
    pub fn new(definitions: Vec<EntityTypeDefinition>) -> Self {
        Self {
            definitions,
            scalars: BTreeSet::new(),
        }
    }

    /// Declares custom scalars that fields may reference.
    #[must_use]
    pub fn with_scalars<I, S>(mut self, scalars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scalars.extend(scalars.into_iter().map(Into::into));
        self
    }

    pub fn definitions(&self) -> &[EntityTypeDefinition] {
        &self.definitions
    }

    fn is_scalar(&self, type_name: &str) -> bool {
        BuiltinScalar::from_name(type_name).is_some() || self.scalars.contains(type_name)
    }

    fn describe_fields(
        &self,
        config: &ComposeConfig,
        registry: &TypeRegistry,
        definition: &EntityTypeDefinition,
    ) -> Result<Vec<FieldDescriptor>> {
        let mut fields = Vec::with_capacity(definition.fields.len());

        for field in &definition.fields {
            if let Some(machine_name) = &field.machine_name
                && !config.is_field_enabled(&definition.id, machine_name)
            {
                continue;
            }
            if field.value && !config.generate_value_fields {
                continue;
            }

            let mut descriptor = FieldDescriptor::from_type_ref(&field.name, &field.ty)
                .map_err(|e| {
                    ComposeError::Introspection(format!(
                        "entity type '{}' field '{}': {e}",
                        definition.id, field.name
                    ))
                })?;

            let target = descriptor.type_name();
            if !self.is_scalar(target) && !registry.will_exist(target) {
                debug!(
                    entity_type = %definition.id,
                    field = %field.name,
                    target = %target,
                    "Skipping field referencing a type that will not exist"
                );
                continue;
            }

            if let Some(machine_name) = &field.machine_name {
                descriptor.set_machine_name(machine_name.as_str());
            }
            if field.value {
                descriptor.mark_value_field();
            }
            if !field.description.is_empty() {
                descriptor.set_description(field.description.as_str());
            }
            fields.push(descriptor);
        }

        Ok(fields)
    }
}

impl EntityIntrospector for StaticIntrospector {
    fn populate(
        &self,
        config: &ComposeConfig,
        registry: &mut TypeRegistry,
    ) -> Result<()> {
        let enabled: Vec<&EntityTypeDefinition> = config
            .enabled_entity_types()
            .filter_map(|id| {
                let definition = self.definitions.iter().find(|d| d.id == id);
                if definition.is_none() {
                    warn!(entity_type = %id, "No definition for enabled entity type, skipping");
                }
                definition
            })
            .collect();

        // Fields may reference entity types registered later in this pass.
        for definition in &enabled {
            registry.reserve(definition.type_name.as_str());
        }

        for definition in enabled {
            let fields = self.describe_fields(config, registry, definition)?;
            debug!(
                entity_type = %definition.id,
                type_name = %definition.type_name,
                fields = fields.len(),
                "Registering entity type"
            );

            let descriptor = registry.get_or_create_object(&definition.type_name)?;
            if descriptor.description().is_empty() && !definition.description.is_empty() {
                descriptor.set_description(definition.description.as_str());
            }
            for field in fields {
                descriptor.add_field(field);
            }
            for interface in &definition.interfaces {
                descriptor.add_interface(interface.as_str());
            }
        }

        Ok(())
    }
}
