//! Registry of type descriptors for one composition.
//!
//! The registry is the single source of truth mapping type names to
//! descriptors. It also records names that are promised to exist before their
//! descriptor is built, so generated fields can reference types produced later
//! in the same pass.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::trace;

use super::descriptor::{TypeDescriptor, TypeKind};
use super::field::FieldDescriptor;
use crate::Result;
use crate::error::ComposeError;

/// Registry for type descriptors, in registration order.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Registered descriptors.
    types: IndexMap<String, TypeDescriptor>,
    /// Names that exist or are guaranteed to exist by the end of composition.
    reserved: HashSet<String>,
}

impl TypeRegistry {
    /// Creates a new empty type registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Promises that a type with this name will be registered.
    pub fn reserve(&mut self, type_name: impl Into<String>) {
        self.reserved.insert(type_name.into());
    }

    /// Checks if a type is registered or has been reserved.
    pub fn will_exist(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name) || self.reserved.contains(type_name)
    }

    pub fn lookup(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    pub fn lookup_mut(&mut self, type_name: &str) -> Option<&mut TypeDescriptor> {
        self.types.get_mut(type_name)
    }

    /// Returns the object with this name, registering it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::KindConflict`] if the name is an interface.
    pub fn get_or_create_object(
        &mut self,
        type_name: &str,
    ) -> Result<&mut TypeDescriptor> {
        self.get_or_create(type_name, TypeKind::Object)
    }

    /// Returns the interface with this name after adding the given fields and
    /// interfaces, registering it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::KindConflict`] if the name is an object.
    pub fn get_or_create_interface(
        &mut self,
        type_name: &str,
        description: &str,
        fields: Vec<FieldDescriptor>,
        interfaces: Vec<String>,
    ) -> Result<&mut TypeDescriptor> {
        let descriptor = self.get_or_create(type_name, TypeKind::Interface)?;
        if descriptor.description().is_empty() && !description.is_empty() {
            descriptor.set_description(description);
        }
        for field in fields {
            descriptor.add_field(field);
        }
        for interface in interfaces {
            descriptor.add_interface(interface);
        }
        Ok(descriptor)
    }

    fn get_or_create(
        &mut self,
        type_name: &str,
        kind: TypeKind,
    ) -> Result<&mut TypeDescriptor> {
        self.reserved.insert(type_name.to_string());

        if let Some(existing) = self.types.get(type_name)
            && existing.kind() != kind
        {
            return Err(ComposeError::KindConflict {
                name: type_name.to_string(),
                existing: existing.kind(),
                incoming: kind,
            });
        }

        Ok(self
            .types
            .entry(type_name.to_string())
            .or_insert_with(|| {
                trace!(type_name = %type_name, kind = %kind, "Registering type");
                TypeDescriptor::new(type_name, kind)
            }))
    }

    /// Merges a descriptor into the registered one of the same name, or
    /// registers it.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::KindConflict`] if the kinds differ.
    pub fn merge_definition(&mut self, descriptor: TypeDescriptor) -> Result<()> {
        self.reserved.insert(descriptor.name().to_string());

        match self.types.get_mut(descriptor.name()) {
            Some(existing) => {
                trace!(type_name = %descriptor.name(), "Merging into registered type");
                existing.merge(descriptor)
            }
            None => {
                trace!(type_name = %descriptor.name(), "Registering type");
                self.types.insert(descriptor.name().to_string(), descriptor);
                Ok(())
            }
        }
    }

    /// Iterates registered descriptors in registration order.
    pub fn all_types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
