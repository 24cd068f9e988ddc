//! Schema generator.
//!
//! The generator takes a populated [`TypeRegistry`] and turns it into a
//! [`CompiledSchema`]:
//!
//! 1. base definitions from extensions are merged into the registry, with
//!    non-object/interface definitions kept as passthrough;
//! 2. the base `Entity` interface is trimmed: base fields outside the
//!    configured whitelist are dropped, fields contributed by extensions stay;
//! 3. interface fields are copied onto implementing types;
//! 4. every type is compiled once, interfaces before their implementors,
//!    through a memoization table keyed by name.

use std::collections::HashSet;
use std::rc::Rc;

use async_graphql_parser::types::{TypeKind as AstTypeKind, TypeSystemDefinition};
use indexmap::IndexMap;
use tracing::{debug, trace};

use super::definition::Definition;
use super::descriptor::{TypeDescriptor, TypeKind};
use super::extend::SchemaExtender;
use super::field::FieldDescriptor;
use super::output::{
    BuiltinScalar, CompiledArgument, CompiledField, CompiledKind, CompiledType, OutputType,
};
use super::printer::{print_compiled_type, print_definition};
use super::registry::TypeRegistry;
use crate::Result;
use crate::error::ComposeError;

/// The interface every content entity type implements.
pub const ENTITY_INTERFACE: &str = "Entity";

/// The interface of translatable entities. A translation of a type is always
/// another instance of that type, so self-typed fields are retargeted.
pub const TRANSLATABLE_INTERFACE: &str = "EntityTranslatable";

/// Fields every entity carries. Only these are subject to the configured
/// base field whitelist; any other field on [`ENTITY_INTERFACE`] was
/// contributed by an extension and is always kept.
pub const ENTITY_BASE_FIELDS: &[&str] = &[
    "id", "uuid", "label", "langcode", "status", "created", "changed",
];

/// Compiles a registry of descriptors into a schema.
#[derive(Debug)]
pub struct SchemaGenerator {
    registry: TypeRegistry,
    /// Definitions that are neither objects nor interfaces, in input order.
    passthrough: Vec<TypeSystemDefinition>,
    /// `extend` forms found among base definitions, applied after compiling.
    deferred: Vec<TypeSystemDefinition>,
    /// Whitelisted base fields of the entity interface.
    entity_base_fields: HashSet<String>,
    /// Memoized output types by name.
    compiled: IndexMap<String, OutputType>,
    /// Types currently being compiled (for cycle detection).
    compiling: HashSet<String>,
    propagated: bool,
}

impl SchemaGenerator {
    /// Creates a generator over a registry populated by introspection.
    pub fn new(
        registry: TypeRegistry,
        entity_base_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            registry,
            passthrough: Vec::new(),
            deferred: Vec::new(),
            entity_base_fields: entity_base_fields.into_iter().map(Into::into).collect(),
            compiled: IndexMap::new(),
            compiling: HashSet::new(),
            propagated: false,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn passthrough(&self) -> &[TypeSystemDefinition] {
        &self.passthrough
    }

    /// Merges base definitions into the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::KindConflict`] if a definition redeclares a
    /// registered type with a different kind.
    pub fn add_base_definitions(
        &mut self,
        definitions: impl IntoIterator<Item = Definition>,
    ) -> Result<()> {
        for definition in definitions {
            self.add_base_definition(definition)?;
        }
        Ok(())
    }

    fn add_base_definition(&mut self, definition: Definition) -> Result<()> {
        match definition {
            Definition::ObjectType(descriptor) | Definition::InterfaceType(descriptor) => {
                self.registry.merge_definition(descriptor)
            }
            Definition::Other(definition) if is_extension(&definition) => {
                self.deferred.push(definition);
                Ok(())
            }
            Definition::Other(definition) => {
                self.passthrough.push(definition);
                Ok(())
            }
        }
    }

    /// Drops entity base fields that are not whitelisted.
    fn apply_entity_whitelist(&mut self) {
        let Some(entity) = self.registry.lookup_mut(ENTITY_INTERFACE) else {
            return;
        };

        let mut allowed = self.entity_base_fields.clone();
        allowed.extend(
            entity
                .raw_fields()
                .iter()
                .map(FieldDescriptor::name)
                .filter(|name| !ENTITY_BASE_FIELDS.contains(name))
                .map(String::from),
        );
        entity.keep_fields(&allowed);
        trace!(
            fields = entity.raw_fields().len(),
            "Applied entity base field whitelist"
        );
    }

    /// Applies the entity whitelist and copies interface fields onto every
    /// implementing type.
    ///
    /// Interfaces are processed before objects so interface inheritance is
    /// visible to objects. Runs once; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownType`] for undeclared interfaces and
    /// [`ComposeError::NotAnInterface`] for implemented objects.
    pub fn propagate_interfaces(&mut self) -> Result<()> {
        if self.propagated {
            return Ok(());
        }
        self.apply_entity_whitelist();

        let mut order: Vec<String> = self
            .registry
            .all_types()
            .filter(|descriptor| descriptor.is_interface())
            .map(|descriptor| descriptor.name().to_string())
            .collect();
        order.extend(
            self.registry
                .all_types()
                .filter(|descriptor| !descriptor.is_interface())
                .map(|descriptor| descriptor.name().to_string()),
        );

        for type_name in order {
            let inherited = self.inherited_fields(&type_name)?;
            if inherited.is_empty() {
                continue;
            }

            trace!(type_name = %type_name, count = inherited.len(), "Propagating interface fields");
            if let Some(descriptor) = self.registry.lookup_mut(&type_name) {
                for field in inherited {
                    descriptor.add_field(field);
                }
            }
        }

        self.propagated = true;
        Ok(())
    }

    fn inherited_fields(&self, type_name: &str) -> Result<Vec<FieldDescriptor>> {
        let Some(descriptor) = self.registry.lookup(type_name) else {
            return Ok(Vec::new());
        };

        let mut inherited = Vec::new();
        for interface_name in unique(descriptor.interfaces()) {
            let interface = self.lookup_interface(type_name, interface_name)?;
            for mut field in interface.fields().into_values() {
                if is_self_typed_translation(interface_name, field.type_name()) {
                    field.set_type(type_name);
                }
                inherited.push(field);
            }
        }
        Ok(inherited)
    }

    fn lookup_interface(
        &self,
        type_name: &str,
        interface_name: &str,
    ) -> Result<&TypeDescriptor> {
        let interface = self
            .registry
            .lookup(interface_name)
            .ok_or_else(|| ComposeError::unknown_type(interface_name, type_name))?;

        if interface.kind() != TypeKind::Interface {
            return Err(ComposeError::NotAnInterface {
                type_name: type_name.to_string(),
                interface: interface_name.to_string(),
            });
        }
        Ok(interface)
    }

    /// Compiles a type by name, reusing the memoized instance if present.
    ///
    /// Fields reference other types by name only, so self- and mutually
    /// referencing types compile without recursion. Interfaces are compiled
    /// before the types implementing them.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownType`] if the name is not registered and
    /// [`ComposeError::CyclicInterface`] if the interface graph has a cycle.
    pub fn compile_type(&mut self, type_name: &str) -> Result<OutputType> {
        if let Some(ty) = self.compiled.get(type_name) {
            return Ok(Rc::clone(ty));
        }

        if let Some(scalar) = BuiltinScalar::from_name(type_name) {
            let ty = Rc::new(CompiledType::scalar(scalar));
            self.compiled.insert(type_name.to_string(), Rc::clone(&ty));
            return Ok(ty);
        }

        if !self.compiling.insert(type_name.to_string()) {
            return Err(ComposeError::CyclicInterface(type_name.to_string()));
        }
        let result = self.build_type(type_name);
        self.compiling.remove(type_name);

        let ty = result?;
        trace!(type_name = %type_name, fields = ty.fields.len(), "Compiled type");
        self.compiled.insert(type_name.to_string(), Rc::clone(&ty));
        Ok(ty)
    }

    fn build_type(&mut self, type_name: &str) -> Result<OutputType> {
        let descriptor = self
            .registry
            .lookup(type_name)
            .ok_or_else(|| ComposeError::unknown_type(type_name, "schema"))?;

        let kind = match descriptor.kind() {
            TypeKind::Object => CompiledKind::Object,
            TypeKind::Interface => CompiledKind::Interface,
        };
        let description = descriptor.description().to_string();
        let directives = descriptor.directives().to_vec();
        let fields = descriptor.fields();
        let interface_names: Vec<String> = unique(descriptor.interfaces())
            .into_iter()
            .map(String::from)
            .collect();

        let mut interfaces = Vec::with_capacity(interface_names.len());
        for interface_name in &interface_names {
            self.lookup_interface(type_name, interface_name)?;
            interfaces.push(self.compile_type(interface_name)?);
        }

        Ok(Rc::new(CompiledType {
            name: type_name.to_string(),
            kind,
            description,
            fields: fields
                .iter()
                .map(|(name, field)| compile_field(name, field))
                .collect(),
            interfaces,
            directives,
        }))
    }

    /// Runs interface propagation and compiles every registered type.
    ///
    /// # Errors
    ///
    /// Fails on unknown or cyclic interfaces, passthrough definitions that
    /// clash with registered types, and unresolved type references.
    pub fn compile(mut self) -> Result<CompiledSchema> {
        self.propagate_interfaces()?;
        self.check_passthrough_names()?;

        let names: Vec<String> = self.registry.type_names().map(String::from).collect();
        debug!(count = names.len(), "Compiling registered types");
        for name in &names {
            self.compile_type(name)?;
        }

        let types = names
            .iter()
            .filter_map(|name| {
                self.compiled
                    .get(name)
                    .map(|ty| (name.clone(), Rc::clone(ty)))
            })
            .collect();

        let mut schema = CompiledSchema {
            types,
            passthrough: self.passthrough,
        };

        if !self.deferred.is_empty() {
            debug!(count = self.deferred.len(), "Applying extensions from base definitions");
            SchemaExtender::apply_definitions(&mut schema, self.deferred)?;
        }

        schema.validate_references()?;
        Ok(schema)
    }

    fn check_passthrough_names(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.passthrough.iter().filter_map(defined_type_name) {
            if self.registry.lookup(name).is_some() || !seen.insert(name) {
                return Err(ComposeError::DuplicateType(name.to_string()));
            }
        }
        Ok(())
    }
}

/// The compiled schema before extension text is applied and printed.
#[derive(Debug)]
pub struct CompiledSchema {
    pub(crate) types: IndexMap<String, OutputType>,
    pub(crate) passthrough: Vec<TypeSystemDefinition>,
}

impl CompiledSchema {
    pub fn get(&self, type_name: &str) -> Option<&OutputType> {
        self.types.get(type_name)
    }

    /// Compiled object and interface names, in registry order.
    pub fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    pub fn passthrough(&self) -> &[TypeSystemDefinition] {
        &self.passthrough
    }

    /// Checks if a type name is defined by a compiled type, a passthrough
    /// definition, or a built-in scalar.
    pub fn defines(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
            || BuiltinScalar::from_name(type_name).is_some()
            || self
                .passthrough
                .iter()
                .filter_map(defined_type_name)
                .any(|name| name == type_name)
    }

    /// Checks that every referenced type name resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownType`] naming the first unresolved
    /// reference.
    pub fn validate_references(&self) -> Result<()> {
        for ty in self.types.values() {
            for field in &ty.fields {
                let referenced_by = format!("{}.{}", ty.name, field.name);
                let names = std::iter::once(field.ty.base_name())
                    .chain(field.arguments.iter().map(|a| a.ty.base_name()));
                for name in names {
                    if !self.defines(name) {
                        return Err(ComposeError::unknown_type(name, &referenced_by));
                    }
                }
            }
        }

        for definition in &self.passthrough {
            if let TypeSystemDefinition::Type(ty) = definition
                && let AstTypeKind::Union(union) = &ty.node.kind
            {
                for member in &union.members {
                    if !self.types.contains_key(member.node.as_str()) {
                        return Err(ComposeError::unknown_type(
                            member.node.as_str(),
                            ty.node.name.node.as_str(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Prints compiled types in registry order followed by passthrough
    /// definitions in their original order.
    pub fn print(&self) -> String {
        let mut blocks: Vec<String> = self
            .types
            .values()
            .map(|ty| print_compiled_type(ty))
            .collect();
        blocks.extend(self.passthrough.iter().map(print_definition));

        let mut sdl = blocks.join("\n\n");
        sdl.push('\n');
        sdl
    }

    /// Replaces a compiled type and rebinds the types implementing it.
    ///
    /// Implementors are rebuilt against the current instances of all their
    /// interfaces, recursively, so an interface implementing the replaced
    /// one passes the change on. When the replaced type is an interface,
    /// implementors also receive the interface fields they lack.
    pub(crate) fn replace_type(&mut self, ty: CompiledType) {
        let mut rebinding = HashSet::new();
        self.rebind(ty, &mut rebinding);
    }

    fn rebind(&mut self, ty: CompiledType, rebinding: &mut HashSet<String>) {
        let name = ty.name.clone();
        rebinding.insert(name.clone());

        let replacement = Rc::new(ty);
        self.types.insert(name.clone(), Rc::clone(&replacement));

        let implementors: Vec<String> = self
            .types
            .values()
            .filter(|other| !rebinding.contains(&other.name) && other.implements(&name))
            .map(|other| other.name.clone())
            .collect();

        for implementor in implementors {
            let Some(existing) = self.types.get(&implementor).cloned() else {
                continue;
            };
            let mut rebound = CompiledType::clone(&existing);
            rebound.interfaces = existing
                .interfaces
                .iter()
                .map(|i| self.types.get(&i.name).map_or_else(|| Rc::clone(i), Rc::clone))
                .collect();

            if replacement.kind == CompiledKind::Interface {
                for field in &replacement.fields {
                    if rebound.field(&field.name).is_some() {
                        continue;
                    }
                    let mut field = field.clone();
                    if is_self_typed_translation(&name, field.ty.base_name()) {
                        field.ty = field.ty.with_base_name(&rebound.name);
                    }
                    trace!(type_name = %rebound.name, field = %field.name, "Inheriting extended interface field");
                    rebound.fields.push(field);
                }
            }

            self.rebind(rebound, rebinding);
        }

        rebinding.remove(&name);
    }
}

/// Compiles a field descriptor emitted under `name`.
pub(crate) fn compile_field(name: &str, field: &FieldDescriptor) -> CompiledField {
    CompiledField {
        name: name.to_string(),
        description: field.description(),
        ty: field.type_ref(),
        arguments: field
            .arguments()
            .iter()
            .map(|argument| CompiledArgument {
                name: argument.name().to_string(),
                description: argument.description(),
                ty: argument.type_ref(),
                default_value: argument.default_value().cloned(),
                directives: argument.directives().to_vec(),
            })
            .collect(),
        directives: field.directives().to_vec(),
    }
}

/// The type name a non-extension passthrough definition introduces.
pub(crate) fn defined_type_name(definition: &TypeSystemDefinition) -> Option<&str> {
    match definition {
        TypeSystemDefinition::Type(ty) if !ty.node.extend => Some(ty.node.name.node.as_str()),
        _ => None,
    }
}

pub(crate) fn is_extension(definition: &TypeSystemDefinition) -> bool {
    match definition {
        TypeSystemDefinition::Type(ty) => ty.node.extend,
        TypeSystemDefinition::Schema(schema) => schema.node.extend,
        TypeSystemDefinition::Directive(_) => false,
    }
}

/// Fields of the translatable interface typed as the interface itself point
/// at the implementing type instead.
fn is_self_typed_translation(interface_name: &str, field_type: &str) -> bool {
    interface_name == TRANSLATABLE_INTERFACE && field_type == interface_name
}

fn unique(names: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .filter(|name| seen.insert(*name))
        .collect()
}
