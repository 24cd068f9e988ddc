//! Schema building.
//!
//! Descriptors are collected in a [`TypeRegistry`], compiled once each by the
//! [`SchemaGenerator`] and then extended and printed.
//!
//! ## Components
//!
//! - [`FieldDescriptor`] / [`TypeDescriptor`] - mutable type descriptions
//! - [`TypeRegistry`] - name to descriptor map for one composition
//! - [`SchemaGenerator`] - merges base definitions, propagates interface
//!   fields and compiles output types
//! - [`SchemaExtender`] - applies `extend` definitions to a compiled schema
//! - [`LazySchema`] - shared schema holder with rebuild support

mod definition;
mod descriptor;
mod extend;
mod field;
mod generator;
mod lazy;
mod output;
mod printer;
mod registry;

pub use definition::{Definition, parse_definitions, parse_document};
pub use descriptor::{TypeDescriptor, TypeKind};
pub use extend::SchemaExtender;
pub use field::{FieldDescriptor, TypeModifier};
pub use generator::{
    CompiledSchema, ENTITY_BASE_FIELDS, ENTITY_INTERFACE, SchemaGenerator, TRANSLATABLE_INTERFACE,
};
pub use lazy::{LazySchema, SchemaState};
pub use output::{
    BuiltinScalar, CompiledArgument, CompiledField, CompiledKind, CompiledType, OutputType,
    TypeRef,
};
pub use printer::{print_compiled_type, print_definition};
pub use registry::TypeRegistry;
