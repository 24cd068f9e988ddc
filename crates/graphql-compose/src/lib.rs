//! # graphql-compose
//!
//! GraphQL schema composition for content entity APIs.
//!
//! A schema is assembled from three independently configured sources:
//!
//! - object types generated from the enabled entity types,
//! - base type and interface definitions shipped by extensions,
//! - `extend` definitions contributed by the same extensions, some of which
//!   apply only when a given type was generated.
//!
//! ## Overview
//!
//! The [`SchemaComposer`] validates the configuration, introspects entity
//! types into a [`schema::TypeRegistry`], merges extension base definitions,
//! propagates interface fields, compiles every type exactly once and applies
//! extension definitions. The printed schema is cached under the fingerprint
//! of the configuration.
//!
//! ```ignore
//! let composer = SchemaComposer::new(introspector, extensions, Arc::new(MemorySchemaCache::new()));
//! let schema = composer.compose(&config)?;
//! println!("{}", schema.sdl);
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! generate_value_fields = true
//! entity_base_fields = ["id", "uuid", "label"]
//!
//! [entity_types.node_article]
//! fields = ["body", "field_tags"]
//!
//! [extensions.routes]
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration options
//! - [`schema`] - Descriptors, registry, generator and extend pass
//! - [`extension`] - Extension trait and registry
//! - [`introspect`] - Entity introspection boundary
//! - [`composer`] - Composition orchestrator
//! - [`cache`] - Composed schema caching
//! - [`error`] - Error types for composition

pub mod cache;
pub mod composer;
pub mod config;
pub mod error;
pub mod extension;
pub mod introspect;
pub mod schema;

// Re-export main types
pub use cache::{MemorySchemaCache, NoopSchemaCache, SchemaCache};
pub use composer::{ComposedSchema, SchemaComposer};
pub use config::{ComposeConfig, EntityTypeConfig, ExtensionConfig};
pub use error::ComposeError;
pub use extension::{
    ConditionalDefinition, ExtensionContext, ExtensionManifest, ExtensionRegistry,
    SchemaExtension, SdlExtension,
};
pub use introspect::{
    EntityFieldDefinition, EntityIntrospector, EntityTypeDefinition, StaticIntrospector,
};
pub use schema::LazySchema;

/// Result type for composition operations.
pub type Result<T> = std::result::Result<T, ComposeError>;
