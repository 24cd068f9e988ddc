//! Composition orchestrator.
//!
//! [`SchemaComposer::compose`] runs one composition end to end:
//!
//! 1. fingerprint the configuration and return a cached schema on a hit;
//! 2. validate entity type and extension dependencies;
//! 3. parse every active extension's base definition and reserve the types
//!    it defines, introspect entity types into a fresh registry, merge the
//!    base definitions and compile;
//! 4. apply extension definitions, then type extension definitions computed
//!    from the compiled type names;
//! 5. print, parse the result back and cache it.
//!
//! A failed composition caches nothing.

use std::fmt;
use std::sync::Arc;

use async_graphql_parser::types::ServiceDocument;
use tracing::{debug, info};

use crate::cache::{SCHEMA_TAG, SchemaCache, entity_type_tag, extension_tag};
use crate::config::ComposeConfig;
use crate::Result;
use crate::error::ComposeError;
use crate::extension::{ExtensionContext, ExtensionRegistry, SchemaExtension};
use crate::introspect::EntityIntrospector;
use crate::schema::{
    Definition, SchemaExtender, SchemaGenerator, TypeRegistry, parse_definitions, parse_document,
};

/// Result of a successful composition.
#[derive(Debug, Clone)]
pub struct ComposedSchema {
    /// Fingerprint of the configuration this schema was built from.
    pub fingerprint: String,
    /// Printed schema.
    pub sdl: String,
    /// `sdl` parsed back.
    pub document: ServiceDocument,
    /// Compiled object and interface names, in registration order.
    pub type_names: Vec<String>,
}

impl ComposedSchema {
    pub fn has_type(&self, type_name: &str) -> bool {
        self.type_names.iter().any(|name| name == type_name)
    }
}

/// Builds schemas from introspected entity types and extensions.
pub struct SchemaComposer {
    introspector: Arc<dyn EntityIntrospector>,
    extensions: ExtensionRegistry,
    cache: Arc<dyn SchemaCache>,
}

impl fmt::Debug for SchemaComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaComposer")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl SchemaComposer {
    pub fn new(
        introspector: impl EntityIntrospector + 'static,
        extensions: ExtensionRegistry,
        cache: Arc<dyn SchemaCache>,
    ) -> Self {
        Self {
            introspector: Arc::new(introspector),
            extensions,
            cache,
        }
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn cache(&self) -> &Arc<dyn SchemaCache> {
        &self.cache
    }

    /// Checks the configuration before anything is built.
    ///
    /// Returns the active extensions in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::NoEntityTypeEnabled`] if nothing would be
    /// generated, [`ComposeError::UnknownExtension`] for unregistered active
    /// extensions, and [`ComposeError::MissingEntityType`] or
    /// [`ComposeError::MissingExtension`] for unmet dependencies.
    pub fn validate(
        &self,
        config: &ComposeConfig,
    ) -> Result<Vec<Arc<dyn SchemaExtension>>> {
        config.validate()?;

        if config.enabled_entity_types().next().is_none() {
            return Err(ComposeError::NoEntityTypeEnabled);
        }

        let extensions = self.extensions.active(config)?;
        for extension in &extensions {
            for entity_type in extension.entity_type_dependencies() {
                if !config.is_entity_type_enabled(&entity_type) {
                    return Err(ComposeError::MissingEntityType {
                        extension: extension.id().to_string(),
                        entity_type,
                    });
                }
            }
            for dependency in extension.extension_dependencies() {
                if !config.is_extension_active(&dependency) {
                    return Err(ComposeError::MissingExtension {
                        extension: extension.id().to_string(),
                        dependency,
                    });
                }
            }
        }

        Ok(extensions)
    }

    /// Returns the schema for `config`, from cache if possible.
    ///
    /// # Errors
    ///
    /// Returns the first configuration or build error. Nothing is cached on
    /// failure.
    pub fn compose(&self, config: &ComposeConfig) -> Result<Arc<ComposedSchema>> {
        let fingerprint = config.fingerprint()?;
        if let Some(schema) = self.cache.get(&fingerprint) {
            info!(fingerprint = %fingerprint, "Using cached GraphQL schema");
            return Ok(schema);
        }

        let extensions = self.validate(config)?;
        let schema = Arc::new(self.build(config, &extensions, fingerprint)?);

        let tags = cache_tags(config, &extensions);
        self.cache.put(&schema.fingerprint, Arc::clone(&schema), &tags);

        info!(
            fingerprint = %schema.fingerprint,
            types = schema.type_names.len(),
            "GraphQL schema composed"
        );
        Ok(schema)
    }

    fn build(
        &self,
        config: &ComposeConfig,
        extensions: &[Arc<dyn SchemaExtension>],
        fingerprint: String,
    ) -> Result<ComposedSchema> {
        let mut base_definitions = Vec::new();
        for extension in extensions {
            let ctx = ExtensionContext::new(config, extension.id());
            if let Some(sdl) = extension.base_definition(&ctx) {
                let origin = format!("extension '{}' base definition", extension.id());
                base_definitions.extend(parse_definitions(&origin, &sdl)?);
            }
        }

        // Entity fields may reference types shipped by extensions.
        let mut registry = TypeRegistry::new();
        for name in base_definitions.iter().filter_map(Definition::defined_type_name) {
            registry.reserve(name);
        }
        self.introspector.populate(config, &mut registry)?;
        debug!(types = registry.len(), "Entity introspection complete");

        let mut generator = SchemaGenerator::new(registry, config.entity_base_fields.iter().cloned());
        generator.add_base_definitions(base_definitions)?;

        let mut schema = generator.compile()?;
        let compiled_types = schema.type_names();
        debug!(types = compiled_types.len(), "Base schema compiled");

        for extension in extensions {
            let ctx = ExtensionContext::new(config, extension.id());
            if let Some(sdl) = extension.extension_definition(&ctx) {
                let origin = format!("extension '{}' extension definition", extension.id());
                SchemaExtender::apply(&mut schema, &origin, &sdl)?;
            }
        }

        for extension in extensions {
            let ctx = ExtensionContext::new(config, extension.id());
            if let Some(sdl) = extension.type_extension_definition(&ctx, &compiled_types) {
                let origin = format!("extension '{}' type extension definition", extension.id());
                SchemaExtender::apply(&mut schema, &origin, &sdl)?;
            }
        }

        schema.validate_references()?;

        let sdl = schema.print();
        let document = parse_document("composed schema", &sdl)?;

        Ok(ComposedSchema {
            fingerprint,
            sdl,
            document,
            type_names: schema.type_names(),
        })
    }
}

/// Tags identifying what a schema was built from.
fn cache_tags(config: &ComposeConfig, extensions: &[Arc<dyn SchemaExtension>]) -> Vec<String> {
    let mut tags = vec![SCHEMA_TAG.to_string()];
    tags.extend(config.enabled_entity_types().map(entity_type_tag));
    tags.extend(extensions.iter().map(|extension| extension_tag(extension.id())));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemorySchemaCache, NoopSchemaCache};
    use crate::extension::{ExtensionManifest, SdlExtension};
    use crate::schema::FieldDescriptor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Registers `NodePage` and counts calls.
    #[derive(Default)]
    struct CountingIntrospector {
        calls: Arc<AtomicUsize>,
    }

    impl EntityIntrospector for CountingIntrospector {
        fn populate(
            &self,
            config: &ComposeConfig,
            registry: &mut TypeRegistry,
        ) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if config.is_entity_type_enabled("node_page") {
                registry
                    .get_or_create_object("NodePage")?
                    .add_field(FieldDescriptor::new("title", "String"));
            }
            Ok(())
        }
    }

    fn composer(
        manifests: Vec<ExtensionManifest>,
        cache: Arc<dyn SchemaCache>,
    ) -> (SchemaComposer, Arc<AtomicUsize>) {
        let introspector = CountingIntrospector::default();
        let calls = Arc::clone(&introspector.calls);

        let mut extensions = ExtensionRegistry::new();
        for manifest in manifests {
            extensions.register(SdlExtension::new(manifest)).unwrap();
        }
        (SchemaComposer::new(introspector, extensions, cache), calls)
    }

    fn query_extension() -> ExtensionManifest {
        ExtensionManifest {
            id: "query".into(),
            base_definition: Some("type Query { page: NodePage }".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_nothing_enabled_fails() {
        let (composer, calls) = composer(vec![], Arc::new(NoopSchemaCache));
        let err = composer.compose(&ComposeConfig::default()).unwrap_err();

        assert!(matches!(err, ComposeError::NoEntityTypeEnabled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cache_hit_skips_build() {
        let (composer, calls) = composer(vec![query_extension()], Arc::new(MemorySchemaCache::new()));
        let config = ComposeConfig::default()
            .with_entity_type("node_page", Vec::<String>::new())
            .with_extension("query");

        let first = composer.compose(&config).unwrap();
        let second = composer.compose(&config).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.type_names, vec!["NodePage", "Query"]);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let broken = ExtensionManifest {
            id: "broken".into(),
            base_definition: Some("type Query { page: Missing }".into()),
            ..Default::default()
        };
        let cache = Arc::new(MemorySchemaCache::new());
        let (composer, calls) = composer(vec![broken], cache.clone());
        let config = ComposeConfig::default()
            .with_entity_type("node_page", Vec::<String>::new())
            .with_extension("broken");

        assert!(composer.compose(&config).is_err());
        assert!(composer.compose(&config).is_err());
        assert!(cache.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_tags() {
        let cache = Arc::new(MemorySchemaCache::new());
        let (composer, _) = composer(vec![query_extension()], cache.clone());
        let config = ComposeConfig::default()
            .with_entity_type("node_page", Vec::<String>::new())
            .with_extension("query");

        composer.compose(&config).unwrap();
        assert_eq!(cache.invalidate_tags(&[entity_type_tag("node_article")]), 0);
        assert_eq!(cache.invalidate_tags(&[extension_tag("query")]), 1);
    }

    #[test]
    fn test_validate_returns_active_extensions() {
        let (composer, _) = composer(
            vec![
                query_extension(),
                ExtensionManifest {
                    id: "unused".into(),
                    ..Default::default()
                },
            ],
            Arc::new(NoopSchemaCache),
        );
        let config = ComposeConfig::default()
            .with_entity_type("node_page", Vec::<String>::new())
            .with_extension("query");

        let active = composer.validate(&config).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), "query");
    }
}
