//! Lazy schema loading implementation.
//!
//! This module provides `LazySchema`, a thread-safe wrapper that defers
//! composition until first access and rebuilds after the configuration
//! changes.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::composer::{ComposedSchema, SchemaComposer};
use crate::config::ComposeConfig;
use crate::Result;
use crate::error::ComposeError;

/// State of the lazy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Schema has not been built yet.
    Uninitialized,
    /// Schema is currently being built.
    Building,
    /// Schema is ready for use.
    Ready,
    /// Schema build failed.
    Failed,
}

/// Thread-safe lazy schema holder.
///
/// Composition is CPU bound and runs on the blocking thread pool. Only one
/// build runs at a time.
///
/// # Example
///
/// ```ignore
/// let lazy_schema = LazySchema::new(composer, config);
///
/// // First access triggers build
/// let schema = lazy_schema.get_or_build().await?;
///
/// // Configuration changed, rebuild on next access
/// lazy_schema.reconfigure(new_config).await;
/// ```
pub struct LazySchema {
    /// The cached schema (None if not built yet or invalidated).
    schema: RwLock<Option<Arc<ComposedSchema>>>,

    /// Build lock to ensure only one build at a time.
    build_lock: Mutex<()>,

    state: RwLock<SchemaState>,

    composer: Arc<SchemaComposer>,

    config: RwLock<ComposeConfig>,

    /// Last build error (for diagnostics).
    last_error: RwLock<Option<ComposeError>>,
}

impl LazySchema {
    #[must_use]
    pub fn new(composer: Arc<SchemaComposer>, config: ComposeConfig) -> Self {
        Self {
            schema: RwLock::new(None),
            build_lock: Mutex::new(()),
            state: RwLock::new(SchemaState::Uninitialized),
            composer,
            config: RwLock::new(config),
            last_error: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> SchemaState {
        *self.state.read().await
    }

    /// Gets the schema, building it if necessary.
    ///
    /// Concurrent callers receive an error while a build is in progress; use
    /// `get_or_build_wait()` to wait instead.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::SchemaInitializing` if another build is in
    /// progress, or the composition error if the build fails.
    pub async fn get_or_build(&self) -> Result<Arc<ComposedSchema>> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        if *self.state.read().await == SchemaState::Building {
            return Err(ComposeError::SchemaInitializing);
        }

        let Ok(_guard) = self.build_lock.try_lock() else {
            return Err(ComposeError::SchemaInitializing);
        };

        // Double-check after acquiring lock
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        self.build().await
    }

    /// Gets the schema, waiting for an in-progress build to complete.
    ///
    /// A previous failure is returned without rebuilding until the schema is
    /// invalidated.
    ///
    /// # Errors
    ///
    /// Returns the composition error if the build fails.
    pub async fn get_or_build_wait(&self) -> Result<Arc<ComposedSchema>> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        let _guard = self.build_lock.lock().await;

        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        if *self.state.read().await == SchemaState::Failed
            && let Some(err) = self.last_error.read().await.as_ref()
        {
            return Err(err.clone());
        }

        self.build().await
    }

    /// Runs a build. The caller holds the build lock.
    async fn build(&self) -> Result<Arc<ComposedSchema>> {
        *self.state.write().await = SchemaState::Building;
        info!("Building GraphQL schema...");

        let composer = Arc::clone(&self.composer);
        let config = self.config.read().await.clone();
        let result = tokio::task::spawn_blocking(move || composer.compose(&config))
            .await
            .map_err(|e| ComposeError::Internal(format!("schema build task failed: {e}")))
            .and_then(|result| result);

        match result {
            Ok(schema) => {
                *self.schema.write().await = Some(Arc::clone(&schema));
                *self.state.write().await = SchemaState::Ready;
                *self.last_error.write().await = None;
                info!(fingerprint = %schema.fingerprint, "GraphQL schema built successfully");
                Ok(schema)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Failed to build GraphQL schema");
                *self.state.write().await = SchemaState::Failed;
                *self.last_error.write().await = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Gets the schema if it's already built, without triggering a build.
    pub async fn get(&self) -> Option<Arc<ComposedSchema>> {
        self.schema.read().await.clone()
    }

    /// Invalidates the held schema, causing the next access to rebuild it.
    pub async fn invalidate(&self) {
        let _guard = self.build_lock.lock().await;

        *self.schema.write().await = None;
        *self.state.write().await = SchemaState::Uninitialized;
        *self.last_error.write().await = None;

        info!("GraphQL schema invalidated - will rebuild on next request");
    }

    /// Replaces the configuration and invalidates the held schema.
    pub async fn reconfigure(&self, config: ComposeConfig) {
        *self.config.write().await = config;
        self.invalidate().await;
    }

    pub async fn config(&self) -> ComposeConfig {
        self.config.read().await.clone()
    }

    /// Returns the last build error, if any.
    pub async fn last_error(&self) -> Option<ComposeError> {
        self.last_error.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        *self.state.read().await == SchemaState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoopSchemaCache;
    use crate::extension::{ExtensionManifest, ExtensionRegistry, SdlExtension};
    use crate::introspect::{EntityFieldDefinition, EntityTypeDefinition, StaticIntrospector};

    fn composer() -> Arc<SchemaComposer> {
        let introspector = StaticIntrospector::new(vec![EntityTypeDefinition {
            id: "node_page".into(),
            type_name: "NodePage".into(),
            description: String::new(),
            interfaces: vec![],
            fields: vec![EntityFieldDefinition {
                name: "title".into(),
                ty: "String".into(),
                machine_name: Some("title".into()),
                value: false,
                description: String::new(),
            }],
        }]);

        let mut extensions = ExtensionRegistry::new();
        extensions
            .register(SdlExtension::new(ExtensionManifest {
                id: "query".into(),
                base_definition: Some("type Query { page: NodePage }".into()),
                ..Default::default()
            }))
            .unwrap();

        Arc::new(SchemaComposer::new(
            introspector,
            extensions,
            Arc::new(NoopSchemaCache),
        ))
    }

    fn config() -> ComposeConfig {
        ComposeConfig::default()
            .with_entity_type("node_page", ["title"])
            .with_extension("query")
    }

    #[test]
    fn test_schema_state_enum() {
        assert_ne!(SchemaState::Uninitialized, SchemaState::Building);
        assert_ne!(SchemaState::Building, SchemaState::Ready);
        assert_ne!(SchemaState::Ready, SchemaState::Failed);
    }

    #[tokio::test]
    async fn test_builds_once() {
        let lazy = LazySchema::new(composer(), config());
        assert_eq!(lazy.state().await, SchemaState::Uninitialized);
        assert!(lazy.get().await.is_none());

        let first = lazy.get_or_build().await.unwrap();
        let second = lazy.get_or_build_wait().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(lazy.is_ready().await);
        assert!(first.sdl.contains("title: String"));
    }

    #[tokio::test]
    async fn test_invalidate_rebuilds() {
        let lazy = LazySchema::new(composer(), config());
        let first = lazy.get_or_build().await.unwrap();

        lazy.invalidate().await;
        assert_eq!(lazy.state().await, SchemaState::Uninitialized);

        let second = lazy.get_or_build().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.sdl, second.sdl);
    }

    #[tokio::test]
    async fn test_failure_is_remembered() {
        let lazy = LazySchema::new(composer(), ComposeConfig::default());

        let err = lazy.get_or_build().await.unwrap_err();
        assert!(matches!(err, ComposeError::NoEntityTypeEnabled));
        assert_eq!(lazy.state().await, SchemaState::Failed);
        assert!(matches!(
            lazy.last_error().await,
            Some(ComposeError::NoEntityTypeEnabled)
        ));

        let err = lazy.get_or_build_wait().await.unwrap_err();
        assert!(matches!(err, ComposeError::NoEntityTypeEnabled));
    }

    #[tokio::test]
    async fn test_reconfigure() {
        let lazy = LazySchema::new(composer(), ComposeConfig::default());
        assert!(lazy.get_or_build().await.is_err());

        lazy.reconfigure(config()).await;
        assert!(lazy.last_error().await.is_none());

        let schema = lazy.get_or_build_wait().await.unwrap();
        assert_eq!(schema.type_names, vec!["NodePage", "Query"]);
        assert_eq!(lazy.config().await, config());
    }
}
