//! Schema extensions.
//!
//! An extension contributes SDL in up to three places:
//!
//! - a base definition, merged into the type registry before compiling;
//! - an extension definition, applied to the compiled schema;
//! - a type extension definition, computed from the names of the compiled
//!   types so it can target only types that were actually generated.
//!
//! Extensions are registered explicitly with an [`ExtensionRegistry`]; the
//! configuration decides which of them are active.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ComposeConfig;
use crate::Result;
use crate::error::ComposeError;

/// What an extension sees while producing its definitions.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext<'a> {
    config: &'a ComposeConfig,
    settings: &'a serde_json::Value,
}

impl<'a> ExtensionContext<'a> {
    pub fn new(config: &'a ComposeConfig, extension_id: &str) -> Self {
        Self {
            config,
            settings: config.extension_settings(extension_id),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &'a ComposeConfig {
        self.config
    }

    /// This extension's own settings, `null` if none are configured.
    pub fn settings(&self) -> &'a serde_json::Value {
        self.settings
    }
}

/// A contributor of schema definitions.
pub trait SchemaExtension: Send + Sync {
    /// Unique id, matched against the `extensions` configuration table.
    fn id(&self) -> &str;

    fn base_definition(&self, _ctx: &ExtensionContext<'_>) -> Option<String> {
        None
    }

    fn extension_definition(&self, _ctx: &ExtensionContext<'_>) -> Option<String> {
        None
    }

    /// Definitions that depend on which types were compiled.
    fn type_extension_definition(
        &self,
        _ctx: &ExtensionContext<'_>,
        _existing_types: &[String],
    ) -> Option<String> {
        None
    }

    /// Entity types that must be enabled for this extension.
    fn entity_type_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Extensions that must be active for this extension.
    fn extension_dependencies(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Ordered set of known extensions.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn SchemaExtension>>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension after the ones already registered.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::DuplicateExtension`] if the id is taken.
    pub fn register(
        &mut self,
        extension: impl SchemaExtension + 'static,
    ) -> Result<&mut Self> {
        self.register_arc(Arc::new(extension))
    }

    /// Registers a shared extension.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::DuplicateExtension`] if the id is taken.
    pub fn register_arc(
        &mut self,
        extension: Arc<dyn SchemaExtension>,
    ) -> Result<&mut Self> {
        if self.get(extension.id()).is_some() {
            return Err(ComposeError::DuplicateExtension(extension.id().to_string()));
        }
        self.extensions.push(extension);
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn SchemaExtension>> {
        self.extensions.iter().find(|extension| extension.id() == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(|extension| extension.id())
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Extensions active under `config`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownExtension`] if the configuration enables
    /// an id that is not registered.
    pub fn active(
        &self,
        config: &ComposeConfig,
    ) -> Result<Vec<Arc<dyn SchemaExtension>>> {
        if let Some(unknown) = config.active_extensions().find(|id| self.get(id).is_none()) {
            return Err(ComposeError::UnknownExtension(unknown.to_string()));
        }

        let active: HashSet<&str> = config.active_extensions().collect();

        Ok(self
            .extensions
            .iter()
            .filter(|extension| active.contains(extension.id()))
            .cloned()
            .collect())
    }
}

/// SDL applied only when a type of the given name was compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalDefinition {
    pub when_type: String,
    pub definition: String,
}

/// Data form of an extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub id: String,
    #[serde(default)]
    pub base_definition: Option<String>,
    #[serde(default)]
    pub extension_definition: Option<String>,
    #[serde(default)]
    pub entity_type_dependencies: Vec<String>,
    #[serde(default)]
    pub extension_dependencies: Vec<String>,
    #[serde(default)]
    pub conditional: Vec<ConditionalDefinition>,
}

/// An extension backed by static SDL.
#[derive(Debug, Clone)]
pub struct SdlExtension {
    manifest: ExtensionManifest,
}

impl SdlExtension {
    pub fn new(manifest: ExtensionManifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }
}

impl From<ExtensionManifest> for SdlExtension {
    fn from(manifest: ExtensionManifest) -> Self {
        Self::new(manifest)
    }
}

impl SchemaExtension for SdlExtension {
    fn id(&self) -> &str {
        &self.manifest.id
    }

    fn base_definition(&self, _ctx: &ExtensionContext<'_>) -> Option<String> {
        self.manifest.base_definition.clone()
    }

    fn extension_definition(&self, _ctx: &ExtensionContext<'_>) -> Option<String> {
        self.manifest.extension_definition.clone()
    }

    fn type_extension_definition(
        &self,
        _ctx: &ExtensionContext<'_>,
        existing_types: &[String],
    ) -> Option<String> {
        let matching: Vec<&str> = self
            .manifest
            .conditional
            .iter()
            .filter(|c| existing_types.iter().any(|t| *t == c.when_type))
            .map(|c| c.definition.as_str())
            .collect();

        if matching.is_empty() {
            None
        } else {
            Some(matching.join("\n\n"))
        }
    }

    fn entity_type_dependencies(&self) -> Vec<String> {
        self.manifest.entity_type_dependencies.clone()
    }

    fn extension_dependencies(&self) -> Vec<String> {
        self.manifest.extension_dependencies.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str) -> ExtensionManifest {
        ExtensionManifest {
            id: id.to_string(),
            ..Default::default()
        }
    }

    struct SettingsExtension;

    impl SchemaExtension for SettingsExtension {
        fn id(&self) -> &str {
            "limits"
        }

        fn extension_definition(&self, ctx: &ExtensionContext<'_>) -> Option<String> {
            let limit = ctx.settings()["limit"].as_u64()?;
            Some(format!("extend type Query {{ limit: Int @default(value: {limit}) }}"))
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ExtensionRegistry::new();
        registry.register(SdlExtension::new(manifest("menus"))).unwrap();

        let err = registry
            .register(SdlExtension::new(manifest("menus")))
            .unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateExtension(id) if id == "menus"));
    }

    #[test]
    fn test_active_keeps_registration_order() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(SdlExtension::new(manifest("routes")))
            .unwrap()
            .register(SdlExtension::new(manifest("menus")))
            .unwrap()
            .register(SdlExtension::new(manifest("users")))
            .unwrap();

        let config = ComposeConfig::default()
            .with_extension("menus")
            .with_extension("routes");
        let ids: Vec<String> = registry
            .active(&config)
            .unwrap()
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, vec!["routes", "menus"]);
    }

    #[test]
    fn test_active_rejects_unregistered() {
        let registry = ExtensionRegistry::new();
        let config = ComposeConfig::default().with_extension("menus");

        let err = registry.active(&config).err().unwrap();
        assert!(matches!(err, ComposeError::UnknownExtension(id) if id == "menus"));
    }

    #[test]
    fn test_conditional_definitions() {
        let extension = SdlExtension::new(ExtensionManifest {
            conditional: vec![
                ConditionalDefinition {
                    when_type: "NodeArticle".into(),
                    definition: "extend type NodeArticle { related: [NodeArticle] }".into(),
                },
                ConditionalDefinition {
                    when_type: "NodePage".into(),
                    definition: "extend type NodePage { children: [NodePage] }".into(),
                },
            ],
            ..manifest("related")
        });

        let config = ComposeConfig::default();
        let ctx = ExtensionContext::new(&config, "related");

        let sdl = extension
            .type_extension_definition(&ctx, &["NodeArticle".to_string()])
            .unwrap();
        assert!(sdl.contains("NodeArticle"));
        assert!(!sdl.contains("NodePage"));

        assert!(
            extension
                .type_extension_definition(&ctx, &["Query".to_string()])
                .is_none()
        );
    }

    #[test]
    fn test_context_exposes_settings() {
        let config = ComposeConfig::default()
            .with_extension_settings("limits", serde_json::json!({ "limit": 25 }));
        let ctx = ExtensionContext::new(&config, "limits");

        let sdl = SettingsExtension.extension_definition(&ctx).unwrap();
        assert!(sdl.contains("value: 25"));

        let empty = ComposeConfig::default();
        assert!(
            SettingsExtension
                .extension_definition(&ExtensionContext::new(&empty, "limits"))
                .is_none()
        );
    }

    #[test]
    fn test_manifest_from_toml() {
        let manifest: ExtensionManifest = toml::from_str(
            r#"
            id = "menus"
            entity_type_dependencies = ["menu"]
            base_definition = "type Menu { name: String }"

            [[conditional]]
            when_type = "NodePage"
            definition = "extend type NodePage { menu: Menu }"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.id, "menus");
        assert_eq!(manifest.entity_type_dependencies, vec!["menu"]);
        assert!(manifest.extension_definition.is_none());
        assert_eq!(manifest.conditional.len(), 1);
    }
}
