//! Composition configuration.
//!
//! The configuration selects which entity types and extensions take part in a
//! composition. It is usually loaded from the `[config]` table of a project
//! file.
//!
//! # Example Configuration
//!
//! ```toml
//! generate_value_fields = true
//! entity_base_fields = ["id", "uuid", "label"]
//!
//! [entity_types.node_article]
//! fields = ["body", "field_tags"]
//!
//! [entity_types.node_page]
//! enabled = false
//!
//! [extensions.routes]
//!
//! [extensions.menus.settings]
//! max_depth = 3
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;
use crate::error::ComposeError;

static NULL_SETTINGS: serde_json::Value = serde_json::Value::Null;

/// Configuration of one composition.
///
/// Maps are ordered so the serialized form, and with it the fingerprint, is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Generate the `{value}` variants of entity fields.
    /// Default: true
    #[serde(default = "default_generate_value_fields")]
    pub generate_value_fields: bool,

    /// Fields of the base `Entity` interface that survive the whitelist.
    /// Default: id, uuid, label
    #[serde(default = "default_entity_base_fields")]
    pub entity_base_fields: BTreeSet<String>,

    /// Entity types by id.
    #[serde(default)]
    pub entity_types: BTreeMap<String, EntityTypeConfig>,

    /// Extensions by id.
    #[serde(default)]
    pub extensions: BTreeMap<String, ExtensionConfig>,
}

/// Per entity type settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Machine names of the fields exposed on this type.
    #[serde(default)]
    pub fields: BTreeSet<String>,
}

/// Per extension settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Free-form settings handed to the extension.
    #[serde(default)]
    pub settings: serde_json::Value,
}

fn default_generate_value_fields() -> bool {
    true
}

fn default_entity_base_fields() -> BTreeSet<String> {
    ["id", "uuid", "label"].into_iter().map(String::from).collect()
}

fn default_enabled() -> bool {
    true
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            generate_value_fields: default_generate_value_fields(),
            entity_base_fields: default_entity_base_fields(),
            entity_types: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }
}

impl ComposeConfig {
    /// Parses a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Config`] if the text is not a valid
    /// configuration.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ComposeError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Enables an entity type with the given fields.
    #[must_use]
    pub fn with_entity_type<I, S>(mut self, id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_types.insert(
            id.into(),
            EntityTypeConfig {
                enabled: true,
                fields: fields.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Enables an extension without settings.
    #[must_use]
    pub fn with_extension(self, id: impl Into<String>) -> Self {
        self.with_extension_settings(id, serde_json::Value::Null)
    }

    /// Enables an extension with settings.
    #[must_use]
    pub fn with_extension_settings(
        mut self,
        id: impl Into<String>,
        settings: serde_json::Value,
    ) -> Self {
        self.extensions.insert(
            id.into(),
            ExtensionConfig {
                enabled: true,
                settings,
            },
        );
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Config`] if an id is empty or a whitelisted base
    /// field is not a valid GraphQL name.
    pub fn validate(&self) -> Result<()> {
        if let Some(field) = self.entity_base_fields.iter().find(|f| !is_graphql_name(f)) {
            return Err(ComposeError::config(format!(
                "entity_base_fields contains invalid field name '{field}'"
            )));
        }
        if self.entity_types.keys().any(|id| id.trim().is_empty()) {
            return Err(ComposeError::config("entity type ids must not be empty"));
        }
        if self.extensions.keys().any(|id| id.trim().is_empty()) {
            return Err(ComposeError::config("extension ids must not be empty"));
        }
        Ok(())
    }

    pub fn enabled_entity_types(&self) -> impl Iterator<Item = &str> {
        self.entity_types
            .iter()
            .filter(|(_, entity_type)| entity_type.enabled)
            .map(|(id, _)| id.as_str())
    }

    pub fn is_entity_type_enabled(&self, id: &str) -> bool {
        self.entity_types.get(id).is_some_and(|e| e.enabled)
    }

    /// Checks if a field of an enabled entity type is exposed.
    pub fn is_field_enabled(&self, entity_type: &str, machine_name: &str) -> bool {
        self.entity_types
            .get(entity_type)
            .is_some_and(|e| e.enabled && e.fields.contains(machine_name))
    }

    pub fn active_extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions
            .iter()
            .filter(|(_, extension)| extension.enabled)
            .map(|(id, _)| id.as_str())
    }

    pub fn is_extension_active(&self, id: &str) -> bool {
        self.extensions.get(id).is_some_and(|e| e.enabled)
    }

    /// Settings of an extension, `null` if it has none.
    pub fn extension_settings(&self, id: &str) -> &serde_json::Value {
        self.extensions
            .get(id)
            .map_or(&NULL_SETTINGS, |extension| &extension.settings)
    }

    /// Stable fingerprint of this configuration.
    ///
    /// Hex-encoded SHA-256 of the canonical JSON encoding. Equal
    /// configurations produce equal fingerprints.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Internal`] if the configuration cannot be
    /// serialized.
    pub fn fingerprint(&self) -> Result<String> {
        let encoded = serde_json::to_vec(self)
            .map_err(|e| ComposeError::Internal(format!("failed to encode configuration: {e}")))?;
        Ok(hex::encode(Sha256::digest(&encoded)))
    }
}

fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ComposeConfig::default();
        assert!(config.generate_value_fields);
        assert_eq!(
            config.entity_base_fields.iter().collect::<Vec<_>>(),
            vec!["id", "label", "uuid"]
        );
        assert!(config.entity_types.is_empty());
        assert!(config.extensions.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_toml() {
        let config = ComposeConfig::from_toml_str(
            r#"
            generate_value_fields = false

            [entity_types.node_article]
            fields = ["body", "field_tags"]

            [entity_types.node_page]
            enabled = false

            [extensions.routes]

            [extensions.menus]
            enabled = true
            settings = { max_depth = 3 }
            "#,
        )
        .unwrap();

        assert!(!config.generate_value_fields);
        assert_eq!(config.entity_base_fields.len(), 3);
        assert_eq!(
            config.enabled_entity_types().collect::<Vec<_>>(),
            vec!["node_article"]
        );
        assert!(config.is_field_enabled("node_article", "body"));
        assert!(!config.is_field_enabled("node_article", "title"));
        assert!(!config.is_field_enabled("node_page", "body"));
        assert_eq!(
            config.active_extensions().collect::<Vec<_>>(),
            vec!["menus", "routes"]
        );
        assert_eq!(config.extension_settings("menus")["max_depth"], 3);
        assert!(config.extension_settings("unknown").is_null());
    }

    #[test]
    fn test_invalid_base_field() {
        let mut config = ComposeConfig::default();
        config.entity_base_fields.insert("not-a-name".into());
        assert!(matches!(config.validate(), Err(ComposeError::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let err = ComposeConfig::from_toml_str("generate_value_fields = \"yes\"").unwrap_err();
        assert!(matches!(err, ComposeError::Config(_)));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = ComposeConfig::default()
            .with_entity_type("node_article", ["body"])
            .with_extension("routes")
            .with_extension("menus");
        let b = ComposeConfig::default()
            .with_extension("menus")
            .with_extension("routes")
            .with_entity_type("node_article", ["body"]);

        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_config() {
        let a = ComposeConfig::default().with_entity_type("node_article", ["body"]);
        let b = ComposeConfig::default().with_entity_type("node_article", ["body", "tags"]);
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
