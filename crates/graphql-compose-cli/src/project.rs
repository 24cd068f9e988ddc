//! Project files.
//!
//! A project file holds the composition configuration, the entity type
//! definitions and the extension manifests. Extension SDL lives in separate
//! files whose paths are relative to the project file.
//!
//! ```toml
//! scalars = ["Html"]
//!
//! [config.entity_types.node_page]
//! fields = ["title"]
//!
//! [config.extensions.routes]
//!
//! [[entity_types]]
//! id = "node_page"
//! type_name = "NodePage"
//!
//! [[entity_types.fields]]
//! name = "title"
//! type = "String!"
//! machine_name = "title"
//!
//! [[extensions]]
//! id = "routes"
//! base_definition = "sdl/routes.graphqls"
//!
//! [[extensions.conditional]]
//! when_type = "NodePage"
//! definition = "sdl/routes.node_page.graphqls"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use graphql_compose::{
    ComposeConfig, ConditionalDefinition, EntityTypeDefinition, ExtensionManifest,
    ExtensionRegistry, NoopSchemaCache, SchemaComposer, SdlExtension, StaticIntrospector,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    config: ComposeConfig,
    #[serde(default)]
    scalars: Vec<String>,
    #[serde(default)]
    entity_types: Vec<EntityTypeDefinition>,
    #[serde(default)]
    extensions: Vec<ExtensionFile>,
}

/// Extension manifest with SDL file paths.
#[derive(Debug, Deserialize)]
struct ExtensionFile {
    id: String,
    #[serde(default)]
    base_definition: Option<PathBuf>,
    #[serde(default)]
    extension_definition: Option<PathBuf>,
    #[serde(default)]
    entity_type_dependencies: Vec<String>,
    #[serde(default)]
    extension_dependencies: Vec<String>,
    #[serde(default)]
    conditional: Vec<ConditionalFile>,
}

#[derive(Debug, Deserialize)]
struct ConditionalFile {
    when_type: String,
    definition: PathBuf,
}

/// A loaded project.
#[derive(Debug)]
pub struct Project {
    pub config: ComposeConfig,
    pub introspector: StaticIntrospector,
    pub extensions: ExtensionRegistry,
}

impl Project {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read project file {}", path.display()))?;
        let file: ProjectFile = toml::from_str(&content)
            .with_context(|| format!("Invalid project file {}", path.display()))?;
        file.config.validate()?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut extensions = ExtensionRegistry::new();
        for extension in file.extensions {
            let manifest = extension.into_manifest(base_dir)?;
            debug!(extension = %manifest.id, "Loaded extension manifest");
            extensions.register(SdlExtension::new(manifest))?;
        }

        Ok(Self {
            config: file.config,
            introspector: StaticIntrospector::new(file.entity_types).with_scalars(file.scalars),
            extensions,
        })
    }

    /// Builds an uncached composer for this project.
    pub fn into_composer(self) -> (SchemaComposer, ComposeConfig) {
        let composer = SchemaComposer::new(
            self.introspector,
            self.extensions,
            Arc::new(NoopSchemaCache),
        );
        (composer, self.config)
    }
}

impl ExtensionFile {
    fn into_manifest(self, base_dir: &Path) -> Result<ExtensionManifest> {
        let conditional = self
            .conditional
            .into_iter()
            .map(|c| {
                Ok(ConditionalDefinition {
                    when_type: c.when_type,
                    definition: read_sdl(base_dir, &c.definition)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ExtensionManifest {
            base_definition: self
                .base_definition
                .map(|p| read_sdl(base_dir, &p))
                .transpose()?,
            extension_definition: self
                .extension_definition
                .map(|p| read_sdl(base_dir, &p))
                .transpose()?,
            entity_type_dependencies: self.entity_type_dependencies,
            extension_dependencies: self.extension_dependencies,
            conditional,
            id: self.id,
        })
    }
}

fn read_sdl(base_dir: &Path, path: &Path) -> Result<String> {
    let path = base_dir.join(path);
    fs::read_to_string(&path).with_context(|| format!("Cannot read SDL file {}", path.display()))
}
