//! Error types for schema composition.
//!
//! Errors fall into two groups: configuration errors raised before any type
//! is compiled (nothing enabled, unmet extension dependencies) and build
//! errors raised while definitions are merged, compiled, or extended. Field
//! name collisions are never errors; they are resolved by the machine-name
//! fallback in [`crate::schema::TypeDescriptor::fields`].

use thiserror::Error;

use crate::schema::TypeKind;

/// Errors that can occur while composing a schema.
#[derive(Debug, Clone, Error)]
pub enum ComposeError {
    #[error("No entity type is enabled, refusing to build an empty schema")]
    NoEntityTypeEnabled,

    #[error("Extension '{extension}' requires entity type '{entity_type}' which is not enabled")]
    MissingEntityType {
        extension: String,
        entity_type: String,
    },

    #[error("Extension '{extension}' requires extension '{dependency}' which is not active")]
    MissingExtension {
        extension: String,
        dependency: String,
    },

    #[error("Extension '{0}' is enabled in the configuration but not registered")]
    UnknownExtension(String),

    #[error("Extension '{0}' is registered more than once")]
    DuplicateExtension(String),

    #[error("Syntax error in {origin}: {message}")]
    Syntax { origin: String, message: String },

    #[error("Type '{name}' is already defined as {existing}, cannot redefine it as {incoming}")]
    KindConflict {
        name: String,
        existing: TypeKind,
        incoming: TypeKind,
    },

    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),

    #[error("Unknown type '{name}' referenced by '{referenced_by}'")]
    UnknownType { name: String, referenced_by: String },

    #[error("Type '{type_name}' implements '{interface}' which is not an interface")]
    NotAnInterface { type_name: String, interface: String },

    #[error("Interface '{0}' is part of an interface implementation cycle")]
    CyclicInterface(String),

    #[error("Cannot extend type '{0}' because it does not exist")]
    UnknownExtendedType(String),

    #[error("Field '{type_name}.{field}' already exists and cannot be redefined by an extension")]
    DuplicateField { type_name: String, field: String },

    #[error("Invalid extension of '{type_name}': {reason}")]
    InvalidExtension { type_name: String, reason: String },

    #[error("Entity introspection failed: {0}")]
    Introspection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema is being built, please retry")]
    SchemaInitializing,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ComposeError {
    /// Create a new Syntax error for the given definition source.
    pub fn syntax(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Create a new UnknownType error.
    pub fn unknown_type(name: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        Self::UnknownType {
            name: name.into(),
            referenced_by: referenced_by.into(),
        }
    }

    /// Create a new Configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the stable error code for diagnostics.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoEntityTypeEnabled => "NO_ENTITY_TYPE_ENABLED",
            Self::MissingEntityType { .. } => "MISSING_ENTITY_TYPE",
            Self::MissingExtension { .. } => "MISSING_EXTENSION",
            Self::UnknownExtension(_) => "UNKNOWN_EXTENSION",
            Self::DuplicateExtension(_) => "DUPLICATE_EXTENSION",
            Self::Syntax { .. } => "SYNTAX_ERROR",
            Self::KindConflict { .. } => "KIND_CONFLICT",
            Self::DuplicateType(_) => "DUPLICATE_TYPE",
            Self::UnknownType { .. } => "UNKNOWN_TYPE",
            Self::NotAnInterface { .. } => "NOT_AN_INTERFACE",
            Self::CyclicInterface(_) => "CYCLIC_INTERFACE",
            Self::UnknownExtendedType(_) => "UNKNOWN_EXTENDED_TYPE",
            Self::DuplicateField { .. } => "DUPLICATE_FIELD",
            Self::InvalidExtension { .. } => "INVALID_EXTENSION",
            Self::Introspection(_) => "INTROSPECTION_FAILED",
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::SchemaInitializing => "SCHEMA_INITIALIZING",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this error is raised before composition starts.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoEntityTypeEnabled
                | Self::MissingEntityType { .. }
                | Self::MissingExtension { .. }
                | Self::UnknownExtension(_)
                | Self::DuplicateExtension(_)
                | Self::Config(_)
        )
    }
}
