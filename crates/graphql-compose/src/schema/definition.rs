//! Parser boundary for SDL definitions.
//!
//! Raw SDL is parsed with `async-graphql-parser` and reduced to a tagged
//! [`Definition`]: object and interface definitions become descriptors, and
//! everything else (enums, scalars, unions, inputs, directives, schema
//! definitions and every `extend` form) is carried as-is.

use async_graphql_parser::types::{ServiceDocument, TypeSystemDefinition};
use async_graphql_parser::parse_schema;

use super::descriptor::{TypeDescriptor, TypeKind};
use super::generator::defined_type_name;
use crate::Result;
use crate::error::ComposeError;

/// One parsed top-level definition.
#[derive(Debug, Clone)]
pub enum Definition {
    ObjectType(TypeDescriptor),
    InterfaceType(TypeDescriptor),
    Other(TypeSystemDefinition),
}

impl Definition {
    /// Classifies a parsed definition.
    pub fn from_ast(definition: TypeSystemDefinition) -> Self {
        if let TypeSystemDefinition::Type(ty) = &definition
            && !ty.node.extend
            && let Some(descriptor) = TypeDescriptor::from_type_definition(&ty.node)
        {
            return match descriptor.kind() {
                TypeKind::Object => Self::ObjectType(descriptor),
                TypeKind::Interface => Self::InterfaceType(descriptor),
            };
        }
        Self::Other(definition)
    }

    /// The type name this definition introduces. `extend` forms, directive
    /// and schema definitions introduce none.
    pub fn defined_type_name(&self) -> Option<&str> {
        match self {
            Self::ObjectType(descriptor) | Self::InterfaceType(descriptor) => {
                Some(descriptor.name())
            }
            Self::Other(definition) => defined_type_name(definition),
        }
    }
}

/// Parses SDL text into a document.
///
/// `origin` names the contributor in error messages, for example
/// `extension 'menus' base definition`.
///
/// # Errors
///
/// Returns [`ComposeError::Syntax`] if the text is not valid SDL.
pub fn parse_document(origin: &str, sdl: &str) -> Result<ServiceDocument> {
    parse_schema(sdl).map_err(|e| ComposeError::syntax(origin, e.to_string()))
}

/// Parses SDL text into tagged definitions, preserving order.
///
/// # Errors
///
/// Returns [`ComposeError::Syntax`] if the text is not valid SDL.
pub fn parse_definitions(origin: &str, sdl: &str) -> Result<Vec<Definition>> {
    if sdl.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document = parse_document(origin, sdl)?;
    Ok(document
        .definitions
        .into_iter()
        .map(Definition::from_ast)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_definitions() {
        let definitions = parse_definitions(
            "test",
            r#"
            interface Entity { id: ID! }
            type NodePage implements Entity { id: ID! }
            enum SortKey { TITLE CREATED }
            scalar Html
            directive @deprecatedField on FIELD_DEFINITION
            extend type NodePage { path: String }
            "#,
        )
        .unwrap();

        assert_eq!(definitions.len(), 6);
        assert!(matches!(&definitions[0], Definition::InterfaceType(d) if d.name() == "Entity"));
        assert!(matches!(&definitions[1], Definition::ObjectType(d) if d.name() == "NodePage"));
        assert!(matches!(definitions[2], Definition::Other(_)));
        assert!(matches!(definitions[3], Definition::Other(_)));
        assert!(matches!(definitions[4], Definition::Other(_)));
        assert!(matches!(definitions[5], Definition::Other(_)));

        let names: Vec<&str> = definitions
            .iter()
            .filter_map(Definition::defined_type_name)
            .collect();
        assert_eq!(names, vec!["Entity", "NodePage", "SortKey", "Html"]);
    }

    #[test]
    fn test_empty_source() {
        assert!(parse_definitions("test", "  \n").unwrap().is_empty());
    }

    #[test]
    fn test_syntax_error_names_origin() {
        let err = parse_definitions("extension 'menus' base definition", "type Menu {")
            .unwrap_err();

        match err {
            ComposeError::Syntax { origin, .. } => {
                assert_eq!(origin, "extension 'menus' base definition");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
