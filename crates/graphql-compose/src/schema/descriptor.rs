//! Object and interface type descriptors.
//!
//! A [`TypeDescriptor`] keeps its fields exactly as they were added. The
//! emitted field set is computed on demand by [`TypeDescriptor::fields`],
//! which deduplicates by machine name and resolves human-name collisions.

use std::collections::HashSet;
use std::fmt;

use async_graphql_parser::types::{TypeDefinition, TypeKind as AstTypeKind};
use indexmap::IndexMap;

use super::field::FieldDescriptor;
use super::printer::print_directive;
use crate::Result;
use crate::error::ComposeError;

/// Variant tag of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Interface,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("object"),
            Self::Interface => f.write_str("interface"),
        }
    }
}

/// A named collection of fields prior to compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    name: String,
    kind: TypeKind,
    description: String,
    fields: Vec<FieldDescriptor>,
    interfaces: Vec<String>,
    directives: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            fields: Vec::new(),
            interfaces: Vec::new(),
            directives: Vec::new(),
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Object)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Builds a descriptor from an object or interface definition.
    ///
    /// Returns `None` for every other definition kind.
    pub fn from_type_definition(definition: &TypeDefinition) -> Option<Self> {
        let (kind, implements, fields) = match &definition.kind {
            AstTypeKind::Object(object) => (TypeKind::Object, &object.implements, &object.fields),
            AstTypeKind::Interface(interface) => {
                (TypeKind::Interface, &interface.implements, &interface.fields)
            }
            _ => return None,
        };

        let mut descriptor = Self::new(definition.name.node.as_str(), kind);
        if let Some(description) = &definition.description {
            descriptor.description = description.node.clone();
        }
        for field in fields {
            descriptor.add_field(FieldDescriptor::from_field_definition(&field.node));
        }
        for interface in implements {
            descriptor.add_interface(interface.node.as_str());
        }
        for directive in &definition.directives {
            descriptor.add_directive(print_directive(&directive.node));
        }

        Some(descriptor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn add_field(&mut self, field: FieldDescriptor) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn add_interface(&mut self, interface: impl Into<String>) -> &mut Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn add_directive(&mut self, directive: impl Into<String>) -> &mut Self {
        self.directives.push(directive.into());
        self
    }

    /// Applied directives in SDL form.
    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    /// Fields in insertion order, duplicates included.
    pub fn raw_fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// The emitted field set.
    ///
    /// Fields sharing a machine name and value flag keep only the first
    /// occurrence. A field whose human name is already emitted falls back to
    /// its machine name; without one it is dropped. The fallback name is not
    /// checked again, so a field already emitted under that name is replaced
    /// in place.
    pub fn fields(&self) -> IndexMap<String, FieldDescriptor> {
        let mut seen = HashSet::new();
        let mut output: IndexMap<String, FieldDescriptor> = IndexMap::new();

        for field in &self.fields {
            if let Some(machine_name) = field.machine_name() {
                let key = format!("{machine_name}-{}", u8::from(field.is_value_field()));
                if !seen.insert(key) {
                    continue;
                }
            }

            let name = if output.contains_key(field.name()) {
                field.machine_name()
            } else {
                Some(field.name())
            };

            let Some(name) = name.filter(|name| !name.is_empty()) else {
                continue;
            };

            output.insert(name.to_string(), field.clone());
        }

        output
    }

    /// Appends another descriptor's fields and interfaces to this one.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::KindConflict`] if the kinds differ.
    pub fn merge(&mut self, other: TypeDescriptor) -> Result<()> {
        if self.kind != other.kind {
            return Err(ComposeError::KindConflict {
                name: self.name.clone(),
                existing: self.kind,
                incoming: other.kind,
            });
        }

        if self.description.is_empty() {
            self.description = other.description;
        }
        self.fields.extend(other.fields);
        self.interfaces.extend(other.interfaces);
        for directive in other.directives {
            if !self.directives.contains(&directive) {
                self.directives.push(directive);
            }
        }
        Ok(())
    }

    /// Retains only the raw fields whose name is in `allowed`.
    pub fn keep_fields(&mut self, allowed: &HashSet<String>) {
        self.fields.retain(|field| allowed.contains(field.name()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, machine_name: &str, value: bool) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(name, "String");
        field.set_machine_name(machine_name);
        if value {
            field.mark_value_field();
        }
        field
    }

    #[test]
    fn test_dedup_five_fields() {
        let mut descriptor = TypeDescriptor::object("Test");
        descriptor
            .add_field(field("field11", "field_11", false))
            .add_field(field("field111", "field_11_1", false))
            .add_field(field("field11RawField", "field_1_1", false))
            .add_field(field("field11", "field_1_1", true))
            .add_field(field("field11", "field_11", true));

        let fields = descriptor.fields();
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();

        assert_eq!(
            names,
            vec!["field11", "field111", "field11RawField", "field_1_1", "field_11"]
        );
        assert!(fields["field_1_1"].is_value_field());
        assert!(fields["field_11"].is_value_field());
        assert!(!fields["field11"].is_value_field());
    }

    #[test]
    fn test_value_flag_distinguishes_same_machine_name() {
        let mut descriptor = TypeDescriptor::object("Article");
        descriptor
            .add_field(field("image", "field_image", false))
            .add_field(field("image", "field_image", true));

        let fields = descriptor.fields();
        assert_eq!(fields.len(), 2);
        assert!(!fields["image"].is_value_field());
        assert!(fields["field_image"].is_value_field());
    }

    #[test]
    fn test_same_machine_name_and_flag_keeps_first() {
        let mut descriptor = TypeDescriptor::object("Article");
        let mut first = field("tags", "field_tags", false);
        first.set_description("first");
        let mut second = field("keywords", "field_tags", false);
        second.set_description("second");
        descriptor.add_field(first).add_field(second);

        let fields = descriptor.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["tags"].raw_description(), "first");
    }

    #[test]
    fn test_unkeyed_name_collision_keeps_first() {
        let mut descriptor = TypeDescriptor::object("Article");
        descriptor
            .add_field(FieldDescriptor::new("id", "ID"))
            .add_field(FieldDescriptor::new("id", "String"));

        let fields = descriptor.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["id"].type_name(), "ID");
    }

    #[test]
    fn test_second_order_collision_replaces_earlier_field() {
        // The fallback name is not re-checked: `field_body` is already emitted
        // by the first field, so the third field replaces it in place.
        let mut descriptor = TypeDescriptor::object("Article");
        descriptor
            .add_field(FieldDescriptor::new("field_body", "String"))
            .add_field(field("body", "field_summary", false))
            .add_field(field("body", "field_body", false));

        let fields = descriptor.fields();
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();

        assert_eq!(names, vec!["field_body", "body"]);
        assert_eq!(fields["field_body"].machine_name(), Some("field_body"));
        assert_eq!(descriptor.raw_fields().len(), 3);
    }

    #[test]
    fn test_raw_fields_keep_duplicates() {
        let mut descriptor = TypeDescriptor::object("Article");
        descriptor
            .add_field(field("title", "title", false))
            .add_field(field("title", "title", false));

        assert_eq!(descriptor.raw_fields().len(), 2);
        assert_eq!(descriptor.directives(), &["@cached"]);
        assert_eq!(descriptor.fields().len(), 1);
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut a = TypeDescriptor::interface("Entity");
        a.add_field(FieldDescriptor::new("id", "ID"))
            .add_interface("Node");
        let mut b = TypeDescriptor::interface("Entity");
        b.add_field(FieldDescriptor::new("label", "String"))
            .add_field(FieldDescriptor::new("uuid", "ID"))
            .add_interface("Labeled");

        a.merge(b).unwrap();

        let names: Vec<&str> = a.raw_fields().iter().map(FieldDescriptor::name).collect();
        assert_eq!(names, vec!["id", "label", "uuid"]);
        assert_eq!(a.interfaces(), &["Node".to_string(), "Labeled".to_string()]);
    }

    #[test]
    fn test_merge_keeps_directives_once() {
        let mut a = TypeDescriptor::object("Query");
        a.add_directive("@cached(ttl: 60)");
        let mut b = TypeDescriptor::object("Query");
        b.add_directive("@cached(ttl: 60)").add_directive("@internal");

        a.merge(b).unwrap();
        assert_eq!(a.directives(), &["@cached(ttl: 60)", "@internal"]);
    }

    #[test]
    fn test_merge_rejects_kind_conflict() {
        let mut a = TypeDescriptor::interface("Media");
        let b = TypeDescriptor::object("Media");

        let err = a.merge(b).unwrap_err();
        assert!(matches!(err, ComposeError::KindConflict { .. }));
    }

    #[test]
    fn test_keep_fields() {
        let mut descriptor = TypeDescriptor::interface("Entity");
        descriptor
            .add_field(FieldDescriptor::new("id", "ID"))
            .add_field(FieldDescriptor::new("status", "Boolean"))
            .add_field(FieldDescriptor::new("metatag", "String"));

        let allowed: HashSet<String> = ["id", "metatag"].into_iter().map(String::from).collect();
        descriptor.keep_fields(&allowed);

        let names: Vec<&str> = descriptor
            .raw_fields()
            .iter()
            .map(FieldDescriptor::name)
            .collect();
        assert_eq!(names, vec!["id", "metatag"]);
    }

    #[test]
    fn test_from_type_definition() {
        use async_graphql_parser::parse_schema;
        use async_graphql_parser::types::TypeSystemDefinition;

        let document = parse_schema(
            r#""An article" type NodeArticle implements Entity & EntityTranslatable @cached { id: ID! title: String }
            enum Status { ON OFF }"#,
        )
        .unwrap();

        let TypeSystemDefinition::Type(article) = &document.definitions[0] else {
            panic!("expected a type definition");
        };
        let descriptor = TypeDescriptor::from_type_definition(&article.node).unwrap();
        assert_eq!(descriptor.name(), "NodeArticle");
        assert_eq!(descriptor.kind(), TypeKind::Object);
        assert_eq!(descriptor.description(), "An article");
        assert_eq!(descriptor.interfaces().len(), 2);
        assert_eq!(descriptor.raw_fields().len(), 2);
        assert_eq!(descriptor.directives(), &["@cached"]);

        let TypeSystemDefinition::Type(status) = &document.definitions[1] else {
            panic!("expected a type definition");
        };
        assert!(TypeDescriptor::from_type_definition(&status.node).is_none());
    }
}
