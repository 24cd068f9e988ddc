//! Applies SDL extension text to a compiled schema.
//!
//! New definitions are added before any `extend` form is applied, so an
//! extension document may extend the types it introduces. Interfaces are
//! added before objects for the same reason.

use std::collections::HashSet;
use std::rc::Rc;

use async_graphql_parser::Positioned;
use async_graphql_parser::types::{
    ConstDirective, FieldDefinition, SchemaDefinition, TypeDefinition, TypeKind as AstTypeKind,
    TypeSystemDefinition,
};
use async_graphql_value::Name;
use tracing::{debug, trace};

use super::definition::parse_document;
use super::descriptor::{TypeDescriptor, TypeKind};
use super::field::FieldDescriptor;
use super::generator::{CompiledSchema, compile_field, defined_type_name, is_extension};
use super::output::{BuiltinScalar, CompiledKind, CompiledType, OutputType};
use super::printer::print_directive;
use crate::Result;
use crate::error::ComposeError;

/// Applies extension documents to a compiled schema.
pub struct SchemaExtender;

impl SchemaExtender {
    /// Parses `sdl` and applies it to the schema. Blank text is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Syntax`] naming `origin` if the text does not
    /// parse, or the error of the first definition that cannot be applied.
    pub fn apply(schema: &mut CompiledSchema, origin: &str, sdl: &str) -> Result<()> {
        if sdl.trim().is_empty() {
            return Ok(());
        }

        let document = parse_document(origin, sdl)?;
        debug!(origin = %origin, definitions = document.definitions.len(), "Applying extension definitions");
        Self::apply_definitions(schema, document.definitions)
    }

    /// Applies parsed definitions to the schema.
    ///
    /// # Errors
    ///
    /// Returns the error of the first definition that cannot be applied.
    pub fn apply_definitions(
        schema: &mut CompiledSchema,
        definitions: Vec<TypeSystemDefinition>,
    ) -> Result<()> {
        let (extensions, additions): (Vec<_>, Vec<_>) =
            definitions.into_iter().partition(is_extension);
        let (interfaces, others): (Vec<_>, Vec<_>) =
            additions.into_iter().partition(is_interface_definition);

        for definition in interfaces.into_iter().chain(others) {
            add_definition(schema, definition)?;
        }
        for extension in extensions {
            extend_definition(schema, extension)?;
        }
        Ok(())
    }
}

fn is_interface_definition(definition: &TypeSystemDefinition) -> bool {
    matches!(
        definition,
        TypeSystemDefinition::Type(ty) if matches!(ty.node.kind, AstTypeKind::Interface(_))
    )
}

fn add_definition(
    schema: &mut CompiledSchema,
    definition: TypeSystemDefinition,
) -> Result<()> {
    match &definition {
        TypeSystemDefinition::Type(ty) => {
            let name = ty.node.name.node.as_str();
            if schema.defines(name) {
                return Err(ComposeError::DuplicateType(name.to_string()));
            }

            if let Some(descriptor) = TypeDescriptor::from_type_definition(&ty.node) {
                let compiled = compile_descriptor(schema, &descriptor)?;
                trace!(type_name = %name, "Adding type from extension");
                schema.types.insert(name.to_string(), Rc::new(compiled));
                return Ok(());
            }
        }
        TypeSystemDefinition::Directive(directive) => {
            let name = directive.node.name.node.as_str();
            let exists = schema.passthrough.iter().any(|existing| {
                matches!(
                    existing,
                    TypeSystemDefinition::Directive(d) if d.node.name.node.as_str() == name
                )
            });
            if exists {
                return Err(ComposeError::DuplicateType(format!("@{name}")));
            }
        }
        TypeSystemDefinition::Schema(_) => {
            let exists = schema.passthrough.iter().any(|existing| {
                matches!(existing, TypeSystemDefinition::Schema(s) if !s.node.extend)
            });
            if exists {
                return Err(ComposeError::DuplicateType("schema".to_string()));
            }
        }
    }

    schema.passthrough.push(definition);
    Ok(())
}

fn compile_descriptor(
    schema: &CompiledSchema,
    descriptor: &TypeDescriptor,
) -> Result<CompiledType> {
    let mut interfaces: Vec<OutputType> = Vec::new();
    for interface in descriptor.interfaces() {
        if interfaces.iter().any(|i| &i.name == interface) {
            continue;
        }
        interfaces.push(resolve_interface(schema, descriptor.name(), interface)?);
    }

    Ok(CompiledType {
        name: descriptor.name().to_string(),
        kind: match descriptor.kind() {
            TypeKind::Object => CompiledKind::Object,
            TypeKind::Interface => CompiledKind::Interface,
        },
        description: descriptor.description().to_string(),
        fields: descriptor
            .fields()
            .iter()
            .map(|(name, field)| compile_field(name, field))
            .collect(),
        interfaces,
        directives: descriptor.directives().to_vec(),
    })
}

fn resolve_interface(
    schema: &CompiledSchema,
    type_name: &str,
    interface: &str,
) -> Result<OutputType> {
    if interface == type_name {
        return Err(ComposeError::CyclicInterface(interface.to_string()));
    }

    match schema.get(interface) {
        Some(ty) if ty.kind == CompiledKind::Interface => Ok(Rc::clone(ty)),
        None if !schema.defines(interface) => {
            Err(ComposeError::unknown_type(interface, type_name))
        }
        _ => Err(ComposeError::NotAnInterface {
            type_name: type_name.to_string(),
            interface: interface.to_string(),
        }),
    }
}

fn extend_definition(
    schema: &mut CompiledSchema,
    definition: TypeSystemDefinition,
) -> Result<()> {
    match definition {
        TypeSystemDefinition::Schema(extension) => extend_schema(schema, extension.node),
        TypeSystemDefinition::Type(extension) => {
            let TypeDefinition {
                name,
                directives,
                kind,
                ..
            } = extension.node;
            let name = name.node.to_string();

            match kind {
                AstTypeKind::Object(object) => extend_compiled(
                    schema,
                    &name,
                    TypeKind::Object,
                    object.implements,
                    object.fields,
                    &directives,
                ),
                AstTypeKind::Interface(interface) => extend_compiled(
                    schema,
                    &name,
                    TypeKind::Interface,
                    interface.implements,
                    interface.fields,
                    &directives,
                ),
                kind => extend_passthrough(schema, &name, directives, kind),
            }
        }
        definition @ TypeSystemDefinition::Directive(_) => add_definition(schema, definition),
    }
}

fn extend_compiled(
    schema: &mut CompiledSchema,
    type_name: &str,
    kind: TypeKind,
    implements: Vec<Positioned<Name>>,
    fields: Vec<Positioned<FieldDefinition>>,
    directives: &[Positioned<ConstDirective>],
) -> Result<()> {
    let Some(existing) = schema.get(type_name) else {
        if schema.defines(type_name) {
            return Err(ComposeError::InvalidExtension {
                type_name: type_name.to_string(),
                reason: format!("it is not an {kind} type"),
            });
        }
        return Err(ComposeError::UnknownExtendedType(type_name.to_string()));
    };

    let existing_kind = match existing.kind {
        CompiledKind::Object => TypeKind::Object,
        CompiledKind::Interface => TypeKind::Interface,
        CompiledKind::Scalar => {
            return Err(ComposeError::InvalidExtension {
                type_name: type_name.to_string(),
                reason: "built-in scalars cannot be extended".to_string(),
            });
        }
    };
    if existing_kind != kind {
        return Err(ComposeError::KindConflict {
            name: type_name.to_string(),
            existing: existing_kind,
            incoming: kind,
        });
    }

    let mut compiled_fields = existing.fields.clone();
    for field in &fields {
        let descriptor = FieldDescriptor::from_field_definition(&field.node);
        if compiled_fields.iter().any(|f| f.name == descriptor.name()) {
            return Err(ComposeError::DuplicateField {
                type_name: type_name.to_string(),
                field: descriptor.name().to_string(),
            });
        }
        compiled_fields.push(compile_field(descriptor.name(), &descriptor));
    }

    let mut interfaces = existing.interfaces.clone();
    for interface in &implements {
        let interface = interface.node.as_str();
        if interfaces.iter().any(|i| i.name == interface) {
            continue;
        }
        interfaces.push(resolve_interface(schema, type_name, interface)?);
    }

    let mut applied = existing.directives.clone();
    for directive in directives {
        let directive = print_directive(&directive.node);
        if !applied.contains(&directive) {
            applied.push(directive);
        }
    }

    let extended = CompiledType {
        name: type_name.to_string(),
        kind: existing.kind,
        description: existing.description.clone(),
        fields: compiled_fields,
        interfaces,
        directives: applied,
    };
    trace!(type_name = %type_name, fields = fields.len(), "Extending type");
    schema.replace_type(extended);
    Ok(())
}

fn extend_passthrough(
    schema: &mut CompiledSchema,
    type_name: &str,
    directives: Vec<Positioned<ConstDirective>>,
    kind: AstTypeKind,
) -> Result<()> {
    let index = schema
        .passthrough
        .iter()
        .position(|definition| defined_type_name(definition) == Some(type_name));

    let Some(index) = index else {
        if schema.types.contains_key(type_name) || BuiltinScalar::from_name(type_name).is_some() {
            return Err(ComposeError::InvalidExtension {
                type_name: type_name.to_string(),
                reason: format!("it is not {}", kind_label(&kind)),
            });
        }
        return Err(ComposeError::UnknownExtendedType(type_name.to_string()));
    };

    let TypeSystemDefinition::Type(target) = &mut schema.passthrough[index] else {
        return Err(ComposeError::Internal(format!(
            "passthrough entry for '{type_name}' is not a type definition"
        )));
    };
    let target = &mut target.node;

    match (&mut target.kind, kind) {
        (AstTypeKind::Scalar, AstTypeKind::Scalar) => {}
        (AstTypeKind::Enum(existing), AstTypeKind::Enum(extension)) => {
            for value in extension.values {
                let name = value.node.value.node.as_str();
                if existing
                    .values
                    .iter()
                    .any(|v| v.node.value.node.as_str() == name)
                {
                    return Err(ComposeError::DuplicateField {
                        type_name: type_name.to_string(),
                        field: name.to_string(),
                    });
                }
                existing.values.push(value);
            }
        }
        (AstTypeKind::Union(existing), AstTypeKind::Union(extension)) => {
            let mut members: HashSet<String> = existing
                .members
                .iter()
                .map(|m| m.node.to_string())
                .collect();
            for member in extension.members {
                if members.insert(member.node.to_string()) {
                    existing.members.push(member);
                }
            }
        }
        (AstTypeKind::InputObject(existing), AstTypeKind::InputObject(extension)) => {
            for field in extension.fields {
                let name = field.node.name.node.as_str();
                if existing
                    .fields
                    .iter()
                    .any(|f| f.node.name.node.as_str() == name)
                {
                    return Err(ComposeError::DuplicateField {
                        type_name: type_name.to_string(),
                        field: name.to_string(),
                    });
                }
                existing.fields.push(field);
            }
        }
        (existing, incoming) => {
            return Err(ComposeError::InvalidExtension {
                type_name: type_name.to_string(),
                reason: format!(
                    "cannot extend {} with {}",
                    kind_label(existing),
                    kind_label(&incoming)
                ),
            });
        }
    }

    trace!(type_name = %type_name, "Extending passthrough definition");
    target.directives.extend(directives);
    Ok(())
}

fn extend_schema(
    schema: &mut CompiledSchema,
    extension: SchemaDefinition,
) -> Result<()> {
    let Some(target) = schema.passthrough.iter_mut().find_map(|definition| match definition {
        TypeSystemDefinition::Schema(s) if !s.node.extend => Some(&mut s.node),
        _ => None,
    }) else {
        return Err(ComposeError::UnknownExtendedType("schema".to_string()));
    };

    let operations = [
        ("query", &mut target.query, extension.query),
        ("mutation", &mut target.mutation, extension.mutation),
        ("subscription", &mut target.subscription, extension.subscription),
    ];
    for (operation, slot, incoming) in operations {
        let Some(incoming) = incoming else {
            continue;
        };
        if slot.is_some() {
            return Err(ComposeError::DuplicateField {
                type_name: "schema".to_string(),
                field: operation.to_string(),
            });
        }
        *slot = Some(incoming);
    }

    target.directives.extend(extension.directives);
    Ok(())
}

fn kind_label(kind: &AstTypeKind) -> &'static str {
    match kind {
        AstTypeKind::Scalar => "a scalar",
        AstTypeKind::Object(_) => "an object",
        AstTypeKind::Interface(_) => "an interface",
        AstTypeKind::Union(_) => "a union",
        AstTypeKind::Enum(_) => "an enum",
        AstTypeKind::InputObject(_) => "an input object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::definition::parse_definitions;
    use crate::schema::generator::SchemaGenerator;
    use crate::schema::registry::TypeRegistry;

    fn compiled(sdl: &str) -> CompiledSchema {
        let mut generator = SchemaGenerator::new(TypeRegistry::new(), ["id"]);
        generator
            .add_base_definitions(parse_definitions("test", sdl).unwrap())
            .unwrap();
        generator.compile().unwrap()
    }

    #[test]
    fn test_extend_object_fields_and_interfaces() {
        let mut schema = compiled(
            "interface Routable { path: String } type NodePage { title: String }",
        );

        SchemaExtender::apply(
            &mut schema,
            "test",
            "extend type NodePage implements Routable { path: String }",
        )
        .unwrap();

        let page = schema.get("NodePage").unwrap();
        let names: Vec<&str> = page.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["title", "path"]);
        assert!(page.implements("Routable"));
    }

    #[test]
    fn test_extend_duplicate_field_fails() {
        let mut schema = compiled("type Query { menu: String }");
        let err = SchemaExtender::apply(&mut schema, "test", "extend type Query { menu: String }")
            .unwrap_err();

        match err {
            ComposeError::DuplicateField { type_name, field } => {
                assert_eq!(type_name, "Query");
                assert_eq!(field, "menu");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extend_unknown_type_fails() {
        let mut schema = compiled("type Query { ok: Boolean }");
        let err = SchemaExtender::apply(&mut schema, "test", "extend type Mutation { a: String }")
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownExtendedType(name) if name == "Mutation"));
    }

    #[test]
    fn test_extend_with_wrong_kind_fails() {
        let mut schema = compiled("type Query { ok: Boolean } enum Sort { ASC }");

        let err = SchemaExtender::apply(&mut schema, "test", "extend interface Query { a: String }")
            .unwrap_err();
        assert!(matches!(err, ComposeError::KindConflict { .. }));

        let err = SchemaExtender::apply(&mut schema, "test", "extend type Sort { a: String }")
            .unwrap_err();
        assert!(matches!(err, ComposeError::InvalidExtension { .. }));
    }

    #[test]
    fn test_new_types_can_be_extended_in_same_document() {
        let mut schema = compiled("interface Entity { id: ID! } type Query { ok: Boolean }");

        SchemaExtender::apply(
            &mut schema,
            "test",
            r#"
            extend type Menu { links: [String] }
            type Menu implements Entity { id: ID! }
            extend type Query { menu: Menu }
            "#,
        )
        .unwrap();

        let menu = schema.get("Menu").unwrap();
        assert!(menu.implements("Entity"));
        assert!(menu.field("links").is_some());
        assert!(schema.get("Query").unwrap().field("menu").is_some());
    }

    #[test]
    fn test_redefining_type_fails() {
        let mut schema = compiled("type Query { ok: Boolean } scalar Html");
        let err = SchemaExtender::apply(&mut schema, "test", "scalar Html").unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateType(name) if name == "Html"));
    }

    #[test]
    fn test_extend_enum_and_union() {
        let mut schema = compiled(
            r#"
            type A { id: ID } type B { id: ID }
            enum Sort { ASC }
            union Content = A
            "#,
        );

        SchemaExtender::apply(
            &mut schema,
            "test",
            "extend enum Sort { DESC } extend union Content = A | B",
        )
        .unwrap();

        let sdl = schema.print();
        assert!(sdl.contains("enum Sort {\n  ASC\n  DESC\n}"));
        assert!(sdl.contains("union Content = A | B"));

        let err = SchemaExtender::apply(&mut schema, "test", "extend enum Sort { ASC }").unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateField { .. }));
    }

    #[test]
    fn test_extend_schema_operations() {
        let mut schema = compiled(
            "schema { query: Query } type Query { a: String } type Mutation { b: String }",
        );

        SchemaExtender::apply(&mut schema, "test", "extend schema { mutation: Mutation }")
            .unwrap();
        assert!(schema.print().contains("mutation: Mutation"));

        let err = SchemaExtender::apply(&mut schema, "test", "extend schema { query: Mutation }")
            .unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateField { .. }));
    }

    #[test]
    fn test_extending_interface_rebinds_implementors() {
        let mut schema = compiled(
            "interface Entity { id: ID! } type NodePage implements Entity { id: ID! }",
        );

        SchemaExtender::apply(&mut schema, "test", "extend interface Entity { label: String }")
            .unwrap();

        let entity = schema.get("Entity").unwrap();
        let page = schema.get("NodePage").unwrap();
        assert!(Rc::ptr_eq(entity, &page.interfaces[0]));
        assert!(page.interfaces[0].field("label").is_some());
        assert!(page.field("label").is_some());
        assert!(
            schema
                .print()
                .contains("type NodePage implements Entity {\n  id: ID!\n  label: String\n}")
        );
    }

    #[test]
    fn test_extending_interface_reaches_nested_implementors() {
        let mut schema = compiled(
            r#"
            interface Entity { id: ID! }
            interface Media implements Entity { id: ID! }
            type MediaImage implements Media & Entity { id: ID! }
            "#,
        );

        SchemaExtender::apply(&mut schema, "test", "extend interface Entity { metatag: String }")
            .unwrap();

        let media = schema.get("Media").unwrap();
        let image = schema.get("MediaImage").unwrap();
        assert!(media.field("metatag").is_some());
        assert!(image.field("metatag").is_some());
        assert!(Rc::ptr_eq(&image.interfaces[0], media));
        assert!(Rc::ptr_eq(&media.interfaces[0], schema.get("Entity").unwrap()));
    }

    #[test]
    fn test_extend_type_directives() {
        let mut schema = compiled("directive @cached on OBJECT type Query { a: String }");

        SchemaExtender::apply(
            &mut schema,
            "test",
            "extend type Query @cached { b: String @deprecated }",
        )
        .unwrap();

        let query = schema.get("Query").unwrap();
        assert_eq!(query.directives, vec!["@cached"]);
        assert_eq!(query.field("b").unwrap().directives, vec!["@deprecated"]);
    }

    #[test]
    fn test_blank_extension_is_noop() {
        let mut schema = compiled("type Query { a: String }");
        let before = schema.print();
        SchemaExtender::apply(&mut schema, "test", "   ").unwrap();
        assert_eq!(schema.print(), before);
    }
}
