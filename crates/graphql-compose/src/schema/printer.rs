//! SDL printing for compiled types and passthrough definitions.

use std::fmt::Write;

use async_graphql_parser::Positioned;
use async_graphql_parser::types::{
    ConstDirective, DirectiveDefinition, InputValueDefinition, SchemaDefinition, TypeDefinition,
    TypeKind, TypeSystemDefinition,
};

use super::output::{CompiledArgument, CompiledField, CompiledKind, CompiledType};

const INDENT: &str = "  ";

/// Prints a compiled object or interface. Scalars print as `scalar Name`.
pub fn print_compiled_type(ty: &CompiledType) -> String {
    let mut out = String::new();
    write_description(&mut out, &ty.description, "");

    let keyword = match ty.kind {
        CompiledKind::Scalar => {
            let _ = write!(out, "scalar {}", ty.name);
            return out;
        }
        CompiledKind::Object => "type",
        CompiledKind::Interface => "interface",
    };

    let _ = write!(out, "{keyword} {}", ty.name);
    if !ty.interfaces.is_empty() {
        let names: Vec<&str> = ty.interfaces.iter().map(|i| i.name.as_str()).collect();
        let _ = write!(out, " implements {}", names.join(" & "));
    }
    write_applied_directives(&mut out, &ty.directives);

    if !ty.fields.is_empty() {
        out.push_str(" {\n");
        for field in &ty.fields {
            write_compiled_field(&mut out, field);
        }
        out.push('}');
    }
    out
}

fn write_compiled_field(out: &mut String, field: &CompiledField) {
    write_description(out, &field.description, INDENT);
    let _ = write!(out, "{INDENT}{}", field.name);
    write_compiled_arguments(out, &field.arguments);
    let _ = write!(out, ": {}", field.ty);
    write_applied_directives(out, &field.directives);
    out.push('\n');
}

fn write_compiled_arguments(out: &mut String, arguments: &[CompiledArgument]) {
    if arguments.is_empty() {
        return;
    }

    let multiline = arguments.iter().any(|a| !a.description.is_empty());
    out.push('(');
    for (index, argument) in arguments.iter().enumerate() {
        if multiline {
            out.push('\n');
            write_description(out, &argument.description, "    ");
            out.push_str("    ");
        } else if index > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}: {}", argument.name, argument.ty);
        if let Some(default) = &argument.default_value {
            let _ = write!(out, " = {default}");
        }
        write_applied_directives(out, &argument.directives);
    }
    if multiline {
        let _ = write!(out, "\n{INDENT}");
    }
    out.push(')');
}

/// Prints a passthrough definition.
pub fn print_definition(definition: &TypeSystemDefinition) -> String {
    match definition {
        TypeSystemDefinition::Schema(schema) => print_schema_definition(&schema.node),
        TypeSystemDefinition::Type(ty) => print_type_definition(&ty.node),
        TypeSystemDefinition::Directive(directive) => print_directive_definition(&directive.node),
    }
}

fn print_schema_definition(schema: &SchemaDefinition) -> String {
    let mut out = String::new();
    if schema.extend {
        out.push_str("extend ");
    }
    out.push_str("schema");
    write_directives(&mut out, &schema.directives);

    let operations = [
        ("query", &schema.query),
        ("mutation", &schema.mutation),
        ("subscription", &schema.subscription),
    ];
    if operations.iter().any(|(_, name)| name.is_some()) {
        out.push_str(" {\n");
        for (operation, name) in operations {
            if let Some(name) = name {
                let _ = writeln!(out, "{INDENT}{operation}: {}", name.node);
            }
        }
        out.push('}');
    }
    out
}

fn print_type_definition(ty: &TypeDefinition) -> String {
    let mut out = String::new();
    if let Some(description) = &ty.description {
        write_description(&mut out, &description.node, "");
    }
    if ty.extend {
        out.push_str("extend ");
    }

    let name = &ty.name.node;
    match &ty.kind {
        TypeKind::Scalar => {
            let _ = write!(out, "scalar {name}");
            write_directives(&mut out, &ty.directives);
        }
        TypeKind::Object(object) => {
            let _ = write!(out, "type {name}");
            write_implements(&mut out, &object.implements);
            write_directives(&mut out, &ty.directives);
            write_field_block(&mut out, &object.fields);
        }
        TypeKind::Interface(interface) => {
            let _ = write!(out, "interface {name}");
            write_implements(&mut out, &interface.implements);
            write_directives(&mut out, &ty.directives);
            write_field_block(&mut out, &interface.fields);
        }
        TypeKind::Union(union) => {
            let _ = write!(out, "union {name}");
            write_directives(&mut out, &ty.directives);
            if !union.members.is_empty() {
                let members: Vec<&str> = union.members.iter().map(|m| m.node.as_str()).collect();
                let _ = write!(out, " = {}", members.join(" | "));
            }
        }
        TypeKind::Enum(enum_type) => {
            let _ = write!(out, "enum {name}");
            write_directives(&mut out, &ty.directives);
            if !enum_type.values.is_empty() {
                out.push_str(" {\n");
                for value in &enum_type.values {
                    let value = &value.node;
                    if let Some(description) = &value.description {
                        write_description(&mut out, &description.node, INDENT);
                    }
                    let _ = write!(out, "{INDENT}{}", value.value.node);
                    write_directives(&mut out, &value.directives);
                    out.push('\n');
                }
                out.push('}');
            }
        }
        TypeKind::InputObject(input) => {
            let _ = write!(out, "input {name}");
            write_directives(&mut out, &ty.directives);
            if !input.fields.is_empty() {
                out.push_str(" {\n");
                for field in &input.fields {
                    write_input_value(&mut out, &field.node, INDENT);
                    out.push('\n');
                }
                out.push('}');
            }
        }
    }
    out
}

fn print_directive_definition(directive: &DirectiveDefinition) -> String {
    let mut out = String::new();
    if let Some(description) = &directive.description {
        write_description(&mut out, &description.node, "");
    }
    let _ = write!(out, "directive @{}", directive.name.node);
    write_input_values(&mut out, &directive.arguments);
    if directive.is_repeatable {
        out.push_str(" repeatable");
    }
    let locations: Vec<String> = directive
        .locations
        .iter()
        .map(|location| screaming_snake(&format!("{:?}", location.node)))
        .collect();
    let _ = write!(out, " on {}", locations.join(" | "));
    out
}

fn write_implements(out: &mut String, implements: &[Positioned<async_graphql_value::Name>]) {
    if implements.is_empty() {
        return;
    }
    let names: Vec<&str> = implements.iter().map(|i| i.node.as_str()).collect();
    let _ = write!(out, " implements {}", names.join(" & "));
}

fn write_field_block(
    out: &mut String,
    fields: &[Positioned<async_graphql_parser::types::FieldDefinition>],
) {
    if fields.is_empty() {
        return;
    }
    out.push_str(" {\n");
    for field in fields {
        let field = &field.node;
        if let Some(description) = &field.description {
            write_description(out, &description.node, INDENT);
        }
        let _ = write!(out, "{INDENT}{}", field.name.node);
        write_input_values(out, &field.arguments);
        let _ = write!(out, ": {}", field.ty.node);
        write_directives(out, &field.directives);
        out.push('\n');
    }
    out.push('}');
}

fn write_input_values(out: &mut String, values: &[Positioned<InputValueDefinition>]) {
    if values.is_empty() {
        return;
    }
    let multiline = values.iter().any(|v| v.node.description.is_some());
    out.push('(');
    for (index, value) in values.iter().enumerate() {
        if multiline {
            out.push('\n');
            write_input_value(out, &value.node, "    ");
        } else {
            if index > 0 {
                out.push_str(", ");
            }
            write_input_value(out, &value.node, "");
        }
    }
    if multiline {
        let _ = write!(out, "\n{INDENT}");
    }
    out.push(')');
}

fn write_input_value(out: &mut String, value: &InputValueDefinition, indent: &str) {
    if let Some(description) = &value.description {
        write_description(out, &description.node, indent);
    }
    let _ = write!(out, "{indent}{}: {}", value.name.node, value.ty.node);
    if let Some(default) = &value.default_value {
        let _ = write!(out, " = {}", default.node);
    }
    write_directives(out, &value.directives);
}

/// Prints an applied directive, e.g. `@deprecated(reason: "gone")`.
pub(crate) fn print_directive(directive: &ConstDirective) -> String {
    let mut out = format!("@{}", directive.name.node);
    if !directive.arguments.is_empty() {
        let arguments: Vec<String> = directive
            .arguments
            .iter()
            .map(|(name, value)| format!("{}: {}", name.node, value.node))
            .collect();
        let _ = write!(out, "({})", arguments.join(", "));
    }
    out
}

fn write_directives(out: &mut String, directives: &[Positioned<ConstDirective>]) {
    for directive in directives {
        out.push(' ');
        out.push_str(&print_directive(&directive.node));
    }
}

fn write_applied_directives(out: &mut String, directives: &[String]) {
    for directive in directives {
        out.push(' ');
        out.push_str(directive);
    }
}

/// Writes a description line, using a block string for multi-line text.
fn write_description(out: &mut String, description: &str, indent: &str) {
    if description.is_empty() {
        return;
    }

    if description.contains('\n') {
        let _ = writeln!(out, "{indent}\"\"\"");
        for line in description.replace("\"\"\"", "\\\"\"\"").lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "{indent}{line}");
            }
        }
        let _ = writeln!(out, "{indent}\"\"\"");
    } else {
        let escaped = description
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\r', "\\r");
        let _ = writeln!(out, "{indent}\"{escaped}\"");
    }
}

/// `FieldDefinition` -> `FIELD_DEFINITION`
fn screaming_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() && index > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}
