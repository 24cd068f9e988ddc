//! Field descriptors.
//!
//! A [`FieldDescriptor`] describes one field or argument before compilation:
//! its base type name, the list/non-null wrappers around it, and the link back
//! to the content field it represents.

use async_graphql_parser::types::{BaseType, FieldDefinition, InputValueDefinition, Type};
use async_graphql_value::ConstValue;

use super::output::TypeRef;
use super::printer::print_directive;
use crate::Result;
use crate::error::ComposeError;

/// A list or non-null wrapper, recorded outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeModifier {
    List,
    NonNull,
}

/// Describes one field or argument of a schema type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldDescriptor {
    name: String,
    type_name: String,
    type_modifiers: Vec<TypeModifier>,
    machine_name: Option<String>,
    is_value_field: bool,
    description: String,
    arguments: Vec<FieldDescriptor>,
    default_value: Option<ConstValue>,
    directives: Vec<String>,
}

impl FieldDescriptor {
    /// Creates an unwrapped, nullable field of the given type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Creates a field from a textual type reference such as `[String!]!`.
    ///
    /// # Errors
    ///
    /// Returns a syntax error if `type_ref` is not a valid GraphQL type.
    pub fn from_type_ref(name: impl Into<String>, type_ref: &str) -> Result<Self> {
        let name = name.into();
        let ty = Type::new(type_ref).ok_or_else(|| {
            ComposeError::syntax(format!("type of field '{name}'"), format!("invalid type '{type_ref}'"))
        })?;

        let mut field = Self::new(name, String::new());
        field.apply_type(&ty);
        Ok(field)
    }

    /// Parses a field definition from the parser AST, arguments included.
    pub fn from_field_definition(definition: &FieldDefinition) -> Self {
        let mut field = Self::new(definition.name.node.as_str(), String::new());
        field.apply_type(&definition.ty.node);

        if let Some(description) = &definition.description {
            field.description = description.node.clone();
        }

        for argument in &definition.arguments {
            field.arguments.push(Self::from_input_value(&argument.node));
        }
        field.directives = definition
            .directives
            .iter()
            .map(|directive| print_directive(&directive.node))
            .collect();

        field
    }

    /// Parses an argument or input field from the parser AST.
    pub fn from_input_value(definition: &InputValueDefinition) -> Self {
        let mut field = Self::new(definition.name.node.as_str(), String::new());
        field.apply_type(&definition.ty.node);

        if let Some(description) = &definition.description {
            field.description = description.node.clone();
        }
        field.default_value = definition
            .default_value
            .as_ref()
            .map(|value| value.node.clone());
        field.directives = definition
            .directives
            .iter()
            .map(|directive| print_directive(&directive.node))
            .collect();

        field
    }

    /// Walks the type chain outermost to innermost, recording each wrapper.
    fn apply_type(&mut self, ty: &Type) {
        let mut current = ty;
        loop {
            if !current.nullable {
                self.type_modifiers.push(TypeModifier::NonNull);
            }
            match &current.base {
                BaseType::List(inner) => {
                    self.type_modifiers.push(TypeModifier::List);
                    current = inner.as_ref();
                }
                BaseType::Named(name) => {
                    self.type_name = name.to_string();
                    break;
                }
            }
        }
    }

    pub fn set_type(&mut self, type_name: impl Into<String>) -> &mut Self {
        self.type_name = type_name.into();
        self
    }

    pub fn push_list_modifier(&mut self) -> &mut Self {
        self.type_modifiers.push(TypeModifier::List);
        self
    }

    pub fn push_non_null_modifier(&mut self) -> &mut Self {
        self.type_modifiers.push(TypeModifier::NonNull);
        self
    }

    pub fn set_machine_name(&mut self, machine_name: impl Into<String>) -> &mut Self {
        self.machine_name = Some(machine_name.into());
        self
    }

    pub fn mark_value_field(&mut self) -> &mut Self {
        self.is_value_field = true;
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn add_argument(&mut self, argument: FieldDescriptor) -> &mut Self {
        self.arguments.push(argument);
        self
    }

    /// Adds an applied directive in SDL form, e.g. `@deprecated`.
    pub fn add_directive(&mut self, directive: impl Into<String>) -> &mut Self {
        self.directives.push(directive.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Wrappers in declaration order, outermost first.
    pub fn type_modifiers(&self) -> &[TypeModifier] {
        &self.type_modifiers
    }

    pub fn machine_name(&self) -> Option<&str> {
        self.machine_name.as_deref()
    }

    pub fn is_value_field(&self) -> bool {
        self.is_value_field
    }

    pub fn arguments(&self) -> &[FieldDescriptor] {
        &self.arguments
    }

    pub fn default_value(&self) -> Option<&ConstValue> {
        self.default_value.as_ref()
    }

    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    /// The free-text description without annotations.
    pub fn raw_description(&self) -> &str {
        &self.description
    }

    /// The description annotated for documentation tooling.
    ///
    /// Value fields are prefixed with `{value}` and fields backed by a content
    /// field with `{field: <machine_name>}`, in that order, ahead of the text.
    pub fn description(&self) -> String {
        let mut markers = String::new();
        if self.is_value_field {
            markers.push_str("{value}");
        }
        if let Some(machine_name) = &self.machine_name {
            markers.push_str("{field: ");
            markers.push_str(machine_name);
            markers.push('}');
        }

        match (markers.is_empty(), self.description.is_empty()) {
            (true, _) => self.description.clone(),
            (false, true) => markers,
            (false, false) => format!("{markers} {}", self.description),
        }
    }

    /// Builds the wrapped output type.
    ///
    /// Modifiers are applied in reverse declaration order so the last declared
    /// wrapper ends up nearest the base type.
    pub fn type_ref(&self) -> TypeRef {
        self.type_modifiers
            .iter()
            .rev()
            .fold(TypeRef::named(&self.type_name), |inner, modifier| match modifier {
                TypeModifier::List => TypeRef::List(Box::new(inner)),
                TypeModifier::NonNull => TypeRef::NonNull(Box::new(inner)),
            })
    }
}
