//! Compiled output types.
//!
//! Output types are created at most once per type name during a composition
//! and shared through [`OutputType`] handles, so two compile requests for the
//! same name observe the same instance. Field types are references by name
//! only; a referenced type does not have to be compiled first.

use std::fmt;
use std::rc::Rc;

use async_graphql_value::ConstValue;

/// Shared handle to a compiled type.
pub type OutputType = Rc<CompiledType>;

/// Built-in GraphQL scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinScalar {
    String,
    Int,
    Float,
    Boolean,
    Id,
}

impl BuiltinScalar {
    pub const ALL: [BuiltinScalar; 5] = [
        Self::String,
        Self::Int,
        Self::Float,
        Self::Boolean,
        Self::Id,
    ];

    /// Resolves a type name against the built-in scalar table.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(Self::String),
            "Int" => Some(Self::Int),
            "Float" => Some(Self::Float),
            "Boolean" => Some(Self::Boolean),
            "ID" => Some(Self::Id),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::Id => "ID",
        }
    }
}

/// A possibly wrapped reference to a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// `Type`
    pub fn named(type_name: impl Into<String>) -> Self {
        Self::Named(type_name.into())
    }

    /// `Type!`
    pub fn named_nn(type_name: impl Into<String>) -> Self {
        Self::NonNull(Box::new(Self::named(type_name)))
    }

    /// `[Type]`
    pub fn named_list(type_name: impl Into<String>) -> Self {
        Self::List(Box::new(Self::named(type_name)))
    }

    /// `[Type!]!`
    pub fn named_nn_list_nn(type_name: impl Into<String>) -> Self {
        Self::NonNull(Box::new(Self::List(Box::new(Self::named_nn(type_name)))))
    }

    /// The innermost type name.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }

    /// The same wrappers around a different named type.
    pub fn with_base_name(&self, type_name: &str) -> Self {
        match self {
            Self::Named(_) => Self::named(type_name),
            Self::List(inner) => Self::List(Box::new(inner.with_base_name(type_name))),
            Self::NonNull(inner) => Self::NonNull(Box::new(inner.with_base_name(type_name))),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompiledKind {
    Scalar,
    Object,
    Interface,
}

/// An argument of a compiled field.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArgument {
    pub name: String,
    pub description: String,
    pub ty: TypeRef,
    pub default_value: Option<ConstValue>,
    /// Applied directives in SDL form, e.g. `@deprecated(reason: "gone")`.
    pub directives: Vec<String>,
}

/// A field of a compiled object or interface.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledField {
    pub name: String,
    pub description: String,
    pub ty: TypeRef,
    pub arguments: Vec<CompiledArgument>,
    pub directives: Vec<String>,
}

/// A finalized scalar, object, or interface.
#[derive(Debug, Clone)]
pub struct CompiledType {
    pub name: String,
    pub kind: CompiledKind,
    pub description: String,
    pub fields: Vec<CompiledField>,
    pub interfaces: Vec<OutputType>,
    pub directives: Vec<String>,
}

impl CompiledType {
    pub fn scalar(scalar: BuiltinScalar) -> Self {
        Self {
            name: scalar.as_str().to_string(),
            kind: CompiledKind::Scalar,
            description: String::new(),
            fields: Vec::new(),
            interfaces: Vec::new(),
            directives: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i.name == interface)
    }

    pub fn is_builtin(&self) -> bool {
        self.kind == CompiledKind::Scalar && BuiltinScalar::from_name(&self.name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scalar_table() {
        for scalar in BuiltinScalar::ALL {
            assert_eq!(BuiltinScalar::from_name(scalar.as_str()), Some(scalar));
        }
        assert_eq!(BuiltinScalar::from_name("Id"), None);
        assert_eq!(BuiltinScalar::from_name("DateTime"), None);
    }

    #[test]
    fn test_type_ref_display() {
        assert_eq!(TypeRef::named("Node").to_string(), "Node");
        assert_eq!(TypeRef::named_nn("Node").to_string(), "Node!");
        assert_eq!(TypeRef::named_list("Node").to_string(), "[Node]");
        assert_eq!(TypeRef::named_nn_list_nn("Node").to_string(), "[Node!]!");
        assert_eq!(TypeRef::named_nn_list_nn("Node").base_name(), "Node");
    }

    #[test]
    fn test_with_base_name_keeps_wrappers() {
        let ty = TypeRef::named_nn_list_nn("EntityTranslatable").with_base_name("NodeArticle");
        assert_eq!(ty.to_string(), "[NodeArticle!]!");
    }
}
