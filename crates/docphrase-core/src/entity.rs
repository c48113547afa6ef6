//! Source entity snapshots supplied by the host.
//!
//! A [`SourceEntity`] is the declaration a comment documents, reduced to the
//! metadata rules look at. The host builds one per declaration per pass; the
//! engine never reads source code itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Type,
    Method,
    Property,
    Field,
    Event,
    Parameter,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Type => "type",
            EntityKind::Method => "method",
            EntityKind::Property => "property",
            EntityKind::Field => "field",
            EntityKind::Event => "event",
            EntityKind::Parameter => "parameter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "type" => Some(EntityKind::Type),
            "method" => Some(EntityKind::Method),
            "property" => Some(EntityKind::Property),
            "field" => Some(EntityKind::Field),
            "event" => Some(EntityKind::Event),
            "parameter" | "param" => Some(EntityKind::Parameter),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared accessibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    #[default]
    Public,
    Protected,
    Internal,
    ProtectedInternal,
    PrivateProtected,
    Private,
}

impl Accessibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Accessibility::Public => "public",
            Accessibility::Protected => "protected",
            Accessibility::Internal => "internal",
            Accessibility::ProtectedInternal => "protected_internal",
            Accessibility::PrivateProtected => "private_protected",
            Accessibility::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Accessibility::Public),
            "protected" => Some(Accessibility::Protected),
            "internal" => Some(Accessibility::Internal),
            "protected_internal" => Some(Accessibility::ProtectedInternal),
            "private_protected" => Some(Accessibility::PrivateProtected),
            "private" => Some(Accessibility::Private),
            _ => None,
        }
    }
}

/// Declaration modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Static,
    Async,
    Abstract,
    Override,
    Virtual,
    Sealed,
    Readonly,
    Const,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Static => "static",
            Modifier::Async => "async",
            Modifier::Abstract => "abstract",
            Modifier::Override => "override",
            Modifier::Virtual => "virtual",
            Modifier::Sealed => "sealed",
            Modifier::Readonly => "readonly",
            Modifier::Const => "const",
        }
    }
}

/// A method or constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Property accessors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessors {
    #[serde(default)]
    pub get: bool,
    #[serde(default)]
    pub set: bool,
}

/// Immutable snapshot of one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntity {
    pub kind: EntityKind,
    pub name: String,
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Declared type (fields, properties, parameters) or return type (methods).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containing_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessors: Option<Accessors>,
    /// Whether static analysis found a use (parameters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_referenced: Option<bool>,
}

impl SourceEntity {
    /// Minimal public entity of the given kind.
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        SourceEntity {
            kind,
            name: name.into(),
            accessibility: Accessibility::Public,
            type_name: None,
            parameters: Vec::new(),
            containing_type: None,
            modifiers: Vec::new(),
            accessors: None,
            is_referenced: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn with_containing_type(mut self, containing: impl Into<String>) -> Self {
        self.containing_type = Some(containing.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_accessors(mut self, get: bool, set: bool) -> Self {
        self.accessors = Some(Accessors { get, set });
        self
    }

    pub fn with_referenced(mut self, referenced: bool) -> Self {
        self.is_referenced = Some(referenced);
        self
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Short human-readable reference, e.g. `method Parser.TryParse`.
    pub fn display_name(&self) -> String {
        match &self.containing_type {
            Some(containing) => format!("{} {}.{}", self.kind, containing, self.name),
            None => format!("{} {}", self.kind, self.name),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
