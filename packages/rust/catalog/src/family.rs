//! The family of port types whose hierarchy is documented.

use std::fmt;

use serde::{Deserialize, Serialize};

use jsondocgen_shared::Result;

/// Fully qualified name of a port object type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeIdentity(pub String);

impl TypeIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeIdentity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Registration data of a type; absent for types that are only ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredTypeInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_class: Option<String>,
    /// Packed RGB(A) color as a signed integer.
    #[serde(default)]
    pub color: i32,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributing_plugin: Option<String>,
}

pub trait TypeFamily: Send + Sync {
    /// The common supertype every member descends from.
    fn root_type(&self) -> TypeIdentity;

    /// All registered member types. Failure here is fatal for type documentation.
    fn all_registered_types(&self) -> Result<Vec<TypeIdentity>>;

    /// Direct ancestors inside the family: the supertype first, then interfaces.
    fn ancestors_of(&self, ty: &TypeIdentity) -> Vec<TypeIdentity>;

    fn registry_info(&self, ty: &TypeIdentity) -> Option<RegisteredTypeInfo>;
}
