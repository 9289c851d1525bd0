//! The catalog registry: the tree of categories and items to document.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use jsondocgen_shared::Result;

/// One entry of the registry tree.
///
/// Unknown `kind` values (metanodes, templates and the like) load as
/// [`RegistryNode::Other`] and are skipped by the tree builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegistryNode {
    Item(CatalogItem),
    Category(RegistryContainer),
    /// A nested root; its children belong to the enclosing category.
    Root(RegistryContainer),
    #[serde(other)]
    Other,
}

/// A category (or the root) with its metadata and ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryContainer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributing_plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_id: Option<String>,
    #[serde(default)]
    pub children: Vec<RegistryNode>,
}

/// A documentable leaf of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributing_plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_id: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub hidden: bool,
    /// Inline description markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    /// Description markup file, relative to the registry's base directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup_file: Option<PathBuf>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

impl RegistryContainer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// All items of this subtree in declaration order.
    pub fn items(&self) -> Vec<&CatalogItem> {
        let mut out = Vec::new();
        collect_items(&self.children, &mut out);
        out
    }
}

fn collect_items<'a>(nodes: &'a [RegistryNode], out: &mut Vec<&'a CatalogItem>) {
    for node in nodes {
        match node {
            RegistryNode::Item(item) => out.push(item),
            RegistryNode::Category(c) | RegistryNode::Root(c) => collect_items(&c.children, out),
            RegistryNode::Other => {}
        }
    }
}

/// Owner of the catalog: enumerates the tree and hands out description markup.
pub trait CatalogRegistry: Send + Sync {
    /// Load the full registry tree. Failure here ends the run.
    fn load_root(&self) -> Result<RegistryContainer>;

    /// Description markup of one item, `None` when the item has none.
    /// Errors are scoped to that item.
    fn description_markup(&self, item: &CatalogItem) -> Result<Option<String>>;
}
