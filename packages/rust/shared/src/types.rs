//! Output model for generated documentation.
//!
//! Field names serialize in camelCase and are the contract with downstream
//! consumers of `nodeDocumentation.json`; field order follows declaration order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// File name of the run manifest written next to the artifacts.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one generator run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Item documentation parts
// ---------------------------------------------------------------------------

/// A single configuration option of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDoc {
    /// Markup tag the option was declared with (e.g. `option`, `columnFilter`).
    #[serde(rename = "type")]
    pub option_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Inner markup of the option element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

/// A named group of options, rendered as a dialog tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTab {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionDoc>,
}

/// An input or output port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// 0-based position, contiguous within one direction.
    pub index: usize,
    /// Runtime type of the port; only known after merging with runtime facts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_type_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `None` for output ports, `Some` for input ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// A variable-cardinality port slot whose member types are known at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicPortGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_before_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stable key joining documented and runtime groups.
    pub group_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub supported_type_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub href: String,
    pub text: String,
}

// ---------------------------------------------------------------------------
// MergedDoc
// ---------------------------------------------------------------------------

/// Documentation of one catalog item after merging markup with runtime facts.
///
/// At most one of `options` and `option_tabs` is populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedDoc {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_html: Option<String>,
    /// Category tag from the markup root (e.g. `Source`, `Manipulator`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub streamable: bool,
    #[serde(default)]
    pub has_modern_dialog: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_tabs: Option<Vec<OptionTab>>,
    #[serde(default)]
    pub in_ports: Vec<Port>,
    #[serde(default)]
    pub out_ports: Vec<Port>,
    #[serde(default)]
    pub dynamic_in_ports: Vec<DynamicPortGroup>,
    #[serde(default)]
    pub dynamic_out_ports: Vec<DynamicPortGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<View>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_view: Option<InteractiveView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributing_plugin: Option<String>,
    /// Opaque, produced by the catalog owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_base64: Option<String>,
    /// Ordering hint relative to a sibling id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_id: Option<String>,
}

// ---------------------------------------------------------------------------
// CategoryNode
// ---------------------------------------------------------------------------

/// A category in the pruned output tree. Owns its child categories and items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributing_plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MergedDoc>,
}

impl CategoryNode {
    /// `true` when the node holds neither items nor child categories.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.items.is_empty()
    }

    /// Total number of items in this subtree.
    pub fn item_count(&self) -> usize {
        self.items.len() + self.children.iter().map(CategoryNode::item_count).sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Migration rules
// ---------------------------------------------------------------------------

/// One entry of `migrations.json`: an item factory and the factory replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRuleDoc {
    pub original_node_factory_class: String,
    pub replacement_node_factory_class: String,
}

// ---------------------------------------------------------------------------
// RunManifest
// ---------------------------------------------------------------------------

/// Metadata for a single written artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Filters that were in effect for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFilters {
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Normalized dotted category path (empty means no filter).
    #[serde(default)]
    pub category_path: String,
    #[serde(default)]
    pub include_deprecated: bool,
}

/// Counters collected while generating documentation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Items present in the item documentation.
    pub items_emitted: usize,
    /// Items removed by plugin, category, or deprecation filters.
    pub items_filtered: usize,
    /// Items dropped because their markup could not be parsed.
    pub items_failed: usize,
    /// Items emitted without runtime facts.
    pub items_markup_only: usize,
    /// Documented/runtime disagreements reported by the merger.
    pub merge_warnings: usize,
    /// Nodes in the type hierarchy (0 when skipped).
    pub type_count: usize,
    /// Entries written to the migration rules artifact.
    #[serde(default)]
    pub migration_rules: usize,
}

/// The `manifest.json` written next to the generated artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    pub run_id: RunId,
    /// Tool version that produced the artifacts.
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub filters: RunFilters,
    pub stats: RunStats,
    #[serde(default)]
    pub artifacts: Vec<ArtifactMeta>,
}
