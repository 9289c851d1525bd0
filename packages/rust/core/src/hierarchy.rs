//! Type hierarchy index: a DAG over a family of port types.
//!
//! Every type is built once, after all of its ancestors. Unregistered
//! ancestors become hidden placeholder nodes. Ancestor cycles in the input
//! are reported and the offending edge is dropped, so edges always run from
//! an earlier-built node to a later-built one.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{error, info, instrument};

use jsondocgen_catalog::{RegisteredTypeInfo, TypeFamily, TypeIdentity};
use jsondocgen_shared::Result;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub object_class: TypeIdentity,
    pub name: Option<String>,
    pub spec_class: Option<String>,
    /// Six lowercase hex digits, see [`color_hex`].
    pub color: Option<String>,
    pub hidden: bool,
    pub registered: bool,
    pub contributing_plugin: Option<String>,
    /// Direct descendants in first-discovery order.
    pub children: IndexSet<TypeIdentity>,
}

impl TypeNode {
    fn registered(object_class: TypeIdentity, info: RegisteredTypeInfo) -> Self {
        Self {
            object_class,
            name: Some(info.name),
            spec_class: info.spec_class,
            color: Some(color_hex(info.color)),
            hidden: info.hidden,
            registered: true,
            contributing_plugin: info.contributing_plugin,
            children: IndexSet::new(),
        }
    }

    fn placeholder(object_class: TypeIdentity) -> Self {
        Self {
            object_class,
            name: None,
            spec_class: None,
            color: None,
            hidden: true,
            registered: false,
            contributing_plugin: None,
            children: IndexSet::new(),
        }
    }
}

/// Arena of [`TypeNode`]s keyed by type, in build order.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    nodes: IndexMap<TypeIdentity, TypeNode>,
}

impl TypeHierarchy {
    pub fn get(&self, ty: &TypeIdentity) -> Option<&TypeNode> {
        self.nodes.get(ty)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in build order (every node after all of its ancestors).
    pub fn nodes(&self) -> impl Iterator<Item = &TypeNode> {
        self.nodes.values()
    }

    /// Nested view rooted at `root`, for serialization.
    pub fn tree<'a>(&'a self, root: &TypeIdentity) -> Option<TypeTree<'a>> {
        self.nodes.get(root).map(|node| TypeTree {
            hierarchy: self,
            node,
        })
    }
}

// ---------------------------------------------------------------------------
// Indexing
// ---------------------------------------------------------------------------

/// Build the hierarchy for `types` and everything reachable through `ancestors_of`.
pub fn build<A, L>(types: &[TypeIdentity], ancestors_of: A, lookup: L) -> TypeHierarchy
where
    A: Fn(&TypeIdentity) -> Vec<TypeIdentity>,
    L: Fn(&TypeIdentity) -> Option<RegisteredTypeInfo>,
{
    let mut walk = Walk {
        ancestors_of: &ancestors_of,
        lookup: &lookup,
        nodes: IndexMap::new(),
        in_progress: HashSet::new(),
    };
    for ty in types {
        walk.visit(ty);
    }
    TypeHierarchy { nodes: walk.nodes }
}

/// Index a whole [`TypeFamily`], making sure its root type is present.
#[instrument(skip_all)]
pub fn index_family(family: &dyn TypeFamily) -> Result<TypeHierarchy> {
    let mut types = family.all_registered_types()?;
    let root = family.root_type();
    if !types.contains(&root) {
        types.insert(0, root);
    }

    let hierarchy = build(
        &types,
        |ty| family.ancestors_of(ty),
        |ty| family.registry_info(ty),
    );

    let placeholders = hierarchy.nodes().filter(|n| !n.registered).count();
    info!(types = hierarchy.len(), placeholders, "indexed type hierarchy");
    Ok(hierarchy)
}

struct Walk<'f> {
    ancestors_of: &'f dyn Fn(&TypeIdentity) -> Vec<TypeIdentity>,
    lookup: &'f dyn Fn(&TypeIdentity) -> Option<RegisteredTypeInfo>,
    nodes: IndexMap<TypeIdentity, TypeNode>,
    in_progress: HashSet<TypeIdentity>,
}

impl Walk<'_> {
    /// Post-order visit. Returns `false` only when `ty` is still being built,
    /// i.e. the caller reached it through a cycle.
    fn visit(&mut self, ty: &TypeIdentity) -> bool {
        if self.nodes.contains_key(ty) {
            return true;
        }
        if !self.in_progress.insert(ty.clone()) {
            return false;
        }

        let mut parents = Vec::new();
        for ancestor in (self.ancestors_of)(ty) {
            if &ancestor == ty {
                error!(ty = %ty, "type lists itself as ancestor; edge skipped");
                continue;
            }
            if self.visit(&ancestor) {
                parents.push(ancestor);
            } else {
                error!(ty = %ty, %ancestor, "ancestor cycle detected; edge skipped");
            }
        }
        self.in_progress.remove(ty);

        let node = match (self.lookup)(ty) {
            Some(info) => TypeNode::registered(ty.clone(), info),
            None => TypeNode::placeholder(ty.clone()),
        };
        self.nodes.insert(ty.clone(), node);

        for parent in parents {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.children.insert(ty.clone());
            }
        }
        true
    }
}

/// Render a packed color as six lowercase hex digits (alpha dropped).
pub fn color_hex(color: i32) -> String {
    format!("{:06x}", (color as u32) & 0x00FF_FFFF)
}

// ---------------------------------------------------------------------------
// Serialization view
// ---------------------------------------------------------------------------

/// A node plus the arena it lives in; serializes the DAG as a nested tree.
///
/// A type reachable through several parents is written under each of them.
#[derive(Debug, Clone, Copy)]
pub struct TypeTree<'a> {
    hierarchy: &'a TypeHierarchy,
    node: &'a TypeNode,
}

impl Serialize for TypeTree<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let node = self.node;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("objectClass", &node.object_class)?;
        if let Some(name) = &node.name {
            map.serialize_entry("name", name)?;
        }
        if let Some(spec_class) = &node.spec_class {
            map.serialize_entry("specClass", spec_class)?;
        }
        if let Some(color) = &node.color {
            map.serialize_entry("color", color)?;
        }
        map.serialize_entry("hidden", &node.hidden)?;
        map.serialize_entry("registered", &node.registered)?;
        if let Some(plugin) = &node.contributing_plugin {
            map.serialize_entry("contributingPlugin", plugin)?;
        }
        if !node.children.is_empty() {
            let children: Vec<TypeTree<'_>> = node
                .children
                .iter()
                .filter_map(|child| self.hierarchy.tree(child))
                .collect();
            map.serialize_entry("children", &children)?;
        }
        map.end()
    }
}
