//! File-backed catalog: a directory holding `catalog.json` and markup files.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use jsondocgen_shared::{DocGenError, Result};

use crate::Catalog;
use crate::family::{RegisteredTypeInfo, TypeFamily, TypeIdentity};
use crate::introspect::IntrospectedFacts;
use crate::memory::{
    MemoryIntrospector, MemoryMigrationRegistry, MemoryMigrationRule, MemoryRegistry,
    MemoryTypeFamily,
};
use crate::registry::RegistryContainer;

/// File name of the snapshot inside its directory.
pub const SNAPSHOT_FILE_NAME: &str = "catalog.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    repository: RegistryContainer,
    #[serde(default)]
    runtime: IndexMap<String, RuntimeEntry>,
    #[serde(default)]
    type_family: Option<TypeFamilyFile>,
    #[serde(default)]
    migrations: Vec<MemoryMigrationRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeEntry {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    facts: IntrospectedFacts,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeFamilyFile {
    root: TypeIdentity,
    #[serde(default)]
    types: Vec<TypeEntryFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeEntryFile {
    object_class: TypeIdentity,
    #[serde(default)]
    ancestors: Vec<TypeIdentity>,
    #[serde(default)]
    registration: Option<RegisteredTypeInfo>,
}

/// Stand-in for a snapshot without a `typeFamily` section.
struct MissingTypeFamily;

impl TypeFamily for MissingTypeFamily {
    fn root_type(&self) -> TypeIdentity {
        TypeIdentity::new("")
    }

    fn all_registered_types(&self) -> Result<Vec<TypeIdentity>> {
        Err(DocGenError::registry(
            "catalog snapshot has no typeFamily section",
        ))
    }

    fn ancestors_of(&self, _ty: &TypeIdentity) -> Vec<TypeIdentity> {
        Vec::new()
    }

    fn registry_info(&self, _ty: &TypeIdentity) -> Option<RegisteredTypeInfo> {
        None
    }
}

pub struct SnapshotCatalog;

impl SnapshotCatalog {
    /// Open the snapshot stored in `dir`.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn open(dir: &Path) -> Result<Catalog> {
        let path = dir.join(SNAPSHOT_FILE_NAME);
        let content = std::fs::read_to_string(&path).map_err(|e| DocGenError::io(&path, e))?;
        let catalog = Self::from_json(&content, dir)?;
        info!(path = %path.display(), "opened catalog snapshot");
        Ok(catalog)
    }

    /// Build a catalog from snapshot JSON; markup files resolve against `base_dir`.
    pub fn from_json(json: &str, base_dir: &Path) -> Result<Catalog> {
        let file: SnapshotFile = serde_json::from_str(json)
            .map_err(|e| DocGenError::validation(format!("malformed catalog snapshot: {e}")))?;

        let item_ids = unique_item_ids(&file.repository)?;

        let mut introspector = MemoryIntrospector::new();
        for (id, entry) in file.runtime {
            if !item_ids.contains(id.as_str()) {
                warn!(item = %id, "runtime facts for an item the repository does not list");
            }
            match entry.error {
                Some(message) => introspector.insert_failure(id, message),
                None => introspector.insert(id, entry.facts),
            }
        }

        let types: Arc<dyn TypeFamily> = match file.type_family {
            Some(family_file) => {
                let mut family = MemoryTypeFamily::new(family_file.root);
                for entry in family_file.types {
                    family.insert(entry.object_class, entry.ancestors, entry.registration);
                }
                Arc::new(family)
            }
            None => Arc::new(MissingTypeFamily),
        };

        for rule in &file.migrations {
            for original in rule.replacements.keys() {
                if !item_ids.contains(original.as_str()) {
                    warn!(rule = %rule.name, original = %original, "migration rule names an unknown item");
                }
            }
        }

        Ok(Catalog {
            registry: Arc::new(MemoryRegistry::new(file.repository).with_base_dir(base_dir)),
            introspector: Arc::new(introspector),
            types,
            migrations: Arc::new(MemoryMigrationRegistry::new(file.migrations)),
        })
    }
}

/// Item ids must be unique across the whole repository.
fn unique_item_ids(root: &RegistryContainer) -> Result<HashSet<&str>> {
    let mut seen = HashSet::new();
    for item in root.items() {
        if !seen.insert(item.id.as_str()) {
            return Err(DocGenError::validation(format!(
                "item id '{}' appears more than once in the repository",
                item.id
            )));
        }
    }
    Ok(seen)
}
