//! In-memory collaborators, used by the snapshot loader and by tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use jsondocgen_shared::{DocGenError, Result};

use crate::family::{RegisteredTypeInfo, TypeFamily, TypeIdentity};
use crate::introspect::{IntrospectedFacts, Introspector, RuntimeHandle};
use crate::migration::{MigrationRegistry, MigrationRule};
use crate::registry::{CatalogItem, CatalogRegistry, RegistryContainer};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct MemoryRegistry {
    root: RegistryContainer,
    base_dir: Option<PathBuf>,
}

impl MemoryRegistry {
    pub fn new(root: RegistryContainer) -> Self {
        Self {
            root,
            base_dir: None,
        }
    }

    /// Resolve `markupFile` entries against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if file.is_relative() => base.join(file),
            _ => file.to_path_buf(),
        }
    }
}

impl CatalogRegistry for MemoryRegistry {
    fn load_root(&self) -> Result<RegistryContainer> {
        Ok(self.root.clone())
    }

    fn description_markup(&self, item: &CatalogItem) -> Result<Option<String>> {
        if let Some(markup) = &item.markup {
            return Ok(Some(markup.clone()));
        }
        let Some(file) = &item.markup_file else {
            return Ok(None);
        };
        let path = self.resolve(file);
        std::fs::read_to_string(&path).map(Some).map_err(|e| {
            DocGenError::parse(format!(
                "cannot read markup of {} from {}: {e}",
                item.id,
                path.display()
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Introspector
// ---------------------------------------------------------------------------

/// Runtime facts keyed by item id; an item may instead carry a failure message.
#[derive(Default)]
pub struct MemoryIntrospector {
    entries: HashMap<String, std::result::Result<IntrospectedFacts, String>>,
}

impl MemoryIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item_id: impl Into<String>, facts: IntrospectedFacts) {
        self.entries.insert(item_id.into(), Ok(facts));
    }

    pub fn insert_failure(&mut self, item_id: impl Into<String>, message: impl Into<String>) {
        self.entries.insert(item_id.into(), Err(message.into()));
    }
}

impl Introspector for MemoryIntrospector {
    fn instantiate(&self, item: &CatalogItem) -> Result<Box<dyn RuntimeHandle + '_>> {
        match self.entries.get(&item.id) {
            Some(Ok(facts)) => Ok(Box::new(facts.clone())),
            Some(Err(message)) => Err(DocGenError::introspection(format!(
                "{} could not be instantiated: {message}",
                item.id
            ))),
            None => Err(DocGenError::introspection(format!(
                "no runtime facts recorded for {}",
                item.id
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Type family
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct TypeEntry {
    ancestors: Vec<TypeIdentity>,
    registration: Option<RegisteredTypeInfo>,
}

/// A type family held in insertion order.
///
/// Types inserted without registration only contribute ancestry.
pub struct MemoryTypeFamily {
    root: TypeIdentity,
    types: IndexMap<TypeIdentity, TypeEntry>,
}

impl MemoryTypeFamily {
    pub fn new(root: impl Into<TypeIdentity>) -> Self {
        Self {
            root: root.into(),
            types: IndexMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        ty: impl Into<TypeIdentity>,
        ancestors: Vec<TypeIdentity>,
        registration: Option<RegisteredTypeInfo>,
    ) {
        self.types.insert(
            ty.into(),
            TypeEntry {
                ancestors,
                registration,
            },
        );
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_type(
        mut self,
        ty: impl Into<TypeIdentity>,
        ancestors: &[&str],
        registration: Option<RegisteredTypeInfo>,
    ) -> Self {
        let ancestors = ancestors.iter().map(|a| TypeIdentity::from(*a)).collect();
        self.insert(ty, ancestors, registration);
        self
    }
}

impl TypeFamily for MemoryTypeFamily {
    fn root_type(&self) -> TypeIdentity {
        self.root.clone()
    }

    fn all_registered_types(&self) -> Result<Vec<TypeIdentity>> {
        Ok(self
            .types
            .iter()
            .filter(|(_, entry)| entry.registration.is_some())
            .map(|(ty, _)| ty.clone())
            .collect())
    }

    fn ancestors_of(&self, ty: &TypeIdentity) -> Vec<TypeIdentity> {
        self.types
            .get(ty)
            .map(|entry| entry.ancestors.clone())
            .unwrap_or_default()
    }

    fn registry_info(&self, ty: &TypeIdentity) -> Option<RegisteredTypeInfo> {
        self.types.get(ty).and_then(|entry| entry.registration.clone())
    }
}

// ---------------------------------------------------------------------------
// Migration rules
// ---------------------------------------------------------------------------

/// A rule backed by a fixed `original -> replacements` table.
///
/// A rule with `error` set fails on every lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMigrationRule {
    pub name: String,
    #[serde(default)]
    pub replacements: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MemoryMigrationRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_replacement(mut self, original: impl Into<String>, replacements: &[&str]) -> Self {
        self.replacements.insert(
            original.into(),
            replacements.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

impl MigrationRule for MemoryMigrationRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn replacements_for(&self, original: &str) -> Result<Vec<String>> {
        if let Some(message) = &self.error {
            return Err(DocGenError::registry(format!(
                "migration rule {} cannot be evaluated: {message}",
                self.name
            )));
        }
        Ok(self.replacements.get(original).cloned().unwrap_or_default())
    }
}

/// Migration rules in registration order.
#[derive(Default)]
pub struct MemoryMigrationRegistry {
    rules: Vec<MemoryMigrationRule>,
}

impl MemoryMigrationRegistry {
    pub fn new(rules: Vec<MemoryMigrationRule>) -> Self {
        Self { rules }
    }
}

impl MigrationRegistry for MemoryMigrationRegistry {
    fn rules(&self) -> Vec<&dyn MigrationRule> {
        self.rules.iter().map(|rule| rule as &dyn MigrationRule).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::PortDirection;

    #[test]
    fn inline_markup_wins_over_file() {
        let registry = MemoryRegistry::new(RegistryContainer::new("root", "Repository"));
        let mut item = CatalogItem::new("a", "A");
        item.markup = Some("<knimeNode/>".into());
        item.markup_file = Some("does/not/exist.xml".into());
        let markup = registry.description_markup(&item).expect("markup");
        assert_eq!(markup.as_deref(), Some("<knimeNode/>"));

        item.markup = None;
        let err = registry.description_markup(&item).unwrap_err();
        assert!(err.is_item_scoped());
        assert!(err.to_string().contains("does/not/exist.xml"));

        item.markup_file = None;
        assert_eq!(registry.description_markup(&item).expect("no markup"), None);
    }

    #[test]
    fn markup_files_resolve_against_base_dir() {
        let registry = MemoryRegistry::new(RegistryContainer::new("root", "Repository"))
            .with_base_dir("../../../fixtures/markup");
        let mut item = CatalogItem::new("joiner", "Joiner");
        item.markup_file = Some("legacy_joiner.xml".into());
        let markup = registry
            .description_markup(&item)
            .expect("read")
            .expect("markup present");
        assert!(markup.contains("<name>Joiner</name>"));
    }

    #[test]
    fn introspector_reports_failures_per_item() {
        let mut introspector = MemoryIntrospector::new();
        introspector.insert(
            "ok",
            IntrospectedFacts {
                streamable: true,
                ..Default::default()
            },
        );
        introspector.insert_failure("broken", "factory threw");

        let handle = introspector
            .instantiate(&CatalogItem::new("ok", "Ok"))
            .expect("instantiate");
        assert!(handle.is_streamable());
        assert!(handle.ports(PortDirection::In).is_empty());

        let err = introspector
            .instantiate(&CatalogItem::new("broken", "Broken"))
            .err()
            .expect("failure");
        assert!(err.to_string().contains("factory threw"));
        assert!(introspector.instantiate(&CatalogItem::new("missing", "Missing")).is_err());
    }

    #[test]
    fn only_registered_types_are_enumerated() {
        let family = MemoryTypeFamily::new("PortObject")
            .with_type("AbstractTable", &["PortObject"], None)
            .with_type(
                "Table",
                &["AbstractTable"],
                Some(RegisteredTypeInfo {
                    name: "Table".into(),
                    spec_class: None,
                    color: 0,
                    hidden: false,
                    contributing_plugin: None,
                }),
            );
        let registered = family.all_registered_types().expect("types");
        assert_eq!(registered, vec![TypeIdentity::from("Table")]);
        assert_eq!(
            family.ancestors_of(&"AbstractTable".into()),
            vec![TypeIdentity::from("PortObject")]
        );
        assert!(family.ancestors_of(&"Unknown".into()).is_empty());
        assert!(family.registry_info(&"AbstractTable".into()).is_none());
    }

    #[test]
    fn migration_rules_look_up_replacements() {
        let registry = MemoryMigrationRegistry::new(vec![
            MemoryMigrationRule::new("writer-rule")
                .with_replacement("org.example.OldWriter", &["org.example.NewWriter"]),
            MemoryMigrationRule::failing("broken-rule", "missing class"),
        ]);
        let rules = registry.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name(), "writer-rule");
        assert_eq!(
            rules[0].replacements_for("org.example.OldWriter").expect("lookup"),
            vec!["org.example.NewWriter"]
        );
        assert!(rules[0].replacements_for("org.example.Other").expect("lookup").is_empty());

        let err = rules[1].replacements_for("org.example.OldWriter").unwrap_err();
        assert!(matches!(err, DocGenError::Registry(_)));
        assert!(err.to_string().contains("missing class"));
    }
}
