//! Collaborator boundary of jsondocgen.
//!
//! The generator never talks to a live catalog directly. It sees three
//! traits instead:
//! - [`CatalogRegistry`]: the category/item tree and each item's description markup
//! - [`Introspector`]: runtime facts (ports, dynamic groups, capability flags)
//! - [`TypeFamily`]: the port type hierarchy
//! - [`MigrationRegistry`]: rules mapping outdated item factories to their replacements
//!
//! In-memory implementations back the file-based [`SnapshotCatalog`].

pub mod family;
pub mod introspect;
pub mod memory;
pub mod migration;
pub mod registry;
pub mod snapshot;

use std::sync::Arc;

pub use family::{RegisteredTypeInfo, TypeFamily, TypeIdentity};
pub use introspect::{
    IntrospectedFacts, Introspector, PortDirection, RuntimeHandle, RuntimePort, RuntimePortGroup,
};
pub use memory::{
    MemoryIntrospector, MemoryMigrationRegistry, MemoryMigrationRule, MemoryRegistry,
    MemoryTypeFamily,
};
pub use migration::{MigrationRegistry, MigrationRule};
pub use registry::{CatalogItem, CatalogRegistry, RegistryContainer, RegistryNode};
pub use snapshot::{SNAPSHOT_FILE_NAME, SnapshotCatalog};

/// The collaborators of one run, shareable across tasks.
#[derive(Clone)]
pub struct Catalog {
    pub registry: Arc<dyn CatalogRegistry>,
    pub introspector: Arc<dyn Introspector>,
    pub types: Arc<dyn TypeFamily>,
    pub migrations: Arc<dyn MigrationRegistry>,
}
