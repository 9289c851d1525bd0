//! Node migration rules: which item factory replaces which.

use jsondocgen_shared::Result;

/// One migration rule of the catalog.
pub trait MigrationRule: Send + Sync {
    /// Rule identifier used in diagnostics.
    fn name(&self) -> &str;

    /// Replacement factories the rule proposes for `original`.
    ///
    /// Empty when the rule does not apply. More than one entry is a rule the
    /// generator cannot document.
    fn replacements_for(&self, original: &str) -> Result<Vec<String>>;
}

/// Enumerates the migration rules known to the catalog.
pub trait MigrationRegistry: Send + Sync {
    fn rules(&self) -> Vec<&dyn MigrationRule>;
}
