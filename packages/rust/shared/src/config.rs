//! Application configuration for jsondocgen.
//!
//! User config lives at `~/.jsondocgen/jsondocgen.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocGenError, Result};
use crate::types::MANIFEST_FILE_NAME;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "jsondocgen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".jsondocgen";

// ---------------------------------------------------------------------------
// Config structs (matching jsondocgen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Catalog filters applied when no CLI flag overrides them.
    #[serde(default)]
    pub filters: FiltersConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum number of items processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// File name of the item documentation artifact.
    #[serde(default = "default_item_docs_file")]
    pub item_docs_file: String,

    /// File name of the type hierarchy artifact.
    #[serde(default = "default_type_docs_file")]
    pub type_docs_file: String,

    /// File name of the migration rules artifact.
    #[serde(default = "default_migrations_file")]
    pub migrations_file: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            item_docs_file: default_item_docs_file(),
            type_docs_file: default_type_docs_file(),
            migrations_file: default_migrations_file(),
        }
    }
}

fn default_concurrency() -> u32 {
    4
}
fn default_item_docs_file() -> String {
    "nodeDocumentation.json".into()
}
fn default_type_docs_file() -> String {
    "portDocumentation.json".into()
}
fn default_migrations_file() -> String {
    "migrations.json".into()
}

/// `[filters]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Plugin allow-list; empty means all plugins.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Category path such as `/community/io`; `/` means the whole catalog.
    #[serde(default = "default_category_path")]
    pub category_path: String,

    /// Whether deprecated items are documented.
    #[serde(default)]
    pub include_deprecated: bool,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            category_path: default_category_path(),
            include_deprecated: false,
        }
    }
}

fn default_category_path() -> String {
    "/".into()
}

// ---------------------------------------------------------------------------
// Generate config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime generator configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Directory the artifacts are written to.
    pub output_dir: PathBuf,
    /// Plugin allow-list; empty means all plugins.
    pub plugins: Vec<String>,
    /// Category path as given by the user (normalized by the tree builder).
    pub category_path: String,
    pub include_deprecated: bool,
    /// Skip the item documentation artifact.
    pub skip_item_docs: bool,
    /// Skip the type hierarchy artifact.
    pub skip_type_docs: bool,
    /// Skip the migration rules artifact.
    pub skip_migration_rules: bool,
    /// Maximum number of items processed concurrently.
    pub concurrency: usize,
    pub item_docs_file: String,
    pub type_docs_file: String,
    pub migrations_file: String,
    /// Tool version string recorded in the run manifest.
    pub tool_version: String,
}

impl GenerateConfig {
    /// Build a runtime config from the file config for the given output directory.
    pub fn from_app(config: &AppConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            plugins: config.filters.plugins.clone(),
            category_path: config.filters.category_path.clone(),
            include_deprecated: config.filters.include_deprecated,
            skip_item_docs: false,
            skip_type_docs: false,
            skip_migration_rules: false,
            concurrency: config.defaults.concurrency as usize,
            item_docs_file: config.defaults.item_docs_file.clone(),
            type_docs_file: config.defaults.type_docs_file.clone(),
            migrations_file: config.defaults.migrations_file.clone(),
            tool_version: String::new(),
        }
    }

    /// Check values that cannot be expressed in the types.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(DocGenError::config("concurrency must be at least 1"));
        }
        let artifacts = [
            ("item_docs_file", &self.item_docs_file, self.skip_item_docs),
            ("type_docs_file", &self.type_docs_file, self.skip_type_docs),
            ("migrations_file", &self.migrations_file, self.skip_migration_rules),
        ];
        for (key, file, _) in &artifacts {
            if file.is_empty() || file.contains(['/', '\\']) {
                return Err(DocGenError::config(format!(
                    "{key} must be a plain file name, got '{file}'"
                )));
            }
            if file.as_str() == MANIFEST_FILE_NAME {
                return Err(DocGenError::config(format!(
                    "{key} cannot be '{MANIFEST_FILE_NAME}', the run manifest uses that name"
                )));
            }
        }
        let written: Vec<_> = artifacts.iter().filter(|(_, _, skipped)| !skipped).collect();
        for (i, (key, file, _)) in written.iter().enumerate() {
            if let Some((other, _, _)) = written[i + 1..].iter().find(|(_, f, _)| f == file) {
                return Err(DocGenError::config(format!(
                    "{key} and {other} must differ, both are '{file}'"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.jsondocgen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocGenError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.jsondocgen/jsondocgen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocGenError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocGenError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocGenError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocGenError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocGenError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
