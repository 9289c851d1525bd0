//! Shared types, error model, and configuration for jsondocgen.
//!
//! This crate is the foundation depended on by all other jsondocgen crates.
//! It provides:
//! - [`DocGenError`]: the unified error type
//! - Output model types ([`MergedDoc`], [`CategoryNode`], [`Port`], [`RunManifest`])
//! - Configuration ([`AppConfig`], [`GenerateConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FiltersConfig, GenerateConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{DocGenError, Result};
pub use types::{
    ArtifactMeta, CURRENT_SCHEMA_VERSION, CategoryNode, DynamicPortGroup, InteractiveView, Link,
    MANIFEST_FILE_NAME, MergedDoc, MigrationRuleDoc, OptionDoc, OptionTab, Port, RunFilters, RunId,
    RunManifest, RunStats, View,
};
