//! End-to-end `generate` pipeline: catalog → item tree, type hierarchy and migration rules → artifacts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use jsondocgen_catalog::Catalog;
use jsondocgen_shared::{
    ArtifactMeta, CURRENT_SCHEMA_VERSION, DocGenError, GenerateConfig, Result, RunId, RunManifest,
    RunStats,
};

use crate::hierarchy::index_family;
use crate::migrations::extract_migration_rules;
use crate::render::{to_pretty_json, write_artifact, write_manifest};
use crate::tree::{CategoryTreeBuilder, TreeFilters};

/// Result of the `generate` pipeline.
#[derive(Debug)]
pub struct GenerateResult {
    pub run_id: RunId,
    /// Directory holding the artifacts and `manifest.json`.
    pub output_dir: PathBuf,
    /// Written artifacts, item documentation first.
    pub artifacts: Vec<ArtifactMeta>,
    pub stats: RunStats,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per catalog item, in output order.
    fn item_processed(&self, id: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_processed(&self, _id: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &GenerateResult) {}
}

/// Run the full `generate` pipeline.
///
/// 1. Build the filtered category tree and write the item documentation
/// 2. Index the type family and write the type documentation
/// 3. Extract the migration rules and write them
/// 4. Write the run manifest
///
/// Each artifact can be skipped through the config.
#[instrument(skip_all, fields(output = %config.output_dir.display()))]
pub async fn generate(
    config: &GenerateConfig,
    catalog: &Catalog,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    config.validate()?;
    let start = Instant::now();
    let run_id = RunId::new();

    info!(%run_id, "starting documentation run");

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| DocGenError::io(&config.output_dir, e))?;

    let filters = TreeFilters::new(
        config.plugins.clone(),
        &config.category_path,
        config.include_deprecated,
    );
    let mut stats = RunStats::default();
    let mut artifacts = Vec::new();

    // --- Phase 1: item documentation ---
    if config.skip_item_docs {
        info!("item documentation skipped");
    } else {
        progress.phase("Documenting catalog items");
        let builder = CategoryTreeBuilder::new(filters.clone(), config.concurrency);
        let outcome = builder
            .build(
                Arc::clone(&catalog.registry),
                Arc::clone(&catalog.introspector),
                progress,
            )
            .await?;
        stats = outcome.stats;

        progress.phase("Writing item documentation");
        let json = to_pretty_json(&outcome.root)?;
        artifacts.push(write_artifact(
            &config.output_dir,
            &config.item_docs_file,
            &json,
        )?);
    }

    // --- Phase 2: type documentation ---
    if config.skip_type_docs {
        info!("type documentation skipped");
    } else {
        progress.phase("Indexing port types");
        let hierarchy = index_family(catalog.types.as_ref())?;
        stats.type_count = hierarchy.len();

        let root = catalog.types.root_type();
        let tree = hierarchy.tree(&root).ok_or_else(|| {
            DocGenError::validation(format!("root type {root} missing from hierarchy"))
        })?;

        progress.phase("Writing type documentation");
        let json = to_pretty_json(&tree)?;
        artifacts.push(write_artifact(
            &config.output_dir,
            &config.type_docs_file,
            &json,
        )?);
    }

    // --- Phase 3: migration rules ---
    if config.skip_migration_rules {
        info!("migration rules skipped");
    } else {
        progress.phase("Extracting migration rules");
        let root = catalog.registry.load_root()?;
        let rules = extract_migration_rules(&root, catalog.migrations.as_ref());
        stats.migration_rules = rules.len();

        progress.phase("Writing migration rules");
        let json = to_pretty_json(&rules)?;
        artifacts.push(write_artifact(
            &config.output_dir,
            &config.migrations_file,
            &json,
        )?);
    }

    // --- Phase 4: manifest ---
    let manifest = RunManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        run_id: run_id.clone(),
        tool_version: config.tool_version.clone(),
        generated_at: Utc::now(),
        filters: filters.to_run_filters(),
        stats: stats.clone(),
        artifacts: artifacts.clone(),
    };
    write_manifest(&config.output_dir, &manifest)?;

    let result = GenerateResult {
        run_id,
        output_dir: config.output_dir.clone(),
        artifacts,
        stats,
        elapsed: start.elapsed(),
    };

    info!(
        run_id = %result.run_id,
        items = result.stats.items_emitted,
        types = result.stats.type_count,
        migrations = result.stats.migration_rules,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "documentation run complete"
    );

    progress.done(&result);
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::render::read_manifest;
    use jsondocgen_catalog::SnapshotCatalog;
    use jsondocgen_shared::{AppConfig, CategoryNode, MigrationRuleDoc};

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("jdg-pipeline-test-{}", uuid::Uuid::now_v7()))
    }

    fn fixture_catalog() -> Catalog {
        SnapshotCatalog::open(Path::new("../../../fixtures/catalog")).expect("open fixture")
    }

    fn config(output_dir: &Path) -> GenerateConfig {
        let mut config = GenerateConfig::from_app(&AppConfig::default(), output_dir);
        config.tool_version = "test".into();
        config
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        items: Mutex<Vec<(String, usize, usize)>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn item_processed(&self, id: &str, current: usize, total: usize) {
            self.items.lock().unwrap().push((id.to_string(), current, total));
        }
        fn done(&self, _result: &GenerateResult) {}
    }

    #[tokio::test]
    async fn generate_writes_all_artifacts_and_manifest() {
        let dir = temp_dir();
        let progress = RecordingProgress::default();
        let result = generate(&config(&dir), &fixture_catalog(), &progress)
            .await
            .expect("generate");

        assert_eq!(result.artifacts.len(), 3);
        assert_eq!(result.artifacts[0].filename, "nodeDocumentation.json");
        assert_eq!(result.artifacts[1].filename, "portDocumentation.json");
        assert_eq!(result.artifacts[2].filename, "migrations.json");

        let nodes = std::fs::read_to_string(dir.join("nodeDocumentation.json")).unwrap();
        let tree: CategoryNode = serde_json::from_str(&nodes).expect("item docs parse");
        assert_eq!(tree.item_count(), result.stats.items_emitted);
        assert_eq!(result.stats.items_emitted, 5);

        let ports = std::fs::read_to_string(dir.join("portDocumentation.json")).unwrap();
        let ports: serde_json::Value = serde_json::from_str(&ports).expect("type docs parse");
        assert_eq!(ports["objectClass"], "org.example.PortObject");
        assert_eq!(ports["color"], "9b9b9b");
        let first_child = &ports["children"][0];
        assert_eq!(first_child["objectClass"], "org.example.DataTable");
        assert_eq!(first_child["registered"], false);
        assert_eq!(first_child["children"][0]["name"], "Data");
        assert_eq!(result.stats.type_count, 6);

        let manifest = read_manifest(&dir).expect("manifest");
        assert_eq!(manifest.run_id, result.run_id);
        assert_eq!(manifest.tool_version, "test");
        assert_eq!(manifest.artifacts, result.artifacts);
        assert_eq!(manifest.stats.items_failed, 1);

        let phases = progress.phases.lock().unwrap();
        assert_eq!(phases.first().map(String::as_str), Some("Documenting catalog items"));
        let items = progress.items.lock().unwrap();
        assert_eq!(items.len(), 6);
        assert!(items.iter().all(|(_, _, total)| *total == 6));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn migration_rules_are_written_as_factory_pairs() {
        let dir = temp_dir();
        let mut config = config(&dir);
        // run filters do not narrow the migration rules
        config.category_path = "/manipulation".into();

        let result = generate(&config, &fixture_catalog(), &SilentProgress)
            .await
            .expect("generate");
        assert_eq!(result.stats.migration_rules, 2);

        let json = std::fs::read_to_string(dir.join("migrations.json")).unwrap();
        let rules: Vec<MigrationRuleDoc> = serde_json::from_str(&json).expect("migrations parse");
        let pairs: Vec<(&str, &str)> = rules
            .iter()
            .map(|r| {
                (
                    r.original_node_factory_class.as_str(),
                    r.replacement_node_factory_class.as_str(),
                )
            })
            .collect();
        // the failing rule and the ambiguous column filter split are left out
        assert_eq!(
            pairs,
            vec![
                ("org.example.io.LegacyWriterFactory", "org.example.io.CsvWriterFactory"),
                ("org.example.extra.RowSamplerFactory", "org.example.base.RowSamplingFactory"),
            ]
        );
        assert!(json.contains("\"originalNodeFactoryClass\""));

        let manifest = read_manifest(&dir).expect("manifest");
        assert_eq!(manifest.stats.migration_rules, 2);
        assert!(manifest.artifacts.iter().any(|a| a.filename == "migrations.json"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn skipping_migration_rules_writes_no_file() {
        let dir = temp_dir();
        let mut config = config(&dir);
        config.skip_migration_rules = true;

        let result = generate(&config, &fixture_catalog(), &SilentProgress)
            .await
            .expect("generate");
        assert_eq!(result.artifacts.len(), 2);
        assert_eq!(result.stats.migration_rules, 0);
        assert!(!dir.join("migrations.json").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn skipping_item_docs_still_indexes_types() {
        let dir = temp_dir();
        let mut config = config(&dir);
        config.skip_item_docs = true;
        config.skip_migration_rules = true;

        let result = generate(&config, &fixture_catalog(), &SilentProgress)
            .await
            .expect("generate");
        assert_eq!(result.artifacts.len(), 1);
        assert!(!dir.join("nodeDocumentation.json").exists());
        assert!(dir.join("portDocumentation.json").exists());
        assert!(dir.join("manifest.json").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn category_filter_is_recorded_normalized() {
        let dir = temp_dir();
        let mut config = config(&dir);
        config.category_path = "/manipulation/row".into();
        config.skip_type_docs = true;

        let result = generate(&config, &fixture_catalog(), &SilentProgress)
            .await
            .expect("generate");
        assert_eq!(result.stats.items_emitted, 2);

        let manifest = read_manifest(&dir).expect("manifest");
        assert_eq!(manifest.filters.category_path, "manipulation.row");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_any_output() {
        let dir = temp_dir();
        let mut config = config(&dir);
        config.concurrency = 0;

        let err = generate(&config, &fixture_catalog(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocGenError::Config { .. }));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn artifact_named_like_the_manifest_is_rejected() {
        let dir = temp_dir();
        let mut config = config(&dir);
        config.type_docs_file = "manifest.json".into();

        let err = generate(&config, &fixture_catalog(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocGenError::Config { .. }));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn missing_type_family_fails_type_docs_only() {
        let json = r#"{"repository": {"id": "root", "name": "Repository"}}"#;
        let catalog = SnapshotCatalog::from_json(json, Path::new(".")).expect("load");

        let dir = temp_dir();
        let mut config = config(&dir);
        config.skip_type_docs = true;
        let result = generate(&config, &catalog, &SilentProgress)
            .await
            .expect("item docs only");
        assert_eq!(result.stats.items_emitted, 0);

        config.skip_type_docs = false;
        let err = generate(&config, &catalog, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, DocGenError::Registry(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
