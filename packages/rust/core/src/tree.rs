//! Category tree assembly.
//!
//! Runs in three phases so item work can fan out while the output stays
//! deterministic:
//! 1. plan: walk the registry, apply filters, record one job per surviving item
//! 2. process: parse, introspect and merge every job on the blocking pool
//! 3. assemble: place results back into their categories and prune empty ones

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use jsondocgen_catalog::{
    CatalogItem, CatalogRegistry, IntrospectedFacts, Introspector, RegistryContainer, RegistryNode,
};
use jsondocgen_markup::DocumentModel;
use jsondocgen_shared::{CategoryNode, DocGenError, MergedDoc, Result, RunFilters, RunStats};

use crate::merge::merge;
use crate::pipeline::ProgressReporter;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Turn a user category path (`/community/io`) into the dotted form (`community.io`).
///
/// `"/"` and `""` both mean no filter.
pub fn normalize_category_path(path: &str) -> String {
    path.strip_prefix('/').unwrap_or(path).replace('/', ".")
}

/// Item filters of one run, with the category path already normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeFilters {
    pub plugins: Vec<String>,
    pub category_path: String,
    pub include_deprecated: bool,
}

impl TreeFilters {
    pub fn new(plugins: Vec<String>, category_path: &str, include_deprecated: bool) -> Self {
        Self {
            plugins,
            category_path: normalize_category_path(category_path),
            include_deprecated,
        }
    }

    pub fn to_run_filters(&self) -> RunFilters {
        RunFilters {
            plugins: self.plugins.clone(),
            category_path: self.category_path.clone(),
            include_deprecated: self.include_deprecated,
        }
    }

    /// Registry-level checks, applied in order: plugin, category path, deprecation.
    /// `path` is the dotted id path of the item's parent category.
    fn accepts(&self, item: &CatalogItem, path: &str) -> bool {
        if !self.plugins.is_empty() {
            let listed = item
                .contributing_plugin
                .as_ref()
                .is_some_and(|plugin| self.plugins.contains(plugin));
            if !listed {
                debug!(item = %item.id, "filtered by plugin");
                return false;
            }
        }
        if !self.category_path.is_empty() && !path.starts_with(&self.category_path) {
            debug!(item = %item.id, path, "filtered by category path");
            return false;
        }
        if item.deprecated && !self.include_deprecated {
            debug!(item = %item.id, "filtered as deprecated");
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

struct PlannedCategory {
    /// Category metadata; `children` and `items` are filled during assembly.
    node: CategoryNode,
    children: Vec<PlannedCategory>,
    /// Indices into the job list, in declaration order.
    jobs: Vec<usize>,
}

impl PlannedCategory {
    fn from_container(container: &RegistryContainer) -> Self {
        Self {
            node: CategoryNode {
                id: container.id.clone(),
                name: container.name.clone(),
                description: container.description.clone(),
                contributing_plugin: container.contributing_plugin.clone(),
                icon_base64: container.icon_base64.clone(),
                after_id: container.after_id.clone(),
                children: Vec::new(),
                items: Vec::new(),
            },
            children: Vec::new(),
            jobs: Vec::new(),
        }
    }
}

struct Planner<'a> {
    filters: &'a TreeFilters,
    jobs: Vec<CatalogItem>,
    filtered: usize,
}

impl Planner<'_> {
    fn plan_container(&mut self, container: &RegistryContainer, path: &str) -> PlannedCategory {
        let mut planned = PlannedCategory::from_container(container);
        self.plan_children(&container.children, path, &mut planned);
        planned
    }

    fn plan_children(&mut self, nodes: &[RegistryNode], path: &str, into: &mut PlannedCategory) {
        for node in nodes {
            match node {
                RegistryNode::Item(item) => {
                    if self.filters.accepts(item, path) {
                        into.jobs.push(self.jobs.len());
                        self.jobs.push(item.clone());
                    } else {
                        self.filtered += 1;
                    }
                }
                RegistryNode::Category(category) => {
                    let child_path = if path.is_empty() {
                        category.id.clone()
                    } else {
                        format!("{path}.{}", category.id)
                    };
                    let child = self.plan_container(category, &child_path);
                    into.children.push(child);
                }
                // a nested root contributes its entries to the enclosing category
                RegistryNode::Root(root) => self.plan_children(&root.children, path, into),
                RegistryNode::Other => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

enum ItemOutcome {
    Emitted {
        doc: Box<MergedDoc>,
        warnings: usize,
        markup_only: bool,
    },
    Failed,
}

fn process_item(
    item: &CatalogItem,
    registry: &dyn CatalogRegistry,
    introspector: &dyn Introspector,
) -> ItemOutcome {
    let markup = match registry.description_markup(item) {
        Ok(markup) => markup,
        Err(e) if e.is_item_scoped() => {
            warn!(item = %item.id, error = %e, "description markup unavailable, item dropped");
            return ItemOutcome::Failed;
        }
        Err(e) => {
            error!(item = %item.id, error = %e, "registry failed while reading markup, item dropped");
            return ItemOutcome::Failed;
        }
    };

    let doc = match markup {
        Some(markup) => match jsondocgen_markup::parse(&markup) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(item = %item.id, error = %e, "description markup rejected, item dropped");
                return ItemOutcome::Failed;
            }
        },
        None => {
            debug!(item = %item.id, "item has no description markup");
            DocumentModel::default()
        }
    };

    let facts = match introspector.instantiate(item) {
        Ok(handle) => Some(IntrospectedFacts::from_handle(handle.as_ref())),
        Err(e) => {
            warn!(item = %item.id, error = %e, "runtime facts unavailable, documenting markup only");
            None
        }
    };

    let markup_only = facts.is_none();
    let outcome = merge(doc, item, facts.as_ref());

    ItemOutcome::Emitted {
        doc: Box::new(outcome.doc),
        warnings: outcome.warnings.len(),
        markup_only,
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// The assembled tree plus what happened along the way.
#[derive(Debug, Clone)]
pub struct TreeOutcome {
    pub root: CategoryNode,
    pub stats: RunStats,
}

pub struct CategoryTreeBuilder {
    filters: TreeFilters,
    concurrency: usize,
}

impl CategoryTreeBuilder {
    pub fn new(filters: TreeFilters, concurrency: usize) -> Self {
        Self {
            filters,
            concurrency: concurrency.max(1),
        }
    }

    /// Build the filtered, pruned category tree.
    ///
    /// Only registry enumeration is fatal; every per-item problem is logged
    /// and counted in the returned stats.
    #[instrument(skip_all, fields(concurrency = self.concurrency, category = %self.filters.category_path))]
    pub async fn build(
        &self,
        registry: Arc<dyn CatalogRegistry>,
        introspector: Arc<dyn Introspector>,
        progress: &dyn ProgressReporter,
    ) -> Result<TreeOutcome> {
        let root = registry.load_root()?;

        // --- Phase 1: plan ---
        let mut planner = Planner {
            filters: &self.filters,
            jobs: Vec::new(),
            filtered: 0,
        };
        let plan = planner.plan_container(&root, "");
        let Planner { jobs, filtered, .. } = planner;
        let total = jobs.len();
        info!(items = total, filtered, "planned category tree");

        let mut stats = RunStats {
            items_filtered: filtered,
            ..Default::default()
        };

        // --- Phase 2: process ---
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total);
        let mut ids = Vec::with_capacity(total);

        for item in jobs {
            let permit = Arc::clone(&semaphore).acquire_owned().await.map_err(|e| {
                DocGenError::validation(format!("item scheduler closed unexpectedly: {e}"))
            })?;
            let registry = Arc::clone(&registry);
            let introspector = Arc::clone(&introspector);
            ids.push(item.id.clone());

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                process_item(&item, registry.as_ref(), introspector.as_ref())
            }));
        }

        let mut slots: Vec<Option<MergedDoc>> = Vec::with_capacity(total);
        for (index, (handle, id)) in handles.into_iter().zip(&ids).enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(item = %id, error = %e, "item task failed, item dropped");
                    ItemOutcome::Failed
                }
            };
            match outcome {
                ItemOutcome::Emitted {
                    doc,
                    warnings,
                    markup_only,
                } => {
                    stats.merge_warnings += warnings;
                    if markup_only {
                        stats.items_markup_only += 1;
                    }
                    slots.push(Some(*doc));
                }
                ItemOutcome::Failed => {
                    stats.items_failed += 1;
                    slots.push(None);
                }
            }
            progress.item_processed(id, index + 1, total);
        }

        // --- Phase 3: assemble ---
        let tree = assemble(plan, &mut slots);
        stats.items_emitted = tree.item_count();

        info!(
            emitted = stats.items_emitted,
            filtered = stats.items_filtered,
            failed = stats.items_failed,
            markup_only = stats.items_markup_only,
            "category tree assembled"
        );

        Ok(TreeOutcome { root: tree, stats })
    }
}

/// Bottom-up: a category survives when it holds an item or a surviving child.
/// The caller always keeps the top node.
fn assemble(planned: PlannedCategory, slots: &mut [Option<MergedDoc>]) -> CategoryNode {
    let mut node = planned.node;
    node.items = planned
        .jobs
        .iter()
        .filter_map(|&job| slots.get_mut(job).and_then(Option::take))
        .collect();
    node.children = planned
        .children
        .into_iter()
        .map(|child| assemble(child, slots))
        .filter(|child| !child.is_empty())
        .collect();
    node
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::pipeline::SilentProgress;
    use jsondocgen_catalog::{
        Catalog, MemoryIntrospector, MemoryRegistry, RuntimePort, SnapshotCatalog,
    };

    fn item(id: &str, plugin: &str, markup: &str) -> RegistryNode {
        RegistryNode::Item(CatalogItem {
            id: id.into(),
            name: id.into(),
            contributing_plugin: Some(plugin.into()),
            markup: Some(markup.into()),
            ..Default::default()
        })
    }

    fn deprecated_item(id: &str) -> RegistryNode {
        RegistryNode::Item(CatalogItem {
            id: id.into(),
            name: id.into(),
            deprecated: true,
            markup: Some("<knimeNode><name>Old</name></knimeNode>".into()),
            ..Default::default()
        })
    }

    fn category(id: &str, children: Vec<RegistryNode>) -> RegistryNode {
        RegistryNode::Category(RegistryContainer {
            children,
            ..RegistryContainer::new(id, id.to_uppercase())
        })
    }

    fn root(children: Vec<RegistryNode>) -> RegistryContainer {
        RegistryContainer {
            children,
            ..RegistryContainer::new("root", "Repository")
        }
    }

    async fn run(
        root: RegistryContainer,
        introspector: MemoryIntrospector,
        filters: TreeFilters,
    ) -> TreeOutcome {
        let builder = CategoryTreeBuilder::new(filters, 3);
        builder
            .build(
                Arc::new(MemoryRegistry::new(root)),
                Arc::new(introspector),
                &SilentProgress,
            )
            .await
            .expect("build tree")
    }

    /// Every non-root category must hold something.
    fn assert_no_empty_categories(node: &CategoryNode) {
        for child in &node.children {
            assert!(!child.is_empty(), "empty category {}", child.id);
            assert_no_empty_categories(child);
        }
    }

    #[test]
    fn category_paths_normalize() {
        assert_eq!(normalize_category_path("/"), "");
        assert_eq!(normalize_category_path(""), "");
        assert_eq!(normalize_category_path("/community/io"), "community.io");
        assert_eq!(normalize_category_path("community/io"), "community.io");
    }

    #[tokio::test]
    async fn all_deprecated_items_give_an_empty_tree() {
        let registry_root = root(vec![category(
            "legacy",
            vec![deprecated_item("a"), deprecated_item("b"), deprecated_item("c")],
        )]);
        let outcome = run(registry_root, MemoryIntrospector::new(), TreeFilters::default()).await;

        assert_eq!(outcome.root.id, "root");
        assert!(outcome.root.children.is_empty());
        assert!(outcome.root.items.is_empty());
        assert_eq!(outcome.stats.items_filtered, 3);
        assert_eq!(outcome.stats.items_emitted, 0);
    }

    #[tokio::test]
    async fn deprecated_items_kept_on_request() {
        let registry_root = root(vec![category("legacy", vec![deprecated_item("a")])]);
        let filters = TreeFilters::new(Vec::new(), "/", true);
        let outcome = run(registry_root, MemoryIntrospector::new(), filters).await;
        assert_eq!(outcome.root.children[0].items[0].id, "a");
        assert!(outcome.root.children[0].items[0].deprecated);
        assert_eq!(outcome.stats.items_markup_only, 1);
    }

    #[tokio::test]
    async fn markup_deprecation_is_reported_not_filtered() {
        let markup = r#"<knimeNode deprecated="true"><name>Old</name></knimeNode>"#;
        let registry_root = root(vec![category("c", vec![item("a", "p", markup)])]);
        let outcome = run(registry_root, MemoryIntrospector::new(), TreeFilters::default()).await;
        assert_eq!(outcome.stats.items_emitted, 1);
        assert_eq!(outcome.stats.items_filtered, 0);
        let doc = &outcome.root.children[0].items[0];
        assert_eq!(doc.id, "a");
        assert!(doc.deprecated);
    }

    #[tokio::test]
    async fn filters_by_plugin_and_category() {
        let markup = "<knimeNode><name>N</name></knimeNode>";
        let registry_root = root(vec![
            category(
                "io",
                vec![
                    category("read", vec![item("r1", "org.io", markup)]),
                    item("w1", "org.io", markup),
                ],
            ),
            category("misc", vec![item("m1", "org.misc", markup)]),
            item("top", "org.io", markup),
        ]);

        let filters = TreeFilters::new(vec!["org.io".into()], "/io/read", false);
        let outcome = run(registry_root.clone(), MemoryIntrospector::new(), filters).await;
        assert_eq!(outcome.root.item_count(), 1);
        assert_eq!(outcome.root.children[0].id, "io");
        assert!(outcome.root.children[0].items.is_empty());
        assert_eq!(outcome.root.children[0].children[0].items[0].id, "r1");
        assert_eq!(outcome.stats.items_filtered, 3);

        // plugin filter alone
        let filters = TreeFilters::new(vec!["org.misc".into()], "/", false);
        let outcome = run(registry_root, MemoryIntrospector::new(), filters).await;
        assert_eq!(outcome.root.item_count(), 1);
        assert_eq!(outcome.root.children[0].id, "misc");
        assert_no_empty_categories(&outcome.root);
    }

    #[tokio::test]
    async fn parse_failures_are_isolated() {
        let good = "<knimeNode><name>Good</name></knimeNode>";
        let bad = "<knimeNode><name>Bad</knimeNode>";
        let registry_root = root(vec![category(
            "c",
            vec![item("good", "p", good), item("bad", "p", bad)],
        )]);
        let outcome = run(registry_root, MemoryIntrospector::new(), TreeFilters::default()).await;
        assert_eq!(outcome.root.children[0].items.len(), 1);
        assert_eq!(outcome.root.children[0].items[0].name, "Good");
        assert_eq!(outcome.stats.items_failed, 1);
        assert_eq!(outcome.stats.items_emitted, 1);
    }

    #[tokio::test]
    async fn nested_roots_splice_and_other_nodes_are_skipped() {
        let markup = "<knimeNode><name>N</name></knimeNode>";
        let registry_root = root(vec![category(
            "c",
            vec![
                item("first", "p", markup),
                RegistryNode::Root(RegistryContainer {
                    children: vec![item("spliced", "p", markup)],
                    ..RegistryContainer::new("nested", "Nested")
                }),
                RegistryNode::Other,
                item("last", "p", markup),
            ],
        )]);
        let outcome = run(registry_root, MemoryIntrospector::new(), TreeFilters::default()).await;
        let ids: Vec<&str> = outcome.root.children[0]
            .items
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "spliced", "last"]);
    }

    /// Sleeps longer for earlier items so completion order runs backwards.
    struct SlowFirstIntrospector {
        count: usize,
        finished: std::sync::Mutex<Vec<String>>,
    }

    impl Introspector for SlowFirstIntrospector {
        fn instantiate(
            &self,
            item: &CatalogItem,
        ) -> Result<Box<dyn jsondocgen_catalog::RuntimeHandle + '_>> {
            let position: usize = item.id.trim_start_matches("item").parse().unwrap_or(0);
            let delay = (self.count - position) as u64 * 25;
            std::thread::sleep(std::time::Duration::from_millis(delay));
            self.finished.lock().unwrap().push(item.id.clone());
            Ok(Box::new(IntrospectedFacts {
                in_ports: vec![RuntimePort {
                    type_class: "T".into(),
                    optional: false,
                }],
                ..Default::default()
            }))
        }
    }

    #[tokio::test]
    async fn output_order_is_declaration_order() {
        let markup = "<knimeNode><ports><inPort name=\"In\"/></ports></knimeNode>";
        let ids: Vec<String> = (0..8).map(|i| format!("item{i:02}")).collect();
        let introspector = Arc::new(SlowFirstIntrospector {
            count: ids.len(),
            finished: std::sync::Mutex::new(Vec::new()),
        });
        let registry_root = root(vec![category(
            "c",
            ids.iter().map(|id| item(id, "p", markup)).collect(),
        )]);

        let builder = CategoryTreeBuilder::new(TreeFilters::default(), ids.len());
        let outcome = builder
            .build(
                Arc::new(MemoryRegistry::new(registry_root)),
                Arc::clone(&introspector) as Arc<dyn Introspector>,
                &SilentProgress,
            )
            .await
            .expect("build tree");

        let finished = introspector.finished.lock().unwrap().clone();
        assert_eq!(finished.len(), ids.len());
        assert_eq!(finished.first(), ids.last(), "last item should finish first");

        let emitted: Vec<&str> = outcome.root.children[0]
            .items
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(emitted, ids.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(outcome.stats.items_markup_only, 0);
        assert_eq!(outcome.stats.merge_warnings, 0);
    }

    #[tokio::test]
    async fn fixture_catalog_tree() {
        let Catalog {
            registry,
            introspector,
            ..
        } = SnapshotCatalog::open(Path::new("../../../fixtures/catalog")).expect("open");
        let builder = CategoryTreeBuilder::new(TreeFilters::default(), 2);
        let outcome = builder
            .build(registry, introspector, &SilentProgress)
            .await
            .expect("build");
        let tree = outcome.root;

        // io, manipulation; templates holds only a metanode and is pruned
        let top: Vec<&str> = tree.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(top, vec!["io", "manipulation"]);
        assert_no_empty_categories(&tree);

        // the broken item fails, the script item is documented without runtime facts
        assert_eq!(outcome.stats.items_failed, 1);
        assert_eq!(outcome.stats.items_markup_only, 1);
        assert_eq!(tree.items.len(), 1);
        assert_eq!(tree.items[0].id, "org.example.extra.ScriptFactory");

        let io = &tree.children[0];
        assert_eq!(io.items.len(), 1);
        let reader = &io.items[0];
        assert!(reader.streamable);
        assert!(reader.has_modern_dialog);
        assert_eq!(reader.option_tabs.as_ref().map(Vec::len), Some(2));

        let row = &tree.children[1].children[1];
        assert_eq!(row.after_id.as_deref(), Some("column"));
        let row_ids: Vec<&str> = row.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            row_ids,
            vec![
                "org.example.base.ConcatenateFactory",
                "org.example.extra.RowSamplerFactory"
            ]
        );
        let concatenate = &row.items[0];
        assert_eq!(
            concatenate.dynamic_in_ports[0].supported_type_classes,
            vec!["org.example.BufferedDataTable"]
        );
        assert_eq!(tree.item_count(), outcome.stats.items_emitted);
    }
}
