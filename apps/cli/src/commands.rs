//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use jsondocgen_catalog::SnapshotCatalog;
use jsondocgen_core::{GenerateResult, ProgressReporter, generate, to_pretty_json};
use jsondocgen_shared::{AppConfig, GenerateConfig, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// jsondocgen: JSON documentation for node catalogs.
#[derive(Parser)]
#[command(
    name = "jsondocgen",
    version,
    about = "Generate JSON documentation for the items and port types of a node catalog.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate item documentation, port type documentation and migration rules from a catalog snapshot.
    Generate {
        /// Directory containing the catalog snapshot (catalog.json).
        #[arg(long)]
        catalog: PathBuf,

        /// Directory the JSON artifacts are written to.
        #[arg(long)]
        destination: PathBuf,

        /// Only document items contributed by this plugin (repeatable).
        #[arg(long)]
        plugin: Vec<String>,

        /// Only document items below this category path (e.g. /io/read).
        #[arg(long)]
        category: Option<String>,

        /// Keep deprecated items in the output.
        #[arg(long)]
        include_deprecated: bool,

        /// Do not write the item documentation.
        #[arg(long)]
        skip_node_documentation: bool,

        /// Do not write the port type documentation.
        #[arg(long)]
        skip_port_documentation: bool,

        /// Do not write the migration rules.
        #[arg(long)]
        skip_migration_rules: bool,

        /// Maximum number of items processed in parallel.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Config file to use instead of the default location.
        #[arg(long, env = "JSONDOCGEN_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Parse a single description markup file and print its document model.
    Parse {
        /// Markup file to parse.
        file: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "jsondocgen=info",
        1 => "jsondocgen=debug",
        _ => "jsondocgen=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `parse` output stays pipeable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            catalog,
            destination,
            plugin,
            category,
            include_deprecated,
            skip_node_documentation,
            skip_port_documentation,
            skip_migration_rules,
            concurrency,
            config,
        } => {
            let overrides = GenerateOverrides {
                plugins: plugin,
                category,
                include_deprecated,
                skip_item_docs: skip_node_documentation,
                skip_type_docs: skip_port_documentation,
                skip_migration_rules,
                concurrency,
            };
            cmd_generate(&catalog, &destination, overrides, config.as_deref()).await
        }
        Command::Parse { file } => cmd_parse(&file).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

/// Flag values that take precedence over the config file.
#[derive(Debug, Default)]
struct GenerateOverrides {
    plugins: Vec<String>,
    category: Option<String>,
    include_deprecated: bool,
    skip_item_docs: bool,
    skip_type_docs: bool,
    skip_migration_rules: bool,
    concurrency: Option<usize>,
}

impl GenerateOverrides {
    fn apply(self, config: &mut GenerateConfig) {
        if !self.plugins.is_empty() {
            config.plugins = self.plugins;
        }
        if let Some(category) = self.category {
            config.category_path = category;
        }
        config.include_deprecated |= self.include_deprecated;
        config.skip_item_docs = self.skip_item_docs;
        config.skip_type_docs = self.skip_type_docs;
        config.skip_migration_rules = self.skip_migration_rules;
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

fn resolve_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_generate(
    catalog_dir: &Path,
    destination: &Path,
    overrides: GenerateOverrides,
    config_path: Option<&Path>,
) -> Result<()> {
    if overrides.skip_item_docs && overrides.skip_type_docs && overrides.skip_migration_rules {
        return Err(eyre!(
            "nothing to generate: node documentation, port documentation and migration rules are all skipped"
        ));
    }
    if !catalog_dir.is_dir() {
        return Err(eyre!(
            "catalog directory not found: {}",
            catalog_dir.display()
        ));
    }

    let app_config = resolve_app_config(config_path)?;
    let mut config = GenerateConfig::from_app(&app_config, destination);
    overrides.apply(&mut config);
    config.tool_version = env!("CARGO_PKG_VERSION").to_string();

    info!(
        catalog = %catalog_dir.display(),
        destination = %destination.display(),
        plugins = config.plugins.len(),
        category = %config.category_path,
        "generating documentation"
    );

    let catalog = SnapshotCatalog::open(catalog_dir)
        .wrap_err_with(|| format!("failed to load catalog from {}", catalog_dir.display()))?;

    let reporter = CliProgress::new();
    let result = generate(&config, &catalog, &reporter).await?;

    // Print summary
    println!();
    println!("  Documentation generated successfully!");
    println!("  Run:      {}", result.run_id);
    println!("  Items:    {}", result.stats.items_emitted);
    println!("  Failed:   {}", result.stats.items_failed);
    println!("  Warnings: {}", result.stats.merge_warnings);
    println!("  Types:    {}", result.stats.type_count);
    println!("  Rules:    {}", result.stats.migration_rules);
    for artifact in &result.artifacts {
        println!("  Wrote:    {} ({} bytes)", artifact.filename, artifact.size_bytes);
    }
    println!("  Path:     {}", result.output_dir.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_parse(file: &Path) -> Result<()> {
    let markup = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("failed to read {}", file.display()))?;
    let model = jsondocgen_markup::parse(&markup)
        .wrap_err_with(|| format!("failed to parse {}", file.display()))?;
    print!("{}", to_pretty_json(&model)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_processed(&self, id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Documenting [{current}/{total}] {id}"));
    }

    fn done(&self, _result: &GenerateResult) {
        self.spinner.finish_and_clear();
    }
}
