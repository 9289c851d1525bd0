//! Migration rule extraction for `migrations.json`.

use tracing::{debug, error, info, instrument, warn};

use jsondocgen_catalog::{MigrationRegistry, RegistryContainer};
use jsondocgen_shared::MigrationRuleDoc;

/// Ask every rule about every known item and keep the one-to-one replacements.
///
/// Items are taken from the whole registry, ignoring the run's filters. A rule
/// that fails is skipped from that point on; entries it produced before the
/// failure stay. A rule proposing several replacements for one item cannot be
/// expressed as a pair and is reported instead.
#[instrument(skip_all)]
pub fn extract_migration_rules(
    root: &RegistryContainer,
    registry: &dyn MigrationRegistry,
) -> Vec<MigrationRuleDoc> {
    let items = root.items();
    let rules = registry.rules();
    info!(rules = rules.len(), items = items.len(), "extracting migration rules");

    let mut docs = Vec::new();
    'rules: for rule in rules {
        for item in &items {
            let replacements = match rule.replacements_for(&item.id) {
                Ok(replacements) => replacements,
                Err(e) => {
                    warn!(rule = rule.name(), error = %e, "migration rule skipped");
                    continue 'rules;
                }
            };
            match replacements.as_slice() {
                [] => {}
                [replacement] => {
                    debug!(rule = rule.name(), original = %item.id, %replacement, "migration rule matched");
                    docs.push(MigrationRuleDoc {
                        original_node_factory_class: item.id.clone(),
                        replacement_node_factory_class: replacement.clone(),
                    });
                }
                many => {
                    error!(
                        rule = rule.name(),
                        original = %item.id,
                        replacements = many.len(),
                        "migration rule returned several replacements, ignored"
                    );
                }
            }
        }
    }
    docs
}
