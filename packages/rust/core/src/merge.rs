//! Merging documented facts with runtime facts.
//!
//! The runtime is authoritative for structure (how many ports, which dynamic
//! groups exist, what types they carry); the markup supplies the prose.

use indexmap::IndexMap;
use tracing::warn;

use jsondocgen_catalog::{CatalogItem, IntrospectedFacts, PortDirection, RuntimePort, RuntimePortGroup};
use jsondocgen_markup::DocumentModel;
use jsondocgen_shared::{DynamicPortGroup, MergedDoc, Port};

/// A disagreement between markup and runtime. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeMismatch {
    #[error(
        "{item_id}: {direction} port count differs (documented {documented}, runtime {runtime})"
    )]
    PortCount {
        item_id: String,
        direction: PortDirection,
        documented: usize,
        runtime: usize,
    },

    #[error("{item_id}: {direction} dynamic port group '{group_identifier}' is not documented")]
    UndocumentedGroup {
        item_id: String,
        direction: PortDirection,
        group_identifier: String,
    },

    #[error(
        "{item_id}: documented {direction} dynamic port group '{group_identifier}' does not exist at runtime"
    )]
    OrphanedGroup {
        item_id: String,
        direction: PortDirection,
        group_identifier: String,
    },
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub doc: MergedDoc,
    pub warnings: Vec<MergeMismatch>,
}

/// Merge one item's parsed markup with its registry entry and runtime facts.
///
/// Without facts the document is emitted as documented, with both capability
/// flags off.
pub fn merge(
    doc: DocumentModel,
    item: &CatalogItem,
    facts: Option<&IntrospectedFacts>,
) -> MergeOutcome {
    let mut warnings = Vec::new();

    let (in_ports, out_ports, dynamic_in_ports, dynamic_out_ports, streamable, has_modern_dialog) =
        match facts {
            Some(facts) => (
                merge_ports(
                    &item.id,
                    PortDirection::In,
                    doc.in_ports,
                    facts.ports_for(PortDirection::In),
                    &mut warnings,
                ),
                merge_ports(
                    &item.id,
                    PortDirection::Out,
                    doc.out_ports,
                    facts.ports_for(PortDirection::Out),
                    &mut warnings,
                ),
                merge_groups(
                    &item.id,
                    PortDirection::In,
                    doc.dynamic_in_ports,
                    facts.groups_for(PortDirection::In),
                    &mut warnings,
                ),
                merge_groups(
                    &item.id,
                    PortDirection::Out,
                    doc.dynamic_out_ports,
                    facts.groups_for(PortDirection::Out),
                    &mut warnings,
                ),
                facts.streamable,
                facts.has_modern_dialog,
            ),
            None => (
                doc.in_ports,
                doc.out_ports,
                doc.dynamic_in_ports,
                doc.dynamic_out_ports,
                false,
                false,
            ),
        };

    for mismatch in &warnings {
        warn!(item = %item.id, "{mismatch}");
    }

    let name = doc
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| item.name.clone());

    MergeOutcome {
        doc: MergedDoc {
            id: item.id.clone(),
            name,
            short_description: doc.short_description,
            intro_html: doc.intro_html,
            item_type: doc.item_type,
            deprecated: doc.deprecated || item.deprecated,
            hidden: item.hidden,
            streamable,
            has_modern_dialog,
            options: doc.options,
            option_tabs: doc.option_tabs,
            in_ports,
            out_ports,
            dynamic_in_ports,
            dynamic_out_ports,
            views: doc.views,
            interactive_view: doc.interactive_view,
            links: doc.links,
            contributing_plugin: item.contributing_plugin.clone(),
            icon_base64: item.icon_base64.clone(),
            after_id: item.after_id.clone(),
        },
        warnings,
    }
}

/// One port per runtime port; documentation is taken by position.
fn merge_ports(
    item_id: &str,
    direction: PortDirection,
    documented: Vec<Port>,
    runtime: &[RuntimePort],
    warnings: &mut Vec<MergeMismatch>,
) -> Vec<Port> {
    if documented.len() != runtime.len() {
        warnings.push(MergeMismatch::PortCount {
            item_id: item_id.to_string(),
            direction,
            documented: documented.len(),
            runtime: runtime.len(),
        });
    }

    let mut documented = documented.into_iter();
    runtime
        .iter()
        .enumerate()
        .map(|(index, actual)| {
            let (name, description, documented_optional) = match documented.next() {
                Some(port) => (port.name, port.description, port.optional.unwrap_or(false)),
                None => (None, None, false),
            };
            Port {
                index,
                runtime_type_class: Some(actual.type_class.clone()),
                name,
                description,
                optional: match direction {
                    PortDirection::In => Some(documented_optional || actual.optional),
                    PortDirection::Out => None,
                },
            }
        })
        .collect()
}

/// Join documented and runtime groups on `group_identifier`, in runtime order.
fn merge_groups(
    item_id: &str,
    direction: PortDirection,
    documented: Vec<DynamicPortGroup>,
    runtime: &[RuntimePortGroup],
    warnings: &mut Vec<MergeMismatch>,
) -> Vec<DynamicPortGroup> {
    let mut documented: IndexMap<String, DynamicPortGroup> = documented
        .into_iter()
        .map(|group| (group.group_identifier.clone(), group))
        .collect();

    let merged = runtime
        .iter()
        .map(|actual| match documented.shift_remove(&actual.group_identifier) {
            Some(group) => DynamicPortGroup {
                supported_type_classes: actual.supported_type_classes.clone(),
                ..group
            },
            None => {
                warnings.push(MergeMismatch::UndocumentedGroup {
                    item_id: item_id.to_string(),
                    direction,
                    group_identifier: actual.group_identifier.clone(),
                });
                DynamicPortGroup {
                    insert_before_index: None,
                    name: None,
                    group_identifier: actual.group_identifier.clone(),
                    description: None,
                    supported_type_classes: actual.supported_type_classes.clone(),
                }
            }
        })
        .collect();

    for group_identifier in documented.into_keys() {
        warnings.push(MergeMismatch::OrphanedGroup {
            item_id: item_id.to_string(),
            direction,
            group_identifier,
        });
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documented_port(index: usize, name: &str, optional: Option<bool>) -> Port {
        Port {
            index,
            runtime_type_class: None,
            name: Some(name.into()),
            description: Some(format!("{name} description")),
            optional,
        }
    }

    fn runtime_port(type_class: &str, optional: bool) -> RuntimePort {
        RuntimePort {
            type_class: type_class.into(),
            optional,
        }
    }

    fn documented_group(id: &str) -> DynamicPortGroup {
        DynamicPortGroup {
            insert_before_index: Some(1),
            name: Some(format!("{id} name")),
            group_identifier: id.into(),
            description: Some("documented".into()),
            supported_type_classes: Vec::new(),
        }
    }

    fn runtime_group(id: &str) -> RuntimePortGroup {
        RuntimePortGroup {
            group_identifier: id.into(),
            supported_type_classes: vec!["org.example.Table".into()],
        }
    }

    fn item() -> CatalogItem {
        CatalogItem {
            id: "org.example.Factory".into(),
            name: "Registry Name".into(),
            contributing_plugin: Some("org.example".into()),
            icon_base64: Some("aWNvbg==".into()),
            after_id: Some("org.example.Other".into()),
            ..Default::default()
        }
    }

    #[test]
    fn flat_options_with_optional_input_port() {
        let markup = r#"<knimeNode type="Manipulator">
            <name>Sorter</name>
            <fullDescription>
                <intro>Sorts.</intro>
                <option name="Column">Sort column.</option>
                <option name="Order">Ascending or descending.</option>
            </fullDescription>
            <ports>
                <inPort index="0" name="Data" optional="true">Rows to sort.</inPort>
            </ports>
        </knimeNode>"#;
        let doc = jsondocgen_markup::parse(markup).expect("parse");
        let facts = IntrospectedFacts {
            in_ports: vec![runtime_port("org.example.Table", false)],
            ..Default::default()
        };

        let outcome = merge(doc, &item(), Some(&facts));
        let merged = outcome.doc;
        assert_eq!(merged.options.as_ref().map(Vec::len), Some(2));
        assert_eq!(merged.in_ports.len(), 1);
        assert_eq!(merged.in_ports[0].name.as_deref(), Some("Data"));
        assert_eq!(merged.in_ports[0].description.as_deref(), Some("Rows to sort."));
        assert_eq!(merged.in_ports[0].optional, Some(true));
        assert_eq!(
            merged.in_ports[0].runtime_type_class.as_deref(),
            Some("org.example.Table")
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn runtime_port_count_wins() {
        let doc = DocumentModel {
            in_ports: vec![
                documented_port(0, "First", Some(false)),
                documented_port(1, "Second", Some(false)),
                documented_port(2, "Third", Some(false)),
            ],
            out_ports: vec![documented_port(0, "Result", None)],
            ..Default::default()
        };
        let facts = IntrospectedFacts {
            in_ports: vec![runtime_port("A", false), runtime_port("B", true)],
            out_ports: vec![runtime_port("C", false), runtime_port("D", false)],
            ..Default::default()
        };

        let outcome = merge(doc, &item(), Some(&facts));
        let merged = outcome.doc;

        assert_eq!(merged.in_ports.len(), 2);
        assert_eq!(merged.in_ports[1].name.as_deref(), Some("Second"));
        assert_eq!(merged.in_ports[1].optional, Some(true));

        assert_eq!(merged.out_ports.len(), 2);
        assert_eq!(merged.out_ports[0].name.as_deref(), Some("Result"));
        assert_eq!(merged.out_ports[1].name, None);
        assert_eq!(merged.out_ports[1].description, None);
        assert_eq!(merged.out_ports[1].index, 1);
        assert!(merged.out_ports.iter().all(|p| p.optional.is_none()));

        assert_eq!(
            outcome.warnings,
            vec![
                MergeMismatch::PortCount {
                    item_id: "org.example.Factory".into(),
                    direction: PortDirection::In,
                    documented: 3,
                    runtime: 2,
                },
                MergeMismatch::PortCount {
                    item_id: "org.example.Factory".into(),
                    direction: PortDirection::Out,
                    documented: 1,
                    runtime: 2,
                },
            ]
        );
    }

    #[test]
    fn dynamic_groups_follow_runtime_identifiers() {
        let doc = DocumentModel {
            dynamic_in_ports: vec![documented_group("Orphan"), documented_group("Tables")],
            ..Default::default()
        };
        let facts = IntrospectedFacts {
            dynamic_in_ports: vec![runtime_group("Tables"), runtime_group("Models")],
            ..Default::default()
        };

        let outcome = merge(doc, &item(), Some(&facts));
        let groups = &outcome.doc.dynamic_in_ports;

        let ids: Vec<&str> = groups.iter().map(|g| g.group_identifier.as_str()).collect();
        assert_eq!(ids, vec!["Tables", "Models"]);

        assert_eq!(groups[0].name.as_deref(), Some("Tables name"));
        assert_eq!(groups[0].insert_before_index, Some(1));
        assert_eq!(groups[0].supported_type_classes, vec!["org.example.Table"]);
        assert_eq!(groups[1].name, None);
        assert_eq!(groups[1].description, None);

        assert!(outcome.warnings.contains(&MergeMismatch::UndocumentedGroup {
            item_id: "org.example.Factory".into(),
            direction: PortDirection::In,
            group_identifier: "Models".into(),
        }));
        assert!(outcome.warnings.contains(&MergeMismatch::OrphanedGroup {
            item_id: "org.example.Factory".into(),
            direction: PortDirection::In,
            group_identifier: "Orphan".into(),
        }));
    }

    #[test]
    fn registry_fields_and_flags() {
        let doc = DocumentModel {
            name: Some(String::new()),
            deprecated: false,
            ..Default::default()
        };
        let mut registry_item = item();
        registry_item.deprecated = true;
        registry_item.hidden = true;
        let facts = IntrospectedFacts {
            streamable: true,
            has_modern_dialog: true,
            ..Default::default()
        };

        let merged = merge(doc, &registry_item, Some(&facts)).doc;
        assert_eq!(merged.name, "Registry Name");
        assert!(merged.deprecated);
        assert!(merged.hidden);
        assert!(merged.streamable);
        assert!(merged.has_modern_dialog);
        assert_eq!(merged.icon_base64.as_deref(), Some("aWNvbg=="));
        assert_eq!(merged.after_id.as_deref(), Some("org.example.Other"));
    }

    #[test]
    fn markup_only_without_facts() {
        let doc = DocumentModel {
            name: Some("Documented".into()),
            deprecated: true,
            in_ports: vec![documented_port(0, "In", Some(true))],
            dynamic_out_ports: vec![documented_group("Outputs")],
            ..Default::default()
        };
        let outcome = merge(doc, &item(), None);
        let merged = outcome.doc;
        assert_eq!(merged.name, "Documented");
        assert!(merged.deprecated);
        assert!(!merged.streamable);
        assert!(!merged.has_modern_dialog);
        assert_eq!(merged.in_ports.len(), 1);
        assert_eq!(merged.in_ports[0].runtime_type_class, None);
        assert_eq!(merged.dynamic_out_ports[0].group_identifier, "Outputs");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn mismatch_messages_name_the_item() {
        let mismatch = MergeMismatch::PortCount {
            item_id: "x.Factory".into(),
            direction: PortDirection::Out,
            documented: 1,
            runtime: 0,
        };
        assert_eq!(
            mismatch.to_string(),
            "x.Factory: out port count differs (documented 1, runtime 0)"
        );
    }
}
