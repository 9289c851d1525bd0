//! Description markup parser for jsondocgen.
//!
//! Turns one item's XML description into a [`DocumentModel`]. The parser is
//! pure and schema-agnostic: the legacy un-namespaced format and the current
//! namespaced one are read through the same local-name queries.

mod dom;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use jsondocgen_shared::{
    DynamicPortGroup, InteractiveView, Link, OptionDoc, OptionTab, Port, Result, View,
};

use crate::dom::XmlElement;

/// Elements under `fullDescription` that never count as options.
const STRUCTURAL_ELEMENTS: &[&str] = &["intro", "tab", "link", "description", "options"];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ---------------------------------------------------------------------------
// DocumentModel
// ---------------------------------------------------------------------------

/// Facts declared in an item's description markup.
///
/// Ports carry no runtime type and dynamic groups no supported types yet;
/// those are filled in when the document is merged with runtime facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro_html: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionDoc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_tabs: Option<Vec<OptionTab>>,
    pub in_ports: Vec<Port>,
    pub out_ports: Vec<Port>,
    pub dynamic_in_ports: Vec<DynamicPortGroup>,
    pub dynamic_out_ports: Vec<DynamicPortGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<View>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive_view: Option<InteractiveView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse description markup into a [`DocumentModel`].
///
/// Fails with [`DocGenError::Parse`](jsondocgen_shared::DocGenError::Parse) when
/// the markup is not well-formed or has no root element.
pub fn parse(markup: &str) -> Result<DocumentModel> {
    let root = dom::parse_document(markup)?;

    let full = root.child("fullDescription");
    let ports = root.child("ports");

    let (options, option_tabs) = match full {
        Some(full) => parse_option_section(full),
        None => (None, None),
    };

    let doc = DocumentModel {
        name: root.child("name").map(|el| el.text().trim().to_string()),
        short_description: root
            .child("shortDescription")
            .map(|el| el.text().trim().to_string()),
        intro_html: full
            .and_then(|f| f.child("intro"))
            .map(|el| el.inner_markup().trim().to_string()),
        item_type: root.attr("type").map(str::to_string),
        deprecated: parse_flag(root.attr("deprecated")),
        options,
        option_tabs,
        in_ports: ports
            .map(|p| parse_ports(p, &["inPort", "inputPort"], true))
            .unwrap_or_default(),
        out_ports: ports
            .map(|p| parse_ports(p, &["outPort", "outputPort"], false))
            .unwrap_or_default(),
        dynamic_in_ports: ports
            .map(|p| parse_dynamic_groups(p, "dynInPort"))
            .unwrap_or_default(),
        dynamic_out_ports: ports
            .map(|p| parse_dynamic_groups(p, "dynOutPort"))
            .unwrap_or_default(),
        views: root.child("views").map(parse_views).unwrap_or_default(),
        interactive_view: root.child("interactiveView").map(|el| InteractiveView {
            name: el.attr("name").map(str::to_string),
            description: non_empty(el.inner_markup().trim()),
        }),
        links: full.map(parse_links).unwrap_or_default(),
    };

    debug!(
        name = doc.name.as_deref().unwrap_or(""),
        in_ports = doc.in_ports.len(),
        out_ports = doc.out_ports.len(),
        "parsed description markup"
    );
    Ok(doc)
}

/// Options either live directly under `fullDescription` or are grouped into tabs.
fn parse_option_section(full: &XmlElement) -> (Option<Vec<OptionDoc>>, Option<Vec<OptionTab>>) {
    let tabs: Vec<&XmlElement> = full.children_named("tab").collect();
    if tabs.is_empty() {
        let container = full.child("options").unwrap_or(full);
        let options = container
            .elements()
            .filter(|el| !STRUCTURAL_ELEMENTS.contains(&el.name.as_str()))
            .map(parse_option)
            .collect();
        return (Some(options), None);
    }

    let tabs = tabs
        .into_iter()
        .map(|tab| {
            let options = match tab.child("options") {
                Some(container) => container.elements().map(parse_option).collect(),
                None => tab
                    .elements()
                    .filter(|el| el.name != "description")
                    .map(parse_option)
                    .collect(),
            };
            OptionTab {
                name: tab.attr("name").map(str::to_string),
                description: tab
                    .child("description")
                    .and_then(|d| non_empty(&collapse_whitespace(&d.text()))),
                options,
            }
        })
        .collect();
    (None, Some(tabs))
}

fn parse_option(el: &XmlElement) -> OptionDoc {
    OptionDoc {
        option_type: el.name.clone(),
        name: el.attr("name").map(str::to_string),
        description: non_empty(el.inner_markup().trim()),
        optional: parse_flag(el.attr("optional")),
    }
}

/// Ports are indexed by declaration position; any `index` attribute is ignored.
fn parse_ports(ports: &XmlElement, tags: &[&str], input: bool) -> Vec<Port> {
    ports
        .elements()
        .filter(|el| tags.contains(&el.name.as_str()))
        .enumerate()
        .map(|(index, el)| Port {
            index,
            runtime_type_class: None,
            name: el.attr("name").map(str::to_string),
            description: non_empty(el.inner_markup().trim()),
            optional: input.then(|| parse_flag(el.attr("optional"))),
        })
        .collect()
}

fn parse_dynamic_groups(ports: &XmlElement, tag: &str) -> Vec<DynamicPortGroup> {
    ports
        .children_named(tag)
        .filter_map(|el| {
            let Some(group_identifier) = el.attr("group-identifier") else {
                debug!(tag, "dynamic port group without group-identifier skipped");
                return None;
            };
            Some(DynamicPortGroup {
                insert_before_index: el.attr("insert-before").and_then(|v| v.trim().parse().ok()),
                name: el.attr("name").map(str::to_string),
                group_identifier: group_identifier.to_string(),
                description: non_empty(el.inner_markup().trim()),
                supported_type_classes: Vec::new(),
            })
        })
        .collect()
}

fn parse_views(views: &XmlElement) -> Vec<View> {
    views
        .children_named("view")
        .enumerate()
        .map(|(position, el)| View {
            index: el
                .attr("index")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(position),
            name: el.attr("name").map(str::to_string),
            description: non_empty(el.inner_markup().trim()),
        })
        .collect()
}

fn parse_links(full: &XmlElement) -> Vec<Link> {
    full.children_named("link")
        .map(|el| Link {
            href: el.attr("href").unwrap_or_default().to_string(),
            text: collapse_whitespace(&el.text()),
        })
        .collect()
}

/// Only a case-insensitive `"true"` counts as set.
fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}
