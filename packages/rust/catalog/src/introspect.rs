//! Runtime facts about an item that only its instantiated model knows.

use std::fmt;

use serde::{Deserialize, Serialize};

use jsondocgen_shared::Result;

use crate::registry::CatalogItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    In,
    Out,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.write_str("in"),
            Self::Out => f.write_str("out"),
        }
    }
}

/// A port as reported by the running model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimePort {
    pub type_class: String,
    #[serde(default)]
    pub optional: bool,
}

/// A dynamic port group as reported by the running model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimePortGroup {
    pub group_identifier: String,
    #[serde(default)]
    pub supported_type_classes: Vec<String>,
}

/// Live view of an instantiated item.
pub trait RuntimeHandle {
    fn ports(&self, direction: PortDirection) -> Vec<RuntimePort>;
    fn dynamic_port_groups(&self, direction: PortDirection) -> Vec<RuntimePortGroup>;
    fn is_streamable(&self) -> bool;
    fn has_modern_dialog(&self) -> bool;
}

/// Instantiates items so their runtime facts can be queried.
pub trait Introspector: Send + Sync {
    fn instantiate(&self, item: &CatalogItem) -> Result<Box<dyn RuntimeHandle + '_>>;
}

/// Everything the merger needs from a [`RuntimeHandle`], captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectedFacts {
    #[serde(default)]
    pub in_ports: Vec<RuntimePort>,
    #[serde(default)]
    pub out_ports: Vec<RuntimePort>,
    #[serde(default)]
    pub dynamic_in_ports: Vec<RuntimePortGroup>,
    #[serde(default)]
    pub dynamic_out_ports: Vec<RuntimePortGroup>,
    #[serde(default)]
    pub streamable: bool,
    #[serde(default)]
    pub has_modern_dialog: bool,
}

impl IntrospectedFacts {
    pub fn from_handle(handle: &dyn RuntimeHandle) -> Self {
        Self {
            in_ports: handle.ports(PortDirection::In),
            out_ports: handle.ports(PortDirection::Out),
            dynamic_in_ports: handle.dynamic_port_groups(PortDirection::In),
            dynamic_out_ports: handle.dynamic_port_groups(PortDirection::Out),
            streamable: handle.is_streamable(),
            has_modern_dialog: handle.has_modern_dialog(),
        }
    }

    pub fn ports_for(&self, direction: PortDirection) -> &[RuntimePort] {
        match direction {
            PortDirection::In => &self.in_ports,
            PortDirection::Out => &self.out_ports,
        }
    }

    pub fn groups_for(&self, direction: PortDirection) -> &[RuntimePortGroup] {
        match direction {
            PortDirection::In => &self.dynamic_in_ports,
            PortDirection::Out => &self.dynamic_out_ports,
        }
    }
}

impl RuntimeHandle for IntrospectedFacts {
    fn ports(&self, direction: PortDirection) -> Vec<RuntimePort> {
        self.ports_for(direction).to_vec()
    }

    fn dynamic_port_groups(&self, direction: PortDirection) -> Vec<RuntimePortGroup> {
        self.groups_for(direction).to_vec()
    }

    fn is_streamable(&self) -> bool {
        self.streamable
    }

    fn has_modern_dialog(&self) -> bool {
        self.has_modern_dialog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facts_capture_a_handle() {
        let facts = IntrospectedFacts {
            in_ports: vec![RuntimePort {
                type_class: "org.example.Table".into(),
                optional: true,
            }],
            dynamic_out_ports: vec![RuntimePortGroup {
                group_identifier: "Outputs".into(),
                supported_type_classes: vec!["org.example.Table".into()],
            }],
            streamable: true,
            ..Default::default()
        };
        let captured = IntrospectedFacts::from_handle(&facts);
        assert_eq!(captured, facts);
        assert_eq!(captured.ports_for(PortDirection::Out).len(), 0);
        assert_eq!(captured.groups_for(PortDirection::Out)[0].group_identifier, "Outputs");
    }

    #[test]
    fn direction_display() {
        assert_eq!(PortDirection::In.to_string(), "in");
        assert_eq!(PortDirection::Out.to_string(), "out");
    }
}
