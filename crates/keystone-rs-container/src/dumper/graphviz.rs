//! Dot rendering of the service graph.

use crate::builder::ContainerBuilder;
use crate::value::{SERVICE_CONTAINER_ID, Value};
use indexmap::IndexMap;
use log::info;

/// Attribute group of a dot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphSection {
    Graph,
    Node,
    Edge,
    /// Services that exist as live instances (the container itself).
    NodeInstance,
    /// Services built from definitions.
    NodeDefinition,
    /// Referenced ids nothing provides.
    NodeMissing,
}

impl GraphSection {
    /// Parse the option key used in configuration (`node.instance`, ...).
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "graph" => Some(Self::Graph),
            "node" => Some(Self::Node),
            "edge" => Some(Self::Edge),
            "node.instance" => Some(Self::NodeInstance),
            "node.definition" => Some(Self::NodeDefinition),
            "node.missing" => Some(Self::NodeMissing),
            _ => None,
        }
    }
}

type Attributes = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphvizOptions {
    graph: Attributes,
    node: Attributes,
    edge: Attributes,
    node_instance: Attributes,
    node_definition: Attributes,
    node_missing: Attributes,
    container_class: String,
}

fn attributes(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

impl Default for GraphvizOptions {
    fn default() -> Self {
        Self {
            graph: attributes(&[("ratio", "compress")]),
            node: attributes(&[("fontsize", "11"), ("fontname", "Arial"), ("shape", "record")]),
            edge: attributes(&[
                ("fontsize", "9"),
                ("fontname", "Arial"),
                ("color", "grey"),
                ("arrowhead", "open"),
                ("arrowsize", "0.5"),
            ]),
            node_instance: attributes(&[("fillcolor", "#9999ff"), ("style", "filled")]),
            node_definition: attributes(&[("fillcolor", "#eeeeee")]),
            node_missing: attributes(&[("fillcolor", "#ff9999"), ("style", "filled")]),
            container_class: "ServiceContainerBuilder".to_string(),
        }
    }
}

impl GraphvizOptions {
    /// Override one attribute, keeping the rest of the section.
    pub fn set(mut self, section: GraphSection, key: &str, value: impl ToString) -> Self {
        self.section_mut(section).insert(key.to_string(), value.to_string());
        self
    }

    /// Class label of the container node.
    pub fn with_container_class(mut self, class: &str) -> Self {
        self.container_class = class.to_string();
        self
    }

    pub fn section(&self, section: GraphSection) -> &Attributes {
        match section {
            GraphSection::Graph => &self.graph,
            GraphSection::Node => &self.node,
            GraphSection::Edge => &self.edge,
            GraphSection::NodeInstance => &self.node_instance,
            GraphSection::NodeDefinition => &self.node_definition,
            GraphSection::NodeMissing => &self.node_missing,
        }
    }

    fn section_mut(&mut self, section: GraphSection) -> &mut Attributes {
        match section {
            GraphSection::Graph => &mut self.graph,
            GraphSection::Node => &mut self.node,
            GraphSection::Edge => &mut self.edge,
            GraphSection::NodeInstance => &mut self.node_instance,
            GraphSection::NodeDefinition => &mut self.node_definition,
            GraphSection::NodeMissing => &mut self.node_missing,
        }
    }
}

struct Node {
    class: String,
    attributes: Attributes,
}

struct Edge {
    from: String,
    to: String,
    label: String,
    required: bool,
}

/// Renders definitions, the container and missing references as a dot digraph.
pub struct GraphvizDumper<'a> {
    builder: &'a ContainerBuilder,
}

impl<'a> GraphvizDumper<'a> {
    pub fn new(builder: &'a ContainerBuilder) -> Self {
        Self { builder }
    }

    pub fn dump(&self, options: &GraphvizOptions) -> String {
        let mut nodes: IndexMap<String, Node> = IndexMap::new();
        for (id, definition) in self.builder.definitions() {
            let mut node_attributes = options.node_definition.clone();
            let style = if definition.is_shared() { "filled" } else { "dotted" };
            node_attributes.insert("style".to_string(), style.to_string());
            nodes.insert(
                id.clone(),
                Node {
                    class: self.resolve_class(definition.class()),
                    attributes: node_attributes,
                },
            );
        }
        if !self.builder.has_definition(SERVICE_CONTAINER_ID) {
            nodes.insert(
                SERVICE_CONTAINER_ID.to_string(),
                Node {
                    class: options.container_class.clone(),
                    attributes: options.node_instance.clone(),
                },
            );
        }

        let mut edges = Vec::new();
        for (id, definition) in self.builder.definitions() {
            self.find_edges(id, definition.arguments(), true, "", &mut edges);
            for call in definition.method_calls() {
                let label = format!("{}()", call.method);
                self.find_edges(id, &call.arguments, false, &label, &mut edges);
            }
        }
        for edge in &edges {
            if !self.builder.has_service(&edge.to) && !nodes.contains_key(&edge.to) {
                nodes.insert(
                    edge.to.clone(),
                    Node {
                        class: String::new(),
                        attributes: options.node_missing.clone(),
                    },
                );
            }
        }

        let mut out = format!(
            "digraph sc {{\n  {}\n  node [{}];\n  edge [{}];\n\n",
            options_code(&options.graph),
            options_code(&options.node),
            options_code(&options.edge)
        );
        let shape = options.node.get("shape").map(String::as_str).unwrap_or("record");
        for (id, node) in &nodes {
            let aliases = self.aliases_of(id);
            let aliases = if aliases.is_empty() {
                String::new()
            } else {
                format!(" ({})", aliases.join(", "))
            };
            out.push_str(&format!(
                "  node_{} [label=\"{id}{aliases}\\n{}\\n\", shape={shape}{}];\n",
                dotize(id),
                node.class.replace('\\', "\\\\"),
                attributes_code(&node.attributes)
            ));
        }
        for edge in &edges {
            out.push_str(&format!(
                "  node_{} -> node_{} [label=\"{}\" style=\"{}\"];\n",
                dotize(&edge.from),
                dotize(&edge.to),
                edge.label,
                if edge.required { "filled" } else { "dashed" }
            ));
        }
        out.push_str("}\n");

        info!(
            "dumped service graph (nodes={}, edges={})",
            nodes.len(),
            edges.len()
        );
        out
    }

    fn find_edges(
        &self,
        id: &str,
        arguments: &[Value],
        required: bool,
        label: &str,
        edges: &mut Vec<Edge>,
    ) {
        for argument in arguments {
            let argument = match argument {
                Value::Parameter(name) => self.builder.parameter(name),
                Value::String(value) => match whole_token(value) {
                    Some(name) => self.builder.parameter(name),
                    None => Some(argument),
                },
                other => Some(other),
            };
            match argument {
                Some(Value::Service(target)) => edges.push(Edge {
                    from: id.to_string(),
                    to: target.clone(),
                    label: label.to_string(),
                    required,
                }),
                Some(Value::List(items)) => self.find_edges(id, items, required, label, edges),
                Some(Value::Map(map)) => {
                    let items: Vec<Value> = map.values().cloned().collect();
                    self.find_edges(id, &items, required, label, edges);
                }
                _ => {}
            }
        }
    }

    fn aliases_of(&self, id: &str) -> Vec<&str> {
        self.builder
            .aliases()
            .iter()
            .filter(|(_, target)| target.as_str() == id)
            .map(|(alias, _)| alias.as_str())
            .collect()
    }

    /// Substitute `%name%` tokens with scalar parameter values.
    fn resolve_class(&self, class: &str) -> String {
        let mut out = String::new();
        let mut rest = class;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('%') {
                Some(end) if end > 0 => {
                    match self.builder.parameter(&after[..end]) {
                        Some(value) => out.push_str(&value.to_string()),
                        None => out.push_str(&rest[start..start + end + 2]),
                    }
                    rest = &after[end + 1..];
                }
                Some(_) => {
                    out.push('%');
                    rest = &after[1..];
                }
                None => {
                    out.push('%');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn whole_token(value: &str) -> Option<&str> {
    let name = value.strip_prefix('%')?.strip_suffix('%')?;
    (!name.is_empty() && !name.contains('%')).then_some(name)
}

fn dotize(id: &str) -> String {
    id.chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '_' { ch } else { '_' })
        .collect::<String>()
        .to_lowercase()
}

fn options_code(options: &Attributes) -> String {
    options
        .iter()
        .map(|(key, value)| format!("{key}=\"{value}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

fn attributes_code(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!(", {key}=\"{value}\""))
        .collect()
}
