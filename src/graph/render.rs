use std::collections::HashSet;

use serde::Serialize;

use crate::config::{RenderConfig, StyleConfig};
use crate::flake::MetadataModel;
use crate::graph::classify::{classify, Classification, ClassifiedNode};
use crate::graph::naming::{escape_dot, IdAllocator};
use crate::graph::{Duplication, NodeClass, Reachability, RenderError};
use crate::lookup::VersionLookup;
use crate::util::template::{read_template, render_template};

pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/flake.dot.tera");

const ROOT_SHAPE: &str = "doublecircle";
const DUPLICATE_EDGE_ATTRS: &str = "[style=dotted, arrowhead=none, constraint=false]";

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub style: StyleConfig,
    pub rankdir: String,
    pub split_version_conflicts: bool,
    pub template: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default(), &StyleConfig::default())
    }
}

impl RenderOptions {
    pub fn from_config(render: &RenderConfig, style: &StyleConfig) -> Self {
        Self {
            style: style.clone(),
            rankdir: render.rankdir.clone(),
            split_version_conflicts: render.split_version_conflicts,
            template: None,
        }
    }

    pub fn load(render: &RenderConfig, style: &StyleConfig) -> Result<Self, RenderError> {
        let mut options = Self::from_config(render, style);
        if let Some(path) = render.template.as_ref() {
            let template = read_template(path).map_err(|source| RenderError::TemplateRead {
                path: path.clone(),
                source,
            })?;
            options.template = Some(template);
        }
        Ok(options)
    }
}

#[derive(Debug, Serialize)]
struct DotContext {
    graph_id: String,
    title: String,
    header: Vec<String>,
    root: String,
    sections: Vec<Section>,
    edges: Vec<String>,
    duplicate_edges: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Section {
    class: &'static str,
    defaults: String,
    nodes: Vec<String>,
}

pub struct Renderer<'a> {
    lookup: &'a dyn VersionLookup,
    options: RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(lookup: &'a dyn VersionLookup, options: RenderOptions) -> Self {
        Self { lookup, options }
    }

    pub fn render(&self, model: &MetadataModel) -> Result<String, RenderError> {
        let title = model
            .title()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .ok_or(RenderError::MissingTitle)?;

        let classification = classify(model, self.lookup);
        let context = self.context(model, title, &classification);
        let template = self
            .options
            .template
            .as_deref()
            .unwrap_or(DEFAULT_TEMPLATE);
        render_template(template, &context).map_err(RenderError::Template)
    }

    fn context(
        &self,
        model: &MetadataModel,
        title: &str,
        classification: &Classification,
    ) -> DotContext {
        let mut ids = IdAllocator::new(
            std::iter::once(model.root())
                .chain(classification.nodes.iter().map(|node| node.name.as_str())),
        );
        let title = escape_dot(title);
        let root_id = ids.id_for(model.root());

        DotContext {
            graph_id: format!("\"{title}\""),
            header: vec![
                format!("rankdir=\"{}\"", escape_dot(&self.options.rankdir)),
                "compound=true".to_string(),
                format!("label=\"{title}\""),
            ],
            root: format!(
                "{root_id} [label=\"{}\", shape={ROOT_SHAPE}, style=filled, fillcolor=\"{}\"]",
                escape_dot(model.root()),
                escape_dot(&self.options.style.root)
            ),
            title,
            sections: self.sections(classification, &mut ids),
            edges: reference_edges(model, &root_id, &mut ids),
            duplicate_edges: duplicate_edges(classification, &mut ids),
        }
    }

    fn sections(&self, classification: &Classification, ids: &mut IdAllocator) -> Vec<Section> {
        let mut sections = Vec::new();
        for class in NodeClass::ALL {
            let members: Vec<&ClassifiedNode> = classification
                .nodes
                .iter()
                .filter(|node| self.drawn_as(node.class) == class)
                .collect();
            if members.is_empty() {
                continue;
            }
            let (shape, color) = self.style_for(class);
            sections.push(Section {
                class: class.label(),
                defaults: format!(
                    "node [shape={}, style=filled, fillcolor=\"{}\"]",
                    escape_dot(shape),
                    escape_dot(color)
                ),
                nodes: members
                    .into_iter()
                    .map(|node| format!("{} [label=\"{}\"]", ids.id_for(&node.name), label(node)))
                    .collect(),
            });
        }
        sections
    }

    fn drawn_as(&self, class: NodeClass) -> NodeClass {
        let merge = !self.options.split_version_conflicts
            && class.reachability == Reachability::Direct
            && class.duplication == Duplication::DifferentVersions;
        if merge {
            NodeClass::new(Reachability::Direct, Duplication::SameVersion)
        } else {
            class
        }
    }

    fn style_for(&self, class: NodeClass) -> (&str, &str) {
        let style = &self.options.style;
        let shape = match class.reachability {
            Reachability::Direct => &style.direct_shape,
            Reachability::Indirect => &style.indirect_shape,
        };
        let color = match (class.reachability, class.duplication) {
            (Reachability::Direct, Duplication::Unique) => &style.direct_unique,
            (Reachability::Direct, Duplication::SameVersion) => &style.direct_same_version,
            (Reachability::Direct, Duplication::DifferentVersions) => {
                &style.direct_different_versions
            }
            (Reachability::Indirect, Duplication::Unique) => &style.indirect_unique,
            (Reachability::Indirect, Duplication::SameVersion) => &style.indirect_same_version,
            (Reachability::Indirect, Duplication::DifferentVersions) => {
                &style.indirect_different_versions
            }
        };
        (shape.as_str(), color.as_str())
    }
}

fn label(node: &ClassifiedNode) -> String {
    match node.version.as_deref() {
        Some(version) => format!("{}\\n{}", escape_dot(&node.normalized), escape_dot(version)),
        None => escape_dot(&node.normalized),
    }
}

fn reference_edges(model: &MetadataModel, root_id: &str, ids: &mut IdAllocator) -> Vec<String> {
    let drawn = |name: &str| name == model.root() || model.is_locked(name);
    let mut edges = Vec::new();

    for name in model.direct_inputs() {
        if model.is_locked(name) {
            edges.push(format!("{root_id} -> {}", ids.id_for(name)));
        }
    }

    for edge in model.edges() {
        if drawn(&edge.from) && drawn(&edge.to) {
            edges.push(format!("{} -> {}", ids.id_for(&edge.from), ids.id_for(&edge.to)));
        }
    }

    edges
}

/// One dotted edge per duplicated source node, towards its first
/// counterpart. Further counterparts of the same source are dropped.
fn duplicate_edges(classification: &Classification, ids: &mut IdAllocator) -> Vec<String> {
    let mut sources: HashSet<&str> = HashSet::new();
    let mut edges = Vec::new();

    for node in &classification.nodes {
        if !classification.duplicates.contains(&node.name) {
            continue;
        }
        for target in classification.counterparts(node) {
            if !sources.insert(node.name.as_str()) {
                continue;
            }
            edges.push(format!(
                "{} -> {} {DUPLICATE_EDGE_ATTRS}",
                ids.id_for(&node.name),
                ids.id_for(&target.name)
            ));
        }
    }

    edges
}
