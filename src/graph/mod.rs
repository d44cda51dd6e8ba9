use serde::Serialize;
use thiserror::Error;

pub mod classify;
pub mod naming;
pub mod render;

pub use classify::{classify, Classification, ClassifiedNode};
pub use render::{RenderOptions, Renderer};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("flake metadata has no title (lock URL)")]
    MissingTitle,
    #[error("failed to read template {path}: {source}")]
    TemplateRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template error: {0}")]
    Template(#[source] tera::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reachability {
    Direct,
    Indirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Duplication {
    Unique,
    SameVersion,
    DifferentVersions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeClass {
    pub reachability: Reachability,
    pub duplication: Duplication,
}

impl NodeClass {
    pub const ALL: [NodeClass; 6] = [
        NodeClass::new(Reachability::Direct, Duplication::Unique),
        NodeClass::new(Reachability::Direct, Duplication::SameVersion),
        NodeClass::new(Reachability::Direct, Duplication::DifferentVersions),
        NodeClass::new(Reachability::Indirect, Duplication::Unique),
        NodeClass::new(Reachability::Indirect, Duplication::SameVersion),
        NodeClass::new(Reachability::Indirect, Duplication::DifferentVersions),
    ];

    pub const fn new(reachability: Reachability, duplication: Duplication) -> Self {
        Self {
            reachability,
            duplication,
        }
    }

    pub fn label(&self) -> &'static str {
        match (self.reachability, self.duplication) {
            (Reachability::Direct, Duplication::Unique) => "direct",
            (Reachability::Direct, Duplication::SameVersion) => "direct-duplicate",
            (Reachability::Direct, Duplication::DifferentVersions) => "direct-conflict",
            (Reachability::Indirect, Duplication::Unique) => "indirect",
            (Reachability::Indirect, Duplication::SameVersion) => "indirect-duplicate",
            (Reachability::Indirect, Duplication::DifferentVersions) => "indirect-conflict",
        }
    }
}
