use std::collections::BTreeMap;

use serde::Deserialize;

use crate::flake::{ResolutionError, Result};

pub(crate) const KNOWN_LOCK_VERSIONS: std::ops::RangeInclusive<u32> = 5..=7;
const MAX_FOLLOWS_DEPTH: usize = 64;

#[derive(Debug, Clone, Deserialize)]
pub struct LockFile {
    pub nodes: BTreeMap<String, LockNode>,
    pub root: String,
    pub version: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LockNode {
    #[serde(default)]
    pub inputs: BTreeMap<String, InputRef>,
    #[serde(default)]
    pub locked: Option<LockedRef>,
}

/// Either a node key or a follows path of input names walked from the root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InputRef {
    Node(String),
    Follows(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedRef {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub nar_hash: Option<String>,
    #[serde(default)]
    pub last_modified: Option<u64>,
}

impl LockFile {
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let lock: LockFile =
            serde_json::from_str(content).map_err(|source| ResolutionError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        lock.validate()?;
        Ok(lock)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.nodes.contains_key(&self.root) {
            return Err(ResolutionError::MissingRoot(self.root.clone()));
        }
        Ok(())
    }

    pub fn root_node(&self) -> Option<&LockNode> {
        self.nodes.get(&self.root)
    }

    /// `None` for dangling references and follows cycles.
    pub fn resolve_input(&self, input: &InputRef) -> Option<&str> {
        self.resolve_input_at_depth(input, 0)
    }

    fn resolve_input_at_depth(&self, input: &InputRef, depth: usize) -> Option<&str> {
        match input {
            InputRef::Node(key) => self.nodes.get_key_value(key).map(|(key, _)| key.as_str()),
            InputRef::Follows(path) => self.resolve_follows(path, depth),
        }
    }

    fn resolve_follows(&self, path: &[String], depth: usize) -> Option<&str> {
        if depth > MAX_FOLLOWS_DEPTH {
            return None;
        }
        let mut current = self.root.as_str();
        for name in path {
            let next = self.nodes.get(current)?.inputs.get(name)?;
            current = self.resolve_input_at_depth(next, depth + 1)?;
        }
        self.nodes.get_key_value(current).map(|(key, _)| key.as_str())
    }
}
