use std::collections::{BTreeMap, BTreeSet};

use crate::flake::lock::{InputRef, LockFile, LockNode, LockedRef, KNOWN_LOCK_VERSIONS};
use crate::flake::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingInput {
    pub from: String,
    pub input: String,
    pub reference: InputRef,
}

#[derive(Debug, Clone)]
pub struct MetadataModel {
    title: Option<String>,
    root: String,
    lock_version: u32,
    nodes: BTreeMap<String, LockNode>,
    direct: BTreeSet<String>,
    edges: Vec<Edge>,
    dangling: Vec<DanglingInput>,
}

impl MetadataModel {
    pub fn from_lock(lock: LockFile, title: Option<String>) -> Result<Self> {
        lock.validate()?;

        let mut direct = BTreeSet::new();
        let mut edges = Vec::new();
        let mut dangling = Vec::new();

        for (key, node) in &lock.nodes {
            for (input, reference) in &node.inputs {
                let Some(target) = lock.resolve_input(reference) else {
                    dangling.push(DanglingInput {
                        from: key.clone(),
                        input: input.clone(),
                        reference: reference.clone(),
                    });
                    continue;
                };
                if *key == lock.root {
                    direct.insert(target.to_string());
                } else {
                    edges.push(Edge {
                        from: key.clone(),
                        to: target.to_string(),
                    });
                }
            }
        }

        let LockFile {
            nodes,
            root,
            version,
        } = lock;
        Ok(Self {
            title,
            root,
            lock_version: version,
            nodes,
            direct,
            edges,
            dangling,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn lock_version(&self) -> u32 {
        self.lock_version
    }

    pub fn has_known_lock_version(&self) -> bool {
        KNOWN_LOCK_VERSIONS.contains(&self.lock_version)
    }

    pub fn is_locked(&self, name: &str) -> bool {
        name != self.root
            && self
                .nodes
                .get(name)
                .map(|node| node.locked.is_some())
                .unwrap_or(false)
    }

    /// Locked nodes in key order. The root and follow-only entries are skipped.
    pub fn locked_nodes(&self) -> impl Iterator<Item = (&str, &LockedRef)> {
        let root = self.root.as_str();
        self.nodes
            .iter()
            .filter(move |(key, _)| key.as_str() != root)
            .filter_map(|(key, node)| node.locked.as_ref().map(|locked| (key.as_str(), locked)))
    }

    pub fn direct_inputs(&self) -> &BTreeSet<String> {
        &self.direct
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn dangling_inputs(&self) -> &[DanglingInput] {
        &self.dangling
    }
}

#[cfg(test)]
mod tests {
    use crate::flake::lock::LockFile;
    use crate::flake::metadata::{Edge, MetadataModel};

    fn model(content: &str) -> MetadataModel {
        let lock = LockFile::parse(content, "test").expect("parse lock");
        MetadataModel::from_lock(lock, Some("path:/flake".into())).expect("build model")
    }

    #[test]
    fn splits_root_inputs_from_node_edges() {
        let model = model(
            r#"{
  "nodes": {
    "a": { "inputs": { "b": "b" }, "locked": { "type": "path", "path": "/a" } },
    "b": { "inputs": { "c": ["a", "b-c"] }, "locked": { "type": "path", "path": "/b" } },
    "c": { "locked": { "type": "path", "path": "/c" } },
    "root": { "inputs": { "a": "a" } }
  },
  "root": "root",
  "version": 7
}"#,
        );
        assert_eq!(model.title(), Some("path:/flake"));
        assert_eq!(
            model.direct_inputs().iter().collect::<Vec<_>>(),
            vec!["a"]
        );
        assert_eq!(
            model.edges(),
            &[Edge {
                from: "a".into(),
                to: "b".into(),
            }]
        );
        assert_eq!(model.dangling_inputs().len(), 1);
        assert_eq!(model.dangling_inputs()[0].from, "b");
        assert_eq!(model.lock_version(), 7);
        assert!(model.has_known_lock_version());
    }

    #[test]
    fn locked_nodes_skip_root_and_unlocked_entries() {
        let model = model(
            r#"{
  "nodes": {
    "a": { "locked": { "type": "path", "path": "/a" } },
    "floating": { "original": { "type": "indirect", "id": "nixpkgs" } },
    "root": { "inputs": { "a": "a", "floating": "floating" } }
  },
  "root": "root",
  "version": 7
}"#,
        );
        let names: Vec<&str> = model.locked_nodes().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a"]);
        assert!(model.is_locked("a"));
        assert!(!model.is_locked("floating"));
        assert!(!model.is_locked("root"));
    }
}
