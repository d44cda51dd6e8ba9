use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::flake::MetadataModel;
use crate::graph::naming::normalized_name;
use crate::graph::{Duplication, NodeClass, Reachability};
use crate::lookup::VersionLookup;
use crate::util::output;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedNode {
    pub name: String,
    pub normalized: String,
    pub version: Option<String>,
    pub class: NodeClass,
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub nodes: Vec<ClassifiedNode>,
    /// Raw names sharing their normalized name with another locked node,
    /// whatever their reachability.
    pub duplicates: BTreeSet<String>,
    pub first_versions: BTreeMap<String, Option<String>>,
}

impl Classification {
    pub fn node(&self, name: &str) -> Option<&ClassifiedNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn in_class(&self, class: NodeClass) -> impl Iterator<Item = &ClassifiedNode> {
        self.nodes.iter().filter(move |node| node.class == class)
    }

    pub fn counterparts<'a>(
        &'a self,
        node: &'a ClassifiedNode,
    ) -> impl Iterator<Item = &'a ClassifiedNode> + 'a {
        self.nodes
            .iter()
            .filter(move |other| other.normalized == node.normalized && other.name != node.name)
    }
}

pub fn classify(model: &MetadataModel, lookup: &dyn VersionLookup) -> Classification {
    let direct = model.direct_inputs();

    let mut first_seen: BTreeMap<String, String> = BTreeMap::new();
    let mut first_versions: BTreeMap<String, Option<String>> = BTreeMap::new();
    let mut versions: BTreeMap<String, Option<String>> = BTreeMap::new();
    let mut duplicates = BTreeSet::new();

    for (name, locked) in model.locked_nodes() {
        let normalized = normalized_name(name).to_string();
        let version = match lookup.version_for(locked) {
            Ok(version) => version,
            Err(err) => {
                output::warn(&format!("version lookup failed for {name}: {err}"));
                None
            }
        };

        match first_seen.get(&normalized) {
            Some(first) => {
                duplicates.insert(first.clone());
                duplicates.insert(name.to_string());
            }
            None => {
                first_seen.insert(normalized.clone(), name.to_string());
                first_versions.insert(normalized, version.clone());
            }
        }
        versions.insert(name.to_string(), version);
    }

    let mut groups: BTreeMap<(Reachability, String), Vec<Option<String>>> = BTreeMap::new();
    for (name, version) in &versions {
        let reachability = reachability_of(direct, name);
        groups
            .entry((reachability, normalized_name(name).to_string()))
            .or_default()
            .push(version.clone());
    }

    let nodes = versions
        .into_iter()
        .map(|(name, version)| {
            let reachability = reachability_of(direct, &name);
            let normalized = normalized_name(&name).to_string();
            let duplication = groups
                .get(&(reachability, normalized.clone()))
                .map(|group| duplication_of(group))
                .unwrap_or(Duplication::Unique);
            ClassifiedNode {
                name,
                normalized,
                version,
                class: NodeClass::new(reachability, duplication),
            }
        })
        .collect();

    Classification {
        nodes,
        duplicates,
        first_versions,
    }
}

fn reachability_of(direct: &BTreeSet<String>, name: &str) -> Reachability {
    if direct.contains(name) {
        Reachability::Direct
    } else {
        Reachability::Indirect
    }
}

/// Absent versions only match other absent versions.
fn duplication_of(versions: &[Option<String>]) -> Duplication {
    if versions.len() < 2 {
        return Duplication::Unique;
    }
    let distinct: BTreeSet<Option<&str>> = versions.iter().map(Option::as_deref).collect();
    if distinct.len() == 1 {
        Duplication::SameVersion
    } else {
        Duplication::DifferentVersions
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::flake::{LockFile, LockedRef, MetadataModel};
    use crate::graph::classify::{classify, duplication_of};
    use crate::graph::{Duplication, NodeClass, Reachability};
    use crate::lookup::{LookupError, NoLookup, Result, VersionLookup};

    struct FakeLookup {
        versions: HashMap<&'static str, &'static str>,
        failing: Vec<&'static str>,
    }

    impl VersionLookup for FakeLookup {
        fn id(&self) -> &'static str {
            "fake"
        }

        fn version_for(&self, locked: &LockedRef) -> Result<Option<String>> {
            let rev = locked.rev.as_deref().unwrap_or_default();
            if self.failing.iter().any(|failing| *failing == rev) {
                return Err(LookupError::Malformed {
                    url: "fake://tags".into(),
                    message: "boom".into(),
                });
            }
            Ok(self.versions.get(rev).map(|v| v.to_string()))
        }
    }

    fn lock(nodes: &[(&str, &str)], root_inputs: &[&str]) -> MetadataModel {
        let nodes_json = nodes
            .iter()
            .map(|(name, rev)| {
                format!(r#""{name}": {{ "locked": {{ "type": "github", "owner": "o", "repo": "{name}", "rev": "{rev}" }} }}"#)
            })
            .collect::<Vec<_>>()
            .join(",\n");
        let inputs = root_inputs
            .iter()
            .map(|name| format!(r#""{name}": "{name}""#))
            .collect::<Vec<_>>()
            .join(", ");
        let content = format!(
            r#"{{ "nodes": {{ {nodes_json}, "root": {{ "inputs": {{ {inputs} }} }} }}, "root": "root", "version": 7 }}"#
        );
        let lock = LockFile::parse(&content, "test").expect("parse lock");
        MetadataModel::from_lock(lock, Some("path:/flake".into())).expect("build model")
    }

    fn fake(versions: &[(&'static str, &'static str)]) -> FakeLookup {
        FakeLookup {
            versions: versions.iter().copied().collect(),
            failing: Vec::new(),
        }
    }

    #[test]
    fn lone_direct_input_is_unique() {
        let model = lock(&[("foo", "r1")], &["foo"]);
        let classes = classify(&model, &fake(&[("r1", "1.0")]));
        let foo = classes.node("foo").expect("foo");
        assert_eq!(
            foo.class,
            NodeClass::new(Reachability::Direct, Duplication::Unique)
        );
        assert_eq!(foo.version.as_deref(), Some("1.0"));
        assert!(classes.duplicates.is_empty());
    }

    #[test]
    fn direct_siblings_with_same_version_are_same_version_duplicates() {
        let model = lock(&[("foo", "r1"), ("foo_2", "r2")], &["foo", "foo_2"]);
        let classes = classify(&model, &fake(&[("r1", "1.0"), ("r2", "1.0")]));
        for name in ["foo", "foo_2"] {
            let node = classes.node(name).expect("node");
            assert_eq!(
                node.class,
                NodeClass::new(Reachability::Direct, Duplication::SameVersion)
            );
            assert_eq!(node.normalized, "foo");
        }
        assert_eq!(classes.duplicates.len(), 2);
    }

    #[test]
    fn direct_siblings_with_different_versions_conflict() {
        let model = lock(&[("foo", "r1"), ("foo_2", "r2")], &["foo", "foo_2"]);
        let classes = classify(&model, &fake(&[("r1", "1.0"), ("r2", "2.0")]));
        for name in ["foo", "foo_2"] {
            assert_eq!(
                classes.node(name).expect("node").class,
                NodeClass::new(Reachability::Direct, Duplication::DifferentVersions)
            );
        }
        assert_eq!(
            classes.first_versions.get("foo"),
            Some(&Some("1.0".to_string()))
        );
    }

    #[test]
    fn duplicates_across_reachability_sides_stay_unique_per_side() {
        let model = lock(&[("foo", "r1"), ("foo_2", "r2")], &["foo"]);
        let classes = classify(&model, &NoLookup);
        assert_eq!(
            classes.node("foo").expect("foo").class,
            NodeClass::new(Reachability::Direct, Duplication::Unique)
        );
        assert_eq!(
            classes.node("foo_2").expect("foo_2").class,
            NodeClass::new(Reachability::Indirect, Duplication::Unique)
        );
        assert!(classes.duplicates.contains("foo"));
        assert!(classes.duplicates.contains("foo_2"));
    }

    #[test]
    fn absent_versions_count_as_the_same_version() {
        let model = lock(&[("bar", "r1"), ("bar_2", "r2")], &[]);
        let classes = classify(&model, &NoLookup);
        for name in ["bar", "bar_2"] {
            assert_eq!(
                classes.node(name).expect("node").class,
                NodeClass::new(Reachability::Indirect, Duplication::SameVersion)
            );
        }
    }

    #[test]
    fn failed_lookup_degrades_to_absent_version() {
        let model = lock(&[("a", "r1"), ("b", "r2")], &["a", "b"]);
        let lookup = FakeLookup {
            versions: [("r1", "1.0"), ("r2", "2.0")].into_iter().collect(),
            failing: vec!["r1"],
        };
        let classes = classify(&model, &lookup);
        assert_eq!(classes.node("a").expect("a").version, None);
        assert_eq!(
            classes.node("b").expect("b").version.as_deref(),
            Some("2.0")
        );
    }

    #[test]
    fn classes_partition_locked_nodes() {
        let model = lock(
            &[
                ("a", "r1"),
                ("a_2", "r2"),
                ("b", "r3"),
                ("c", "r4"),
                ("c_2", "r5"),
                ("c_3", "r6"),
            ],
            &["a", "a_2", "b"],
        );
        let classes = classify(&model, &fake(&[("r5", "1"), ("r6", "2")]));
        let total: usize = NodeClass::ALL
            .iter()
            .map(|class| classes.in_class(*class).count())
            .sum();
        assert_eq!(total, 6);
        assert_eq!(classes.nodes.len(), 6);
        assert_eq!(
            classes.node("c").expect("c").class,
            NodeClass::new(Reachability::Indirect, Duplication::DifferentVersions)
        );
    }

    #[test]
    fn counterparts_share_normalized_name() {
        let model = lock(&[("x", "r1"), ("x_2", "r2"), ("y", "r3")], &["x"]);
        let classes = classify(&model, &NoLookup);
        let x = classes.node("x").expect("x");
        let names: Vec<&str> = classes
            .counterparts(x)
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["x_2"]);
    }

    #[test]
    fn duplication_kind_from_versions() {
        assert_eq!(duplication_of(&[Some("1".into())]), Duplication::Unique);
        assert_eq!(duplication_of(&[None, None]), Duplication::SameVersion);
        assert_eq!(
            duplication_of(&[Some("1".into()), None]),
            Duplication::DifferentVersions
        );
    }
}
