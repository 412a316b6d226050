//! The analysis design: a nested grouping of samples inferred from their
//! `_`-separated names.
//!
//! `Grp1_Rep1` and `Grp1_Rep2` produce
//!
//! ```text
//! Grp1
//! ├── Rep1 -> "Grp1_Rep1"
//! └── Rep2 -> "Grp1_Rep2"
//! ```
//!
//! Every leaf sits at the same depth, which equals the token arity of the
//! sample names.

use crate::design::naming::validate_arity;
use crate::design::NamingError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// A node of the design tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// A sample; holds its full normalized name.
    Leaf(String),
    /// A group of samples or sub-groups, keyed by token.
    Branch(BTreeMap<String, Node>),
}

/// What to do when the same sample name is inserted twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Fail with [`NamingError::DuplicateSample`].
    #[default]
    Strict,
    /// Keep the first leaf and count the collision.
    LegacyCount,
}

/// Nested mapping from token to sub-design or sample name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisDesign {
    root: BTreeMap<String, Node>,
}

/// Build the design for `names`.
///
/// All names must share one token arity. The result does not depend on
/// the order of `names`.
pub fn build_design<S: AsRef<str>>(names: &[S], policy: CollisionPolicy) -> Result<AnalysisDesign, NamingError> {
    validate_arity(names)?;

    let mut design = AnalysisDesign::new();
    let mut collisions = 0usize;
    for name in names {
        if design.insert(name.as_ref(), policy)? {
            collisions += 1;
        }
    }
    if collisions > 0 {
        warn!(
            "{} duplicate sample name(s) collapsed while building the analysis design",
            collisions
        );
    }
    Ok(design)
}

impl AnalysisDesign {
    pub fn new() -> Self {
        AnalysisDesign::default()
    }

    /// Insert one sample. Returns `Ok(true)` when the sample already
    /// existed and `policy` allowed keeping the first one.
    pub fn insert(&mut self, name: &str, policy: CollisionPolicy) -> Result<bool, NamingError> {
        let tokens: Vec<&str> = name.split('_').collect();
        let (last, parents) = tokens
            .split_last()
            .ok_or_else(|| NamingError::MissingIdentifier(name.to_string()))?;

        let mut level = &mut self.root;
        for token in parents {
            let node = level
                .entry(token.to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            level = match node {
                Node::Branch(children) => children,
                Node::Leaf(_) => {
                    return Err(NamingError::BranchLeafConflict {
                        name: name.to_string(),
                        token: token.to_string(),
                    })
                }
            };
        }

        match level.entry(last.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Node::Leaf(name.to_string()));
                Ok(false)
            }
            Entry::Occupied(slot) => match slot.get() {
                Node::Branch(_) => Err(NamingError::BranchLeafConflict {
                    name: name.to_string(),
                    token: last.to_string(),
                }),
                Node::Leaf(_) => match policy {
                    CollisionPolicy::Strict => Err(NamingError::DuplicateSample(name.to_string())),
                    CollisionPolicy::LegacyCount => Ok(true),
                },
            },
        }
    }

    /// Top-level groups.
    pub fn root(&self) -> &BTreeMap<String, Node> {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Number of nested mapping levels; equals the sample token arity.
    pub fn depth(&self) -> usize {
        fn node_depth(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 0,
                Node::Branch(children) => 1 + children.values().map(node_depth).max().unwrap_or(0),
            }
        }
        if self.root.is_empty() {
            return 0;
        }
        1 + self.root.values().map(node_depth).max().unwrap_or(0)
    }

    /// Walk every leaf with the token path leading to it.
    fn visit<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&[&'a str], &'a str),
    {
        fn walk<'a, F>(map: &'a BTreeMap<String, Node>, path: &mut Vec<&'a str>, f: &mut F)
        where
            F: FnMut(&[&'a str], &'a str),
        {
            for (token, node) in map {
                path.push(token.as_str());
                match node {
                    Node::Leaf(name) => f(path.as_slice(), name.as_str()),
                    Node::Branch(children) => walk(children, path, f),
                }
                path.pop();
            }
        }
        let mut path = Vec::new();
        walk(&self.root, &mut path, &mut f);
    }

    /// All sample names, in design order.
    pub fn leaves(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.visit(|_, name| out.push(name.to_string()));
        out
    }

    /// Samples grouped by their first `level + 1` tokens.
    ///
    /// Level 0 groups by the top token; the deepest level puts every sample
    /// in its own group.
    pub fn groups_at_level(&self, level: usize) -> BTreeMap<String, Vec<String>> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        self.visit(|path, name| {
            let end = (level + 1).min(path.len());
            groups
                .entry(path[..end].join("_"))
                .or_default()
                .push(name.to_string());
        });
        groups
    }
}
