// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::step::{Dependencies, StepId, StepSpec};
use crate::errors::{JobError, Result};

/// Internal node structure: resolved deps and direct children.
#[derive(Debug, Clone, Default)]
struct StepNode {
    /// Steps that must complete before this one may run.
    deps: BTreeSet<StepId>,
    /// Steps that list this one as a dependency.
    children: BTreeSet<StepId>,
}

/// Dependency graph of a job, keyed by step id.
///
/// Built once from the step specs; `ALL` dependencies are resolved to the
/// concrete set of every other id at build time and never change afterwards.
#[derive(Debug, Clone, Default)]
pub struct StepGraph {
    nodes: BTreeMap<StepId, StepNode>,
}

impl StepGraph {
    /// Build the graph, resolving `ALL` and rejecting unknown dependency ids.
    ///
    /// Cycles are *not* rejected here; see [`StepGraph::ensure_acyclic`].
    pub fn build(specs: &BTreeMap<StepId, StepSpec>) -> Result<Self> {
        let mut nodes: BTreeMap<StepId, StepNode> = specs
            .keys()
            .map(|id| (id.clone(), StepNode::default()))
            .collect();

        for (id, spec) in specs {
            let deps = match &spec.dependencies {
                Dependencies::None => BTreeSet::new(),
                Dependencies::All => resolve_all(specs.keys(), id),
                Dependencies::Ids(ids) => {
                    for dep in ids {
                        if !specs.contains_key(dep) {
                            return Err(JobError::UnknownDependency {
                                step: id.clone(),
                                dependency: dep.clone(),
                            });
                        }
                    }
                    ids.clone()
                }
            };

            if let Some(node) = nodes.get_mut(id) {
                node.deps = deps;
            }
        }

        // Second pass: children from deps.
        let edges: Vec<(StepId, StepId)> = nodes
            .iter()
            .flat_map(|(id, node)| node.deps.iter().map(move |dep| (dep.clone(), id.clone())))
            .collect();
        for (parent, child) in edges {
            if let Some(node) = nodes.get_mut(&parent) {
                node.children.insert(child);
            }
        }

        Ok(Self { nodes })
    }

    /// Reject dependency cycles, which would leave steps waiting forever.
    pub fn ensure_acyclic(&self) -> Result<()> {
        // Edge direction: dep -> step.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for id in self.nodes.keys() {
            graph.add_node(id.as_str());
        }
        for (id, node) in &self.nodes {
            for dep in &node.deps {
                graph.add_edge(dep.as_str(), id.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(JobError::DagCycle(format!(
                "cycle detected in step graph involving step '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// All step ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every step id except `id` (what `"dependencies": "ALL"` resolves to).
    pub fn resolve_all_dependency(&self, id: &str) -> BTreeSet<StepId> {
        resolve_all(self.nodes.keys(), id)
    }

    /// Resolved dependencies of a step.
    pub fn dependencies_of(&self, id: &str) -> Option<&BTreeSet<StepId>> {
        self.nodes.get(id).map(|n| &n.deps)
    }

    /// Steps that list `id` directly as a dependency, sorted.
    pub fn children(&self, id: &str) -> Vec<StepId> {
        self.nodes
            .get(id)
            .map(|n| n.children.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Transitive closure of [`children`](Self::children), sorted.
    ///
    /// Breadth-first with a visited set, so shared descendants appear once
    /// and the walk terminates even on a cyclic graph. `id` itself is only
    /// included if it is reachable from its own children.
    pub fn descendants(&self, id: &str) -> Vec<StepId> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut found: BTreeSet<StepId> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            for child in &node.children {
                found.insert(child.clone());
                if !visited.contains(child.as_str()) {
                    queue.push_back(child.as_str());
                }
            }
        }

        found.into_iter().collect()
    }
}

fn resolve_all<'a, I>(ids: I, id: &str) -> BTreeSet<StepId>
where
    I: IntoIterator<Item = &'a StepId>,
{
    ids.into_iter().filter(|other| other.as_str() != id).cloned().collect()
}
