//! Plan graph export for startup diagnostics.
//!
//! Renders a plan as nodes and dependency edges, either as GraphViz DOT or,
//! with the `graph-export` feature, as JSON.

use std::collections::HashSet;
use std::fmt::Write as _;

#[cfg(feature = "graph-export")]
use serde::Serialize;

use crate::plan::Plan;

/// One node per plan step.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "graph-export", derive(Serialize))]
pub struct GraphNode {
    /// The step's key, rendered.
    pub id: String,
    /// The step's action kind.
    pub kind: &'static str,
    /// Whether the key is one of the plan's roots.
    pub root: bool,
}

/// One edge per dependency, pointing from the dependent to the dependency.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "graph-export", derive(Serialize))]
pub struct GraphEdge {
    /// The dependent step's key, rendered.
    pub from: String,
    /// The dependency key, rendered. May name a parent-served key with no
    /// node of its own.
    pub to: String,
}

/// A plan rendered as a dependency graph.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "graph-export", derive(Serialize))]
pub struct PlanGraph {
    /// All nodes, in plan order.
    pub nodes: Vec<GraphNode>,
    /// All edges, deduplicated.
    pub edges: Vec<GraphEdge>,
}

impl PlanGraph {
    /// Builds the graph for a plan.
    pub fn from_plan(plan: &Plan) -> PlanGraph {
        let roots: HashSet<String> = plan.roots().iter().map(|k| k.to_string()).collect();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut seen_edges = HashSet::new();

        for step in plan.steps() {
            let id = step.key().to_string();
            nodes.push(GraphNode {
                root: roots.contains(&id),
                kind: step.action().kind_name(),
                id: id.clone(),
            });
            for dep in step.deps() {
                let to = dep.to_string();
                if seen_edges.insert((id.clone(), to.clone())) {
                    edges.push(GraphEdge { from: id.clone(), to });
                }
            }
        }

        PlanGraph { nodes, edges }
    }

    /// Renders the graph in GraphViz DOT format.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph plan {\n");
        for node in &self.nodes {
            let shape = if node.root { "box" } else { "ellipse" };
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{}\\n({})\", shape={}];",
                node.id, node.id, node.kind, shape
            );
        }
        for edge in &self.edges {
            let _ = writeln!(out, "  \"{}\" -> \"{}\";", edge.from, edge.to);
        }
        out.push_str("}\n");
        out
    }

    /// Renders the graph as JSON.
    #[cfg(feature = "graph-export")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
