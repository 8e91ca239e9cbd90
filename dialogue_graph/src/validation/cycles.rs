//! Cycle detection with exact paths and stable cycle identities.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use super::{IssueKind, ValidationIssue, ValidationResult};
use crate::node::{Edge, Node};

/// A detected cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleInfo {
    /// `cycle_` followed by 8 hex chars; independent of where the cycle was entered.
    pub cycle_id: String,
    /// Human-readable path, e.g. `A → B → C → A`.
    pub cycle_path: String,
    /// Member nodes in path order, without the closing repeat.
    pub cycle_nodes: Vec<String>,
}

/// Stable identity of a cycle: a hash over its sorted member set.
pub fn cycle_id(nodes: &[String]) -> String {
    let mut members: Vec<&str> = nodes.iter().map(String::as_str).collect();
    members.sort_unstable();
    members.dedup();

    let digest = Sha256::digest(members.join(",").as_bytes());
    let hex = format!("{:x}", digest);
    format!("cycle_{}", &hex[..8])
}

struct CycleSearch<'a> {
    adjacency: HashMap<&'a str, Vec<&'a str>>,
    visited: HashSet<&'a str>,
    on_stack: HashSet<&'a str>,
    path: Vec<&'a str>,
    found: Vec<CycleInfo>,
    seen_ids: HashSet<String>,
}

impl<'a> CycleSearch<'a> {
    fn new(edges: &'a [Edge]) -> Self {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in edges {
            adjacency
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }

        Self {
            adjacency,
            visited: HashSet::new(),
            on_stack: HashSet::new(),
            path: Vec::new(),
            found: Vec::new(),
            seen_ids: HashSet::new(),
        }
    }

    fn enter(&mut self, node: &'a str) {
        self.visited.insert(node);
        self.on_stack.insert(node);
        self.path.push(node);
    }

    /// Depth-first search from `root` with an explicit frame stack.
    ///
    /// Each frame is a node and the index of its next unexplored neighbour.
    fn visit(&mut self, root: &'a str) {
        let mut frames: Vec<(&'a str, usize)> = vec![(root, 0)];
        self.enter(root);

        while let Some(frame) = frames.last_mut() {
            let (node, index) = *frame;
            let next = self
                .adjacency
                .get(node)
                .and_then(|targets| targets.get(index))
                .copied();

            let Some(next) = next else {
                frames.pop();
                self.path.pop();
                self.on_stack.remove(node);
                continue;
            };
            frame.1 += 1;

            if self.on_stack.contains(next) {
                self.record(next);
            } else if !self.visited.contains(next) {
                self.enter(next);
                frames.push((next, 0));
            }
        }
    }

    /// Slice the current path from the first occurrence of `entry`.
    fn record(&mut self, entry: &'a str) {
        let Some(start) = self.path.iter().position(|id| *id == entry) else {
            return;
        };

        // Nodes on the stack are distinct, so the slice has no repeats.
        let members: Vec<String> = self.path[start..].iter().map(|id| id.to_string()).collect();

        let id = cycle_id(&members);
        if !self.seen_ids.insert(id.clone()) {
            log::debug!("cycle {} rediscovered at {}", id, entry);
            return;
        }

        let mut steps: Vec<&str> = self.path[start..].to_vec();
        steps.push(entry);

        self.found.push(CycleInfo {
            cycle_id: id,
            cycle_path: steps.join(" → "),
            cycle_nodes: members,
        });
    }
}

/// Find every distinct cycle, searching from each unvisited node in node order.
pub(super) fn detect_cycles(nodes: &[Node], edges: &[Edge]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut search = CycleSearch::new(edges);

    for node in nodes {
        let id = node.id.as_str();
        if !id.is_empty() && !search.visited.contains(id) {
            search.visit(id);
        }
    }

    for cycle in search.found {
        let first = cycle.cycle_nodes.first().cloned().unwrap_or_default();
        let mut issue = ValidationIssue::for_node(
            IssueKind::CycleDetected,
            first,
            format!("cycle detected: {}", cycle.cycle_path),
        );
        issue.cycle = Some(cycle);
        result.warning(issue);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(ids: &[&str], pairs: &[(&str, &str)]) -> (Vec<Node>, Vec<Edge>) {
        let nodes = ids.iter().map(|id| Node::new(*id).with_line("...")).collect();
        let edges = pairs.iter().map(|(s, t)| Edge::new(*s, *t)).collect();
        (nodes, edges)
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let (nodes, edges) = graph(
            &["START", "A", "B", "C"],
            &[("START", "A"), ("START", "B"), ("A", "C"), ("B", "C")],
        );
        assert!(detect_cycles(&nodes, &edges).warnings.is_empty());
    }

    #[test]
    fn test_exact_cycle_path_excludes_lead_in() {
        let (nodes, edges) = graph(
            &["START", "A", "B", "C"],
            &[("START", "A"), ("A", "B"), ("B", "C"), ("C", "A")],
        );
        let result = detect_cycles(&nodes, &edges);

        assert_eq!(result.warnings.len(), 1);
        let cycle = result.warnings[0].cycle.as_ref().unwrap();
        assert_eq!(cycle.cycle_path, "A → B → C → A");
        assert_eq!(cycle.cycle_nodes, vec!["A", "B", "C"]);
        assert!(cycle.cycle_id.starts_with("cycle_"));
        assert_eq!(cycle.cycle_id.len(), "cycle_".len() + 8);
    }

    #[test]
    fn test_cycle_id_independent_of_entry_point() {
        let abc = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let cab = vec!["C".to_string(), "A".to_string(), "B".to_string()];
        assert_eq!(cycle_id(&abc), cycle_id(&cab));

        let other = vec!["A".to_string(), "B".to_string()];
        assert_ne!(cycle_id(&abc), cycle_id(&other));
    }

    #[test]
    fn test_same_cycle_from_two_entries_reported_once() {
        // X and Y both enter the A/B loop; whichever is searched first finds it.
        let (nodes, edges) = graph(
            &["X", "Y", "A", "B"],
            &[("X", "A"), ("Y", "B"), ("A", "B"), ("B", "A")],
        );
        let result = detect_cycles(&nodes, &edges);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_self_loop() {
        let (nodes, edges) = graph(&["START", "LOOP"], &[("START", "LOOP"), ("LOOP", "LOOP")]);
        let result = detect_cycles(&nodes, &edges);

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].cycle.as_ref().unwrap().cycle_path, "LOOP → LOOP");
    }

    #[test]
    fn test_two_distinct_cycles() {
        let (nodes, edges) = graph(
            &["START", "A", "B", "C", "D"],
            &[("START", "A"), ("A", "B"), ("B", "A"), ("START", "C"), ("C", "D"), ("D", "C")],
        );
        let result = detect_cycles(&nodes, &edges);

        assert_eq!(result.warnings.len(), 2);
        let ids: HashSet<_> = result.cycles().iter().map(|c| c.cycle_id.clone()).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_edges_to_unknown_nodes_do_not_panic() {
        let (nodes, edges) = graph(&["START"], &[("START", "GHOST"), ("GHOST", "START")]);
        let result = detect_cycles(&nodes, &edges);
        assert_eq!(result.warnings.len(), 1);
    }
}
