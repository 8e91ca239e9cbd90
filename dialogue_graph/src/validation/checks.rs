//! Identity, reference, orphan, reachability and content passes.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{IssueKind, ValidationIssue, ValidationResult};
use crate::node::{Edge, Node, NodeKind, END, START};

fn node_ids(nodes: &[Node]) -> HashSet<&str> {
    nodes
        .iter()
        .map(|node| node.id.as_str())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Every node carries a non-empty id, and no id is used twice.
pub(super) fn check_identity(nodes: &[Node]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut seen = HashSet::new();

    for (position, node) in nodes.iter().enumerate() {
        if node.id.is_empty() {
            result.error(ValidationIssue::new(
                IssueKind::MissingId,
                format!("node at position {} has no id", position),
            ));
        } else if !seen.insert(node.id.as_str()) {
            result.error(ValidationIssue::for_node(
                IssueKind::DuplicateId,
                &node.id,
                format!("node id '{}' is used more than once", node.id),
            ));
        }
    }

    result
}

/// Every edge endpoint resolves to a node; a target of `END` always resolves.
pub(super) fn check_references(nodes: &[Node], edges: &[Edge]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let ids = node_ids(nodes);

    for edge in edges {
        if !ids.contains(edge.source.as_str()) {
            result.error(ValidationIssue::for_node(
                IssueKind::BrokenReference,
                &edge.source,
                format!(
                    "edge {} -> {} starts at unknown node '{}'",
                    edge.source, edge.target, edge.source
                ),
            ));
        }
        if edge.target != END && !ids.contains(edge.target.as_str()) {
            result.error(ValidationIssue::for_node(
                IssueKind::BrokenReference,
                &edge.source,
                format!(
                    "edge {} -> {} points at unknown node '{}'",
                    edge.source, edge.target, edge.target
                ),
            ));
        }
    }

    result
}

/// Nodes (other than the sentinels) that no edge points at.
pub(super) fn check_orphans(nodes: &[Node], edges: &[Edge]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let targets: HashSet<&str> = edges.iter().map(|edge| edge.target.as_str()).collect();

    for node in nodes {
        let id = node.id.as_str();
        if id.is_empty() || id == START || id == END {
            continue;
        }
        if !targets.contains(id) {
            result.warning(ValidationIssue::for_node(
                IssueKind::OrphanNode,
                id,
                format!("node '{}' has no inbound edges", id),
            ));
        }
    }

    result
}

/// Breadth-first traversal from `START`; anything not visited is unreachable.
pub(super) fn check_reachability(nodes: &[Node], edges: &[Edge]) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !nodes.iter().any(|node| node.id == START) {
        result.error(ValidationIssue::new(
            IssueKind::MissingStart,
            format!("graph has no '{}' node", START),
        ));
        return result;
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(START);
    queue.push_back(START);

    while let Some(current) = queue.pop_front() {
        for &next in adjacency.get(current).into_iter().flatten() {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    for node in nodes {
        let id = node.id.as_str();
        if id.is_empty() || id == END || visited.contains(id) {
            continue;
        }
        result.warning(ValidationIssue::for_node(
            IssueKind::UnreachableNode,
            id,
            format!("node '{}' cannot be reached from {}", id, START),
        ));
    }

    result
}

/// Dialogue nodes must show something; test nodes must carry their test.
pub(super) fn check_content(nodes: &[Node]) -> ValidationResult {
    let mut result = ValidationResult::new();

    for node in nodes {
        if node.id == END {
            continue;
        }
        match node.kind {
            NodeKind::Dialogue => {
                if !node.has_line() && !node.has_choices() {
                    result.error(ValidationIssue::for_node(
                        IssueKind::EmptyNode,
                        &node.id,
                        format!("node '{}' has neither a line nor choices", node.id),
                    ));
                }
            }
            NodeKind::Test => {
                if node.test.as_deref().map_or(true, |test| test.trim().is_empty()) {
                    result.error(ValidationIssue::for_node(
                        IssueKind::MissingTest,
                        &node.id,
                        format!("test node '{}' has no test expression", node.id),
                    ));
                }
            }
        }
    }

    result
}
