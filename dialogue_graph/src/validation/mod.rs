//! Graph Validation Engine - structural checks over flattened nodes and edges.
//!
//! [`validate_graph`] runs six independent passes and reports every finding
//! at once:
//! 1. **Identity**: every node has a non-empty, unique id
//! 2. **References**: every edge endpoint names an existing node (`END` excepted)
//! 3. **Orphans**: nodes nothing points at
//! 4. **Reachability**: nodes not reachable from `START`
//! 5. **Content**: dialogue nodes with nothing to show, test nodes without a test
//! 6. **Cycles**: exact cycle paths with a stable identity
//!
//! Findings never abort validation. Errors block export; warnings are advisory.

mod checks;
mod cycles;

pub use cycles::*;

use serde::{Deserialize, Serialize};

use crate::node::{Edge, Node};

/// Codes for validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingId,
    DuplicateId,
    BrokenReference,
    OrphanNode,
    UnreachableNode,
    MissingStart,
    EmptyNode,
    MissingTest,
    CycleDetected,
    EmptyGraph,
    InvalidId,
    TooManyChoices,
    MissingChoiceText,
}

impl IssueKind {
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::MissingId => "missing_id",
            IssueKind::DuplicateId => "duplicate_id",
            IssueKind::BrokenReference => "broken_reference",
            IssueKind::OrphanNode => "orphan_node",
            IssueKind::UnreachableNode => "unreachable_node",
            IssueKind::MissingStart => "missing_start",
            IssueKind::EmptyNode => "empty_node",
            IssueKind::MissingTest => "missing_test",
            IssueKind::CycleDetected => "cycle_detected",
            IssueKind::EmptyGraph => "empty_graph",
            IssueKind::InvalidId => "invalid_id",
            IssueKind::TooManyChoices => "too_many_choices",
            IssueKind::MissingChoiceText => "missing_choice_text",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<CycleInfo>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node_id: None,
            cycle: None,
        }
    }

    pub fn for_node(kind: IssueKind, node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: Some(node_id.into()),
            ..Self::new(kind, message)
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Outcome of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there are no errors. Warnings do not affect validity.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// All findings of one kind, errors first.
    pub fn issues_of(&self, kind: IssueKind) -> Vec<&ValidationIssue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(|issue| issue.kind == kind)
            .collect()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues_of(kind).len()
    }

    /// Detected cycles, in discovery order.
    pub fn cycles(&self) -> Vec<&CycleInfo> {
        self.warnings
            .iter()
            .filter_map(|issue| issue.cycle.as_ref())
            .collect()
    }
}

/// Validate a flattened graph.
///
/// `edges` are taken as given, independent of the nodes' own `choices` and
/// `nextNode` fields; use [`crate::node::edges_from_nodes`] to derive them.
pub fn validate_graph(nodes: &[Node], edges: &[Edge]) -> ValidationResult {
    let mut result = ValidationResult::new();

    result.merge(checks::check_identity(nodes));
    result.merge(checks::check_references(nodes, edges));
    result.merge(checks::check_orphans(nodes, edges));
    result.merge(checks::check_reachability(nodes, edges));
    result.merge(checks::check_content(nodes));
    result.merge(cycles::detect_cycles(nodes, edges));

    log::debug!(
        "validated {} nodes / {} edges: {} errors, {} warnings",
        nodes.len(),
        edges.len(),
        result.errors.len(),
        result.warnings.len()
    );

    result
}
