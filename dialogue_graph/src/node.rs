//! Flattened nodes - the engine-facing view of a dialogue graph.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved id of the entry node. Must exist; never reported as an orphan.
pub const START: &str = "START";

/// Reserved id denoting dialogue termination. Need not exist as a node.
pub const END: &str = "END";

/// Behaviour of a flattened node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Shows a line and/or choices.
    #[default]
    Dialogue,
    /// Branches on a test expression.
    Test,
}

impl NodeKind {
    pub fn is_dialogue(&self) -> bool {
        matches!(self, NodeKind::Dialogue)
    }
}

/// A choice as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeChoice {
    pub text: String,
    #[serde(rename = "targetNode")]
    pub target_node: String,
}

impl NodeChoice {
    pub fn new(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_node: target.into(),
        }
    }
}

/// One node of the flattened graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "NodeKind::is_dialogue")]
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,

    /// All line texts of the interaction, newline separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<NodeChoice>>,

    #[serde(rename = "nextNode", default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<String>,

    /// Test expression, required for [`NodeKind::Test`] nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }

    pub fn with_choice(mut self, text: impl Into<String>, target: impl Into<String>) -> Self {
        self.choices
            .get_or_insert_with(Vec::new)
            .push(NodeChoice::new(text, target));
        self
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next_node = Some(next.into());
        self
    }

    /// Turn this into a test node.
    pub fn with_test(mut self, test: impl Into<String>) -> Self {
        self.kind = NodeKind::Test;
        self.test = Some(test.into());
        self
    }

    pub fn has_line(&self) -> bool {
        self.line.as_deref().is_some_and(|line| !line.is_empty())
    }

    pub fn has_choices(&self) -> bool {
        self.choices.as_ref().is_some_and(|choices| !choices.is_empty())
    }

    /// Targets this node links to, in field order (choices, then `nextNode`).
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self
            .choices
            .iter()
            .flatten()
            .map(|choice| choice.target_node.as_str())
            .filter(|target| !target.is_empty())
            .collect();

        if let Some(next) = self.next_node.as_deref().filter(|next| !next.is_empty()) {
            targets.push(next);
        }

        targets
    }
}

/// A directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Derive the edge list implied by the nodes' `choices` and `nextNode` fields.
///
/// Repeated source/target pairs are collapsed.
pub fn edges_from_nodes(nodes: &[Node]) -> Vec<Edge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for node in nodes {
        for target in node.targets() {
            let edge = Edge::new(node.id.clone(), target);
            if seen.insert(edge.clone()) {
                edges.push(edge);
            }
        }
    }

    edges
}
