//! Engine JSON codec: interactions to flat nodes and back.
//!
//! The exported document is an indented array of node objects:
//!
//! ```json
//! [
//!   {
//!     "id": "START",
//!     "speaker": "Guard",
//!     "line": "Who goes there?",
//!     "choices": [{ "text": "A friend", "targetNode": "FRIEND" }]
//!   }
//! ]
//! ```
//!
//! Nothing is written unless [`validate_nodes_with`] finds no errors.

use dialogue_model::{ChoiceOption, DialogueElement, DialogueLine, Interaction};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use crate::config::ExportConfig;
use crate::error::{GraphError, Result};
use crate::node::{edges_from_nodes, Node, NodeChoice, NodeKind, END};
use crate::validation::{validate_graph, IssueKind, ValidationIssue, ValidationResult};

/// Fields kept by [`normalize`] even when empty.
const RETAINED_FIELDS: [&str; 2] = ["id", "targetNode"];

/// Header command prefix carrying a test node's expression.
const TEST_COMMAND: &str = "test ";

/// Node ids the engine accepts when the pattern is enforced.
const ID_PATTERN: &str = "^[A-Z][A-Z0-9_]*$";

/// Engine-side constraints on exported nodes.
#[derive(Debug, Clone)]
pub struct NodeSchema {
    pub max_choices: usize,
    pub id_pattern: Option<Regex>,
}

impl Default for NodeSchema {
    fn default() -> Self {
        Self {
            max_choices: 4,
            id_pattern: Some(id_regex()),
        }
    }
}

impl NodeSchema {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            max_choices: config.max_choices,
            id_pattern: config.enforce_id_pattern.then(id_regex),
        }
    }
}

static ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn id_regex() -> Regex {
    ID_REGEX
        .get_or_init(|| Regex::new(ID_PATTERN).expect("ID_PATTERN is a valid regex"))
        .clone()
}

/// Flatten interactions into one node each.
///
/// Fails on an empty input or on repeated ids; either means the data is
/// broken upstream of graph semantics.
pub fn to_nodes(interactions: &[Interaction]) -> Result<Vec<Node>> {
    if interactions.is_empty() {
        return Err(GraphError::EmptyExport);
    }

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for interaction in interactions {
        if !seen.insert(interaction.id.as_str()) && !duplicates.contains(&interaction.id) {
            duplicates.push(interaction.id.clone());
        }
    }
    if !duplicates.is_empty() {
        return Err(GraphError::DuplicateIds(duplicates));
    }

    Ok(interactions.iter().map(to_node).collect())
}

/// Flatten a single interaction.
///
/// A `test <expr>` header command turns the node into a test node.
pub fn to_node(interaction: &Interaction) -> Node {
    let mut speaker = None;
    let mut lines = Vec::new();
    let mut choices = Vec::new();

    for element in &interaction.elements {
        match element {
            DialogueElement::DialogueLine(line) => {
                if speaker.is_none() {
                    speaker = line.speaker.clone().filter(|s| !s.is_empty());
                }
                lines.push(line.text.as_str());
            }
            DialogueElement::PlayerChoice { options } => {
                choices.extend(options.iter().map(|option| {
                    NodeChoice::new(option.text.clone(), option.target().unwrap_or(END))
                }));
            }
            DialogueElement::Command { .. } => {}
        }
    }

    let test = interaction
        .header_commands
        .iter()
        .find_map(|command| command.strip_prefix(TEST_COMMAND))
        .map(str::trim)
        .filter(|test| !test.is_empty());

    Node {
        id: interaction.id.clone(),
        kind: if test.is_some() { NodeKind::Test } else { NodeKind::Dialogue },
        speaker,
        line: (!lines.is_empty()).then(|| lines.join("\n")),
        choices: (!choices.is_empty()).then_some(choices),
        next_node: interaction.fallthrough().map(str::to_string),
        test: test.map(str::to_string),
    }
}

/// Rebuild interactions from nodes. Test nodes keep only their links.
pub fn from_nodes(nodes: &[Node]) -> Vec<Interaction> {
    nodes
        .iter()
        .map(|node| {
            let mut interaction = Interaction::new(node.id.clone());

            if let Some(line) = node.line.as_deref().filter(|line| !line.is_empty()) {
                for text in line.split('\n') {
                    interaction = interaction.with_element(DialogueLine::new(node.speaker.as_deref(), text));
                }
            }
            if let Some(choices) = node.choices.as_ref().filter(|choices| !choices.is_empty()) {
                interaction = interaction.with_choices(
                    choices
                        .iter()
                        .map(|choice| ChoiceOption::new(choice.text.clone(), choice.target_node.clone()))
                        .collect(),
                );
            }
            if let Some(test) = node.test.as_deref().filter(|test| !test.is_empty()) {
                interaction = interaction.with_header_command(format!("{}{}", TEST_COMMAND, test));
            }
            interaction.next_interaction_id_if_no_choices =
                node.next_node.clone().filter(|next| !next.is_empty());
            interaction
        })
        .collect()
}

/// Serialize a node, dropping empty-string, `false` and null fields.
///
/// `id` and `targetNode` are always kept; consumers key on their presence.
pub fn normalize(node: &Node) -> Result<Value> {
    let mut value = serde_json::to_value(node)?;
    prune(&mut value);
    Ok(value)
}

fn prune(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, field| {
                RETAINED_FIELDS.contains(&key.as_str())
                    || (!matches!(field, Value::Null | Value::Bool(false)) && field.as_str() != Some(""))
            });
            for field in map.values_mut() {
                prune(field);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(prune),
        _ => {}
    }
}

/// Check nodes against the default engine schema and the graph rules.
pub fn validate_nodes(nodes: &[Node]) -> ValidationResult {
    validate_nodes_with(nodes, &NodeSchema::default())
}

pub fn validate_nodes_with(nodes: &[Node], schema: &NodeSchema) -> ValidationResult {
    let mut result = ValidationResult::new();

    if nodes.is_empty() {
        result.error(ValidationIssue::new(
            IssueKind::EmptyGraph,
            "at least one node required",
        ));
        return result;
    }

    for node in nodes {
        if let Some(pattern) = &schema.id_pattern {
            if !node.id.is_empty() && node.id != END && !pattern.is_match(&node.id) {
                result.error(ValidationIssue::for_node(
                    IssueKind::InvalidId,
                    &node.id,
                    format!("node id '{}' does not match {}", node.id, pattern.as_str()),
                ));
            }
        }

        let Some(choices) = &node.choices else {
            continue;
        };
        if choices.len() > schema.max_choices {
            result.error(ValidationIssue::for_node(
                IssueKind::TooManyChoices,
                &node.id,
                format!(
                    "node '{}' has {} choices (max {})",
                    node.id,
                    choices.len(),
                    schema.max_choices
                ),
            ));
        }
        for (index, choice) in choices.iter().enumerate() {
            if choice.text.trim().is_empty() {
                result.error(ValidationIssue::for_node(
                    IssueKind::MissingChoiceText,
                    &node.id,
                    format!("choice {} of node '{}' has no text", index, node.id),
                ));
            }
        }
    }

    result.merge(validate_graph(nodes, &edges_from_nodes(nodes)));
    result
}

/// Render nodes as an indented JSON array after validating them.
pub fn to_string(nodes: &[Node], normalize_nodes: bool) -> Result<String> {
    to_string_with(nodes, normalize_nodes, &NodeSchema::default())
}

pub fn to_string_with(nodes: &[Node], normalize_nodes: bool, schema: &NodeSchema) -> Result<String> {
    let result = validate_nodes_with(nodes, schema);
    if !result.is_valid() {
        return Err(GraphError::InvalidExport {
            errors: result.errors,
        });
    }
    for warning in &result.warnings {
        log::warn!("export: {}", warning);
    }

    let document = if normalize_nodes {
        Value::Array(nodes.iter().map(normalize).collect::<Result<Vec<_>>>()?)
    } else {
        serde_json::to_value(nodes)?
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn to_file(path: &Path, nodes: &[Node], normalize_nodes: bool) -> Result<()> {
    to_file_with(path, nodes, normalize_nodes, &NodeSchema::default())
}

pub fn to_file_with(path: &Path, nodes: &[Node], normalize_nodes: bool, schema: &NodeSchema) -> Result<()> {
    let content = to_string_with(nodes, normalize_nodes, schema)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Parse a node array.
pub fn from_str(content: &str) -> Result<Vec<Node>> {
    Ok(serde_json::from_str(content)?)
}

pub fn from_file(path: &Path) -> Result<Vec<Node>> {
    from_str(&std::fs::read_to_string(path)?)
}
