//! Interaction definitions - the nodes of an authored dialogue graph.

mod element;

pub use element::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a parent interaction reaches a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceSlot {
    /// The n-th choice option of the interaction, counted across all choice blocks.
    Choice(usize),
    /// The `next_interaction_id_if_no_choices` link.
    Fallthrough,
}

impl ChoiceSlot {
    /// Wire index: the choice position, or -1 for the fallthrough.
    pub fn index(&self) -> i64 {
        match self {
            ChoiceSlot::Choice(index) => *index as i64,
            ChoiceSlot::Fallthrough => -1,
        }
    }

    pub fn from_index(index: i64) -> Self {
        if index < 0 {
            ChoiceSlot::Fallthrough
        } else {
            ChoiceSlot::Choice(index as usize)
        }
    }
}

/// An outgoing edge derived from an interaction's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub target: String,
    pub slot: ChoiceSlot,
}

/// One node of authored dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Interaction {
    pub id: String,

    /// Display title; may be empty.
    #[serde(default)]
    pub title: String,

    /// Ordered content. Insertion order is significant.
    #[serde(default)]
    pub elements: Vec<DialogueElement>,

    #[serde(default)]
    pub header_commands: Vec<String>,

    #[serde(default)]
    pub header_tags: BTreeSet<String>,

    /// Successor used when the interaction has no player-choice block.
    #[serde(default)]
    pub next_interaction_id_if_no_choices: Option<String>,
}

impl Interaction {
    /// Create an empty interaction with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_element(mut self, element: impl Into<DialogueElement>) -> Self {
        self.elements.push(element.into());
        self
    }

    /// Append a dialogue line.
    pub fn with_line(self, speaker: Option<&str>, text: impl Into<String>) -> Self {
        self.with_element(DialogueElement::line(speaker, text))
    }

    /// Append a player-choice block.
    pub fn with_choices(self, options: Vec<ChoiceOption>) -> Self {
        self.with_element(DialogueElement::choices(options))
    }

    pub fn with_command(self, command: impl Into<String>) -> Self {
        self.with_element(DialogueElement::command(command))
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.header_tags.insert(tag.into());
        self
    }

    pub fn with_header_command(mut self, command: impl Into<String>) -> Self {
        self.header_commands.push(command.into());
        self
    }

    /// Set the fallthrough successor.
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next_interaction_id_if_no_choices = Some(next.into());
        self
    }

    /// Replace the whole element sequence.
    pub fn set_elements(&mut self, elements: Vec<DialogueElement>) {
        self.elements = elements;
    }

    /// All dialogue lines in order.
    pub fn dialogue_lines(&self) -> impl Iterator<Item = &DialogueLine> {
        self.elements.iter().filter_map(|element| match element {
            DialogueElement::DialogueLine(line) => Some(line),
            DialogueElement::PlayerChoice { .. } | DialogueElement::Command { .. } => None,
        })
    }

    /// All choice options in order, across every choice block.
    pub fn choice_options(&self) -> impl Iterator<Item = &ChoiceOption> {
        self.elements.iter().flat_map(|element| match element {
            DialogueElement::PlayerChoice { options } => options.as_slice(),
            DialogueElement::DialogueLine(_) | DialogueElement::Command { .. } => &[][..],
        })
    }

    /// Check if the interaction contains a player-choice block.
    pub fn has_choices(&self) -> bool {
        self.elements
            .iter()
            .any(|element| element.kind() == ElementKind::PlayerChoice)
    }

    /// The fallthrough target, if set and non-empty.
    pub fn fallthrough(&self) -> Option<&str> {
        self.next_interaction_id_if_no_choices
            .as_deref()
            .filter(|target| !target.is_empty())
    }

    /// Derive outgoing links: one per targeted choice option, plus the fallthrough.
    pub fn outgoing_links(&self) -> Vec<Link> {
        let mut links: Vec<Link> = self
            .choice_options()
            .enumerate()
            .filter_map(|(index, option)| {
                option.target().map(|target| Link {
                    target: target.to_string(),
                    slot: ChoiceSlot::Choice(index),
                })
            })
            .collect();

        if let Some(next) = self.fallthrough() {
            links.push(Link {
                target: next.to_string(),
                slot: ChoiceSlot::Fallthrough,
            });
        }

        links
    }
}
