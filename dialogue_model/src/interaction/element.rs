//! Dialogue elements - the ordered content of an interaction.

use serde::{Deserialize, Serialize};

/// A single spoken line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DialogueLine {
    #[serde(default)]
    pub speaker: Option<String>,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Commands run before the line is shown.
    #[serde(default)]
    pub pre_line_commands: Vec<String>,
    /// Commands run after the line is shown.
    #[serde(default)]
    pub post_line_commands: Vec<String>,
}

impl DialogueLine {
    /// Create a line with an optional speaker.
    pub fn new(speaker: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.map(str::to_string),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_pre_command(mut self, command: impl Into<String>) -> Self {
        self.pre_line_commands.push(command.into());
        self
    }

    pub fn with_post_command(mut self, command: impl Into<String>) -> Self {
        self.post_line_commands.push(command.into());
        self
    }
}

/// A player-selectable branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChoiceOption {
    pub text: String,
    /// Target interaction. Absent or empty means the option ends the dialogue.
    #[serde(default)]
    pub next_interaction_id: Option<String>,
    /// Guard expression evaluated by the engine.
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ChoiceOption {
    /// Create a choice option pointing at `target`.
    pub fn new(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            next_interaction_id: Some(target.into()),
            ..Self::default()
        }
    }

    /// Create a choice option with no successor.
    pub fn dead_end(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// The target id, if it is set and non-empty.
    pub fn target(&self) -> Option<&str> {
        self.next_interaction_id
            .as_deref()
            .filter(|target| !target.is_empty())
    }

    /// Check if choosing this option ends the dialogue.
    pub fn is_dead_end(&self) -> bool {
        self.target().is_none()
    }
}

/// Kinds of dialogue elements, used where only the shape matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    DialogueLine,
    PlayerChoice,
    Command,
}

impl ElementKind {
    /// The discriminator written into serialized elements.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::DialogueLine => "dialogue_line",
            ElementKind::PlayerChoice => "player_choice",
            ElementKind::Command => "command",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of an interaction, discriminated by `type` when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueElement {
    DialogueLine(DialogueLine),
    PlayerChoice { options: Vec<ChoiceOption> },
    Command { command: String },
}

impl DialogueElement {
    pub fn line(speaker: Option<&str>, text: impl Into<String>) -> Self {
        DialogueElement::DialogueLine(DialogueLine::new(speaker, text))
    }

    pub fn choices(options: Vec<ChoiceOption>) -> Self {
        DialogueElement::PlayerChoice { options }
    }

    pub fn command(command: impl Into<String>) -> Self {
        DialogueElement::Command {
            command: command.into(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            DialogueElement::DialogueLine(_) => ElementKind::DialogueLine,
            DialogueElement::PlayerChoice { .. } => ElementKind::PlayerChoice,
            DialogueElement::Command { .. } => ElementKind::Command,
        }
    }
}

impl From<DialogueLine> for DialogueElement {
    fn from(line: DialogueLine) -> Self {
        DialogueElement::DialogueLine(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_target_filters_empty() {
        let empty = ChoiceOption {
            text: "Leave".to_string(),
            next_interaction_id: Some(String::new()),
            ..ChoiceOption::default()
        };
        assert!(empty.is_dead_end());
        assert!(empty.target().is_none());

        let linked = ChoiceOption::new("Stay", "TAVERN");
        assert_eq!(linked.target(), Some("TAVERN"));
        assert!(!linked.is_dead_end());
    }

    #[test]
    fn test_element_serializes_with_type_tag() {
        let element = DialogueElement::line(Some("Guard"), "Halt!");
        let json = serde_json::to_value(&element).unwrap();

        assert_eq!(json["type"], "dialogue_line");
        assert_eq!(json["speaker"], "Guard");
        assert_eq!(json["text"], "Halt!");

        let command = serde_json::to_value(DialogueElement::command("play_sfx gate")).unwrap();
        assert_eq!(command["type"], "command");
        assert_eq!(command["command"], "play_sfx gate");
    }

    #[test]
    fn test_element_deserializes_with_defaults() {
        let json = r#"{"type": "player_choice", "options": [{"text": "Run"}]}"#;
        let element: DialogueElement = serde_json::from_str(json).unwrap();

        match element {
            DialogueElement::PlayerChoice { options } => {
                assert_eq!(options.len(), 1);
                assert!(options[0].is_dead_end());
                assert!(options[0].actions.is_empty());
            }
            other => panic!("unexpected element {:?}", other),
        }
    }

    #[test]
    fn test_element_kind() {
        assert_eq!(DialogueElement::line(None, "Hi").kind(), ElementKind::DialogueLine);
        assert_eq!(DialogueElement::choices(vec![]).kind(), ElementKind::PlayerChoice);
        assert_eq!(DialogueElement::command("x").kind().to_string(), "command");
    }
}
