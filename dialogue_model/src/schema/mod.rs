//! Element schemas - fixed-shape type descriptions for generated interactions.
//!
//! A generator asked for "a line, then a line, then a choice block" gets back a
//! JSON-schema description whose `elements` array has exactly those kinds in
//! that order. Built schemas are cached in a [`SchemaRegistry`] owned by the
//! caller.

use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::interaction::ElementKind;

/// Builds a composite schema from an ordered list of element kinds.
#[derive(Debug, Clone, Default)]
pub struct ElementSchemaBuilder {
    kinds: Vec<ElementKind>,
    max_choices: Option<usize>,
}

impl ElementSchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a required element kind.
    pub fn element(mut self, kind: ElementKind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn elements(mut self, kinds: impl IntoIterator<Item = ElementKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Cap the number of options in each choice block.
    pub fn max_choices(mut self, max: usize) -> Self {
        self.max_choices = Some(max);
        self
    }

    pub fn kinds(&self) -> &[ElementKind] {
        &self.kinds
    }

    /// Produce the interaction schema.
    pub fn build(&self) -> Value {
        let items: Vec<Value> = self
            .kinds
            .iter()
            .map(|kind| self.element_schema(*kind))
            .collect();
        let count = items.len();

        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "elements": {
                    "type": "array",
                    "prefixItems": items,
                    "items": false,
                    "minItems": count,
                    "maxItems": count,
                },
            },
            "required": ["elements"],
            "additionalProperties": false,
        })
    }

    fn element_schema(&self, kind: ElementKind) -> Value {
        let mut properties = Map::new();
        properties.insert("type".to_string(), json!({ "const": kind.as_str() }));

        let required = match kind {
            ElementKind::DialogueLine => {
                properties.insert("speaker".to_string(), json!({ "type": "string" }));
                properties.insert("text".to_string(), json!({ "type": "string" }));
                vec!["type", "speaker", "text"]
            }
            ElementKind::PlayerChoice => {
                let mut options = json!({
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "text": { "type": "string" },
                            "next_interaction_id": { "type": "string" },
                        },
                        "required": ["text"],
                        "additionalProperties": false,
                    },
                });
                if let Some(max) = self.max_choices {
                    options["maxItems"] = json!(max);
                }
                properties.insert("options".to_string(), options);
                vec!["type", "options"]
            }
            ElementKind::Command => {
                properties.insert("command".to_string(), json!({ "type": "string" }));
                vec!["type", "command"]
            }
        };

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// Cache of built schemas, keyed by element-kind sequence.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    max_choices: Option<usize>,
    cache: HashMap<Vec<ElementKind>, Value>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose choice blocks are capped at `max` options.
    pub fn with_max_choices(max: usize) -> Self {
        Self {
            max_choices: Some(max),
            cache: HashMap::new(),
        }
    }

    /// Get the schema for a kind sequence, building it on first use.
    pub fn schema_for(&mut self, kinds: &[ElementKind]) -> &Value {
        let max_choices = self.max_choices;
        self.cache.entry(kinds.to_vec()).or_insert_with(|| {
            let mut builder = ElementSchemaBuilder::new().elements(kinds.iter().copied());
            if let Some(max) = max_choices {
                builder = builder.max_choices(max);
            }
            builder.build()
        })
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
