//! Interaction Index Service - a store wrapper that tracks who links to whom.
//!
//! The index maps each target id to the interactions that link to it, so
//! "who points at X" is a single lookup. It is rebuilt from the store on
//! construction and kept current by [`InteractionService::save`] and
//! [`InteractionService::delete`].

mod ids;

pub use ids::*;

use dialogue_model::{ChoiceSlot, Interaction, Link};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::codec::json::{self, NodeSchema};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::node::{edges_from_nodes, Node};
use crate::store::InteractionStore;
use crate::validation::ValidationResult;

/// An inbound edge: `parent_id` reaches the indexed interaction via `slot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub parent_id: String,
    pub slot: ChoiceSlot,
}

impl ParentLink {
    /// Choice position, or -1 for a fallthrough link.
    pub fn choice_index(&self) -> i64 {
        self.slot.index()
    }
}

/// Prefix for ids assigned by [`InteractionService::create`] when none is given.
const CREATE_PREFIX: &str = "NODE";

/// Store access plus the parent/child index.
pub struct InteractionService<S: InteractionStore> {
    store: S,
    config: EngineConfig,

    /// Index: target id -> inbound links, in insertion order.
    parents: HashMap<String, Vec<ParentLink>>,
}

impl<S: InteractionStore> InteractionService<S> {
    /// Wrap a store with default settings and build the index.
    pub fn new(store: S) -> Result<Self> {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Result<Self> {
        let mut service = Self {
            store,
            config,
            parents: HashMap::new(),
        };
        service.rebuild_index()?;
        Ok(service)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Recompute the whole index from the store.
    pub fn rebuild_index(&mut self) -> Result<()> {
        self.parents.clear();
        let all = self.store.list_all()?;
        for interaction in &all {
            self.index_links(interaction);
        }
        log::debug!(
            "index rebuilt: {} interactions, {} linked targets",
            all.len(),
            self.parents.len()
        );
        Ok(())
    }

    fn index_links(&mut self, interaction: &Interaction) {
        for Link { target, slot } in interaction.outgoing_links() {
            self.parents.entry(target).or_default().push(ParentLink {
                parent_id: interaction.id.clone(),
                slot,
            });
        }
    }

    /// Drop every edge whose source is `id`, and any keys left empty.
    fn unindex_source(&mut self, id: &str) {
        self.parents.retain(|_, links| {
            links.retain(|link| link.parent_id != id);
            !links.is_empty()
        });
    }

    pub fn get(&self, id: &str) -> Result<Option<Interaction>> {
        self.store.get(id)
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        self.store.exists(id)
    }

    pub fn list_all(&self) -> Result<Vec<Interaction>> {
        self.store.list_all()
    }

    /// Persist an interaction and re-derive its outgoing edges.
    pub fn save(&mut self, interaction: &Interaction) -> Result<()> {
        self.store.save(interaction)?;
        self.unindex_source(&interaction.id);
        self.index_links(interaction);
        Ok(())
    }

    /// Save an interaction, assigning a fresh id when it has none. Returns the id.
    ///
    /// Without a prefix the id is `NODE_<uuid>`, so it passes the export id
    /// pattern. A prefix that does not start with a letter will not.
    pub fn create(&mut self, mut interaction: Interaction, prefix: Option<&str>) -> Result<String> {
        if interaction.id.is_empty() {
            interaction.id = self.generate_id(Some(prefix.unwrap_or(CREATE_PREFIX)), false);
        }
        self.save(&interaction)?;
        Ok(interaction.id)
    }

    /// Delete an interaction and purge it from the index in both directions.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self.store.delete(id)?;
        self.parents.remove(id);
        self.unindex_source(id);
        Ok(removed)
    }

    pub fn generate_id(&self, prefix: Option<&str>, readable: bool) -> String {
        generate_id(prefix, readable, self.config.ids.max_prefix_len)
    }

    /// Inbound links of `id`, in the order they were recorded.
    pub fn get_parents(&self, id: &str) -> Vec<ParentLink> {
        self.parents.get(id).cloned().unwrap_or_default()
    }

    /// Outgoing links of `id`, derived from its stored content.
    pub fn get_children(&self, id: &str) -> Result<Vec<Link>> {
        Ok(self
            .store
            .get(id)?
            .map(|interaction| interaction.outgoing_links())
            .unwrap_or_default())
    }

    /// Text of the first choice in `parent_id` that leads to `child_id`.
    pub fn get_choice_text_for_transition(
        &self,
        parent_id: &str,
        child_id: &str,
    ) -> Result<Option<String>> {
        let Some(parent) = self.store.get(parent_id)? else {
            return Ok(None);
        };
        let text = parent
            .choice_options()
            .find(|option| option.target() == Some(child_id))
            .map(|option| option.text.clone());
        Ok(text)
    }

    /// Walk back from `id` through first parents, oldest interaction first.
    ///
    /// With several parents the first recorded one is taken; which one that is
    /// depends on save order, so the path is one plausible history, not the
    /// only one. The walk stops at a root, after `max_depth` steps, on a repeat,
    /// or when a parent is missing from the store.
    pub fn get_dialogue_path(&self, id: &str, max_depth: usize) -> Result<Vec<Interaction>> {
        let Some(current) = self.store.get(id)? else {
            return Ok(Vec::new());
        };

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(current.id.clone());
        let mut current_id = current.id.clone();
        let mut path = vec![current];

        for _ in 0..max_depth {
            let parents = self.get_parents(&current_id);
            let Some(first) = parents.first() else {
                break;
            };
            if parents.len() > 1 {
                log::debug!(
                    "{} has {} parents, following {}",
                    current_id,
                    parents.len(),
                    first.parent_id
                );
            }
            if !visited.insert(first.parent_id.clone()) {
                log::debug!("path from {} loops back to {}", id, first.parent_id);
                break;
            }
            let Some(parent) = self.store.get(&first.parent_id)? else {
                log::warn!(
                    "path from {} stops: parent {} is missing from the store",
                    id,
                    first.parent_id
                );
                break;
            };
            current_id = parent.id.clone();
            path.push(parent);
        }

        path.reverse();
        Ok(path)
    }

    /// [`Self::get_dialogue_path`] with the configured depth.
    pub fn dialogue_path(&self, id: &str) -> Result<Vec<Interaction>> {
        self.get_dialogue_path(id, self.config.paths.max_depth)
    }

    /// Flatten every stored interaction into engine nodes.
    pub fn to_nodes(&self) -> Result<Vec<Node>> {
        json::to_nodes(&self.store.list_all()?)
    }

    /// Validate the stored graph the way an export would.
    pub fn validate(&self) -> Result<ValidationResult> {
        let nodes = self.to_nodes()?;
        let schema = NodeSchema::from_config(&self.config.export);
        Ok(json::validate_nodes_with(&nodes, &schema))
    }

    /// Write the stored graph as engine JSON. Refuses when validation has errors.
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<usize> {
        let nodes = self.to_nodes()?;
        let schema = NodeSchema::from_config(&self.config.export);
        json::to_file_with(path.as_ref(), &nodes, self.config.export.normalize, &schema)?;
        log::info!(
            "exported {} nodes ({} edges) to {}",
            nodes.len(),
            edges_from_nodes(&nodes).len(),
            path.as_ref().display()
        );
        Ok(nodes.len())
    }
}
