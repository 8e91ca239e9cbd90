//! In-memory interaction store.

use dialogue_model::Interaction;
use std::collections::HashMap;

use super::InteractionStore;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    interactions: HashMap<String, Interaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

impl InteractionStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Interaction>> {
        Ok(self.interactions.get(id).cloned())
    }

    fn save(&mut self, interaction: &Interaction) -> Result<()> {
        self.interactions
            .insert(interaction.id.clone(), interaction.clone());
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        Ok(self.interactions.remove(id).is_some())
    }

    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.interactions.contains_key(id))
    }

    fn list_all(&self) -> Result<Vec<Interaction>> {
        let mut all: Vec<Interaction> = self.interactions.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}
