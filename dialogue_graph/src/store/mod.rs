//! Interaction Store - CRUD persistence for interactions.
//!
//! Two implementations:
//! - [`MemoryStore`]: a map, for tests and scratch graphs
//! - [`FileStore`]: one JSON file per interaction on disk

mod file;
mod memory;

pub use file::*;
pub use memory::*;

use dialogue_model::Interaction;

use crate::error::Result;

/// Persistence for interactions, keyed by id.
///
/// Implementations return `list_all` sorted by id.
pub trait InteractionStore {
    fn get(&self, id: &str) -> Result<Option<Interaction>>;

    /// Insert or replace the interaction with the same id.
    fn save(&mut self, interaction: &Interaction) -> Result<()>;

    /// Returns whether anything was removed.
    fn delete(&mut self, id: &str) -> Result<bool>;

    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }

    fn list_all(&self) -> Result<Vec<Interaction>>;
}
