//! File-backed interaction store: one pretty-printed JSON file per interaction.
//!
//! Files are named `{slug(title)}_{id}.json`, or `{id}.json` for untitled
//! interactions. Renaming an interaction's title removes the file written
//! under the old slug. There is no locking; one writer per directory.

use dialogue_model::Interaction;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs;
use std::path::{Path, PathBuf};

use super::InteractionStore;
use crate::error::Result;

/// Longest slug kept in a file name.
const MAX_SLUG_LEN: usize = 40;

/// Characters escaped when an id is used in a file name.
const ID_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// Lowercase the title and collapse every run of other characters into `_`.
pub fn slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('_').to_string()
}

fn encode_id(id: &str) -> String {
    utf8_percent_encode(id, ID_ESCAPES).to_string()
}

/// File name for an interaction.
pub fn file_name(interaction: &Interaction) -> String {
    let id = encode_id(&interaction.id);
    let slug = slug(&interaction.title);
    if slug.is_empty() {
        format!("{}.json", id)
    } else {
        format!("{}_{}.json", slug, id)
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (or create) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(path: &Path) -> Result<Interaction> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Paths whose name could hold `id`: `{id}.json` or `*_{id}.json`.
    fn candidates(&self, id: &str) -> Result<Vec<PathBuf>> {
        let encoded = encode_id(id);
        let exact = format!("{}.json", encoded);
        let suffix = format!("_{}.json", encoded);

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name == exact || name.ends_with(&suffix) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Candidate files that really hold `id`. Unreadable candidates are skipped.
    fn files_for(&self, id: &str) -> Result<Vec<(PathBuf, Interaction)>> {
        let mut found = Vec::new();
        for path in self.candidates(id)? {
            match Self::read(&path) {
                Ok(interaction) if interaction.id == id => found.push((path, interaction)),
                Ok(_) => {}
                Err(err) => log::warn!("skipping unreadable file {}: {}", path.display(), err),
            }
        }
        Ok(found)
    }
}

impl InteractionStore for FileStore {
    fn get(&self, id: &str) -> Result<Option<Interaction>> {
        Ok(self
            .files_for(id)?
            .into_iter()
            .next()
            .map(|(_, interaction)| interaction))
    }

    fn save(&mut self, interaction: &Interaction) -> Result<()> {
        let path = self.dir.join(file_name(interaction));
        let stale = self.files_for(&interaction.id)?;

        // The previous file stays until the new one is on disk.
        let content = serde_json::to_string_pretty(interaction)?;
        fs::write(&path, content)?;
        log::debug!("saved interaction {} to {}", interaction.id, path.display());

        for (old, _) in stale {
            if old != path {
                log::debug!("removing stale file {}", old.display());
                fs::remove_file(&old)?;
            }
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let files = self.files_for(id)?;
        let removed = !files.is_empty();
        for (path, _) in files {
            fs::remove_file(&path)?;
        }
        Ok(removed)
    }

    fn list_all(&self) -> Result<Vec<Interaction>> {
        let mut all = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(interaction) => all.push(interaction),
                Err(err) => log::warn!("skipping unreadable file {}: {}", path.display(), err),
            }
        }
        all.sort_by(|a: &Interaction, b: &Interaction| a.id.cmp(&b.id));
        Ok(all)
    }
}
