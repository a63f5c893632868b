use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

use crate::launcher::{self, LaunchError};

/// Program label → launch path, in insertion order.
pub type Programs = IndexMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// On-disk shape of one category. Older files stored a bare list of labels.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredCategory {
    Programs(Programs),
    Legacy(Vec<String>),
}

impl From<StoredCategory> for Programs {
    fn from(stored: StoredCategory) -> Self {
        match stored {
            StoredCategory::Programs(programs) => programs,
            StoredCategory::Legacy(labels) => labels
                .into_iter()
                .map(|label| (label.clone(), label))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct StoreFile {
    categories: IndexMap<String, StoredCategory>,
}

#[derive(Serialize)]
#[serde(transparent)]
struct StoreFileRef<'a> {
    categories: &'a IndexMap<String, Programs>,
}

/// Category → programs mapping mirrored to a single JSON file.
///
/// Every mutating call rewrites the file, even when the call turned out to be
/// a no-op. Mutators return `Ok(true)` only when the mapping changed.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    categories: IndexMap<String, Programs>,
}

impl Store {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let categories = if path.exists() {
            let data = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            let parsed: StoreFile =
                serde_json::from_str(&data).map_err(|source| StoreError::Parse {
                    path: path.clone(),
                    source,
                })?;
            parsed
                .categories
                .into_iter()
                .map(|(name, stored)| (name, Programs::from(stored)))
                .collect()
        } else {
            IndexMap::new()
        };
        tracing::info!(path = %path.display(), categories = categories.len(), "store loaded");
        Ok(Self { path, categories })
    }

    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }
        let mut data = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut data, formatter);
        StoreFileRef {
            categories: &self.categories,
        }
        .serialize(&mut serializer)?;
        data.push(b'\n');
        fs::write(&self.path, data).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "store saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn contains_category(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    pub fn programs(&self, category: &str) -> Option<&Programs> {
        self.categories.get(category)
    }

    pub fn program_path(&self, category: &str, label: &str) -> Option<&str> {
        self.categories
            .get(category)?
            .get(label)
            .map(String::as_str)
    }

    pub fn add_category(&mut self, name: &str) -> Result<bool, StoreError> {
        let changed = !self.categories.contains_key(name);
        if changed {
            self.categories.insert(name.to_string(), Programs::new());
            tracing::info!(category = name, "category added");
        }
        self.save()?;
        Ok(changed)
    }

    pub fn remove_category(&mut self, name: &str) -> Result<bool, StoreError> {
        let changed = self.categories.shift_remove(name).is_some();
        if changed {
            tracing::info!(category = name, "category removed");
        }
        self.save()?;
        Ok(changed)
    }

    /// Moves every program of `old` under `new`. Rejected when `new` is already
    /// taken, which includes renaming a category to itself.
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<bool, StoreError> {
        let mut changed = false;
        if !self.categories.contains_key(new) {
            if let Some(programs) = self.categories.shift_remove(old) {
                self.categories.insert(new.to_string(), programs);
                tracing::info!(from = old, to = new, "category renamed");
                changed = true;
            }
        }
        self.save()?;
        Ok(changed)
    }

    /// Files `path` under its final filename component. A later add resolving
    /// to the same label replaces the earlier path.
    ///
    /// The file holds JSON strings, so a path that is not valid UTF-8 is
    /// rejected before anything is touched.
    pub fn add_program(&mut self, category: &str, path: &Path) -> Result<bool, StoreError> {
        let Some(full_path) = path.to_str() else {
            tracing::warn!(path = %path.display(), "refusing non UTF-8 program path");
            return Err(StoreError::NonUtf8Path(path.to_path_buf()));
        };
        let mut changed = false;
        if let Some(programs) = self.categories.get_mut(category) {
            let label = program_label(path);
            tracing::info!(category, label = %label, path = full_path, "program added");
            programs.insert(label, full_path.to_string());
            changed = true;
        }
        self.save()?;
        Ok(changed)
    }

    pub fn remove_program(&mut self, category: &str, label: &str) -> Result<bool, StoreError> {
        let mut changed = false;
        if let Some(programs) = self.categories.get_mut(category) {
            if programs.shift_remove(label).is_some() {
                tracing::info!(category, label, "program removed");
                changed = true;
            }
        }
        self.save()?;
        Ok(changed)
    }

    pub fn rename_program(
        &mut self,
        category: &str,
        old_label: &str,
        new_label: &str,
    ) -> Result<bool, StoreError> {
        let mut changed = false;
        if let Some(programs) = self.categories.get_mut(category) {
            if let Some(path) = programs.shift_remove(old_label) {
                programs.insert(new_label.to_string(), path);
                tracing::info!(category, from = old_label, to = new_label, "program renamed");
                changed = true;
            }
        }
        self.save()?;
        Ok(changed)
    }

    pub fn open_program(&self, category: &str, label: &str) -> Result<(), LaunchError> {
        let path = self
            .program_path(category, label)
            .ok_or_else(|| LaunchError::UnknownProgram {
                category: category.to_string(),
                label: label.to_string(),
            })?;
        launcher::launch(Path::new(path))
    }
}

fn program_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
