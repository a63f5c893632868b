use std::fs;
use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent};

const PAGE_STEP: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickerEntryKind {
    Parent,
    Directory,
    File,
}

#[derive(Clone, Debug)]
pub struct PickerEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: PickerEntryKind,
}

impl PickerEntry {
    pub fn display_name(&self) -> String {
        match self.kind {
            PickerEntryKind::Parent => "..".to_string(),
            PickerEntryKind::Directory => format!("{}/", self.name),
            PickerEntryKind::File => self.name.clone(),
        }
    }
}

pub enum PickerKeyResult {
    Continue,
    Cancel,
    Chosen(PathBuf),
}

/// Modal "open file" browser used when adding a program.
pub struct FilePickerState {
    pub current_dir: PathBuf,
    pub entries: Vec<PickerEntry>,
    pub cursor: usize,
    pub show_hidden: bool,
    pub error: Option<String>,
}

impl FilePickerState {
    pub fn new() -> Self {
        let start = dirs::home_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::at(start)
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let mut picker = Self {
            current_dir: dir.into(),
            entries: Vec::new(),
            cursor: 0,
            show_hidden: false,
            error: None,
        };
        picker.refresh();
        picker
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerKeyResult {
        self.error = None;
        match key.code {
            KeyCode::Esc => PickerKeyResult::Cancel,
            KeyCode::Enter | KeyCode::Right => self.activate(),
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                PickerKeyResult::Continue
            }
            KeyCode::Down => {
                self.move_down(1);
                PickerKeyResult::Continue
            }
            KeyCode::PageUp => {
                self.cursor = self.cursor.saturating_sub(PAGE_STEP);
                PickerKeyResult::Continue
            }
            KeyCode::PageDown => {
                self.move_down(PAGE_STEP);
                PickerKeyResult::Continue
            }
            KeyCode::Home => {
                self.cursor = 0;
                PickerKeyResult::Continue
            }
            KeyCode::End => {
                self.cursor = self.entries.len().saturating_sub(1);
                PickerKeyResult::Continue
            }
            KeyCode::Backspace | KeyCode::Left => {
                self.go_to_parent();
                PickerKeyResult::Continue
            }
            KeyCode::Char('~') => {
                if let Some(home) = dirs::home_dir() {
                    self.change_dir(home);
                }
                PickerKeyResult::Continue
            }
            KeyCode::Char('.') => {
                self.show_hidden = !self.show_hidden;
                self.refresh();
                PickerKeyResult::Continue
            }
            _ => PickerKeyResult::Continue,
        }
    }

    fn move_down(&mut self, step: usize) {
        let last = self.entries.len().saturating_sub(1);
        self.cursor = (self.cursor + step).min(last);
    }

    fn activate(&mut self) -> PickerKeyResult {
        let Some(entry) = self.entries.get(self.cursor).cloned() else {
            return PickerKeyResult::Continue;
        };
        match entry.kind {
            PickerEntryKind::Parent | PickerEntryKind::Directory => {
                self.change_dir(entry.path);
                PickerKeyResult::Continue
            }
            PickerEntryKind::File => PickerKeyResult::Chosen(entry.path),
        }
    }

    fn go_to_parent(&mut self) {
        if let Some(parent) = self.current_dir.parent().map(Path::to_path_buf) {
            self.change_dir(parent);
        }
    }

    /// Enters `dir`; an unreadable directory leaves the current listing intact.
    fn change_dir(&mut self, dir: PathBuf) {
        match read_entries(&dir, self.show_hidden) {
            Ok(entries) => {
                self.current_dir = dir;
                self.entries = entries;
                self.cursor = 0;
            }
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "picker cannot list directory");
                self.error = Some(format!("Cannot open {}: {err}", dir.display()));
            }
        }
    }

    fn refresh(&mut self) {
        match read_entries(&self.current_dir, self.show_hidden) {
            Ok(entries) => self.entries = entries,
            Err(err) => {
                self.entries = parent_entry(&self.current_dir).into_iter().collect();
                self.error = Some(format!("Cannot open {}: {err}", self.current_dir.display()));
            }
        }
        self.cursor = self.cursor.min(self.entries.len().saturating_sub(1));
    }
}

fn parent_entry(dir: &Path) -> Option<PickerEntry> {
    dir.parent().map(|parent| PickerEntry {
        name: "..".to_string(),
        path: parent.to_path_buf(),
        kind: PickerEntryKind::Parent,
    })
}

fn read_entries(dir: &Path, show_hidden: bool) -> std::io::Result<Vec<PickerEntry>> {
    let mut directories = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !show_hidden && name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        // Follows symlinks so a link to a directory can be browsed into.
        if path.is_dir() {
            directories.push(PickerEntry {
                name,
                path,
                kind: PickerEntryKind::Directory,
            });
        } else {
            files.push(PickerEntry {
                name,
                path,
                kind: PickerEntryKind::File,
            });
        }
    }
    directories.sort_by_key(|entry| entry.name.to_lowercase());
    files.sort_by_key(|entry| entry.name.to_lowercase());

    let mut entries: Vec<PickerEntry> = parent_entry(dir).into_iter().collect();
    entries.extend(directories);
    entries.extend(files);
    Ok(entries)
}
