use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::prelude::Rect;

use crate::picker::{FilePickerState, PickerKeyResult};
use crate::store::{Store, StoreError};
use crate::ui::{self, FooterAction, ScreenLayout, Theme};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    CategoryList,
    CategoryInput,
    ProgramList,
    ProgramInput,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::CategoryList => Focus::CategoryInput,
            Focus::CategoryInput => Focus::ProgramList,
            Focus::ProgramList => Focus::ProgramInput,
            Focus::ProgramInput => Focus::CategoryList,
        }
    }

    fn previous(self) -> Self {
        match self {
            Focus::CategoryList => Focus::ProgramInput,
            Focus::CategoryInput => Focus::CategoryList,
            Focus::ProgramList => Focus::CategoryInput,
            Focus::ProgramInput => Focus::ProgramList,
        }
    }
}

pub enum PopupState {
    Message { title: String, text: String },
    FilePicker(FilePickerState),
}

enum PopupResult {
    None,
    Close,
    Picked(Option<PathBuf>),
}

/// Controller behind the two-pane screen.
///
/// `category_cursor` / `program_cursor` mark the active row of each list and
/// drive every button. `displayed_category` only changes when a category is
/// selected or a program operation refreshes the pane, so the program list can
/// lag behind the active category.
pub struct AppState {
    pub store: Store,
    pub category_items: Vec<String>,
    pub program_items: Vec<String>,
    pub category_cursor: usize,
    pub program_cursor: usize,
    pub displayed_category: Option<String>,
    pub category_input: String,
    pub program_input: String,
    pub focus: Focus,
    pub active_popup: Option<PopupState>,
    pub status_message: Option<String>,
    pub should_quit: bool,
    pub theme: Theme,
    pub title: String,
    /// Category the open file picker will add to.
    picker_target: Option<String>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        let mut app = AppState {
            store,
            category_items: Vec::new(),
            program_items: Vec::new(),
            category_cursor: 0,
            program_cursor: 0,
            displayed_category: None,
            category_input: String::new(),
            program_input: String::new(),
            focus: Focus::CategoryList,
            active_popup: None,
            status_message: None,
            should_quit: false,
            theme: Theme::nord(),
            title: "App Organizer".into(),
            picker_target: None,
        };
        app.update_category_list();
        app
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.category_items
            .get(self.category_cursor)
            .map(String::as_str)
    }

    pub fn selected_program(&self) -> Option<&str> {
        self.program_items
            .get(self.program_cursor)
            .map(String::as_str)
    }

    fn update_category_list(&mut self) {
        self.category_items = self.store.categories().map(str::to_string).collect();
        self.category_cursor = clamp_cursor(self.category_cursor, self.category_items.len());
    }

    fn update_program_list(&mut self, category: &str) {
        self.program_items = self
            .store
            .programs(category)
            .map(|programs| programs.keys().cloned().collect())
            .unwrap_or_default();
        self.program_cursor = clamp_cursor(self.program_cursor, self.program_items.len());
        self.displayed_category = Some(category.to_string());
    }

    fn clear_program_list(&mut self) {
        self.program_items.clear();
        self.program_cursor = 0;
        self.displayed_category = None;
    }

    /// Reports a store call in the status line. A no-op leaves the previous
    /// message alone.
    fn persist(&mut self, result: Result<bool, StoreError>, success: String) {
        match result {
            Ok(true) => self.set_status(Some(success)),
            Ok(false) => {}
            Err(StoreError::NonUtf8Path(path)) => {
                self.set_status(Some(format!(
                    "Cannot add {}: path is not valid UTF-8",
                    path.display()
                )));
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to persist store");
                self.set_status(Some(format!("Save failed: {err}")));
            }
        }
    }

    pub fn set_status(&mut self, message: Option<String>) {
        self.status_message = message;
    }

    pub fn status_text(&self) -> String {
        let mut text = format!(
            "{} categories | {}",
            self.category_items.len(),
            self.store.path().display()
        );
        if let Some(msg) = &self.status_message {
            text.push_str(" | ");
            text.push_str(msg);
        }
        text
    }

    /// Shows the programs of the active category.
    pub fn select_category(&mut self) {
        if let Some(category) = self.selected_category().map(str::to_string) {
            tracing::debug!(category = %category, "category selected");
            self.update_program_list(&category);
        }
    }

    pub fn add_category(&mut self) {
        let name = self.category_input.clone();
        if name.is_empty() {
            return;
        }
        let result = self.store.add_category(&name);
        self.update_category_list();
        self.persist(result, format!("Category '{name}' added"));
    }

    pub fn remove_category(&mut self) {
        let Some(category) = self.selected_category().map(str::to_string) else {
            return;
        };
        let result = self.store.remove_category(&category);
        self.update_category_list();
        self.clear_program_list();
        self.persist(result, format!("Category '{category}' removed"));
    }

    /// Leaves the program pane untouched; it keeps showing the old contents
    /// until a category is selected again.
    pub fn rename_category(&mut self) {
        let Some(category) = self.selected_category().map(str::to_string) else {
            return;
        };
        let new_name = self.category_input.clone();
        if category.is_empty() || new_name.is_empty() {
            return;
        }
        let result = self.store.rename_category(&category, &new_name);
        self.update_category_list();
        self.persist(result, format!("Category '{category}' renamed"));
    }

    pub fn queue_add_program(&mut self) {
        let Some(category) = self.selected_category().map(str::to_string) else {
            return;
        };
        if category.is_empty() || !self.store.contains_category(&category) {
            return;
        }
        self.picker_target = Some(category);
        self.active_popup = Some(PopupState::FilePicker(FilePickerState::new()));
    }

    /// Completes an add started by [`AppState::queue_add_program`].
    pub fn apply_picked_path(&mut self, path: Option<&Path>) {
        self.active_popup = None;
        let Some(category) = self.picker_target.take() else {
            return;
        };
        let Some(path) = path else {
            self.set_status(Some("Add program cancelled".into()));
            return;
        };
        let result = self.store.add_program(&category, path);
        self.update_program_list(&category);
        self.persist(result, format!("Added {}", path.display()));
    }

    pub fn remove_program(&mut self) {
        let (Some(category), Some(program)) = (
            self.selected_category().map(str::to_string),
            self.selected_program().map(str::to_string),
        ) else {
            return;
        };
        let result = self.store.remove_program(&category, &program);
        self.update_program_list(&category);
        self.persist(result, format!("Program '{program}' removed"));
    }

    pub fn rename_program(&mut self) {
        let (Some(category), Some(program)) = (
            self.selected_category().map(str::to_string),
            self.selected_program().map(str::to_string),
        ) else {
            return;
        };
        let new_label = self.program_input.clone();
        if category.is_empty() || program.is_empty() || new_label.is_empty() {
            return;
        }
        let result = self.store.rename_program(&category, &program, &new_label);
        self.update_program_list(&category);
        self.persist(result, format!("Program '{program}' renamed"));
    }

    /// Launch failures end up in an error popup; they never leave this call.
    pub fn open_program(&mut self) {
        let (Some(category), Some(program)) = (
            self.selected_category().map(str::to_string),
            self.selected_program().map(str::to_string),
        ) else {
            return;
        };
        if category.is_empty() || program.is_empty() {
            return;
        }
        match self.store.open_program(&category, &program) {
            Ok(()) => self.set_status(Some(format!("Started {program}"))),
            Err(err) => {
                self.active_popup = Some(PopupState::Message {
                    title: "Error".into(),
                    text: format!("Could not open the program: {err}"),
                });
            }
        }
    }

    pub fn execute_footer_action(&mut self, action: FooterAction) {
        match action {
            FooterAction::Quit => self.should_quit = true,
            FooterAction::AddCategory => self.add_category(),
            FooterAction::RemoveCategory => self.remove_category(),
            FooterAction::RenameCategory => self.rename_category(),
            FooterAction::AddProgram => self.queue_add_program(),
            FooterAction::RemoveProgram => self.remove_program(),
            FooterAction::RenameProgram => self.rename_program(),
            FooterAction::OpenProgram => self.open_program(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(popup) = self.active_popup.as_mut() {
            let result = match popup {
                PopupState::Message { .. } => match key.code {
                    KeyCode::Esc | KeyCode::Enter => PopupResult::Close,
                    _ => PopupResult::None,
                },
                PopupState::FilePicker(picker) => match picker.handle_key(key) {
                    PickerKeyResult::Continue => PopupResult::None,
                    PickerKeyResult::Cancel => PopupResult::Picked(None),
                    PickerKeyResult::Chosen(path) => PopupResult::Picked(Some(path)),
                },
            };
            match result {
                PopupResult::None => {}
                PopupResult::Close => self.active_popup = None,
                PopupResult::Picked(path) => self.apply_picked_path(path.as_deref()),
            }
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.previous();
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::CategoryInput | Focus::ProgramInput => self.handle_input_key(key),
            Focus::CategoryList | Focus::ProgramList => self.handle_list_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let is_category = self.focus == Focus::CategoryInput;
        match key.code {
            KeyCode::Esc => {
                self.focus = if is_category {
                    Focus::CategoryList
                } else {
                    Focus::ProgramList
                };
            }
            KeyCode::Enter => {
                if is_category {
                    self.add_category();
                } else {
                    self.rename_program();
                }
            }
            KeyCode::Backspace => {
                self.active_input_mut().pop();
            }
            KeyCode::Delete => self.active_input_mut().clear(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.active_input_mut().push(c);
            }
            _ => {}
        }
    }

    fn active_input_mut(&mut self) -> &mut String {
        if self.focus == Focus::CategoryInput {
            &mut self.category_input
        } else {
            &mut self.program_input
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let on_categories = self.focus == Focus::CategoryList;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(on_categories, -1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(on_categories, 1),
            KeyCode::Home => self.set_cursor(on_categories, 0),
            KeyCode::End => self.set_cursor(on_categories, usize::MAX),
            KeyCode::Left => self.focus = Focus::CategoryList,
            KeyCode::Right => self.focus = Focus::ProgramList,
            KeyCode::Enter | KeyCode::Char(' ') => {
                if on_categories {
                    self.select_category();
                } else {
                    self.open_program();
                }
            }
            KeyCode::Char(c) => {
                if let Some(action) = ui::footer_action_for_key(c) {
                    self.execute_footer_action(action);
                }
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, on_categories: bool, delta: isize) {
        let (cursor, len) = if on_categories {
            (self.category_cursor, self.category_items.len())
        } else {
            (self.program_cursor, self.program_items.len())
        };
        if len == 0 {
            return;
        }
        let next = if delta < 0 {
            cursor.saturating_sub(delta.unsigned_abs())
        } else {
            cursor.saturating_add(delta.unsigned_abs())
        };
        self.set_cursor(on_categories, next);
    }

    fn set_cursor(&mut self, on_categories: bool, index: usize) {
        if on_categories {
            self.category_cursor = clamp_cursor(index, self.category_items.len());
        } else {
            self.program_cursor = clamp_cursor(index, self.program_items.len());
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, terminal_area: Rect) {
        if self.active_popup.is_some() {
            return;
        }
        if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }
        let layout = ScreenLayout::compute(terminal_area);
        let (column, row) = (mouse.column, mouse.row);

        if contains(layout.footer, column, row) {
            if let Some(action) = ui::footer_action_at(&self.theme, column, layout.footer) {
                self.execute_footer_action(action);
            }
            return;
        }
        if contains(layout.category_input, column, row) {
            self.focus = Focus::CategoryInput;
            return;
        }
        if contains(layout.program_input, column, row) {
            self.focus = Focus::ProgramInput;
            return;
        }
        if let Some(index) = list_row_at(
            layout.category_list,
            self.category_cursor,
            self.category_items.len(),
            column,
            row,
        ) {
            self.focus = Focus::CategoryList;
            self.category_cursor = index;
            self.select_category();
            return;
        }
        if let Some(index) = list_row_at(
            layout.program_list,
            self.program_cursor,
            self.program_items.len(),
            column,
            row,
        ) {
            self.focus = Focus::ProgramList;
            self.program_cursor = index;
        }
    }
}

fn clamp_cursor(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x + area.width
        && row >= area.y
        && row < area.y + area.height
}

/// Maps a click inside a bordered list to the row index it landed on.
fn list_row_at(area: Rect, cursor: usize, len: usize, column: u16, row: u16) -> Option<usize> {
    let inner = ui::list_inner(area);
    if !contains(inner, column, row) {
        return None;
    }
    let offset = ui::list_offset(cursor, inner.height as usize);
    let index = offset + usize::from(row - inner.y);
    (index < len).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn app_with(dir: &TempDir, json: &str) -> AppState {
        let path = dir.path().join("apps.json");
        fs::write(&path, json).unwrap();
        AppState::new(Store::load(path).unwrap())
    }

    fn press(app: &mut AppState, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut AppState, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_selecting_category_shows_its_programs() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(
            &dir,
            r#"{"Games": {"chess": "/bin/chess"}, "Work": {"vim": "/usr/bin/vim"}}"#,
        );
        assert_eq!(app.category_items, vec!["Games", "Work"]);
        assert!(app.program_items.is_empty());

        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected_category(), Some("Work"));
        assert!(app.program_items.is_empty());

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.program_items, vec!["vim"]);
        assert_eq!(app.displayed_category.as_deref(), Some("Work"));
    }

    #[test]
    fn test_add_category_from_input_keeps_text() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, "{}");
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::CategoryInput);
        type_text(&mut app, "Games");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.category_items, vec!["Games"]);
        assert_eq!(app.category_input, "Games");
        assert!(app.store.contains_category("Games"));
    }

    #[test]
    fn test_empty_category_input_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, "{}");
        app.add_category();
        assert!(app.category_items.is_empty());
    }

    #[test]
    fn test_rename_category_leaves_program_pane_stale() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, r#"{"Games": {"chess": "/bin/chess"}}"#);
        app.select_category();
        assert_eq!(app.program_items, vec!["chess"]);

        app.category_input = "Fun".into();
        app.rename_category();
        assert_eq!(app.category_items, vec!["Fun"]);
        assert_eq!(app.displayed_category.as_deref(), Some("Games"));
        assert_eq!(app.program_items, vec!["chess"]);
    }

    #[test]
    fn test_remove_category_clears_program_pane() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, r#"{"Games": {"chess": "/bin/chess"}, "Work": {}}"#);
        app.select_category();
        app.remove_category();
        assert_eq!(app.category_items, vec!["Work"]);
        assert!(app.program_items.is_empty());
        assert!(app.displayed_category.is_none());
    }

    #[test]
    fn test_program_operations_use_active_category() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(
            &dir,
            r#"{"Games": {"chess": "/bin/chess"}, "Work": {"vim": "/usr/bin/vim"}}"#,
        );
        app.select_category();
        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected_category(), Some("Work"));

        app.program_input = "editor".into();
        app.rename_program();
        // The active program row still reads "chess" from the Games pane and
        // Work has no such entry.
        assert_eq!(app.store.program_path("Games", "chess"), Some("/bin/chess"));
        assert_eq!(app.displayed_category.as_deref(), Some("Work"));
        assert_eq!(app.program_items, vec!["vim"]);

        app.rename_program();
        assert_eq!(app.store.program_path("Work", "editor"), Some("/usr/bin/vim"));
        assert_eq!(app.program_items, vec!["editor"]);
    }

    #[test]
    fn test_add_program_through_picker() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, r#"{"Games": {}}"#);
        app.queue_add_program();
        assert!(matches!(app.active_popup, Some(PopupState::FilePicker(_))));

        app.apply_picked_path(Some(Path::new("/bin/chess")));
        assert!(app.active_popup.is_none());
        assert_eq!(app.store.program_path("Games", "chess"), Some("/bin/chess"));
        assert_eq!(app.program_items, vec!["chess"]);

        app.queue_add_program();
        app.apply_picked_path(Some(Path::new("/usr/bin/chess")));
        assert_eq!(app.store.program_path("Games", "chess"), Some("/usr/bin/chess"));
    }

    #[test]
    fn test_cancelled_picker_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, r#"{"Games": {}}"#);
        app.queue_add_program();
        press(&mut app, KeyCode::Esc);
        assert!(app.active_popup.is_none());
        assert!(app.store.programs("Games").unwrap().is_empty());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_add_program_without_category_does_not_open_picker() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, "{}");
        app.queue_add_program();
        assert!(app.active_popup.is_none());
    }

    #[test]
    fn test_remove_program_refreshes_list() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(
            &dir,
            r#"{"Games": {"chess": "/bin/chess", "go": "/bin/go"}}"#,
        );
        app.select_category();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::ProgramList);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.program_items, vec!["chess"]);
        assert_eq!(app.program_cursor, 0);
    }

    #[test]
    fn test_open_missing_program_shows_error_popup() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-binary");
        let json = serde_json::json!({ "Games": { "ghost": missing } }).to_string();
        let mut app = app_with(&dir, &json);
        app.select_category();
        app.open_program();

        match &app.active_popup {
            Some(PopupState::Message { title, text }) => {
                assert_eq!(title, "Error");
                assert!(text.starts_with("Could not open the program:"));
            }
            _ => panic!("expected an error popup"),
        }
        assert_eq!(app.store.program_path("Games", "ghost"), missing.to_str());

        press(&mut app, KeyCode::Enter);
        assert!(app.active_popup.is_none());
    }

    #[test]
    fn test_open_requires_program() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, r#"{"Games": {}}"#);
        app.open_program();
        assert!(app.active_popup.is_none());
    }

    #[test]
    fn test_quit_from_list_but_not_from_input() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, "{}");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        assert_eq!(app.category_input, "q");

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_clicking_category_row_selects_it() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(
            &dir,
            r#"{"Games": {"chess": "/bin/chess"}, "Work": {"vim": "/usr/bin/vim"}}"#,
        );
        let area = Rect::new(0, 0, 80, 24);
        let layout = ScreenLayout::compute(area);
        let inner = ui::list_inner(layout.category_list);
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: inner.x,
            row: inner.y + 1,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_mouse(click, area);
        assert_eq!(app.selected_category(), Some("Work"));
        assert_eq!(app.program_items, vec!["vim"]);
    }

    #[test]
    fn test_noop_rename_reports_nothing() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, r#"{"Games": {}, "Apps": {}}"#);
        app.category_input = "Apps".into();
        app.rename_category();
        assert!(app.status_message.is_none());
        assert_eq!(app.category_items, vec!["Games", "Apps"]);

        app.category_input = "Fun".into();
        app.rename_category();
        assert_eq!(app.status_message.as_deref(), Some("Category 'Games' renamed"));
    }

    #[test]
    fn test_failed_save_keeps_change_and_reports_it() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut app = AppState::new(Store::load(blocker.join("apps.json")).unwrap());

        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Games");
        press(&mut app, KeyCode::Enter);

        let status = app.status_message.clone().unwrap_or_default();
        assert!(status.starts_with("Save failed:"), "status was {status:?}");
        assert_eq!(app.category_items, vec!["Games"]);
        assert!(app.store.contains_category("Games"));
        assert!(app.active_popup.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_pick_is_reported() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let mut app = app_with(&dir, r#"{"Games": {}}"#);
        app.queue_add_program();
        app.apply_picked_path(Some(Path::new(OsStr::from_bytes(b"/opt/che\xffss"))));

        let status = app.status_message.clone().unwrap_or_default();
        assert!(status.contains("not valid UTF-8"), "status was {status:?}");
        assert!(app.store.programs("Games").unwrap().is_empty());
        assert!(app.program_items.is_empty());
    }
}
