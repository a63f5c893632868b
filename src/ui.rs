use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::app::{AppState, Focus, PopupState};
use crate::picker::{FilePickerState, PickerEntryKind};

#[derive(Clone)]
pub struct Theme {
    pub primary: Color,
    pub accent: Color,
    pub highlight: Color,
    pub background: Color,
    pub surface: Color,
    pub text: Color,
}

impl Theme {
    pub fn nord() -> Self {
        Theme::from_hexes("#5E81AC", "#D08770", "#76B3C5", "#3B4252", "#4C566A", "#ECEFF4")
    }

    fn from_hexes(
        primary: &str,
        accent: &str,
        highlight: &str,
        background: &str,
        surface: &str,
        text: &str,
    ) -> Theme {
        Theme {
            primary: color_from_hex(primary).unwrap_or(Color::Blue),
            accent: color_from_hex(accent).unwrap_or(Color::Cyan),
            highlight: color_from_hex(highlight).unwrap_or(Color::Cyan),
            background: color_from_hex(background).unwrap_or(Color::Black),
            surface: color_from_hex(surface).unwrap_or(Color::DarkGray),
            text: color_from_hex(text).unwrap_or(Color::White),
        }
    }
}

fn color_from_hex(value: &str) -> Option<Color> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

/// Screen regions shared by rendering and mouse hit-testing.
pub struct ScreenLayout {
    pub header: Rect,
    pub footer: Rect,
    pub category_list: Rect,
    pub category_input: Rect,
    pub program_list: Rect,
    pub program_input: Rect,
    pub status: Rect,
}

impl ScreenLayout {
    pub fn compute(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[2]);
        let split_pane = |pane: Rect| {
            Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(3)])
                .split(pane)
        };
        let left = split_pane(panes[0]);
        let right = split_pane(panes[1]);
        ScreenLayout {
            header: rows[0],
            footer: rows[1],
            category_list: left[0],
            category_input: left[1],
            program_list: right[0],
            program_input: right[1],
            status: rows[3],
        }
    }
}

pub fn list_inner(area: Rect) -> Rect {
    area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    })
}

/// First visible row for a list of `height` rows keeping `cursor` on screen.
pub fn list_offset(cursor: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    cursor.saturating_sub(height - 1)
}

pub fn render(frame: &mut Frame, app: &AppState) {
    let size = frame.size();
    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.background)),
        size,
    );
    let layout = ScreenLayout::compute(size);

    let header = Paragraph::new(app.title.clone())
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(app.theme.text)
                .bg(app.theme.primary)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(header, layout.header);

    let footer = Paragraph::new(footer_line_data(&app.theme).line)
        .alignment(Alignment::Center)
        .style(Style::default().bg(app.theme.highlight));
    frame.render_widget(footer, layout.footer);

    let category_marker = |name: &str| {
        if app.displayed_category.as_deref() == Some(name) {
            format!("▸ {name}")
        } else {
            format!("  {name}")
        }
    };
    let category_rows: Vec<String> = app
        .category_items
        .iter()
        .map(|name| category_marker(name.as_str()))
        .collect();
    render_list(
        frame,
        layout.category_list,
        app,
        "Categories",
        &category_rows,
        app.category_cursor,
        app.focus == Focus::CategoryList,
    );

    let program_title = match &app.displayed_category {
        Some(category) => format!("Programs: {category}"),
        None => "Programs".to_string(),
    };
    render_list(
        frame,
        layout.program_list,
        app,
        &program_title,
        &app.program_items,
        app.program_cursor,
        app.focus == Focus::ProgramList,
    );

    render_input(
        frame,
        layout.category_input,
        app,
        "Category name",
        &app.category_input,
        app.focus == Focus::CategoryInput,
    );
    render_input(
        frame,
        layout.program_input,
        app,
        "Program name",
        &app.program_input,
        app.focus == Focus::ProgramInput,
    );

    let status = Paragraph::new(app.status_text())
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .bg(app.theme.primary)
                .fg(app.theme.text)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(status, layout.status);

    if let Some(popup) = &app.active_popup {
        render_popup(frame, popup, app);
    }
}

fn pane_block<'a>(title: &'a str, focused: bool, app: &AppState) -> Block<'a> {
    let border = if focused {
        app.theme.accent
    } else {
        app.theme.background
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(app.theme.surface).fg(app.theme.text))
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    app: &AppState,
    title: &str,
    rows: &[String],
    cursor: usize,
    focused: bool,
) {
    let inner = list_inner(area);
    let height = inner.height as usize;
    let offset = list_offset(cursor, height);
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, row)| {
            if index == cursor {
                let style = if focused {
                    Style::default()
                        .fg(app.theme.background)
                        .bg(app.theme.highlight)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(app.theme.accent)
                        .add_modifier(Modifier::BOLD)
                };
                ListItem::new(highlight_line_with_width(
                    Line::from(row.clone()),
                    inner.width as usize,
                    style,
                ))
            } else {
                ListItem::new(row.clone())
            }
        })
        .collect();
    let list = List::new(items).block(pane_block(title, focused, app));
    frame.render_widget(list, area);
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    app: &AppState,
    title: &str,
    value: &str,
    focused: bool,
) {
    let mut spans = vec![Span::styled(
        value.to_string(),
        Style::default().fg(app.theme.text),
    )];
    if focused {
        spans.push(Span::styled("█", Style::default().fg(app.theme.accent)));
    }
    let input = Paragraph::new(Line::from(spans)).block(pane_block(title, focused, app));
    frame.render_widget(input, area);
}

fn highlight_line_with_width(mut line: Line<'static>, width: usize, style: Style) -> Line<'static> {
    let mut text_width = 0usize;
    for span in &mut line.spans {
        span.style = style;
        text_width += UnicodeWidthStr::width(span.content.as_ref());
    }
    if width > text_width {
        line.spans
            .push(Span::styled(" ".repeat(width - text_width), style));
    }
    line
}

fn render_popup(frame: &mut Frame, popup: &PopupState, app: &AppState) {
    match popup {
        PopupState::Message { title, text } => {
            let area = centered_rect(frame.size(), 50, 30);
            frame.render_widget(Clear, area);
            let block = Paragraph::new(format!("{text}\n\nPress Enter or Esc to close."))
                .wrap(Wrap { trim: true })
                .style(Style::default().bg(app.theme.surface).fg(app.theme.text))
                .block(
                    Block::default()
                        .title(title.as_str())
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Red))
                        .style(Style::default().bg(app.theme.surface)),
                );
            frame.render_widget(block, area);
        }
        PopupState::FilePicker(picker) => {
            let area = centered_rect(frame.size(), 80, 80);
            frame.render_widget(Clear, area);
            render_file_picker(frame, area, picker, app);
        }
    }
}

fn render_file_picker(frame: &mut Frame, area: Rect, picker: &FilePickerState, app: &AppState) {
    let title = format!("Select a program: {}", picker.current_dir.display());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.accent))
        .style(Style::default().bg(app.theme.surface).fg(app.theme.text));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);
    let list_area = sections[0];
    let height = list_area.height as usize;
    let offset = list_offset(picker.cursor, height);
    let highlight = Style::default()
        .fg(app.theme.background)
        .bg(app.theme.highlight)
        .add_modifier(Modifier::BOLD);
    let items: Vec<ListItem> = picker
        .entries
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, entry)| {
            let line = Line::from(entry.display_name());
            if index == picker.cursor {
                ListItem::new(highlight_line_with_width(
                    line,
                    list_area.width as usize,
                    highlight,
                ))
            } else if entry.kind == PickerEntryKind::File {
                ListItem::new(line)
            } else {
                ListItem::new(line).style(
                    Style::default()
                        .fg(app.theme.accent)
                        .add_modifier(Modifier::BOLD),
                )
            }
        })
        .collect();
    frame.render_widget(List::new(items), list_area);

    let hint = match &picker.error {
        Some(error) => Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))),
        None => Line::from("↵ open | ⌫ up | ~ home | . hidden | Esc cancel"),
    };
    frame.render_widget(Paragraph::new(hint), sections[1]);
}

fn centered_rect(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100 - height_percent) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

#[derive(Clone, Copy)]
struct FooterShortcut {
    key: char,
    label: &'static str,
    action: FooterAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FooterAction {
    AddCategory,
    RemoveCategory,
    RenameCategory,
    AddProgram,
    RemoveProgram,
    RenameProgram,
    OpenProgram,
    Quit,
}

struct FooterSegment {
    start: u16,
    end: u16,
    action: FooterAction,
}

pub struct FooterLineData {
    line: Line<'static>,
    segments: Vec<FooterSegment>,
    total_width: u16,
}

const FOOTER_SEPARATOR: &str = "│";

const FOOTER_SHORTCUTS: &[FooterShortcut] = &[
    FooterShortcut {
        key: 'n',
        label: " New Cat",
        action: FooterAction::AddCategory,
    },
    FooterShortcut {
        key: 'x',
        label: " Del Cat",
        action: FooterAction::RemoveCategory,
    },
    FooterShortcut {
        key: 'r',
        label: " Ren Cat",
        action: FooterAction::RenameCategory,
    },
    FooterShortcut {
        key: 'p',
        label: " Add Prog",
        action: FooterAction::AddProgram,
    },
    FooterShortcut {
        key: 'd',
        label: " Del Prog",
        action: FooterAction::RemoveProgram,
    },
    FooterShortcut {
        key: 'm',
        label: " Ren Prog",
        action: FooterAction::RenameProgram,
    },
    FooterShortcut {
        key: 'o',
        label: " Open",
        action: FooterAction::OpenProgram,
    },
    FooterShortcut {
        key: 'q',
        label: " Quit",
        action: FooterAction::Quit,
    },
];

pub fn footer_action_for_key(key: char) -> Option<FooterAction> {
    FOOTER_SHORTCUTS
        .iter()
        .find(|shortcut| shortcut.key == key)
        .map(|shortcut| shortcut.action)
}

pub fn footer_line_data(theme: &Theme) -> FooterLineData {
    let shortcut_style = Style::default()
        .fg(theme.accent)
        .bg(theme.highlight)
        .add_modifier(Modifier::BOLD);
    let label_style = Style::default().fg(theme.background).bg(theme.highlight);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut segments = Vec::new();
    let mut cursor: u16 = 0;
    for (index, shortcut) in FOOTER_SHORTCUTS.iter().enumerate() {
        if index > 0 {
            spans.push(Span::styled(FOOTER_SEPARATOR, label_style));
            cursor = cursor.saturating_add(FOOTER_SEPARATOR.width() as u16);
        }
        let entry_start = cursor;
        let key = shortcut.key.to_string();
        let key_len = key.width() as u16;
        let label_len = shortcut.label.width() as u16;
        spans.push(Span::styled(key, shortcut_style));
        spans.push(Span::styled(shortcut.label, label_style));
        let entry_end = entry_start
            .saturating_add(key_len)
            .saturating_add(label_len);
        segments.push(FooterSegment {
            start: entry_start,
            end: entry_end,
            action: shortcut.action,
        });
        cursor = entry_end;
    }
    FooterLineData {
        line: Line::from(spans),
        segments,
        total_width: cursor,
    }
}

/// Resolves a click on the centered footer line to the shortcut under it.
pub fn footer_action_at(theme: &Theme, column: u16, footer_area: Rect) -> Option<FooterAction> {
    let line_data = footer_line_data(theme);
    if line_data.segments.is_empty() || footer_area.width == 0 {
        return None;
    }
    let text_width = line_data.total_width.min(footer_area.width);
    let mut start_x = footer_area.x;
    if footer_area.width > text_width {
        start_x += (footer_area.width - text_width) / 2;
    }
    if column < start_x || column >= start_x + text_width {
        return None;
    }
    let relative = column - start_x;
    line_data
        .segments
        .iter()
        .find(|segment| relative >= segment.start && relative < segment.end)
        .map(|segment| segment.action)
}
