mod app;
mod launcher;
mod logging;
mod paths;
mod picker;
mod store;
mod ui;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::AppState;
use paths::AppPaths;
use store::Store;

fn main() -> Result<()> {
    let paths = AppPaths::new();
    logging::init_or_warn(&paths.log_file);
    let store = Store::load(&paths.data_file)
        .with_context(|| format!("Unable to load {}", paths.data_file.display()))?;
    let mut app = AppState::new(store);
    run_app(&mut app)
}

fn run_app(app: &mut AppState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    tracing::info!("ui started");

    let result = event_loop(&mut terminal, app);

    restore_terminal(&mut terminal)?;
    tracing::info!("ui stopped");
    result
}

fn event_loop<B>(terminal: &mut Terminal<B>, app: &mut AppState) -> Result<()>
where
    B: ratatui::backend::Backend + Write,
{
    let tick_rate = Duration::from_millis(200);
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Key(_) => {}
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    app.handle_mouse(mouse, size);
                }
                Event::Resize(_, _) => {}
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            };
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn restore_terminal<B>(terminal: &mut Terminal<B>) -> Result<()>
where
    B: ratatui::backend::Backend + Write,
{
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
