use std::{
    io::{self, Stdout},
    path::Path,
    time::Duration,
};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use tracing::info;

use crate::{
    clock,
    config::Settings,
    domain::{CategoryId, SessionId, SessionRecord},
    error::Result,
    storage::{FileRecordStore, RecordStore},
    tracker::TimeTracker,
};

mod event_handlers;
mod input_modal_view;
mod render_views;
mod ui_helpers;
mod view_style;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UiMode {
    Main,
    AddCategory,
    EditDuration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Focus {
    Categories,
    Sessions,
}

struct App<B: RecordStore> {
    tracker: TimeTracker<B>,
    ui_mode: UiMode,
    focus: Focus,
    selected_index: usize,
    session_selected_index: usize,
    input: String,
    editing: Option<(CategoryId, SessionId)>,
    status_message: Option<String>,
    recent_limit: usize,
    render_needed: bool,
}

impl<B: RecordStore> App<B> {
    fn new(tracker: TimeTracker<B>, recent_limit: usize) -> Self {
        Self {
            tracker,
            ui_mode: UiMode::Main,
            focus: Focus::Categories,
            selected_index: 0,
            session_selected_index: 0,
            input: String::new(),
            editing: None,
            status_message: None,
            recent_limit,
            render_needed: true,
        }
    }

    fn recent_sessions(&self) -> Vec<SessionRecord> {
        self.tracker.store().recent_sessions(self.recent_limit)
    }

    fn selected_category_id(&self) -> Option<CategoryId> {
        self.tracker
            .store()
            .categories
            .get(self.selected_index)
            .map(|category| category.id.clone())
    }

    fn selected_session(&self) -> Option<SessionRecord> {
        self.recent_sessions()
            .into_iter()
            .nth(self.session_selected_index)
    }

    fn clamp_selection(&mut self) {
        self.selected_index =
            ui_helpers::clamp_index(self.selected_index, self.tracker.store().categories.len());
        self.session_selected_index =
            ui_helpers::clamp_index(self.session_selected_index, self.recent_sessions().len());
    }

    fn open_input(&mut self, mode: UiMode, initial: String) {
        self.ui_mode = mode;
        self.input = initial;
        self.status_message = None;
        self.render_needed = true;
    }

    fn close_input(&mut self) {
        self.ui_mode = UiMode::Main;
        self.input.clear();
        self.editing = None;
        self.render_needed = true;
    }

    fn in_input_modal(&self) -> bool {
        !matches!(self.ui_mode, UiMode::Main)
    }

    fn modal_rect(&self, terminal_size: Rect) -> Rect {
        let target_width = (terminal_size.width / 2).max(44);
        let max_width = terminal_size.width.saturating_sub(2).max(1);
        let max_height = terminal_size.height.saturating_sub(2).max(1);

        let modal_width = target_width.clamp(1, max_width);
        let modal_height = 5u16.clamp(1, max_height);

        let modal_x = (terminal_size.width.saturating_sub(modal_width)) / 2;
        let modal_y = (terminal_size.height.saturating_sub(modal_height)) / 2;

        Rect::new(modal_x, modal_y, modal_width, modal_height)
    }
}

pub fn run_ui(settings: &Settings, data_dir: &Path) -> Result<()> {
    let tracker = TimeTracker::open(FileRecordStore::in_dir(data_dir), clock::now_ms());
    let mut app = App::new(tracker, settings.recent_limit);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("terminal ui started");
    let result = run_loop(
        &mut terminal,
        &mut app,
        Duration::from_millis(settings.tick_ms),
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("terminal ui closed");

    result
}

fn run_loop<B: RecordStore>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<B>,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        if app.render_needed {
            let now = clock::now_ms();
            terminal.draw(|f| app.draw_frame(f, now))?;
            app.render_needed = false;
        }

        // Only wake up on a timer while a session is running.
        let next_event = if app.tracker.needs_tick() {
            if event::poll(tick_rate)? {
                Some(event::read()?)
            } else {
                app.render_needed = true;
                None
            }
        } else {
            Some(event::read()?)
        };

        match next_event {
            Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if app.handle_key(key, clock::now_ms()) {
                    break;
                }
            }
            Some(Event::Resize(_, _)) => app.render_needed = true,
            _ => {}
        }
    }

    Ok(())
}
