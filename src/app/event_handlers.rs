use crossterm::event::{KeyCode, KeyEvent};

use crate::{duration::format_duration, error::Result, storage::RecordStore};

use super::{App, Focus, UiMode, ui_helpers};

impl<B: RecordStore> App<B> {
    /// Returns `true` when the app should quit.
    pub(super) fn handle_key(&mut self, key: KeyEvent, now: i64) -> bool {
        let quit = match self.ui_mode {
            UiMode::Main => self.handle_normal_key(key, now),
            UiMode::AddCategory => {
                self.handle_add_category_key(key);
                false
            }
            UiMode::EditDuration => {
                self.handle_edit_duration_key(key);
                false
            }
        };

        self.clamp_selection();
        self.render_needed = true;
        quit
    }

    fn handle_normal_key(&mut self, key: KeyEvent, now: i64) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Categories => Focus::Sessions,
                    Focus::Sessions => Focus::Categories,
                };
            }
            KeyCode::Up => match self.focus {
                Focus::Categories => {
                    let len = self.tracker.store().categories.len();
                    self.selected_index = ui_helpers::wrap_prev_index(self.selected_index, len);
                }
                Focus::Sessions => {
                    let len = self.recent_sessions().len();
                    self.session_selected_index =
                        ui_helpers::wrap_prev_index(self.session_selected_index, len);
                }
            },
            KeyCode::Down => match self.focus {
                Focus::Categories => {
                    let len = self.tracker.store().categories.len();
                    self.selected_index = ui_helpers::wrap_next_index(self.selected_index, len);
                }
                Focus::Sessions => {
                    let len = self.recent_sessions().len();
                    self.session_selected_index =
                        ui_helpers::wrap_next_index(self.session_selected_index, len);
                }
            },
            KeyCode::Enter => match self.focus {
                Focus::Categories => self.toggle_selected(now),
                Focus::Sessions => self.open_duration_editor(),
            },
            KeyCode::Char('e') => self.open_duration_editor(),
            KeyCode::Char('s') => {
                let result = self.tracker.stop_active_session(now).map(|_| ());
                self.report(result);
            }
            KeyCode::Char('a') => self.open_input(UiMode::AddCategory, String::new()),
            KeyCode::Char('x') => {
                if self.focus == Focus::Categories {
                    if let Some(category_id) = self.selected_category_id() {
                        let result = self.tracker.delete_category(&category_id).map(|_| ());
                        self.report(result);
                    }
                }
            }
            _ => {}
        }
        false
    }

    fn toggle_selected(&mut self, now: i64) {
        let Some(category_id) = self.selected_category_id() else {
            return;
        };

        let result = if self.tracker.store().is_active(&category_id) {
            self.tracker.stop_active_session(now).map(|_| ())
        } else {
            self.tracker.start_session(&category_id, now).map(|_| ())
        };
        self.report(result);
    }

    fn open_duration_editor(&mut self) {
        if self.focus != Focus::Sessions {
            return;
        }
        let Some(record) = self.selected_session() else {
            return;
        };

        self.editing = Some((record.category_id, record.session.id));
        self.open_input(
            UiMode::EditDuration,
            format_duration(record.session.duration_ms),
        );
    }

    fn handle_add_category_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.close_input(),
            KeyCode::Enter => {
                let name = self.input.clone();
                match self.tracker.add_category(&name) {
                    Ok(Some(_)) => {
                        self.selected_index = self.tracker.store().categories.len() - 1;
                        self.focus = Focus::Categories;
                        self.close_input();
                    }
                    Ok(None) => self.close_input(),
                    Err(e) => {
                        self.close_input();
                        self.status_message = Some(format!("Save failed: {e}"));
                    }
                }
            }
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            _ => {}
        }
    }

    fn handle_edit_duration_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.close_input(),
            KeyCode::Enter => {
                let Some((category_id, session_id)) = self.editing.clone() else {
                    self.close_input();
                    return;
                };

                match self
                    .tracker
                    .edit_session_duration_text(&category_id, &session_id, &self.input)
                {
                    Ok(_) => {
                        self.close_input();
                        self.status_message = None;
                    }
                    // Keep the editor open so the text can be corrected.
                    Err(e) => self.status_message = Some(e.to_string()),
                }
            }
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            _ => {}
        }
    }

    fn report(&mut self, result: Result<()>) {
        self.status_message = result.err().map(|e| format!("Save failed: {e}"));
    }
}
