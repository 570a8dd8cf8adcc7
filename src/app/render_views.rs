use ratatui::prelude::{Line, Span};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState},
};

use crate::{cli::format_local_time, duration::format_duration, storage::RecordStore};

use super::{App, Focus, ui_helpers, view_style};

const MAIN_HINTS: &str = "keys: up/down  enter start/stop  s stop  a add  x delete  tab  e edit  q";

impl<B: RecordStore> App<B> {
    pub(super) fn draw_frame(&mut self, f: &mut Frame, now: i64) {
        let size = f.size();
        let store = self.tracker.store();
        let today = store.today_totals_by_category(now);

        let active_index = store
            .active
            .as_ref()
            .and_then(|active| store.categories.iter().position(|c| c.id == active.category_id));

        let active_name = active_index
            .and_then(|idx| store.categories.get(idx))
            .map(|category| category.name.clone())
            .unwrap_or_else(|| "idle".to_string());

        let session_timer = store
            .active_elapsed(now)
            .map(format_duration)
            .unwrap_or_else(|| "--:--:--".to_string());

        let today_total = format_duration(today.values().fold(0u64, |acc, ms| acc.saturating_add(*ms)));

        let border_color = active_index
            .map(view_style::category_color)
            .unwrap_or(Color::White);

        let footer_text = self
            .status_message
            .clone()
            .unwrap_or_else(|| MAIN_HINTS.to_string());
        let footer_color = if self.status_message.is_some() {
            Color::Red
        } else {
            Color::DarkGray
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(
                Line::from(Span::styled(active_name, view_style::title_style()))
                    .alignment(Alignment::Left),
            )
            .title(
                Line::from(Span::styled(session_timer, Style::default().fg(Color::White)))
                    .alignment(Alignment::Center),
            )
            .title(
                Line::from(Span::styled(
                    format!("today {today_total}"),
                    Style::default().fg(Color::White),
                ))
                .alignment(Alignment::Right),
            )
            .title_bottom(
                Line::from(Span::raw(footer_text).fg(footer_color)).alignment(Alignment::Left),
            )
            .border_style(Style::default().fg(border_color));

        let inner = block.inner(size);
        f.render_widget(block, size);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);

        self.render_categories(f, panes[0], now);
        self.render_sessions(f, panes[1]);

        if self.in_input_modal() {
            self.render_input_modal(f, size);
        }
    }

    fn render_categories(&self, f: &mut Frame, area: Rect, now: i64) {
        let store = self.tracker.store();
        let today = store.today_totals_by_category(now);
        let focused = self.focus == Focus::Categories;

        let metric_width = 8;
        let row_width = area.width.saturating_sub(2) as usize;
        let name_width = row_width.saturating_sub(2 * metric_width + 4).max(4);

        let items: Vec<ListItem> = store
            .categories
            .iter()
            .enumerate()
            .map(|(idx, category)| {
                let color = view_style::category_color(idx);
                let dot = if store.is_active(&category.id) {
                    "▶ "
                } else {
                    "● "
                };
                let name = ui_helpers::truncate_label(&category.name, name_width);
                let pad = name_width.saturating_sub(name.chars().count()) + 1;
                let today_value = format_duration(today.get(&category.id).copied().unwrap_or(0));
                let total_value = format_duration(store.all_time_total(category, now));

                if focused && idx == self.selected_index {
                    let text_color = view_style::text_color_for_bg(color);
                    ListItem::new(Line::from(vec![
                        Span::raw(dot).fg(text_color),
                        Span::raw(name).fg(text_color),
                        Span::raw(" ".repeat(pad)).fg(text_color),
                        Span::raw(today_value).fg(text_color),
                        Span::raw(" ").fg(text_color),
                        Span::raw(total_value).fg(text_color),
                    ]))
                    .style(Style::default().fg(text_color).bg(color))
                } else {
                    ListItem::new(Line::from(vec![
                        Span::raw(dot).fg(color),
                        Span::raw(name).fg(Color::White),
                        Span::raw(" ".repeat(pad)),
                        Span::raw(today_value).fg(Color::White),
                        Span::raw(" "),
                        Span::raw(total_value).fg(Color::Gray),
                    ]))
                }
            })
            .collect();

        let list = if items.is_empty() {
            List::new(vec![ListItem::new(Line::from(Span::styled(
                "No categories yet. Press a to add one.",
                Style::default().fg(Color::Gray),
            )))])
        } else {
            List::new(items)
        };

        let mut list_state = ListState::default();
        if !store.categories.is_empty() {
            list_state.select(Some(self.selected_index));
        }

        let list = list.block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(Line::from(Span::styled("categories", view_style::title_style())))
                .border_style(view_style::pane_border_style(focused)),
        );
        f.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_sessions(&self, f: &mut Frame, area: Rect) {
        let store = self.tracker.store();
        let records = self.recent_sessions();
        let focused = self.focus == Focus::Sessions;

        let time_width = 16;
        let metric_width = 8;
        let row_width = area.width.saturating_sub(2) as usize;
        let name_width = row_width.saturating_sub(time_width + metric_width + 2).max(4);

        let items: Vec<ListItem> = records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let color = store
                    .categories
                    .iter()
                    .position(|c| c.id == record.category_id)
                    .map(view_style::category_color)
                    .unwrap_or(Color::Gray);
                let started = format_local_time(record.session.start);
                let name = ui_helpers::truncate_label(&record.category_name, name_width);
                let pad = name_width.saturating_sub(name.chars().count()) + 1;
                let value = format_duration(record.session.duration_ms);

                if focused && idx == self.session_selected_index {
                    let text_color = view_style::text_color_for_bg(color);
                    ListItem::new(Line::from(vec![
                        Span::raw(started).fg(text_color),
                        Span::raw(" ").fg(text_color),
                        Span::raw(name).fg(text_color),
                        Span::raw(" ".repeat(pad)).fg(text_color),
                        Span::raw(value).fg(text_color),
                    ]))
                    .style(Style::default().fg(text_color).bg(color))
                } else {
                    ListItem::new(Line::from(vec![
                        Span::raw(started).fg(Color::Gray),
                        Span::raw(" "),
                        Span::raw(name).fg(color),
                        Span::raw(" ".repeat(pad)),
                        Span::raw(value).fg(Color::White),
                    ]))
                }
            })
            .collect();

        let list = if items.is_empty() {
            List::new(vec![ListItem::new(Line::from(Span::styled(
                "No sessions recorded.",
                Style::default().fg(Color::Gray),
            )))])
        } else {
            List::new(items)
        };

        let mut list_state = ListState::default();
        if !records.is_empty() {
            list_state.select(Some(self.session_selected_index));
        }

        let list = list.block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(Line::from(Span::styled("recent", view_style::title_style())))
                .border_style(view_style::pane_border_style(focused)),
        );
        f.render_stateful_widget(list, area, &mut list_state);
    }
}
