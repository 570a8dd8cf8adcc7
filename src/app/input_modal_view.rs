use ratatui::prelude::{Line, Span};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Style, Stylize},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::storage::RecordStore;

use super::{App, UiMode, view_style};

impl<B: RecordStore> App<B> {
    pub(super) fn render_input_modal(&self, f: &mut Frame, terminal_size: Rect) {
        let modal_rect = self.modal_rect(terminal_size);

        let title = match self.ui_mode {
            UiMode::EditDuration => "edit duration (HH:MM:SS, MM:SS, minutes)",
            _ => "new category",
        };

        let mut lines = vec![Line::from(vec![
            Span::raw(self.input.as_str()).fg(Color::White),
            Span::raw("_").fg(Color::Gray),
        ])];
        if let Some(message) = &self.status_message {
            lines.push(Line::from(Span::raw(message.as_str()).fg(Color::Red)));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(Line::from(Span::styled(title, view_style::title_style())))
            .title_alignment(Alignment::Center)
            .title_bottom(
                Line::from(Span::raw("enter save  esc cancel").fg(Color::DarkGray))
                    .alignment(Alignment::Center),
            )
            .border_style(Style::default().fg(Color::White));

        f.render_widget(Clear, modal_rect);
        f.render_widget(Paragraph::new(lines).block(block), modal_rect);
    }
}
