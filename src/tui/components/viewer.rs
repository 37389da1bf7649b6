use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Scrollable block of pre-styled lines. Scrolling is bounded by wrapped
/// rows as of the last render, not by the number of stored lines.
pub struct TextPane {
    pub lines: Vec<Line<'static>>,
    pub scroll: usize,
    height: usize,
    rows: usize,
}

impl TextPane {
    pub fn new(lines: Vec<Line<'static>>) -> Self {
        Self {
            lines,
            scroll: 0,
            height: 0,
            rows: 0,
        }
    }

    pub fn set_lines(&mut self, lines: Vec<Line<'static>>) {
        self.lines = lines;
        self.scroll = 0;
    }

    fn max_scroll(&self) -> usize {
        self.rows.saturating_sub(self.height.max(1))
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let page = self.height.max(1);
        match key.code {
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(page);
                true
            }
            KeyCode::PageDown => {
                self.scroll = (self.scroll + page).min(self.max_scroll());
                true
            }
            KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                true
            }
            KeyCode::Char('j') => {
                self.scroll = (self.scroll + 1).min(self.max_scroll());
                true
            }
            KeyCode::Home => {
                self.scroll = 0;
                true
            }
            KeyCode::End => {
                self.scroll = self.max_scroll();
                true
            }
            _ => false,
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, title: &str, focused: bool) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .border_style(if focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Gray)
            });
        let inner = block.inner(area);

        let paragraph = Paragraph::new(self.lines.clone()).wrap(Wrap { trim: false });
        self.height = inner.height as usize;
        self.rows = paragraph.line_count(inner.width);
        self.scroll = self.scroll.min(self.max_scroll());

        let paragraph = paragraph
            .block(block)
            .scroll((self.scroll.min(u16::MAX as usize) as u16, 0));

        f.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn draw(terminal: &mut Terminal<TestBackend>, pane: &mut TextPane) {
        terminal
            .draw(|f| pane.render(f, f.area(), "Outline", true))
            .unwrap();
    }

    #[test]
    fn end_reaches_last_wrapped_row() {
        let mut lines: Vec<Line<'static>> = (0..6)
            .map(|i| Line::from(format!("{i} {}", "detail ".repeat(10))))
            .collect();
        lines.push(Line::from("CTA-END"));
        let mut pane = TextPane::new(lines);
        let mut terminal = Terminal::new(TestBackend::new(30, 12)).unwrap();

        draw(&mut terminal, &mut pane);
        assert!(!screen_text(&terminal).contains("CTA-END"));

        pane.handle_key(KeyEvent::new(KeyCode::End, KeyModifiers::NONE));
        draw(&mut terminal, &mut pane);
        assert!(screen_text(&terminal).contains("CTA-END"));
    }

    #[test]
    fn short_content_does_not_scroll() {
        let mut pane = TextPane::new(vec![Line::from("one"), Line::from("two")]);
        let mut terminal = Terminal::new(TestBackend::new(30, 12)).unwrap();

        draw(&mut terminal, &mut pane);
        pane.handle_key(KeyEvent::new(KeyCode::PageDown, KeyModifiers::NONE));
        assert_eq!(pane.scroll, 0);
    }
}
