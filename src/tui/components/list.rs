use crate::core::VideoRecord;
use crate::output::{format_count, truncate_to_width};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

/// Ranked search results. Each row is one video "card".
pub struct VideoList {
    pub items: Vec<VideoRecord>,
    pub state: ListState,
    viewport_size: usize,
}

impl VideoList {
    pub fn new(items: Vec<VideoRecord>) -> Self {
        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(0));
        }

        Self {
            items,
            state,
            viewport_size: 0,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.previous();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.next();
                true
            }
            KeyCode::PageDown => {
                self.page_down();
                true
            }
            KeyCode::PageUp => {
                self.page_up();
                true
            }
            KeyCode::Home => {
                self.select(0);
                true
            }
            KeyCode::End => {
                self.select(self.items.len().saturating_sub(1));
                true
            }
            _ => false,
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                let current = self.state.selected().unwrap_or(0);
                self.select(current.saturating_sub(1));
                true
            }
            MouseEventKind::ScrollDown => {
                let current = self.state.selected().unwrap_or(0);
                self.select(current + 1);
                true
            }
            _ => false,
        }
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }

        let i = match self.state.selected() {
            Some(i) => (i + 1) % self.items.len(),
            None => 0,
        };
        self.select(i);
    }

    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }

        let i = match self.state.selected() {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.select(i);
    }

    pub fn is_at_top(&self) -> bool {
        matches!(self.state.selected(), None | Some(0))
    }

    fn page_down(&mut self) {
        let step = self.viewport_size.max(1);
        let current = self.state.selected().unwrap_or(0);
        self.select(current + step);
    }

    fn page_up(&mut self) {
        let step = self.viewport_size.max(1);
        let current = self.state.selected().unwrap_or(0);
        self.select(current.saturating_sub(step));
    }

    fn select(&mut self, index: usize) {
        if self.items.is_empty() {
            self.state.select(None);
            return;
        }
        self.state.select(Some(index.min(self.items.len() - 1)));
        self.adjust_offset();
    }

    pub fn get_selected(&self) -> Option<&VideoRecord> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    /// `analyzing` marks the card whose analysis is in flight.
    pub fn render(&mut self, f: &mut Frame, area: Rect, title: &str, analyzing: Option<&str>) {
        // Two rows per card plus borders.
        self.viewport_size = (area.height.saturating_sub(2) / 2).max(1) as usize;
        self.adjust_offset();

        let title_width = area.width.saturating_sub(14) as usize;
        let items: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, video)| {
                let ratio_style = if video.efficiency_ratio >= 1.0 {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };

                let mut headline = vec![
                    Span::styled(format!("{:>3}. ", i + 1), Style::default().fg(Color::DarkGray)),
                    Span::styled(format!("{:>8.2}x ", video.efficiency_ratio), ratio_style),
                    Span::styled(
                        truncate_to_width(&video.title, title_width),
                        Style::default().fg(Color::White),
                    ),
                ];
                if analyzing == Some(video.id.as_str()) {
                    headline.push(Span::styled(
                        "  analyzing…",
                        Style::default().fg(Color::Yellow),
                    ));
                }

                let details = Line::from(Span::styled(
                    format!(
                        "      {}  ·  {} views  ·  {} subs  ·  {} comments  ·  {}",
                        video.channel_title,
                        format_count(video.view_count),
                        format_count(video.subscriber_count),
                        format_count(video.comment_count),
                        video.published_date(),
                    ),
                    Style::default().fg(Color::DarkGray),
                ));

                ListItem::new(vec![Line::from(headline), details])
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

        f.render_stateful_widget(list, area, &mut self.state);
    }

    pub fn update_items(&mut self, new_items: Vec<VideoRecord>) {
        self.items = new_items;
        *self.state.offset_mut() = 0;
        if self.items.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    fn adjust_offset(&mut self) {
        if self.items.is_empty() {
            *self.state.offset_mut() = 0;
            return;
        }

        let viewport = self.viewport_size.max(1);
        let selected = self.state.selected().unwrap_or(0).min(self.items.len() - 1);

        let max_offset = self.items.len().saturating_sub(viewport);
        let offset = self.state.offset().min(max_offset);
        *self.state.offset_mut() = offset;

        if selected < offset {
            *self.state.offset_mut() = selected;
        } else if selected >= offset + viewport {
            *self.state.offset_mut() = selected + 1 - viewport;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn video(id: &str) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: id.to_string(),
            thumbnail: String::new(),
            channel_title: String::new(),
            channel_id: String::new(),
            view_count: 0,
            subscriber_count: 1,
            efficiency_ratio: 0.0,
            comment_count: 0,
            published_at: String::new(),
        }
    }

    #[test]
    fn navigation_wraps() {
        let mut list = VideoList::new(vec![video("a"), video("b"), video("c")]);
        list.handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(list.get_selected().unwrap().id, "c");
        list.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(list.get_selected().unwrap().id, "a");
    }

    #[test]
    fn update_resets_selection() {
        let mut list = VideoList::new(vec![video("a"), video("b")]);
        list.next();
        list.update_items(vec![video("x")]);
        assert_eq!(list.get_selected().unwrap().id, "x");

        list.update_items(Vec::new());
        assert!(list.get_selected().is_none());
    }
}
