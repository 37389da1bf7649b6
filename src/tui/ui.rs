use crate::core::{OutlineResult, VideoType};
use crate::output::format_count;
use crate::tui::app::{
    AnalysisModal, App, ModalPane, OutlineState, Screen, SearchFocus, SearchState,
};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.screen {
        Screen::Search => draw_search(f, app),
        Screen::Settings => draw_settings(f, app),
    }

    if app.modal.is_some() {
        draw_modal(f, app);
    }
}

fn heading(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
}

fn footer(f: &mut Frame, area: Rect, help: &str, status: Option<&str>) {
    let line = match status {
        Some(status) => Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled(help.to_string(), Style::default().fg(Color::Gray))),
    };

    let paragraph = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn draw_search(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Keyword + type filter
            Constraint::Min(1),    // Results
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    f.render_widget(heading("InsightMiner · Insight Discovery"), chunks[0]);

    let input_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(30)])
        .split(chunks[1]);
    app.keyword_input.render(f, input_row[0]);
    draw_type_filter(f, input_row[1], app.video_type);

    match &app.search_state {
        SearchState::Idle => {
            let idle = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "START MINING INSIGHT",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "Type a keyword and press Enter. Results are ranked by views per subscriber.",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(idle, chunks[2]);
        }
        SearchState::Searching => {
            let searching = Paragraph::new("Searching...")
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(searching, chunks[2]);
        }
        SearchState::Failed(message) => {
            let error = Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Red))
                        .title("Search failed"),
                );
            f.render_widget(error, chunks[2]);
        }
        SearchState::Results if app.video_list.items.is_empty() => {
            let empty = Paragraph::new("No videos found.")
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(empty, chunks[2]);
        }
        SearchState::Results => {
            let title = format!("Ranked by efficiency ({} videos)", app.video_list.items.len());
            let analyzing = app.analyzing.clone();
            app.video_list
                .render(f, chunks[2], &title, analyzing.as_deref());
        }
    }

    let help = match app.focus {
        SearchFocus::Input => {
            "[Enter] Search  [Tab] Type  [↓] Results  [F2] Settings  [Ctrl+C] Quit"
        }
        SearchFocus::Results => {
            "[↑↓] Navigate  [Enter/a] Analyze  [/] Keyword  [t] Type  [s] Settings  [q] Quit"
        }
    };
    footer(f, chunks[3], help, app.status.as_deref());
}

fn draw_type_filter(f: &mut Frame, area: Rect, current: VideoType) {
    let spans: Vec<Span> = [VideoType::All, VideoType::Long, VideoType::Shorts]
        .into_iter()
        .flat_map(|kind| {
            let style = if kind == current {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            [Span::styled(format!(" {} ", kind.label()), style), Span::raw(" ")]
        })
        .collect();

    let filter = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Type"));
    f.render_widget(filter, area);
}

fn draw_settings(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // YouTube key
            Constraint::Length(3), // Gemini key
            Constraint::Min(1),    // Notes
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    f.render_widget(heading("API Configuration"), chunks[0]);
    app.youtube_input.render(f, chunks[1]);
    app.gemini_input.render(f, chunks[2]);

    let notes = Paragraph::new(
        "Keys are stored in the config directory with owner-only permissions. \
         YOUTUBE_API_KEY and GEMINI_API_KEY environment variables fill in keys left empty.",
    )
    .style(Style::default().fg(Color::DarkGray))
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(notes, chunks[3]);

    footer(
        f,
        chunks[4],
        "[Tab] Next field  [Enter] Save  [Esc] Back",
        app.status.as_deref(),
    );
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn section(title: &str, color: Color) -> Line<'static> {
    Line::from(Span::styled(
        format!("● {title}"),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn analysis_lines(modal: &AnalysisModal) -> Vec<Line<'static>> {
    let analysis = &modal.analysis;
    let mut lines = vec![
        Line::from(Span::styled(
            modal.video.watch_url(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        section("Viewer sentiment", Color::Blue),
        Line::from(Span::styled(
            format!("\"{}\"", analysis.sentiment),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
        section("Recommended keywords (pick one)", Color::Green),
    ];

    let selected = modal.selected_keyword();
    let keyword_spans: Vec<Span<'static>> = analysis
        .recommended_keywords
        .iter()
        .enumerate()
        .flat_map(|(i, kw)| {
            let mut style = Style::default().fg(Color::Gray);
            if selected == Some(kw.as_str()) {
                style = style.fg(Color::Black).bg(Color::Green);
            }
            if i == modal.keyword_cursor {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            [Span::styled(format!("#{kw}"), style), Span::raw("  ")]
        })
        .collect();
    lines.push(Line::from(keyword_spans));
    lines.push(Line::from(""));

    for (title, color, items) in [
        ("Common keywords", Color::Magenta, &analysis.common_keywords),
        ("Viewer needs", Color::Cyan, &analysis.user_needs),
        ("Suggested topics", Color::Yellow, &analysis.suggested_topics),
    ] {
        lines.push(section(title, color));
        lines.extend(items.iter().map(|item| Line::from(format!("  - {item}"))));
        lines.push(Line::from(""));
    }

    lines
}

fn outline_lines(outline: &OutlineResult) -> Vec<Line<'static>> {
    let label = |text: &str| {
        Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ))
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(" DRAFT ", Style::default().fg(Color::White).bg(Color::Blue)),
            Span::raw(" "),
            Span::styled(
                outline.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        label("HOOK"),
        Line::from(outline.hook.clone()),
        Line::from(""),
        label("CHAPTERS"),
    ];

    for (i, chapter) in outline.chapters.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("{}. {}", i + 1, chapter.title),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("   {}", chapter.detail),
            Style::default().fg(Color::Gray),
        )));
    }

    lines.push(Line::from(""));
    lines.push(label("CALL TO ACTION"));
    lines.push(Line::from(outline.cta.clone()));
    lines
}

fn draw_modal(f: &mut Frame, app: &mut App) {
    let area = centered(f.area(), 90, 85);
    let status = app.status.clone();
    let Some(modal) = app.modal.as_mut() else {
        return;
    };

    f.render_widget(Clear, area);

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(
            " AI Content Lab · {} · {} views · {:.2}x ",
            modal.video.title,
            format_count(modal.video.view_count),
            modal.video.efficiency_ratio
        ));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(inner);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    // Rebuilt every frame so the keyword highlight follows the cursor;
    // assigning the lines directly keeps the scroll position.
    let lines = analysis_lines(modal);
    modal.analysis_pane.lines = lines;
    let analysis_focused = modal.focus == ModalPane::Analysis;
    modal
        .analysis_pane
        .render(f, columns[0], "Comment analysis", analysis_focused);

    match &modal.outline {
        OutlineState::KeywordUnselected => {
            let hint = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Pick a keyword to draft an outline",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
                )),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Outline"));
            f.render_widget(hint, columns[1]);
        }
        OutlineState::Loading { keyword } => {
            let loading = Paragraph::new(format!("Drafting an outline for \"{keyword}\"..."))
                .style(Style::default().fg(Color::Blue))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Outline"));
            f.render_widget(loading, columns[1]);
        }
        OutlineState::Ready { keyword, outline } => {
            if modal.outline_pane.lines.is_empty() {
                modal.outline_pane.set_lines(outline_lines(outline));
            }
            let title = format!("Outline · #{keyword}");
            modal
                .outline_pane
                .render(f, columns[1], &title, !analysis_focused);
        }
    }

    footer(
        f,
        rows[1],
        "[←→] Keyword  [Enter] Outline  [Tab] Switch pane  [PgUp/PgDn j/k] Scroll  [Esc] Close",
        status.as_deref(),
    );
}
