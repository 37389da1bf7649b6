use crate::core::{
    AnalysisResult, ApiKey, Credentials, KeyStore, OutlineResult, SearchQuery, Services,
    VideoRecord, VideoType, rank_by_efficiency,
};
use crate::error::Result;
use crate::tui::components::{InputField, TextPane, VideoList};
use crate::tui::events::AppEvent;
use crate::tui::tasks::{RequestKind, RequestTracker, TaskMessage};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Search,
    Settings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Searching,
    Results,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFocus {
    Input,
    Results,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutlineState {
    KeywordUnselected,
    Loading { keyword: String },
    Ready { keyword: String, outline: OutlineResult },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPane {
    Analysis,
    Outline,
}

/// Overlay shown after a successful analysis. Dropping it is the
/// "closed" state.
pub struct AnalysisModal {
    pub video: VideoRecord,
    pub analysis: AnalysisResult,
    pub keyword_cursor: usize,
    pub outline: OutlineState,
    pub focus: ModalPane,
    pub analysis_pane: TextPane,
    pub outline_pane: TextPane,
}

impl AnalysisModal {
    fn new(video: VideoRecord, analysis: AnalysisResult) -> Self {
        Self {
            video,
            analysis,
            keyword_cursor: 0,
            outline: OutlineState::KeywordUnselected,
            focus: ModalPane::Analysis,
            analysis_pane: TextPane::new(Vec::new()),
            outline_pane: TextPane::new(Vec::new()),
        }
    }

    pub fn highlighted_keyword(&self) -> Option<&str> {
        self.analysis
            .recommended_keywords
            .get(self.keyword_cursor)
            .map(String::as_str)
    }

    pub fn selected_keyword(&self) -> Option<&str> {
        match &self.outline {
            OutlineState::KeywordUnselected => None,
            OutlineState::Loading { keyword } | OutlineState::Ready { keyword, .. } => {
                Some(keyword)
            }
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            ModalPane::Analysis => ModalPane::Outline,
            ModalPane::Outline => ModalPane::Analysis,
        };
    }

    fn focused_pane(&mut self) -> &mut TextPane {
        match self.focus {
            ModalPane::Analysis => &mut self.analysis_pane,
            ModalPane::Outline => &mut self.outline_pane,
        }
    }

    fn move_cursor(&mut self, forward: bool) {
        let count = self.analysis.recommended_keywords.len();
        if count == 0 {
            return;
        }
        self.keyword_cursor = if forward {
            (self.keyword_cursor + 1) % count
        } else {
            (self.keyword_cursor + count - 1) % count
        };
    }
}

pub struct App {
    pub screen: Screen,
    pub should_quit: bool,

    // Search screen
    pub keyword_input: InputField,
    pub video_type: VideoType,
    pub focus: SearchFocus,
    pub search_state: SearchState,
    pub video_list: VideoList,
    pub analyzing: Option<String>,
    pub modal: Option<AnalysisModal>,

    // Settings screen
    pub youtube_input: InputField,
    pub gemini_input: InputField,
    pub settings_focus: usize,

    /// One-shot notice shown in the footer until the next key press.
    pub status: Option<String>,

    services: Services,
    store: KeyStore,
    credentials: Credentials,
    requests: RequestTracker,

    // Async communication
    pub task_tx: Option<mpsc::UnboundedSender<TaskMessage>>,
    pub task_rx: Option<mpsc::UnboundedReceiver<TaskMessage>>,
}

impl App {
    pub fn new(services: Services, store: KeyStore, credentials: Credentials) -> Self {
        let mut keyword_input = InputField::new("Keyword", "Search a topic...");
        keyword_input.focused = true;

        Self {
            screen: Screen::Search,
            should_quit: false,

            keyword_input,
            video_type: VideoType::All,
            focus: SearchFocus::Input,
            search_state: SearchState::Idle,
            video_list: VideoList::new(Vec::new()),
            analyzing: None,
            modal: None,

            youtube_input: InputField::new("YouTube Data API v3 Key", "AIza...").masked(),
            gemini_input: InputField::new("Gemini API Key", "AIza...").masked(),
            settings_focus: 0,

            status: None,

            services,
            store,
            credentials,
            requests: RequestTracker::new(),

            task_tx: None,
            task_rx: None,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Mouse(mouse) => {
                if self.screen == Screen::Search && self.modal.is_none() {
                    self.video_list.handle_mouse(mouse);
                }
            }
            AppEvent::Tick => {
                self.handle_tick();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        self.status = None;

        if self.modal.is_some() {
            self.handle_modal_key(key);
            return;
        }

        match self.screen {
            Screen::Search => self.handle_search_key(key),
            Screen::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::F(2) {
            self.open_settings(None);
            return;
        }

        match self.focus {
            SearchFocus::Input => match key.code {
                KeyCode::Enter => self.submit_search(),
                KeyCode::Tab => self.video_type = self.video_type.next(),
                KeyCode::Down | KeyCode::Esc if !self.video_list.items.is_empty() => {
                    self.set_focus(SearchFocus::Results);
                }
                _ => {
                    self.keyword_input.handle_key(key);
                }
            },
            SearchFocus::Results => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Enter | KeyCode::Char('a') => self.analyze_selected(),
                KeyCode::Char('/') | KeyCode::Char('i') => self.set_focus(SearchFocus::Input),
                KeyCode::Tab | KeyCode::Char('t') => self.video_type = self.video_type.next(),
                KeyCode::Char('s') => self.open_settings(None),
                KeyCode::Up if self.video_list.is_at_top() => self.set_focus(SearchFocus::Input),
                _ => {
                    self.video_list.handle_key(key);
                }
            },
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                // An outline still in flight has nowhere to land.
                self.requests.cancel(RequestKind::Outline);
                self.modal = None;
            }
            KeyCode::Tab | KeyCode::BackTab => modal.toggle_focus(),
            KeyCode::Left | KeyCode::Up => modal.move_cursor(false),
            KeyCode::Right | KeyCode::Down => modal.move_cursor(true),
            KeyCode::Enter => {
                if let Some(keyword) = modal.highlighted_keyword().map(str::to_string) {
                    self.request_outline(keyword);
                }
            }
            _ => {
                modal.focused_pane().handle_key(key);
            }
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.close_settings(),
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => {
                self.settings_focus = (self.settings_focus + 1) % 2;
                self.youtube_input.focused = self.settings_focus == 0;
                self.gemini_input.focused = self.settings_focus == 1;
            }
            KeyCode::Enter => self.save_settings(),
            _ => {
                if self.settings_focus == 0 {
                    self.youtube_input.handle_key(key);
                } else {
                    self.gemini_input.handle_key(key);
                }
            }
        }
    }

    fn set_focus(&mut self, focus: SearchFocus) {
        self.focus = focus;
        self.keyword_input.focused = focus == SearchFocus::Input;
    }

    fn open_settings(&mut self, notice: Option<&str>) {
        let value = |key: &Option<ApiKey>| key.as_ref().map(|k| k.as_str().to_string());
        self.youtube_input
            .set_value(&value(&self.credentials.youtube).unwrap_or_default());
        self.gemini_input
            .set_value(&value(&self.credentials.gemini).unwrap_or_default());
        self.settings_focus = 0;
        self.youtube_input.focused = true;
        self.gemini_input.focused = false;
        self.status = notice.map(str::to_string);
        self.screen = Screen::Settings;
    }

    fn close_settings(&mut self) {
        self.youtube_input.focused = false;
        self.gemini_input.focused = false;
        self.screen = Screen::Search;
    }

    fn save_settings(&mut self) {
        let credentials = Credentials::new(
            ApiKey::new(self.youtube_input.value.clone()),
            ApiKey::new(self.gemini_input.value.clone()),
        );
        if let Err(e) = self.store.save(&credentials) {
            warn!(error = %e, "saving settings failed");
            self.status = Some(format!("Could not save keys: {e}"));
            return;
        }
        self.credentials = credentials.with_env_fallback();
        info!("settings saved");

        self.close_settings();
        self.status = Some("Settings saved.".to_string());
    }

    fn submit_search(&mut self) {
        if !self.keyword_input.is_valid() {
            return;
        }
        if self.credentials.youtube.is_none() {
            self.open_settings(Some("Set the YouTube API key to search."));
            return;
        }

        if self.requests.in_flight(RequestKind::Search) {
            debug!("superseding in-flight search");
        }
        let ticket = self.requests.begin(RequestKind::Search);
        self.search_state = SearchState::Searching;
        let query = SearchQuery::new(self.keyword_input.value.clone(), self.video_type);
        info!(keyword = %query.keyword, kind = ?query.kind, "search started");

        let Some(tx) = self.task_tx.clone() else {
            return;
        };
        let service = self.services.search.clone();
        let credentials = self.credentials.clone();
        tokio::spawn(async move {
            let result = service.search(&credentials, &query).await;
            let _ = tx.send(TaskMessage::SearchFinished { ticket, result });
        });
    }

    fn analyze_selected(&mut self) {
        let Some(video) = self.video_list.get_selected().cloned() else {
            return;
        };
        if self.credentials.youtube.is_none() || self.credentials.gemini.is_none() {
            self.open_settings(Some("Both API keys are needed to analyze comments."));
            return;
        }

        let ticket = self.requests.begin(RequestKind::Analysis);
        self.analyzing = Some(video.id.clone());
        info!(video_id = %video.id, "analysis started");

        let Some(tx) = self.task_tx.clone() else {
            return;
        };
        let services = self.services.clone();
        let credentials = self.credentials.clone();
        tokio::spawn(async move {
            let result = analyze_video(&services, &credentials, &video).await;
            let _ = tx.send(TaskMessage::AnalysisFinished {
                ticket,
                video: Box::new(video),
                result,
            });
        });
    }

    fn request_outline(&mut self, keyword: String) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };

        let ticket = self.requests.begin(RequestKind::Outline);
        modal.outline = OutlineState::Loading {
            keyword: keyword.clone(),
        };
        modal.outline_pane.set_lines(Vec::new());
        modal.focus = ModalPane::Outline;

        let Some(tx) = self.task_tx.clone() else {
            return;
        };
        let service = self.services.insight.clone();
        let credentials = self.credentials.clone();
        tokio::spawn(async move {
            let result = service.outline(&credentials, &keyword).await;
            let _ = tx.send(TaskMessage::OutlineFinished {
                ticket,
                keyword,
                result,
            });
        });
    }

    fn handle_tick(&mut self) {
        let mut messages = Vec::new();
        if let Some(rx) = &mut self.task_rx {
            while let Ok(message) = rx.try_recv() {
                messages.push(message);
            }
        }

        for message in messages {
            self.apply(message);
        }
    }

    /// Commit a finished request, unless a newer one of the same kind has
    /// been started since.
    pub fn apply(&mut self, message: TaskMessage) {
        match message {
            TaskMessage::SearchFinished { ticket, result } => {
                if !self.requests.finish(RequestKind::Search, ticket) {
                    debug!(?ticket, "discarding stale search result");
                    return;
                }

                match result {
                    Ok(mut videos) => {
                        rank_by_efficiency(&mut videos);
                        let has_results = !videos.is_empty();
                        self.video_list.update_items(videos);
                        self.search_state = SearchState::Results;
                        if has_results {
                            self.set_focus(SearchFocus::Results);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "search failed");
                        self.video_list.update_items(Vec::new());
                        self.search_state = SearchState::Failed(e.to_string());
                        self.set_focus(SearchFocus::Input);
                    }
                }
            }
            TaskMessage::AnalysisFinished {
                ticket,
                video,
                result,
            } => {
                if !self.requests.finish(RequestKind::Analysis, ticket) {
                    debug!(?ticket, "discarding stale analysis result");
                    return;
                }
                self.analyzing = None;

                match result {
                    Ok(analysis) => {
                        self.requests.cancel(RequestKind::Outline);
                        self.modal = Some(AnalysisModal::new(*video, analysis));
                    }
                    Err(e) => {
                        warn!(error = %e, "analysis failed");
                        self.status = Some(format!("Analysis failed: {e}"));
                    }
                }
            }
            TaskMessage::OutlineFinished {
                ticket,
                keyword,
                result,
            } => {
                if !self.requests.finish(RequestKind::Outline, ticket) {
                    debug!(?ticket, "discarding stale outline result");
                    return;
                }
                let Some(modal) = self.modal.as_mut() else {
                    return;
                };

                match result {
                    Ok(outline) => {
                        modal.outline = OutlineState::Ready { keyword, outline };
                    }
                    Err(e) => {
                        warn!(error = %e, "outline failed");
                        modal.outline = OutlineState::KeywordUnselected;
                        self.status = Some(format!("Outline generation failed: {e}"));
                    }
                }
            }
        }
    }
}

async fn analyze_video(
    services: &Services,
    credentials: &Credentials,
    video: &VideoRecord,
) -> Result<AnalysisResult> {
    let comments = services
        .comments
        .fetch_comments(credentials, &video.id)
        .await?;
    services
        .insight
        .analyze(credentials, &comments, &video.title)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChannelPolicy, Chapter};
    use crate::error::Error;
    use crate::tui::tasks::Ticket;
    use crate::tui::ui;
    use ratatui::{Terminal, backend::TestBackend};

    fn app_in(dir: std::path::PathBuf, credentials: Credentials) -> App {
        let store = KeyStore::open(dir).unwrap();
        let services = Services::new("test-model", ChannelPolicy::Abort).unwrap();
        App::new(services, store, credentials)
    }

    fn app(credentials: Credentials) -> App {
        let dir = std::env::temp_dir().join(format!("insightminer-app-{}", std::process::id()));
        app_in(dir, credentials)
    }

    fn open_modal(app: &mut App, analysis: AnalysisResult) {
        let ticket = app.requests.begin(RequestKind::Analysis);
        app.apply(TaskMessage::AnalysisFinished {
            ticket,
            video: Box::new(video("a", 1.0)),
            result: Ok(analysis),
        });
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn keyed() -> Credentials {
        Credentials::new(ApiKey::new("yt"), ApiKey::new("gm"))
    }

    fn video(id: &str, ratio: f64) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: format!("title {id}"),
            thumbnail: String::new(),
            channel_title: String::new(),
            channel_id: String::new(),
            view_count: 0,
            subscriber_count: 1,
            efficiency_ratio: ratio,
            comment_count: 0,
            published_at: String::new(),
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            sentiment: "good".to_string(),
            common_keywords: vec![],
            user_needs: vec![],
            suggested_topics: vec![],
            recommended_keywords: ["a", "b", "c", "d", "e"].map(String::from).to_vec(),
        }
    }

    fn outline() -> OutlineResult {
        OutlineResult {
            title: "t".to_string(),
            hook: "h".to_string(),
            chapters: vec![Chapter {
                title: "c".to_string(),
                detail: "d".to_string(),
            }],
            cta: "cta".to_string(),
        }
    }

    fn search_done(ticket: Ticket, ids: &[(&str, f64)]) -> TaskMessage {
        TaskMessage::SearchFinished {
            ticket,
            result: Ok(ids.iter().map(|(id, r)| video(id, *r)).collect()),
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn results_are_ranked_on_arrival() {
        let mut app = app(keyed());
        let ticket = app.requests.begin(RequestKind::Search);

        app.apply(search_done(ticket, &[("low", 0.5), ("high", 12.0), ("mid", 3.0)]));

        let ids: Vec<&str> = app.video_list.items.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["high", "mid", "low"]);
        assert_eq!(app.search_state, SearchState::Results);
        assert_eq!(app.focus, SearchFocus::Results);
    }

    #[test]
    fn stale_search_cannot_overwrite_newer_one() {
        let mut app = app(keyed());
        let first = app.requests.begin(RequestKind::Search);
        let second = app.requests.begin(RequestKind::Search);

        app.apply(search_done(second, &[("fresh", 1.0)]));
        app.apply(search_done(first, &[("stale", 9.0)]));

        assert_eq!(app.video_list.items.len(), 1);
        assert_eq!(app.video_list.items[0].id, "fresh");
    }

    #[test]
    fn search_failure_replaces_list_with_error() {
        let mut app = app(keyed());
        let ticket = app.requests.begin(RequestKind::Search);
        app.apply(search_done(ticket, &[("a", 1.0)]));

        let ticket = app.requests.begin(RequestKind::Search);
        app.apply(TaskMessage::SearchFinished {
            ticket,
            result: Err(Error::Upstream {
                status: Some(403),
                message: "quota".to_string(),
            }),
        });

        assert_eq!(app.search_state, SearchState::Failed("quota".to_string()));
        assert!(app.video_list.items.is_empty());
    }

    #[test]
    fn analysis_failure_leaves_card_untouched() {
        let mut app = app(keyed());
        let ticket = app.requests.begin(RequestKind::Analysis);
        app.analyzing = Some("a".to_string());

        app.apply(TaskMessage::AnalysisFinished {
            ticket,
            video: Box::new(video("a", 1.0)),
            result: Err(Error::parse("bad")),
        });

        assert!(app.modal.is_none());
        assert!(app.analyzing.is_none());
        assert!(app.status.as_deref().unwrap().starts_with("Analysis failed"));
    }

    #[test]
    fn outline_lifecycle_in_modal() {
        let mut app = app(keyed());
        let ticket = app.requests.begin(RequestKind::Analysis);
        app.apply(TaskMessage::AnalysisFinished {
            ticket,
            video: Box::new(video("a", 1.0)),
            result: Ok(analysis()),
        });
        let modal = app.modal.as_ref().unwrap();
        assert_eq!(modal.outline, OutlineState::KeywordUnselected);

        app.handle_event(key(KeyCode::Right)).unwrap();
        app.handle_event(key(KeyCode::Enter)).unwrap();
        let modal = app.modal.as_ref().unwrap();
        assert_eq!(modal.selected_keyword(), Some("b"));
        assert!(matches!(modal.outline, OutlineState::Loading { .. }));
        assert!(app.requests.in_flight(RequestKind::Outline));

        // The task sender is absent in tests, so finish by hand.
        let ticket = app.requests.begin(RequestKind::Outline);
        app.apply(TaskMessage::OutlineFinished {
            ticket,
            keyword: "b".to_string(),
            result: Ok(outline()),
        });
        let modal = app.modal.as_ref().unwrap();
        assert!(matches!(modal.outline, OutlineState::Ready { .. }));

        app.handle_event(key(KeyCode::Esc)).unwrap();
        assert!(app.modal.is_none());
    }

    #[test]
    fn outline_arriving_after_close_is_dropped() {
        let mut app = app(keyed());
        let ticket = app.requests.begin(RequestKind::Analysis);
        app.apply(TaskMessage::AnalysisFinished {
            ticket,
            video: Box::new(video("a", 1.0)),
            result: Ok(analysis()),
        });
        app.handle_event(key(KeyCode::Enter)).unwrap();
        app.handle_event(key(KeyCode::Esc)).unwrap();
        assert!(!app.requests.in_flight(RequestKind::Outline));
    }

    #[test]
    fn search_without_key_opens_settings() {
        let mut app = app(Credentials::default());
        app.keyword_input.set_value("camping");

        app.handle_event(key(KeyCode::Enter)).unwrap();

        assert_eq!(app.screen, Screen::Settings);
        assert_eq!(app.search_state, SearchState::Idle);
        assert!(!app.requests.in_flight(RequestKind::Search));
    }

    #[test]
    fn tab_cycles_video_type() {
        let mut app = app(keyed());
        app.handle_event(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.video_type, VideoType::Long);
        app.handle_event(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.video_type, VideoType::Shorts);
        app.handle_event(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.video_type, VideoType::All);
    }

    #[test]
    fn analysis_pane_scrolls_to_last_topic() {
        let mut app = app(keyed());
        let items = |prefix: &str| (1..=5).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>();
        open_modal(
            &mut app,
            AnalysisResult {
                sentiment: "mostly positive ".repeat(8),
                common_keywords: items("COMMON"),
                user_needs: items("NEED"),
                suggested_topics: items("TOPIC"),
                recommended_keywords: ["a", "b", "c", "d", "e"].map(String::from).to_vec(),
            },
        );
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|f| ui::draw(f, &mut app)).unwrap();
        assert!(!screen_text(&terminal).contains("TOPIC5"));

        app.handle_event(key(KeyCode::End)).unwrap();
        terminal.draw(|f| ui::draw(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("TOPIC5"));
    }

    #[test]
    fn tab_switches_scrolled_pane() {
        let mut app = app(keyed());
        open_modal(&mut app, analysis());
        assert_eq!(app.modal.as_ref().unwrap().focus, ModalPane::Analysis);

        app.handle_event(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.modal.as_ref().unwrap().focus, ModalPane::Outline);

        app.handle_event(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.modal.as_ref().unwrap().focus, ModalPane::Analysis);
    }

    #[test]
    fn failed_save_keeps_settings_open() {
        let dir = std::env::temp_dir().join(format!(
            "insightminer-app-save-{}",
            std::process::id()
        ));
        let mut app = app_in(dir.clone(), Credentials::default());
        // A directory where the credentials file belongs makes the write fail.
        std::fs::create_dir_all(dir.join("credentials.json")).unwrap();

        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE)))
            .unwrap();
        app.youtube_input.set_value("yt-key");
        app.handle_event(key(KeyCode::Enter)).unwrap();

        assert_eq!(app.screen, Screen::Settings);
        assert!(app.status.as_deref().unwrap().starts_with("Could not save keys"));
        assert!(app.credentials.youtube.is_none());
    }
}
