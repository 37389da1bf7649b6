mod cli;
mod core;
mod error;
mod logging;
mod output;
mod tui;

use crate::cli::{Cli, Commands, KeysAction};
use crate::core::{
    ApiKey, ChannelPolicy, Credentials, KeyStore, SearchQuery, Services, VideoType,
    rank_by_efficiency,
};
use crate::error::{Error, Result};
use crate::tui::{App, EventHandler, init as tui_init, restore as tui_restore, ui};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = KeyStore::open(&cli.config_dir)?;
    let policy = if cli.lenient_channels {
        ChannelPolicy::Degrade
    } else {
        ChannelPolicy::Abort
    };

    match cli.command {
        Some(Commands::Search { keyword, kind, json }) => {
            logging::init_stderr(&cli.log_level);
            let services = Services::new(&cli.model, policy)?;
            run_cli_search(&services, &store, keyword, kind, json).await?;
        }
        Some(Commands::Analyze {
            video,
            title,
            outline,
            json,
        }) => {
            logging::init_stderr(&cli.log_level);
            let services = Services::new(&cli.model, policy)?;
            run_cli_analyze(&services, &store, video, title, outline, json).await?;
        }
        Some(Commands::Outline { keyword, json }) => {
            logging::init_stderr(&cli.log_level);
            let services = Services::new(&cli.model, policy)?;
            run_cli_outline(&services, &store, keyword, json).await?;
        }
        Some(Commands::Keys(args)) => {
            logging::init_stderr(&cli.log_level);
            run_cli_keys(&store, args.action)?;
        }
        Some(Commands::Tui) | None => {
            let _guard = logging::init_file(&cli.log_level, store.dir())?;
            let services = Services::new(&cli.model, policy)?;
            run_tui(services, store).await?;
        }
    }

    Ok(())
}

fn load_credentials(store: &KeyStore) -> Result<Credentials> {
    Ok(store.load()?.with_env_fallback())
}

async fn run_cli_search(
    services: &Services,
    store: &KeyStore,
    keyword: String,
    kind: VideoType,
    json: bool,
) -> Result<()> {
    let credentials = load_credentials(store)?;
    let query = SearchQuery::new(keyword, kind);

    let mut videos = services.search.search(&credentials, &query).await?;
    rank_by_efficiency(&mut videos);

    if json {
        println!("{}", serde_json::to_string_pretty(&videos)?);
        return Ok(());
    }

    if videos.is_empty() {
        println!("No videos found for \"{}\".", query.keyword.trim());
        return Ok(());
    }

    println!(
        "Found {} videos for \"{}\" ({})",
        videos.len(),
        query.keyword.trim(),
        kind.label()
    );
    println!();
    println!("{}", output::video_table(&videos));

    Ok(())
}

async fn run_cli_analyze(
    services: &Services,
    store: &KeyStore,
    video_id: String,
    title: Option<String>,
    outline_index: Option<usize>,
    json: bool,
) -> Result<()> {
    let credentials = load_credentials(store)?;
    // Fail before touching the network when either key is missing.
    credentials.youtube()?;
    credentials.gemini()?;

    if let Some(n) = outline_index
        && !(1..=core::RECOMMENDED_KEYWORDS).contains(&n)
    {
        return Err(Error::custom(format!(
            "--outline must be between 1 and {}",
            core::RECOMMENDED_KEYWORDS
        )));
    }

    let title = match title {
        Some(title) => title,
        None => services
            .search
            .fetch_video(&credentials, &video_id)
            .await?
            .map(|video| video.title)
            .ok_or_else(|| Error::custom(format!("Video {video_id} not found")))?,
    };

    info!(%video_id, "analyzing comments");
    let comments = services
        .comments
        .fetch_comments(&credentials, &video_id)
        .await?;
    let analysis = services
        .insight
        .analyze(&credentials, &comments, &title)
        .await?;

    let outline = match outline_index {
        Some(n) => {
            let keyword = &analysis.recommended_keywords[n - 1];
            Some(services.insight.outline(&credentials, keyword).await?)
        }
        None => None,
    };

    if json {
        let doc = serde_json::json!({
            "videoId": video_id,
            "title": title,
            "commentCount": comments.len(),
            "analysis": analysis,
            "outline": outline,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{}", output::analysis_text(&title, &analysis));
    if let Some(outline) = outline {
        println!();
        println!("{}", output::outline_text(&outline));
    }

    Ok(())
}

async fn run_cli_outline(
    services: &Services,
    store: &KeyStore,
    keyword: String,
    json: bool,
) -> Result<()> {
    let credentials = load_credentials(store)?;
    let outline = services.insight.outline(&credentials, &keyword).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outline)?);
    } else {
        println!("{}", output::outline_text(&outline));
    }

    Ok(())
}

fn run_cli_keys(store: &KeyStore, action: KeysAction) -> Result<()> {
    match action {
        KeysAction::Set { youtube, gemini } => {
            if youtube.is_none() && gemini.is_none() {
                return Err(Error::custom("Nothing to set; pass --youtube and/or --gemini"));
            }

            let mut credentials = store.load()?;
            if let Some(value) = youtube {
                credentials.youtube = ApiKey::new(value);
            }
            if let Some(value) = gemini {
                credentials.gemini = ApiKey::new(value);
            }

            let path = store.save(&credentials)?;
            println!("Keys saved to: {}", path.display());
        }
        KeysAction::Show => {
            let stored = store.load()?;
            let effective = stored.clone().with_env_fallback();

            for (name, stored, effective) in [
                (core::YOUTUBE_KEY_NAME, &stored.youtube, &effective.youtube),
                (core::GEMINI_KEY_NAME, &stored.gemini, &effective.gemini),
            ] {
                let status = match (stored, effective) {
                    (Some(key), _) => key.masked(),
                    (None, Some(key)) => format!("{} (from environment)", key.masked()),
                    (None, None) => "not set".to_string(),
                };
                println!("{name:<16} {status}");
            }
        }
    }

    Ok(())
}

async fn run_tui(services: Services, store: KeyStore) -> Result<()> {
    let credentials = load_credentials(&store)?;

    // Initialize terminal
    let mut terminal = tui_init()?;

    let mut app = App::new(services, store, credentials);
    let event_handler = EventHandler::new();

    // Background results flow back over this channel
    let (tx, rx) = mpsc::unbounded_channel();
    app.task_tx = Some(tx);
    app.task_rx = Some(rx);

    let outcome = loop {
        let event = match event_handler.next_event() {
            Ok(event) => event,
            Err(e) => break Err(e),
        };
        if let Err(e) = app.handle_event(event) {
            break Err(e);
        }

        if let Err(e) = terminal.draw(|f| ui::draw(f, &mut app)) {
            break Err(e.into());
        }

        if app.should_quit {
            break Ok(());
        }
    };

    // Restore terminal
    tui_restore()?;
    outcome
}
