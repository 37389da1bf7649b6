use crate::core::{DEFAULT_CONFIG_DIR, DEFAULT_MODEL, VideoType, extract_video_id};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "insightminer")]
#[command(about = "Find videos that outperform their channel and mine their comments")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding credentials and logs
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Generation model name
    #[arg(long, global = true, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Keep results when the channel lookup fails, counting one subscriber per channel
    #[arg(long, global = true)]
    pub lenient_channels: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search videos by keyword, ranked by views per subscriber
    Search {
        /// Search keyword
        keyword: String,

        /// Duration filter
        #[arg(short = 't', long = "type", value_enum, default_value_t = VideoType::All)]
        kind: VideoType,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Summarize a video's comments and suggest follow-up keywords
    Analyze {
        /// Video URL or video ID
        #[arg(value_parser = parse_video_id)]
        video: String,

        /// Video title used in the prompt (looked up when omitted)
        #[arg(long)]
        title: Option<String>,

        /// Also draft an outline for the N-th recommended keyword (1-5)
        #[arg(long, value_name = "N")]
        outline: Option<usize>,

        /// Print JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Draft a video outline for a keyword
    Outline {
        keyword: String,

        /// Print JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Manage stored API keys
    Keys(KeysArgs),

    /// Open TUI interface
    Tui,
}

#[derive(Args)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub action: KeysAction,
}

#[derive(Subcommand)]
pub enum KeysAction {
    /// Store one or both keys
    Set {
        /// Video platform data API key
        #[arg(long)]
        youtube: Option<String>,

        /// Generation API key
        #[arg(long)]
        gemini: Option<String>,
    },

    /// Show which keys are configured (masked)
    Show,
}

/// Accept a watch/short/embed URL or a bare id and keep only the id.
fn parse_video_id(input: &str) -> Result<String, String> {
    extract_video_id(input).ok_or_else(|| format!("not a video URL or ID: {input:?}"))
}
