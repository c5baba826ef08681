use clap::{Args, Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

/// Analyze coding videos and their repositories for monetization potential
#[derive(Parser, Debug)]
#[command(
    name = "reelforge",
    about = "Analyze coding videos and their repositories for monetization potential",
    version,
    author,
    long_about = "reelforge takes a YouTube video, a channel or a GitHub repository, \
                  analyzes the video and the repositories it references, builds the \
                  application, measures technology trends and proposes ranked \
                  monetization strategies. Every run produces a combined report of \
                  each task's outcome."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only errors are logged"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the full pipeline for one video",
        long_about = "Analyzes a single YouTube video, the GitHub repositories it \
                      references, builds the primary one and proposes monetization \
                      strategies.\n\n\
                      Examples:\n  \
                      reelforge video dQw4w9WgXcQ\n  \
                      reelforge video dQw4w9WgXcQ --format json --output report.json"
    )]
    Video(VideoArgs),

    #[command(
        about = "Run the pipeline for a channel's recent uploads",
        long_about = "Lists a channel's most recent uploads and runs one independent \
                      pipeline per video.\n\n\
                      Examples:\n  \
                      reelforge channel UC_x5XG1OV2P6uZZ5FSM9Ttw --max-videos 3"
    )]
    Channel(ChannelArgs),

    #[command(
        about = "Run the pipeline for a repository without a video",
        long_about = "Analyzes a GitHub repository directly. Video analysis is replaced \
                      by a placeholder derived from the repository.\n\n\
                      Examples:\n  \
                      reelforge repo https://github.com/tokio-rs/tokio"
    )]
    Repo(RepoArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

/// Options shared by every pipeline command
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Overall run timeout in seconds (overrides REELFORGE_RUN_TIMEOUT)"
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'b',
        long,
        value_parser = parse_adapter_kind,
        help = "LLM provider for strategy generation (overrides REELFORGE_PROVIDER)"
    )]
    pub backend: Option<AdapterKind>,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model name (overrides REELFORGE_MODEL)"
    )]
    pub model: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct VideoArgs {
    #[arg(value_name = "VIDEO_ID", help = "YouTube video id")]
    pub video_id: String,

    #[command(flatten)]
    pub run: RunOptions,
}

#[derive(Args, Debug, Clone)]
pub struct ChannelArgs {
    #[arg(value_name = "CHANNEL_ID", help = "YouTube channel id")]
    pub channel_id: String,

    #[arg(
        long,
        value_name = "N",
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..=50),
        help = "Number of recent uploads to analyze"
    )]
    pub max_videos: u64,

    #[command(flatten)]
    pub run: RunOptions,
}

#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    #[arg(value_name = "URL", help = "GitHub repository URL or owner/name")]
    pub url: String,

    #[command(flatten)]
    pub run: RunOptions,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    crate::config::parse_provider(s).map_err(|e| e.to_string())
}
