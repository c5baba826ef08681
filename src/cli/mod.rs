pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{ChannelArgs, CliArgs, Commands, ConfigArgs, RepoArgs, RunOptions, VideoArgs};
pub use output::{OutputFormat, OutputFormatter};
