use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "podgen",
    about = "Generate a podcast episode from a title: LLM-written script, AI voices, FFmpeg assembly",
    version,
    after_help = "\x1b[1mExamples:\x1b[0m
  podgen                              Produce the built-in demo episode into ./output
  podgen init ./tea-show              Create a starter podcast.toml
  podgen generate ./tea-show          Produce the episode described in podcast.toml
  podgen script ./tea-show -o tea.json   Write the script only
  podgen script ./tea-show --no-merge    Dialogue only, skip the music pass"
)]
pub struct Cli {
    /// Without a subcommand the built-in demo episode is produced.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter podcast.toml
    Init {
        /// Directory to hold podcast.toml
        path: PathBuf,
    },
    /// Run the full pipeline: script, music merge, voices, audio and video
    Generate {
        /// Directory containing podcast.toml
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Generate the script JSON without rendering any audio
    Script {
        /// Directory containing podcast.toml
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Skip the music merge pass
        #[arg(long)]
        no_merge: bool,

        /// Write the script to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}
