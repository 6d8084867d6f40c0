use crate::config::{self, PodcastConfig, CONFIG_FILE};
use crate::error::{PodgenError, PodgenResult};
use colored::*;
use std::path::{Path, PathBuf};

const ENV_TEMPLATE: &str = "\
# Credentials read by podgen. Keep this file out of version control.
OPENAI_API_KEY=
REPLICATE_API_TOKEN=
# ELEVEN_API_KEY=
";

/// Write a starter `podcast.toml` (the demo request) and a `.env.example`.
pub fn create_show(path: &Path) -> PodgenResult<Vec<PathBuf>> {
    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(PodgenError::AlreadyInitialized(config_path));
    }

    std::fs::create_dir_all(path)?;
    config::save_config(path, &PodcastConfig::demo())?;

    let env_path = path.join(".env.example");
    std::fs::write(&env_path, ENV_TEMPLATE)?;

    Ok(vec![config_path, env_path])
}

/// CLI entry point for `podgen init PATH`.
pub fn run(path: &Path) -> PodgenResult<()> {
    let files = create_show(path)?;

    eprintln!(
        "{} Created podcast at {}",
        "done:".green().bold(),
        path.display()
    );
    for file in &files {
        eprintln!("  {}", file.display());
    }
    eprintln!();
    eprintln!(
        "Next: edit {}, copy .env.example to .env, then run:",
        CONFIG_FILE.cyan()
    );
    eprintln!("  podgen generate {}", path.display());

    Ok(())
}
