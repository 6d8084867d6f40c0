use crate::config;
use crate::error::{PodgenError, PodgenResult};
use crate::llm::openai::OpenAiClient;
use crate::pipeline;
use colored::*;
use std::path::Path;
use std::sync::Arc;

/// CLI entry point for `podgen script`: print or save the generated script.
pub async fn run(path: &Path, merge_music: bool, output: Option<&Path>) -> PodgenResult<()> {
    let config = config::load_config(path)?;
    let _ = dotenvy::from_path(path.join(".env"));

    let client = Arc::new(OpenAiClient::from_env(&config.llm, &config.image)?);
    let script = pipeline::write_script(&config, client, merge_music).await?;

    match output {
        Some(file) => {
            pipeline::save_script(&script, file)?;
            eprintln!(
                "{} Wrote \"{}\" to {}",
                "done:".green().bold(),
                script.title,
                file.display()
            );
        }
        None => {
            let json = serde_json::to_string_pretty(&script)
                .map_err(|e| PodgenError::Other(format!("Failed to serialize script: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}
