use crate::config::{self, PodcastConfig};
use crate::error::PodgenResult;
use crate::llm::openai::OpenAiClient;
use crate::llm::ImageGenerator;
use crate::pipeline::{self, Collaborators, PodcastOutput};
use crate::tts::{self, SpeechRenderer};
use colored::*;
use std::path::Path;
use std::sync::Arc;

/// Build the vendor clients named by `config`. Credentials are read here, once.
pub fn build_collaborators(config: &PodcastConfig) -> PodgenResult<Collaborators> {
    let openai = Arc::new(OpenAiClient::from_env(&config.llm, &config.image)?);
    let speech: Arc<dyn SpeechRenderer> = Arc::from(tts::create_renderer(&config.voice)?);
    let image = if config.image.enabled {
        Some(openai.clone() as Arc<dyn ImageGenerator>)
    } else {
        None
    };

    Ok(Collaborators {
        text: openai,
        speech,
        image,
    })
}

/// Resolve paths in `config` that are relative to the project directory.
fn anchor_paths(config: &mut PodcastConfig, base: &Path) {
    if let Some(intro) = config.output.intro.as_mut() {
        if intro.is_relative() {
            *intro = base.join(&*intro);
        }
    }
}

/// Programmatic entry point: produce the episode described by `config`.
pub async fn generate_podcast(mut config: PodcastConfig, base: &Path) -> PodgenResult<PodcastOutput> {
    config.validate()?;
    anchor_paths(&mut config, base);
    let collaborators = build_collaborators(&config)?;
    let output_dir = config.output_dir(base);
    pipeline::produce(&config, collaborators, &output_dir).await
}

/// CLI entry point for `podgen generate PATH`.
pub async fn run(path: &Path) -> PodgenResult<()> {
    let config = config::load_config(path)?;
    let _ = dotenvy::from_path(path.join(".env"));
    let output = generate_podcast(config, path).await?;
    report(&output);
    Ok(())
}

/// CLI entry point for bare `podgen`: the built-in demo request.
pub async fn run_demo() -> PodgenResult<()> {
    let _ = dotenvy::dotenv();
    let output = generate_podcast(PodcastConfig::demo(), Path::new(".")).await?;
    report(&output);
    Ok(())
}

fn report(output: &PodcastOutput) {
    eprintln!(
        "{} \"{}\": {} fragment(s) rendered, {} failed",
        "done:".green().bold(),
        output.title,
        output.fragments_rendered,
        output.fragments_failed
    );
    eprintln!("  {}", output.script_path);
    eprintln!("  {}", output.audio_path);
    if let Some(video) = &output.video_path {
        eprintln!("  {video}");
    }
}
