use crate::assembly::{self, OutputPaths};
use crate::config::PodcastConfig;
use crate::dispatcher::{FragmentDispatcher, FragmentOutcome, FragmentResult};
use crate::error::{PodgenError, PodgenResult};
use crate::llm::{ImageGenerator, TextGenerator};
use crate::prompt::PromptRegistry;
use crate::refiner::MusicMergeRefiner;
use crate::script::PodcastScript;
use crate::synthesizer::ScriptSynthesizer;
use crate::tts::SpeechRenderer;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// External services the pipeline talks to.
pub struct Collaborators {
    pub text: Arc<dyn TextGenerator>,
    pub speech: Arc<dyn SpeechRenderer>,
    /// `None` produces audio only.
    pub image: Option<Arc<dyn ImageGenerator>>,
}

/// Files produced by one pipeline run.
#[derive(Debug)]
pub struct PodcastOutput {
    pub title: String,
    pub script_path: String,
    pub audio_path: String,
    pub video_path: Option<String>,
    pub fragments_rendered: usize,
    pub fragments_failed: usize,
}

/// Synthesize a script, then optionally let the editor merge music into it.
///
/// Generation calls block on HTTP, so both stages run on one blocking thread,
/// strictly one after the other.
pub async fn write_script(
    config: &PodcastConfig,
    text: Arc<dyn TextGenerator>,
    merge_music: bool,
) -> PodgenResult<PodcastScript> {
    config.validate()?;
    let podcast = config.podcast.clone();
    let participants = config.participants.clone();
    let sponsors = config.sponsors.clone();

    tokio::task::spawn_blocking(move || -> PodgenResult<PodcastScript> {
        let prompts = PromptRegistry::new()?;

        let script = ScriptSynthesizer::new(text.as_ref(), &prompts).synthesize(
            &podcast.name,
            &podcast.title,
            &participants,
            &sponsors,
        )?;
        eprintln!(
            "{} Script \"{}\": {} dialogue line(s)",
            "podgen:".cyan().bold(),
            script.title,
            script.dialogue_count()
        );

        if !merge_music {
            return Ok(script);
        }
        let merged = MusicMergeRefiner::new(text.as_ref(), &prompts).merge_music(&script)?;
        eprintln!(
            "{} Music merge: {} cue(s)",
            "podgen:".cyan().bold(),
            merged.music_cue_count()
        );
        Ok(merged)
    })
    .await
    .map_err(|e| PodgenError::Other(format!("script task aborted: {e}")))?
}

/// Write the script as pretty JSON next to the other outputs.
pub fn save_script(script: &PodcastScript, path: &Path) -> PodgenResult<()> {
    let json = serde_json::to_string_pretty(script)
        .map_err(|e| PodgenError::Other(format!("Failed to serialize script: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Render every dialogue line of `script` into `fragment_dir`.
pub async fn render_fragments(
    script: &PodcastScript,
    speech: Arc<dyn SpeechRenderer>,
    fragment_dir: &Path,
) -> PodgenResult<Vec<FragmentResult>> {
    eprintln!(
        "{} Rendering {} fragment(s) with {}",
        "podgen:".cyan().bold(),
        script.dialogue_count(),
        speech.engine_name()
    );
    let results = FragmentDispatcher::new(speech, fragment_dir)
        .dispatch(script)
        .await?;

    for result in &results {
        if let FragmentOutcome::Failed(reason) = &result.outcome {
            eprintln!("  Fragment {}: failed ({})", result.index, reason);
        }
    }
    Ok(results)
}

/// Run the whole pipeline for `config`, writing into `output_dir`.
pub async fn produce(
    config: &PodcastConfig,
    collaborators: Collaborators,
    output_dir: &Path,
) -> PodgenResult<PodcastOutput> {
    eprintln!(
        "{} Producing \"{}\" for {} with {} participant(s)",
        "podgen:".cyan().bold(),
        config.podcast.title,
        config.podcast.name,
        config.participants.len()
    );
    std::fs::create_dir_all(output_dir)?;

    let script = write_script(config, collaborators.text.clone(), true).await?;
    let paths = OutputPaths::new(output_dir, &script.title);
    let script_path = paths.audio.with_extension("json");
    save_script(&script, &script_path)?;

    let results = render_fragments(&script, collaborators.speech, &paths.fragments).await?;
    let rendered = results.iter().filter(|r| r.is_rendered()).count();
    let failed = results.len() - rendered;

    let inputs = assembly::plan_inputs(
        &results,
        config.output.missing_fragment,
        config.output.silence_secs,
    );
    assembly::concat_audio(
        config.output.intro.as_deref(),
        config.output.intro_gap_secs,
        inputs,
        &paths.audio,
    )?;
    eprintln!(
        "{} Audio: {}",
        "podgen:".cyan().bold(),
        paths.audio.display()
    );

    let video_path = match collaborators.image {
        Some(image) => Some(make_video(config, image, &script.title, &paths).await?),
        None => None,
    };

    Ok(PodcastOutput {
        title: script.title,
        script_path: script_path.display().to_string(),
        audio_path: paths.audio.display().to_string(),
        video_path: video_path.map(|p| p.display().to_string()),
        fragments_rendered: rendered,
        fragments_failed: failed,
    })
}

async fn make_video(
    config: &PodcastConfig,
    image: Arc<dyn ImageGenerator>,
    title: &str,
    paths: &OutputPaths,
) -> PodgenResult<PathBuf> {
    let prompt = title.to_string();
    let cover = paths.cover.clone();
    let timeout = Duration::from_secs(config.llm.timeout_secs);
    tokio::task::spawn_blocking(move || -> PodgenResult<()> {
        let url = image.generate_image(&prompt)?;
        assembly::download_cover(&url, &cover, timeout)
    })
    .await
    .map_err(|e| PodgenError::Other(format!("cover task aborted: {e}")))??;

    assembly::mux_video(&paths.cover, &paths.audio, &paths.video, config.output.fps)?;
    eprintln!(
        "{} Video: {}",
        "podgen:".cyan().bold(),
        paths.video.display()
    );
    Ok(paths.video.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PodcastInfo;
    use crate::dispatcher::tests::MockRenderer;
    use crate::script::{Segment, SegmentKind};
    use crate::synthesizer::tests::{script_json, tea_participants, ScriptedGenerator};

    fn tea_config() -> PodcastConfig {
        PodcastConfig {
            podcast: PodcastInfo {
                name: "Steeped".into(),
                title: "History of Tea".into(),
            },
            participants: tea_participants(),
            sponsors: vec![],
            ..PodcastConfig::demo()
        }
    }

    fn tea_lines() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("Ada", "v1", "Welcome to Steeped!"),
            ("Bo", "v2", "Legend says tea began with a leaf in a pot of boiling water."),
            ("Ada", "v1", "And then it conquered the world."),
            ("Bo", "v2", "Thanks for listening."),
        ]
    }

    /// The draft with a music cue before the first and after the last line.
    fn merged_json(draft: &str) -> String {
        let cue = serde_json::json!({
            "music_theme": "gentle guitar",
            "mode": "background",
            "volume_level": 0.4,
            "what_percentage": 0.1
        });
        let mut value: serde_json::Value = serde_json::from_str(draft).unwrap();
        let mut conversation = vec![cue.clone()];
        conversation.extend(value["conversation"].as_array().unwrap().iter().cloned());
        conversation.push(cue);
        value["conversation"] = serde_json::Value::Array(conversation);
        value.to_string()
    }

    #[tokio::test]
    async fn test_history_of_tea_end_to_end() {
        let draft = script_json(&tea_lines());
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(format!("Here you go:\n{draft}")),
            Ok(merged_json(&draft)),
        ]));

        let script = write_script(&tea_config(), generator.clone(), true)
            .await
            .unwrap();
        assert_eq!(generator.requests.lock().unwrap().len(), 2);

        let kinds: Vec<SegmentKind> = script.conversation.iter().map(Segment::kind).collect();
        assert_eq!(kinds.first(), Some(&SegmentKind::Music));
        assert_eq!(kinds.last(), Some(&SegmentKind::Music));
        assert_eq!(script.dialogue_count(), 4);

        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(dir.path(), &script.title);
        let script_path = paths.audio.with_extension("json");
        save_script(&script, &script_path).unwrap();
        let reloaded = std::fs::read_to_string(&script_path).unwrap();
        assert!(reloaded.contains("\"speakers_name\": \"Bo\""));

        let results = render_fragments(&script, Arc::new(MockRenderer::new()), &paths.fragments)
            .await
            .unwrap();
        // Dialogue sits at conversation indices 1..=4, between the two cues.
        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert!(results.iter().all(FragmentResult::is_rendered));

        let first = std::fs::read_to_string(paths.fragments.join("1.mp3")).unwrap();
        assert_eq!(first, "v1: Welcome to Steeped!");
        let last = std::fs::read_to_string(paths.fragments.join("4.mp3")).unwrap();
        assert_eq!(last, "v2: Thanks for listening.");
    }

    #[tokio::test]
    async fn test_write_script_without_merge() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(script_json(&tea_lines()))]));
        let script = write_script(&tea_config(), generator.clone(), false)
            .await
            .unwrap();
        assert_eq!(script.music_cue_count(), 0);
        assert_eq!(generator.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_write_script_rejects_invalid_config() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let mut config = tea_config();
        config.participants.clear();

        let err = write_script(&config, generator.clone(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, PodgenError::InvalidRequest(_)));
        assert!(generator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_script_generation_error_is_fatal() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(PodgenError::Generation(
            "HTTP 500".into(),
        ))]));
        let err = write_script(&tea_config(), generator, true)
            .await
            .unwrap_err();
        assert!(matches!(err, PodgenError::Generation(_)));
    }
}
