use crate::error::PodgenResult;
use crate::script::{PodcastScript, Segment};
use crate::tts::SpeechRenderer;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    Rendered(PathBuf),
    Failed(String),
}

/// Render result for the dialogue segment at `index` of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentResult {
    pub index: usize,
    pub outcome: FragmentOutcome,
}

impl FragmentResult {
    pub fn path(&self) -> Option<&Path> {
        match &self.outcome {
            FragmentOutcome::Rendered(path) => Some(path),
            FragmentOutcome::Failed(_) => None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.path().is_some()
    }
}

/// Fans dialogue segments out to the speech renderer, one task per segment.
pub struct FragmentDispatcher {
    renderer: Arc<dyn SpeechRenderer>,
    fragment_dir: PathBuf,
}

impl FragmentDispatcher {
    pub fn new(renderer: Arc<dyn SpeechRenderer>, fragment_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            fragment_dir: fragment_dir.into(),
        }
    }

    /// Render every dialogue segment of `script` concurrently.
    ///
    /// Fragment `i` is written to `<fragment_dir>/<i>.<ext>`. Returns one
    /// result per dialogue segment, sorted by segment index; a failed render
    /// only fails its own slot. Music cues and unrecognized segments are
    /// passed through without a render.
    pub async fn dispatch(&self, script: &PodcastScript) -> PodgenResult<Vec<FragmentResult>> {
        // Must exist before any task writes its slot.
        std::fs::create_dir_all(&self.fragment_dir)?;

        let ext = self.renderer.file_extension().to_string();
        let mut indices = Vec::new();
        let mut handles = Vec::new();

        for (index, segment) in script.conversation.iter().enumerate() {
            match segment {
                Segment::Dialogue(dialogue) => {
                    let renderer = Arc::clone(&self.renderer);
                    let text = dialogue.line.clone();
                    let voice = dialogue.voice.clone();
                    let path = self.fragment_dir.join(format!("{index}.{ext}"));
                    debug!("Fragment {index}: {} ({})", dialogue.speaker, voice);

                    indices.push(index);
                    handles.push(tokio::task::spawn_blocking(move || {
                        renderer.render(&text, &voice, &path)
                    }));
                }
                Segment::Music(cue) => {
                    info!(
                        "Segment {index}: {:?} music cue \"{}\" passed through",
                        cue.mode, cue.theme
                    );
                }
                Segment::Other(value) => {
                    info!("Segment {index}: unrecognized segment passed through: {value}");
                }
            }
        }

        let joined = join_all(handles).await;

        let mut results: Vec<FragmentResult> = indices
            .into_iter()
            .zip(joined)
            .map(|(index, joined)| {
                let outcome = match joined {
                    Ok(Ok(path)) => FragmentOutcome::Rendered(path),
                    Ok(Err(e)) => {
                        warn!("Fragment {index} failed: {e}");
                        FragmentOutcome::Failed(e.to_string())
                    }
                    Err(e) => {
                        warn!("Fragment {index} render task aborted: {e}");
                        FragmentOutcome::Failed(format!("render task aborted: {e}"))
                    }
                };
                FragmentResult { index, outcome }
            })
            .collect();

        results.sort_by_key(|r| r.index);
        Ok(results)
    }
}
