pub mod elevenlabs;
pub mod replicate;

use crate::config::VoiceConfig;
use crate::error::{PodgenError, PodgenResult};
use std::path::{Path, PathBuf};

/// Trait for pluggable speech backends.
///
/// Implementations are synchronous: each call blocks on the vendor API until
/// the fragment is written. The dispatcher runs calls on blocking threads.
pub trait SpeechRenderer: Send + Sync {
    /// Speak `text` with `voice` and store the audio at `output_path`.
    fn render(&self, text: &str, voice: &str, output_path: &Path) -> PodgenResult<PathBuf>;

    fn engine_name(&self) -> &str;

    /// Extension of the files written by `render`.
    fn file_extension(&self) -> &str {
        "mp3"
    }
}

/// Factory: create a speech renderer from the voice config.
pub fn create_renderer(config: &VoiceConfig) -> PodgenResult<Box<dyn SpeechRenderer>> {
    match config.engine.as_str() {
        "replicate" => {
            let engine = replicate::ReplicateRenderer::new(config)?;
            Ok(Box::new(engine))
        }
        "elevenlabs" => {
            let engine = elevenlabs::ElevenLabsRenderer::new(config)?;
            Ok(Box::new(engine))
        }
        other => Err(PodgenError::Render(format!(
            "Unknown TTS engine: '{other}'. Supported: replicate, elevenlabs"
        ))),
    }
}
