use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodgenError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Script does not match the expected schema: {0}")]
    SchemaValidation(String),

    #[error("Prompt render error: {0}")]
    Prompt(String),

    #[error("Speech render failed: {0}")]
    Render(String),

    #[error("Image generation failed: {0}")]
    Image(String),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    #[error("Already initialized: {0} already exists")]
    AlreadyInitialized(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl PodgenError {
    /// Return an actionable hint for the user, if applicable.
    pub fn hint(&self) -> Option<String> {
        match self {
            PodgenError::InvalidRequest(_) => Some(
                "A podcast needs a non-empty title and at least one [[participants]] entry.".into(),
            ),
            PodgenError::Generation(msg) => {
                if msg.contains("OPENAI_API_KEY") {
                    Some("Set OPENAI_API_KEY in your environment or in a .env file next to podcast.toml.".into())
                } else if msg.contains("429") {
                    Some("The text generation API is rate limiting requests. Wait a moment and retry.".into())
                } else {
                    Some("Check network access and the [llm] api_base / model settings in podcast.toml.".into())
                }
            }
            PodgenError::SchemaValidation(_) => Some(
                "The model returned a script in an unexpected shape. Retrying usually helps; a larger [llm] max_tokens avoids truncated output.".into(),
            ),
            PodgenError::Render(_) => Some(
                "For replicate: set REPLICATE_API_TOKEN. For elevenlabs: set ELEVEN_API_KEY. Both can live in .env.".into(),
            ),
            PodgenError::Image(_) => Some(
                "Set [image] enabled = false in podcast.toml to produce audio only.".into(),
            ),
            PodgenError::Ffmpeg(_) => Some(
                "Ensure FFmpeg is installed and on your PATH. Install via: brew install ffmpeg (macOS) or apt install ffmpeg (Linux).".into(),
            ),
            PodgenError::ConfigNotFound(_) => Some(
                "Run 'podgen init <path>' to create a podcast.toml, or run 'podgen' with no arguments for the built-in demo.".into(),
            ),
            PodgenError::ConfigParse(msg) => {
                if msg.contains("missing field") {
                    Some("Each [[participants]] entry needs name, role, gender and voice.".into())
                } else {
                    Some("Check podcast.toml syntax. Run 'podgen init <path>' to generate a valid example config.".into())
                }
            }
            PodgenError::AlreadyInitialized(_) => Some(
                "Use a different path, or delete the existing podcast.toml first.".into(),
            ),
            _ => None,
        }
    }
}

pub type PodgenResult<T> = Result<T, PodgenError>;
