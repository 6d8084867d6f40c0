use crate::config::VoiceConfig;
use crate::error::{PodgenError, PodgenResult};
use crate::fetch;
use crate::tts::SpeechRenderer;
use std::path::{Path, PathBuf};
use std::time::Duration;

const API_BASE: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Speech renderer using the ElevenLabs cloud API.
///
/// Requires `ELEVEN_API_KEY`. Participant voices are ElevenLabs voice IDs.
pub struct ElevenLabsRenderer {
    agent: ureq::Agent,
    request_timeout: Duration,
    api_key: String,
}

impl ElevenLabsRenderer {
    pub fn new(config: &VoiceConfig) -> PodgenResult<Self> {
        let api_key = std::env::var("ELEVEN_API_KEY").map_err(|_| {
            PodgenError::Render(
                "ELEVEN_API_KEY env var not set. Get your API key from https://elevenlabs.io"
                    .into(),
            )
        })?;

        if api_key.is_empty() {
            return Err(PodgenError::Render("ELEVEN_API_KEY env var is empty".into()));
        }

        Ok(Self::with_key(api_key, config))
    }

    pub fn with_key(api_key: String, config: &VoiceConfig) -> Self {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        Self {
            agent: fetch::agent(request_timeout),
            request_timeout,
            api_key,
        }
    }
}

fn speech_url(voice_id: &str) -> String {
    format!("{API_BASE}/text-to-speech/{voice_id}?output_format=mp3_44100_128")
}

impl SpeechRenderer for ElevenLabsRenderer {
    fn render(&self, text: &str, voice: &str, output_path: &Path) -> PodgenResult<PathBuf> {
        let body = serde_json::json!({
            "text": text,
            "model_id": DEFAULT_MODEL_ID,
        });

        let response = self
            .agent
            .post(&speech_url(voice))
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(body.to_string().as_bytes())
            .map_err(|e| {
                PodgenError::Render(format!(
                    "ElevenLabs API request failed (timeout {}s): {e}",
                    self.request_timeout.as_secs()
                ))
            })?;

        let bytes = response
            .into_body()
            .read_to_vec()
            .map_err(|e| PodgenError::Render(format!("Failed to read ElevenLabs response: {e}")))?;

        if bytes.is_empty() {
            return Err(PodgenError::Render("ElevenLabs returned no audio".into()));
        }

        std::fs::write(output_path, &bytes)
            .map_err(|e| PodgenError::Render(format!("Failed to write MP3: {e}")))?;

        Ok(output_path.to_path_buf())
    }

    fn engine_name(&self) -> &str {
        "elevenlabs"
    }
}
