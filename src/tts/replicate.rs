use crate::config::VoiceConfig;
use crate::error::{PodgenError, PodgenResult};
use crate::fetch;
use crate::tts::SpeechRenderer;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const API_BASE: &str = "https://api.replicate.com/v1";
/// afiaka87/tortoise-tts
const TORTOISE_VERSION: &str = "e9658de4b325863c4fcdc12d94bb7c9b54cbfe351b7ca1b36860008172b91c71";

/// Speech renderer running tortoise-tts on Replicate.
///
/// Requires `REPLICATE_API_TOKEN`. Creates a prediction, polls it until it
/// settles, then downloads the produced audio. Every HTTP call is bounded by
/// `[voice] request_timeout_secs`; the whole wait by `max_wait_secs`.
pub struct ReplicateRenderer {
    agent: ureq::Agent,
    request_timeout: Duration,
    api_token: String,
    preset: String,
    seed: u64,
    cvvp_amount: f32,
    poll_interval: Duration,
    max_wait: Duration,
}

impl ReplicateRenderer {
    pub fn new(config: &VoiceConfig) -> PodgenResult<Self> {
        let api_token = std::env::var("REPLICATE_API_TOKEN").map_err(|_| {
            PodgenError::Render(
                "REPLICATE_API_TOKEN env var not set. Get a token from https://replicate.com/account"
                    .into(),
            )
        })?;

        if api_token.is_empty() {
            return Err(PodgenError::Render(
                "REPLICATE_API_TOKEN env var is empty".into(),
            ));
        }

        Ok(Self::with_token(api_token, config))
    }

    pub fn with_token(api_token: String, config: &VoiceConfig) -> Self {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        Self {
            agent: fetch::agent(request_timeout),
            request_timeout,
            api_token,
            preset: config.preset.clone(),
            seed: config.seed,
            cvvp_amount: config.cvvp_amount,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_wait: Duration::from_secs(config.max_wait_secs),
        }
    }

    fn prediction_body(&self, text: &str, voice: &str) -> serde_json::Value {
        serde_json::json!({
            "version": TORTOISE_VERSION,
            "input": {
                "text": text,
                "voice_a": voice.to_lowercase(),
                "preset": self.preset,
                "seed": self.seed,
                "cvvp_amount": self.cvvp_amount,
            }
        })
    }

    fn create_prediction(&self, body: &serde_json::Value) -> Result<Prediction, String> {
        let response = self
            .agent
            .post(&format!("{API_BASE}/predictions"))
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .send(body.to_string().as_bytes())
            .map_err(|e| format!("Replicate prediction request failed: {e}"))?;

        let json = response
            .into_body()
            .read_to_string()
            .map_err(|e| format!("Failed to read Replicate response: {e}"))?;
        parse_prediction(&json)
    }

    fn fetch_prediction(&self, url: &str) -> Result<Prediction, String> {
        let response = self
            .agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .call()
            .map_err(|e| format!("Replicate poll failed: {e}"))?;

        let json = response
            .into_body()
            .read_to_string()
            .map_err(|e| format!("Failed to read Replicate response: {e}"))?;
        parse_prediction(&json)
    }

    /// Cancel a prediction that outlived `max_wait`.
    fn cancel_prediction(&self, prediction: &Prediction) {
        let url = prediction.cancel_url();
        let result = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .send_empty();
        match result {
            Ok(_) => debug!("Canceled Replicate prediction {}", prediction.id),
            Err(e) => warn!("Failed to cancel Replicate prediction {}: {e}", prediction.id),
        }
    }

    /// Poll until the prediction leaves the queue, bounded by `max_wait`.
    fn wait_for(&self, mut prediction: Prediction) -> Result<Prediction, String> {
        let started = Instant::now();
        while !prediction.status.is_terminal() {
            if started.elapsed() > self.max_wait {
                self.cancel_prediction(&prediction);
                return Err(format!(
                    "prediction {} still {:?} after {}s",
                    prediction.id,
                    prediction.status,
                    self.max_wait.as_secs()
                ));
            }
            std::thread::sleep(self.poll_interval);
            let url = prediction
                .urls
                .as_ref()
                .map(|u| u.get.clone())
                .unwrap_or_else(|| format!("{API_BASE}/predictions/{}", prediction.id));
            prediction = self.fetch_prediction(&url)?;
        }
        Ok(prediction)
    }
}

impl SpeechRenderer for ReplicateRenderer {
    fn render(&self, text: &str, voice: &str, output_path: &Path) -> PodgenResult<PathBuf> {
        debug!(
            "Replicate render: voice={}, request timeout {}s",
            voice,
            self.request_timeout.as_secs()
        );
        let body = self.prediction_body(text, voice);
        let prediction = self
            .create_prediction(&body)
            .and_then(|p| self.wait_for(p))
            .map_err(PodgenError::Render)?;

        let audio_url = prediction.audio_url().map_err(PodgenError::Render)?;
        debug!(
            "Replicate prediction {} finished, downloading {}",
            prediction.id, audio_url
        );

        fetch::download(&self.agent, &audio_url, output_path).map_err(PodgenError::Render)?;
        Ok(output_path.to_path_buf())
    }

    fn engine_name(&self) -> &str {
        "replicate"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl PredictionStatus {
    fn is_terminal(self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: String,
    #[serde(default)]
    cancel: Option<String>,
}

/// A Replicate prediction as returned by `POST /v1/predictions` and its `urls.get`.
#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

impl Prediction {
    fn cancel_url(&self) -> String {
        self.urls
            .as_ref()
            .and_then(|u| u.cancel.clone())
            .unwrap_or_else(|| format!("{API_BASE}/predictions/{}/cancel", self.id))
    }

    /// URL of the rendered audio. Tortoise returns a single URI; list outputs
    /// use their first entry.
    fn audio_url(&self) -> Result<String, String> {
        match self.status {
            PredictionStatus::Succeeded => {}
            PredictionStatus::Failed => {
                let reason = self
                    .error
                    .as_ref()
                    .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                    .unwrap_or_else(|| "no error message".into());
                return Err(format!("prediction {} failed: {reason}", self.id));
            }
            other => return Err(format!("prediction {} ended as {other:?}", self.id)),
        }

        let url = match &self.output {
            Some(serde_json::Value::String(url)) => Some(url.clone()),
            Some(serde_json::Value::Array(items)) => {
                items.iter().find_map(|v| v.as_str()).map(str::to_string)
            }
            _ => None,
        };
        url.ok_or_else(|| format!("prediction {} produced no audio URL", self.id))
    }
}

fn parse_prediction(json: &str) -> Result<Prediction, String> {
    serde_json::from_str(json).map_err(|e| format!("Unexpected Replicate payload: {e}"))
}
