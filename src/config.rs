use crate::error::{PodgenError, PodgenResult};
use crate::script::{Participant, SponsorMessage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "podcast.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PodcastConfig {
    pub podcast: PodcastInfo,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub sponsors: Vec<SponsorMessage>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PodcastInfo {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoiceConfig {
    #[serde(default = "default_voice_engine")]
    pub engine: String,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_cvvp_amount")]
    pub cvvp_amount: f32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Upper bound for any single HTTP call a renderer makes.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_enabled")]
    pub enabled: bool,
    #[serde(default = "default_image_size")]
    pub size: String,
}

/// What assembly does with a dialogue fragment whose render failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFragment {
    #[default]
    Skip,
    Silence,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Watermark clip played before the first fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<PathBuf>,
    #[serde(default = "default_intro_gap")]
    pub intro_gap_secs: f64,
    #[serde(default)]
    pub missing_fragment: MissingFragment,
    #[serde(default = "default_silence_secs")]
    pub silence_secs: f64,
}

// Defaults
fn default_model() -> String {
    "gpt-3.5-turbo-16k".into()
}
fn default_temperature() -> f32 {
    0.9
}
fn default_max_tokens() -> u32 {
    10385
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_timeout() -> u64 {
    600
}
fn default_voice_engine() -> String {
    "replicate".into()
}
fn default_preset() -> String {
    "standard".into()
}
fn default_seed() -> u64 {
    42
}
fn default_cvvp_amount() -> f32 {
    0.9
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_max_wait_secs() -> u64 {
    900
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_image_enabled() -> bool {
    true
}
fn default_image_size() -> String {
    "1024x1024".into()
}
fn default_output_dir() -> String {
    "./output".into()
}
fn default_fps() -> u32 {
    30
}
fn default_intro_gap() -> f64 {
    0.5
}
fn default_silence_secs() -> f64 {
    1.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_base: default_api_base(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            engine: default_voice_engine(),
            preset: default_preset(),
            seed: default_seed(),
            cvvp_amount: default_cvvp_amount(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: default_image_enabled(),
            size: default_image_size(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            fps: default_fps(),
            intro: None,
            intro_gap_secs: default_intro_gap(),
            missing_fragment: MissingFragment::default(),
            silence_secs: default_silence_secs(),
        }
    }
}

impl PodcastConfig {
    /// The built-in request used when `podgen` runs without arguments.
    pub fn demo() -> Self {
        let participant = |name: &str, role: &str, gender: &str, voice: &str| Participant {
            name: name.into(),
            role: role.into(),
            gender: gender.into(),
            voice: voice.into(),
        };
        Self {
            podcast: PodcastInfo {
                name: "Dingo and the Baby".into(),
                title: "fashion through history".into(),
            },
            participants: vec![
                participant("Sharon", "Host", "female", "angie"),
                participant("Brian", "Co-host", "male", "freeman"),
                participant("Dorothy", "Co-host", "female", "halle"),
            ],
            sponsors: vec![SponsorMessage {
                message: "Blueband, the best jam to use".into(),
            }],
            llm: LlmConfig::default(),
            voice: VoiceConfig::default(),
            image: ImageConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Reject configs the pipeline cannot run with.
    pub fn validate(&self) -> PodgenResult<()> {
        if self.podcast.title.trim().is_empty() {
            return Err(PodgenError::InvalidRequest("podcast title is empty".into()));
        }
        if self.participants.is_empty() {
            return Err(PodgenError::InvalidRequest(
                "at least one participant is required".into(),
            ));
        }
        if let Some(p) = self.participants.iter().find(|p| p.voice.trim().is_empty()) {
            return Err(PodgenError::InvalidRequest(format!(
                "participant '{}' has no voice",
                p.name
            )));
        }

        let output = &self.output;
        if !output.silence_secs.is_finite() || output.silence_secs <= 0.0 {
            return Err(PodgenError::InvalidRequest(format!(
                "[output] silence_secs must be a positive number, got {}",
                output.silence_secs
            )));
        }
        if !output.intro_gap_secs.is_finite() || output.intro_gap_secs < 0.0 {
            return Err(PodgenError::InvalidRequest(format!(
                "[output] intro_gap_secs must be zero or positive, got {}",
                output.intro_gap_secs
            )));
        }
        if output.fps == 0 {
            return Err(PodgenError::InvalidRequest(
                "[output] fps must be at least 1".into(),
            ));
        }
        if self.voice.request_timeout_secs == 0 {
            return Err(PodgenError::InvalidRequest(
                "[voice] request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Output directory, resolved against `base` when relative.
    pub fn output_dir(&self, base: &Path) -> PathBuf {
        let dir = Path::new(&self.output.directory);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            base.join(dir)
        }
    }
}

/// Save a `PodcastConfig` to `path/podcast.toml`.
pub fn save_config(path: &Path, config: &PodcastConfig) -> PodgenResult<()> {
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| PodgenError::ConfigParse(e.to_string()))?;
    std::fs::write(path.join(CONFIG_FILE), toml_str)?;
    Ok(())
}

pub fn load_config(path: &Path) -> PodgenResult<PodcastConfig> {
    let config_path = path.join(CONFIG_FILE);
    if !config_path.exists() {
        return Err(PodgenError::ConfigNotFound(config_path));
    }
    let content = std::fs::read_to_string(&config_path)?;
    toml::from_str(&content).map_err(|e| PodgenError::ConfigParse(e.to_string()))
}
