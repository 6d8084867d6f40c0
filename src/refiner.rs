use crate::error::{PodgenError, PodgenResult};
use crate::llm::{ChatMessage, TextGenerator};
use crate::prompt::PromptRegistry;
use crate::script::{format_instructions, DialogueSegment, PodcastScript, ScriptShape};
use tracing::{debug, warn};

/// Asks the text generator to interleave music cues into a finished script.
pub struct MusicMergeRefiner<'a> {
    generator: &'a dyn TextGenerator,
    prompts: &'a PromptRegistry,
}

impl<'a> MusicMergeRefiner<'a> {
    pub fn new(generator: &'a dyn TextGenerator, prompts: &'a PromptRegistry) -> Self {
        Self { generator, prompts }
    }

    /// Return `script` with music cues inserted between its dialogue lines.
    ///
    /// If the merged script does not carry the input's dialogue verbatim and
    /// in order, the input script is returned unchanged.
    pub fn merge_music(&self, script: &PodcastScript) -> PodgenResult<PodcastScript> {
        let script_json = serde_json::to_string(script)
            .map_err(|e| PodgenError::Other(format!("Failed to serialize script: {e}")))?;

        let messages = [
            ChatMessage::system(self.prompts.editor_system()?),
            ChatMessage::user(
                self.prompts
                    .merge_request(&script_json, &format_instructions(ScriptShape::Merged))?,
            ),
        ];

        debug!(
            "Requesting music merge for \"{}\" ({} segment(s))",
            script.title,
            script.conversation.len()
        );
        let raw = self.generator.complete(&messages)?;
        let merged = PodcastScript::parse(&raw, ScriptShape::Merged)?;

        if let Err(reason) = check_dialogue_preserved(script, &merged) {
            warn!("Music merge rewrote the dialogue ({reason}); keeping the unmerged script");
            return Ok(script.clone());
        }

        debug!("Music merge inserted {} cue(s)", merged.music_cue_count());
        Ok(merged)
    }
}

/// The dialogue-only subsequence of `merged` must equal that of `original`.
fn check_dialogue_preserved(original: &PodcastScript, merged: &PodcastScript) -> Result<(), String> {
    let before: Vec<&DialogueSegment> = original.dialogue().collect();
    let after: Vec<&DialogueSegment> = merged.dialogue().collect();

    if before.len() != after.len() {
        return Err(format!(
            "{} dialogue line(s) before, {} after",
            before.len(),
            after.len()
        ));
    }

    match before.iter().zip(after.iter()).position(|(a, b)| a != b) {
        Some(i) => Err(format!("dialogue line {i} differs")),
        None => Ok(()),
    }
}
