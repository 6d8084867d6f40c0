use crate::error::{PodgenError, PodgenResult};
use crate::llm::{ChatMessage, TextGenerator};
use crate::prompt::PromptRegistry;
use crate::script::{
    format_instructions, Participant, PodcastScript, ScriptShape, Segment, SponsorMessage,
};
use tracing::{debug, warn};

/// Writes the first draft of a script: dialogue only, no music cues.
pub struct ScriptSynthesizer<'a> {
    generator: &'a dyn TextGenerator,
    prompts: &'a PromptRegistry,
}

impl<'a> ScriptSynthesizer<'a> {
    pub fn new(generator: &'a dyn TextGenerator, prompts: &'a PromptRegistry) -> Self {
        Self { generator, prompts }
    }

    /// Generate a dialogue-only script for `title`.
    ///
    /// Every returned dialogue line is non-empty and spoken with the voice of
    /// one of `participants`.
    pub fn synthesize(
        &self,
        podcast_name: &str,
        title: &str,
        participants: &[Participant],
        sponsors: &[SponsorMessage],
    ) -> PodgenResult<PodcastScript> {
        if title.trim().is_empty() {
            return Err(PodgenError::InvalidRequest("title is empty".into()));
        }
        if participants.is_empty() {
            return Err(PodgenError::InvalidRequest(
                "a podcast needs at least one participant".into(),
            ));
        }

        let messages = [
            ChatMessage::system(self.prompts.writer_system(podcast_name)?),
            ChatMessage::user(self.prompts.script_request(
                title,
                participants,
                sponsors,
                &format_instructions(ScriptShape::Dialogue),
            )?),
        ];

        debug!(
            "Requesting script for \"{}\" from {}",
            title,
            self.generator.model_name()
        );
        let raw = self.generator.complete(&messages)?;

        let mut script = PodcastScript::parse(&raw, ScriptShape::Dialogue)?;
        resolve_speakers(&mut script, participants)?;
        Ok(script)
    }
}

/// Check every dialogue line against the roster.
///
/// A voice that matches no participant is repaired from the speaker name when
/// that name is on the roster; anything else is a schema violation.
fn resolve_speakers(script: &mut PodcastScript, participants: &[Participant]) -> PodgenResult<()> {
    for (i, segment) in script.conversation.iter_mut().enumerate() {
        let Segment::Dialogue(dialogue) = segment else {
            continue;
        };

        if dialogue.line.trim().is_empty() {
            return Err(PodgenError::SchemaValidation(format!(
                "conversation[{i}] has an empty line"
            )));
        }
        if dialogue.voice.trim().is_empty() {
            return Err(PodgenError::SchemaValidation(format!(
                "conversation[{i}] has no speaker voice"
            )));
        }

        if let Some(p) = participants
            .iter()
            .find(|p| p.voice.eq_ignore_ascii_case(dialogue.voice.trim()))
        {
            dialogue.voice = p.voice.clone();
            continue;
        }

        match participants
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(dialogue.speaker.trim()))
        {
            Some(p) => {
                warn!(
                    "conversation[{}]: voice '{}' not on roster, using {}'s voice '{}'",
                    i, dialogue.voice, p.name, p.voice
                );
                dialogue.voice = p.voice.clone();
            }
            None => {
                return Err(PodgenError::SchemaValidation(format!(
                    "conversation[{i}]: speaker '{}' with voice '{}' is not a participant",
                    dialogue.speaker, dialogue.voice
                )));
            }
        }
    }
    Ok(())
}
