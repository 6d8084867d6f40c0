use crate::error::{PodgenError, PodgenResult};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A person taking part in the episode. Supplied by the caller before generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Participant {
    pub name: String,
    /// Free text: host, co-host, guest, ...
    pub role: String,
    pub gender: String,
    /// Voice identifier understood by the speech renderer.
    pub voice: String,
}

impl Participant {
    /// Roster entry as shown to the script writer, e.g. `Sharon (female, Host with a voice angie)`.
    pub fn roster_entry(&self) -> String {
        format!(
            "{} ({}, {} with a voice {})",
            self.name, self.gender, self.role, self.voice
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SponsorMessage {
    pub message: String,
}

/// A single spoken line of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct DialogueSegment {
    /// name of the current speaker
    #[serde(rename = "speakers_name")]
    pub speaker: String,
    /// the voice of the current speaker
    #[serde(rename = "speaker_voice")]
    pub voice: String,
    /// what the speaker is saying
    pub line: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MusicMode {
    Background,
    Foreground,
}

/// A music cue placed between dialogue lines.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct MusicCue {
    /// theme of the music to be played
    #[serde(rename = "music_theme")]
    pub theme: String,
    /// whether the music is a background music or not ( background | foreground )
    pub mode: MusicMode,
    /// the volume level of the music to be played relative to the expected general volume of the podcast
    pub volume_level: f64,
    /// the percentage of the music to be played
    #[serde(rename = "what_percentage")]
    pub play_percentage: f64,
}

/// Candidate music placement. A generation hint only; never rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct MusicHint {
    /// theme of the music to be played
    pub theme: String,
    /// position where the music should be played, this should be in relation to the discussion
    pub position: i64,
}

/// One element of the podcast timeline.
///
/// `Other` holds any JSON object matching neither known shape; the generator
/// is not guaranteed to emit only dialogue and music.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Segment {
    Dialogue(DialogueSegment),
    Music(MusicCue),
    Other(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Dialogue,
    Music,
    Other,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentKind::Dialogue => "dialogue",
            SegmentKind::Music => "music",
            SegmentKind::Other => "other",
        };
        f.write_str(name)
    }
}

impl Segment {
    /// Classify a raw conversation entry. Non-objects have no determinable kind.
    pub fn from_value(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err(format!("conversation entry is not an object: {value}"));
        }
        if let Ok(dialogue) = DialogueSegment::deserialize(&value) {
            return Ok(Segment::Dialogue(dialogue));
        }
        if let Ok(cue) = MusicCue::deserialize(&value) {
            return Ok(Segment::Music(cue));
        }
        Ok(Segment::Other(value))
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Dialogue(_) => SegmentKind::Dialogue,
            Segment::Music(_) => SegmentKind::Music,
            Segment::Other(_) => SegmentKind::Other,
        }
    }

    pub fn as_dialogue(&self) -> Option<&DialogueSegment> {
        match self {
            Segment::Dialogue(d) => Some(d),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Segment::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Which conversation entries a parse accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptShape {
    /// Dialogue pieces only (first generation pass).
    Dialogue,
    /// Dialogue, music cues and unrecognized objects (after the music merge).
    Merged,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PodcastScript {
    pub title: String,
    pub description: String,
    pub music_theme: String,
    #[serde(rename = "music_to_be_played")]
    pub music_hints: Vec<MusicHint>,
    /// Playback order is the order of this list.
    pub conversation: Vec<Segment>,
}

impl PodcastScript {
    /// Parse a raw completion into a script.
    ///
    /// The completion may wrap the JSON in a code fence or prose; the first
    /// balanced object that is valid JSON is used.
    pub fn parse(raw: &str, shape: ScriptShape) -> PodgenResult<Self> {
        let json = extract_json_object(raw).ok_or_else(|| {
            PodgenError::SchemaValidation("no JSON object found in the response".into())
        })?;

        let script: PodcastScript = serde_json::from_str(json)
            .map_err(|e| PodgenError::SchemaValidation(e.to_string()))?;

        if shape == ScriptShape::Dialogue {
            if let Some((i, seg)) = script
                .conversation
                .iter()
                .enumerate()
                .find(|(_, seg)| seg.kind() != SegmentKind::Dialogue)
            {
                return Err(PodgenError::SchemaValidation(format!(
                    "conversation[{i}] is not a dialogue piece (found {})",
                    seg.kind()
                )));
            }
        }

        Ok(script)
    }

    pub fn dialogue(&self) -> impl Iterator<Item = &DialogueSegment> {
        self.conversation.iter().filter_map(Segment::as_dialogue)
    }

    pub fn dialogue_count(&self) -> usize {
        self.dialogue().count()
    }

    pub fn music_cue_count(&self) -> usize {
        self.conversation
            .iter()
            .filter(|s| s.kind() == SegmentKind::Music)
            .count()
    }
}

/// Output contract handed to the text generator. Only used for its schema.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct ScriptContract<T> {
    /// title of the current topic being discussed
    title: String,
    /// a single line description of the current topic being discussed
    description: String,
    /// the music theme to be played depending on the current topic being discussed
    music_theme: String,
    /// a list of music to be played depending on the current topic being discussed
    music_to_be_played: Vec<MusicHint>,
    /// a list of the conversation segments within the podcast
    conversation: Vec<T>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(untagged)]
#[allow(dead_code)]
enum MergedEntry {
    Dialogue(DialogueSegment),
    Music(MusicCue),
}

/// Formatting contract appended to generation prompts.
pub fn format_instructions(shape: ScriptShape) -> String {
    let schema = match shape {
        ScriptShape::Dialogue => schemars::schema_for!(ScriptContract<DialogueSegment>),
        ScriptShape::Merged => schemars::schema_for!(ScriptContract<MergedEntry>),
    };
    let schema_json = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\
         Respond with the JSON object only.\n\n\
         Here is the output schema:\n```\n{schema_json}\n```"
    )
}

/// Extract the first balanced JSON object from `s`, ignoring braces inside strings.
///
/// Candidates that are not valid JSON (e.g. `{topic}` in leading prose) are
/// skipped. If none parses, the first balanced candidate is returned so the
/// caller can report why.
fn extract_json_object(s: &str) -> Option<&str> {
    let mut first = None;
    let mut from = 0;

    while let Some(offset) = s[from..].find('{') {
        let start = from + offset;
        if let Some(candidate) = balanced_object(&s[start..]) {
            if serde_json::from_str::<Value>(candidate).is_ok() {
                return Some(candidate);
            }
            first.get_or_insert(candidate);
        }
        from = start + 1;
    }

    first
}

/// The balanced `{...}` at the start of `s`, if it closes.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIALOGUE_SCRIPT: &str = r#"{
        "title": "Fashion Through History",
        "description": "From togas to tracksuits.",
        "music_theme": "upbeat retro",
        "music_to_be_played": [{"theme": "jazzy intro", "position": 0}],
        "conversation": [
            {"speakers_name": "Sharon", "speaker_voice": "angie", "line": "Welcome back!"},
            {"speakers_name": "Brian", "speaker_voice": "freeman", "line": "[laughs] Glad to be here."}
        ]
    }"#;

    #[test]
    fn test_parse_dialogue_script() {
        let script = PodcastScript::parse(DIALOGUE_SCRIPT, ScriptShape::Dialogue).unwrap();
        assert_eq!(script.title, "Fashion Through History");
        assert_eq!(script.music_hints.len(), 1);
        assert_eq!(script.dialogue_count(), 2);
        let first = script.dialogue().next().unwrap();
        assert_eq!(first.speaker, "Sharon");
        assert_eq!(first.voice, "angie");
    }

    #[test]
    fn test_parse_fenced_response_with_prose() {
        let raw = format!("Sure! Here is your script:\n```json\n{DIALOGUE_SCRIPT}\n```\nEnjoy.");
        let script = PodcastScript::parse(&raw, ScriptShape::Dialogue).unwrap();
        assert_eq!(script.conversation.len(), 2);
    }

    #[test]
    fn test_parse_braces_inside_strings() {
        let raw = r#"{"title": "a {b}", "description": "}", "music_theme": "x",
            "music_to_be_played": [], "conversation": []} trailing }"#;
        let script = PodcastScript::parse(raw, ScriptShape::Merged).unwrap();
        assert_eq!(script.title, "a {b}");
        assert_eq!(script.description, "}");
    }

    #[test]
    fn test_parse_skips_braces_in_leading_prose() {
        let raw = format!("Here is the script for {{history of tea}}:\n{DIALOGUE_SCRIPT}");
        let script = PodcastScript::parse(&raw, ScriptShape::Dialogue).unwrap();
        assert_eq!(script.title, "Fashion Through History");
        assert_eq!(script.dialogue_count(), 2);
    }

    #[test]
    fn test_parse_no_json() {
        let err = PodcastScript::parse("I cannot help with that.", ScriptShape::Dialogue)
            .unwrap_err();
        assert!(matches!(err, PodgenError::SchemaValidation(_)));
    }

    #[test]
    fn test_parse_truncated_json() {
        let truncated = &DIALOGUE_SCRIPT[..DIALOGUE_SCRIPT.len() / 2];
        let err = PodcastScript::parse(truncated, ScriptShape::Dialogue).unwrap_err();
        assert!(matches!(err, PodgenError::SchemaValidation(_)));
    }

    #[test]
    fn test_parse_missing_required_field() {
        let raw = r#"{"title": "t", "description": "d", "music_to_be_played": [], "conversation": []}"#;
        let err = PodcastScript::parse(raw, ScriptShape::Merged).unwrap_err();
        match err {
            PodgenError::SchemaValidation(msg) => assert!(msg.contains("music_theme")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_mistyped_field() {
        let raw = r#"{"title": 5, "description": "d", "music_theme": "m",
            "music_to_be_played": [], "conversation": []}"#;
        assert!(PodcastScript::parse(raw, ScriptShape::Merged).is_err());
    }

    #[test]
    fn test_parse_non_object_entry_is_error() {
        let raw = r#"{"title": "t", "description": "d", "music_theme": "m",
            "music_to_be_played": [], "conversation": ["[music plays]"]}"#;
        let err = PodcastScript::parse(raw, ScriptShape::Merged).unwrap_err();
        assert!(matches!(err, PodgenError::SchemaValidation(_)));
    }

    #[test]
    fn test_dialogue_shape_rejects_music() {
        let raw = r#"{"title": "t", "description": "d", "music_theme": "m",
            "music_to_be_played": [], "conversation": [
                {"music_theme": "drums", "mode": "foreground", "volume_level": 1.0, "what_percentage": 0.2}
            ]}"#;
        let err = PodcastScript::parse(raw, ScriptShape::Dialogue).unwrap_err();
        match err {
            PodgenError::SchemaValidation(msg) => assert!(msg.contains("conversation[0]")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_merged_shape_classifies_segments() {
        let raw = r#"{"title": "t", "description": "d", "music_theme": "m",
            "music_to_be_played": [], "conversation": [
                {"speakers_name": "Ada", "speaker_voice": "v1", "line": "Hi"},
                {"music_theme": "soft piano", "mode": "background", "volume_level": 0.3, "what_percentage": 0.5},
                {"transition": "crossfade"},
                {"music_theme": "gong", "mode": "sideways", "volume_level": 1.0, "what_percentage": 1.0}
            ]}"#;
        let script = PodcastScript::parse(raw, ScriptShape::Merged).unwrap();
        let kinds: Vec<SegmentKind> = script.conversation.iter().map(Segment::kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Dialogue,
                SegmentKind::Music,
                SegmentKind::Other,
                SegmentKind::Other,
            ]
        );
        match &script.conversation[1] {
            Segment::Music(cue) => {
                assert_eq!(cue.theme, "soft piano");
                assert_eq!(cue.mode, MusicMode::Background);
                assert!((cue.play_percentage - 0.5).abs() < f64::EPSILON);
            }
            other => panic!("expected music cue, got {other:?}"),
        }
        assert_eq!(script.music_cue_count(), 1);
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let script = PodcastScript::parse(DIALOGUE_SCRIPT, ScriptShape::Dialogue).unwrap();
        let json = serde_json::to_value(&script).unwrap();
        assert_eq!(json["conversation"][0]["speakers_name"], "Sharon");
        assert_eq!(json["conversation"][0]["speaker_voice"], "angie");
        assert!(json.get("music_to_be_played").is_some());

        let reparsed = PodcastScript::parse(&json.to_string(), ScriptShape::Merged).unwrap();
        assert_eq!(reparsed, script);
    }

    #[test]
    fn test_format_instructions_describe_fields() {
        let dialogue = format_instructions(ScriptShape::Dialogue);
        assert!(dialogue.contains("speakers_name"));
        assert!(dialogue.contains("music_to_be_played"));
        assert!(!dialogue.contains("what_percentage"));

        let merged = format_instructions(ScriptShape::Merged);
        assert!(merged.contains("speaker_voice"));
        assert!(merged.contains("what_percentage"));
        assert!(merged.contains("foreground"));
    }

    #[test]
    fn test_roster_entry() {
        let p = Participant {
            name: "Sharon".into(),
            role: "Host".into(),
            gender: "female".into(),
            voice: "angie".into(),
        };
        assert_eq!(p.roster_entry(), "Sharon (female, Host with a voice angie)");
    }
}
