use crate::error::{PodgenError, PodgenResult};
use crate::script::{Participant, SponsorMessage};
use handlebars::Handlebars;
use serde_json::json;
use tracing::{debug, trace};

const WRITER_SYSTEM_TEMPLATE: &str = include_str!("prompts/writer_system.hbs");
const SCRIPT_REQUEST_TEMPLATE: &str = include_str!("prompts/script_request.hbs");
const EDITOR_SYSTEM_TEMPLATE: &str = include_str!("prompts/editor_system.hbs");
const MERGE_REQUEST_TEMPLATE: &str = include_str!("prompts/merge_request.hbs");

/// Handlebars registry holding the built-in prompt templates.
pub struct PromptRegistry {
    hbs: Handlebars<'static>,
}

impl PromptRegistry {
    pub fn new() -> PodgenResult<Self> {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(false);
        // Prompts are plain text; HTML escaping would mangle quotes in the JSON schema.
        hbs.register_escape_fn(handlebars::no_escape);

        for (name, template) in [
            ("writer-system", WRITER_SYSTEM_TEMPLATE),
            ("script-request", SCRIPT_REQUEST_TEMPLATE),
            ("editor-system", EDITOR_SYSTEM_TEMPLATE),
            ("merge-request", MERGE_REQUEST_TEMPLATE),
        ] {
            hbs.register_template_string(name, template)
                .map_err(|e| PodgenError::Prompt(format!("{name}: {e}")))?;
        }

        debug!("Prompt registry initialized with 4 built-in templates");
        Ok(Self { hbs })
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> PodgenResult<String> {
        trace!("Rendering prompt '{}'", name);
        self.hbs
            .render(name, data)
            .map(|s| s.trim().to_string())
            .map_err(|e| PodgenError::Prompt(format!("{name}: {e}")))
    }

    /// Writer persona for the podcast called `podcast_name`.
    pub fn writer_system(&self, podcast_name: &str) -> PodgenResult<String> {
        self.render("writer-system", &json!({ "podcast_name": podcast_name }))
    }

    /// Generation instruction. The sponsor block is only emitted when at
    /// least one sponsor message has text.
    pub fn script_request(
        &self,
        title: &str,
        participants: &[Participant],
        sponsors: &[SponsorMessage],
        format_instructions: &str,
    ) -> PodgenResult<String> {
        let roster = participants
            .iter()
            .map(Participant::roster_entry)
            .collect::<Vec<_>>()
            .join(", ");
        let sponsors: Vec<&str> = sponsors
            .iter()
            .map(|s| s.message.trim())
            .filter(|m| !m.is_empty())
            .collect();

        self.render(
            "script-request",
            &json!({
                "title": title,
                "roster": roster,
                "sponsors": sponsors,
                "format_instructions": format_instructions,
            }),
        )
    }

    pub fn editor_system(&self) -> PodgenResult<String> {
        self.render("editor-system", &json!({}))
    }

    pub fn merge_request(&self, script_json: &str, format_instructions: &str) -> PodgenResult<String> {
        self.render(
            "merge-request",
            &json!({
                "script": script_json,
                "format_instructions": format_instructions,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Participant> {
        vec![
            Participant {
                name: "Ada".into(),
                role: "Host".into(),
                gender: "female".into(),
                voice: "v1".into(),
            },
            Participant {
                name: "Bo".into(),
                role: "Guest".into(),
                gender: "male".into(),
                voice: "v2".into(),
            },
        ]
    }

    #[test]
    fn test_writer_system_names_podcast() {
        let prompts = PromptRegistry::new().unwrap();
        let text = prompts.writer_system("Dingo and the Baby").unwrap();
        assert!(text.contains("'Dingo and the Baby' podcast"));
        assert!(text.contains("Outro"));
    }

    #[test]
    fn test_script_request_roster_and_no_sponsors() {
        let prompts = PromptRegistry::new().unwrap();
        let text = prompts
            .script_request("history of tea", &roster(), &[], "FORMAT")
            .unwrap();
        assert!(text.contains("title: history of tea"));
        assert!(text.contains(
            "Ada (female, Host with a voice v1), Bo (male, Guest with a voice v2)"
        ));
        assert!(!text.contains("SPONSOR MESSAGES"));
        assert!(text.ends_with("FORMAT"));
    }

    #[test]
    fn test_script_request_with_sponsors() {
        let prompts = PromptRegistry::new().unwrap();
        let sponsors = vec![
            SponsorMessage {
                message: "Blueband, the best jam to use".into(),
            },
            SponsorMessage {
                message: "   ".into(),
            },
        ];
        let text = prompts
            .script_request("history of tea", &roster(), &sponsors, "FORMAT")
            .unwrap();
        assert!(text.contains("SPONSOR MESSAGES"));
        assert!(text.contains("Blueband, the best jam to use"));
    }

    #[test]
    fn test_blank_sponsors_omit_block() {
        let prompts = PromptRegistry::new().unwrap();
        let sponsors = vec![SponsorMessage {
            message: "\n".into(),
        }];
        let text = prompts
            .script_request("history of tea", &roster(), &sponsors, "FORMAT")
            .unwrap();
        assert!(!text.contains("SPONSOR MESSAGES"));
    }

    #[test]
    fn test_merge_request_is_not_escaped() {
        let prompts = PromptRegistry::new().unwrap();
        let script = r#"{"title":"Tea & <Biscuits>"}"#;
        let text = prompts.merge_request(script, "FORMAT").unwrap();
        assert!(text.contains(script));
        assert!(text.starts_with("Given the podcast script below"));
    }
}
