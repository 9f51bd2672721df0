//! System and user prompts for each AI action
//!
//! Templates may reference `{text}` (plain text of the chapter or manuscript),
//! `{context}` (trailing excerpt) and `{prompt}` (free-form request). The
//! built-in table can be overridden per action from TOML:
//!
//! ```toml
//! [autocomplete]
//! system = "You continue stories."
//! user = "{context}"
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::action::{AiAction, EditorAnalysis, RewriteStyle};
use crate::error::AiError;

pub const DEFAULT_SCENE_PROMPT: &str = "Generate a vivid scene description";
pub const DEFAULT_CHAT_PROMPT: &str = "Hello!";

const CHARACTER_PROFILE_FORMAT: &str = "Provide a JSON response with the following fields:
- personality: A detailed description of their traits, quirks, and behavioral patterns
- background: Their history, key life events, and how it shaped them
- description: Physical appearance and how they present themselves

Make the character feel real and multi-dimensional.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptInput<'a> {
    pub text: Option<&'a str>,
    pub context: Option<&'a str>,
    pub prompt: Option<&'a str>,
}

/// System and user message ready to send to a chat model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTable {
    templates: HashMap<AiAction, PromptTemplate>,
}

impl Default for PromptTable {
    fn default() -> Self {
        let templates = AiAction::all()
            .into_iter()
            .map(|action| (action, builtin(action)))
            .collect();
        Self { templates }
    }
}

impl PromptTable {
    /// Built-in prompts with the overrides from `toml_str` applied.
    pub fn from_toml(toml_str: &str) -> Result<Self, AiError> {
        let overrides: HashMap<String, PromptTemplate> =
            toml::from_str(toml_str).map_err(|e| AiError::Config(e.to_string()))?;
        let mut table = Self::default();
        for (tag, template) in overrides {
            let action: AiAction = tag.parse()?;
            table.templates.insert(action, template);
        }
        Ok(table)
    }

    pub fn get(&self, action: AiAction) -> Option<&PromptTemplate> {
        self.templates.get(&action)
    }

    pub fn set(&mut self, action: AiAction, template: PromptTemplate) {
        self.templates.insert(action, template);
    }

    /// Fill in the template for `action`.
    pub fn render(
        &self,
        action: AiAction,
        input: &PromptInput<'_>,
    ) -> Result<RenderedPrompt, AiError> {
        let template = self
            .templates
            .get(&action)
            .ok_or_else(|| AiError::UnknownAction(action.tag()))?;

        let prompt = match action {
            AiAction::GenerateScene => non_empty(input.prompt).unwrap_or(DEFAULT_SCENE_PROMPT),
            AiAction::Chat => non_empty(input.prompt)
                .or(non_empty(input.text))
                .unwrap_or(DEFAULT_CHAT_PROMPT),
            _ => input.prompt.unwrap_or(""),
        };

        let values = [
            ("{text}", input.text.unwrap_or("")),
            ("{context}", input.context.unwrap_or("")),
            ("{prompt}", prompt),
        ];
        Ok(RenderedPrompt {
            system: fill(&template.system, &values),
            user: fill(&template.user, &values),
        })
    }
}

/// Substitute placeholders in a single pass over `template`. Inserted values
/// are never scanned again.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match values.iter().find(|(token, _)| tail.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn builtin(action: AiAction) -> PromptTemplate {
    match action {
        AiAction::Autocomplete => PromptTemplate::new(
            "You are a creative writing assistant for novelists. Continue the story naturally in the author's style. Write 1-2 sentences that flow seamlessly from the context.",
            "Context:\n{context}\n\nContinue writing from here naturally:",
        ),
        AiAction::Rewrite(RewriteStyle::Suspenseful) => PromptTemplate::new(
            "You are a creative writing expert. Rewrite the given text to be more suspenseful, adding tension and intrigue.",
            "Rewrite this to be more suspenseful:\n\n{text}",
        ),
        AiAction::Rewrite(RewriteStyle::Show) => PromptTemplate::new(
            "You are a creative writing expert. Rewrite the given text using \"show, don't tell\" technique - use sensory details and actions instead of stating emotions directly.",
            "Rewrite this using \"show, don't tell\":\n\n{text}",
        ),
        AiAction::Rewrite(RewriteStyle::Dialogue) => PromptTemplate::new(
            "You are a creative writing expert. Rewrite the dialogue to be more natural, authentic, and character-driven.",
            "Make this dialogue more natural:\n\n{text}",
        ),
        AiAction::GenerateScene => PromptTemplate::new(
            "You are a creative writing assistant. Generate vivid, atmospheric scene descriptions based on prompts. Write 2-3 paragraphs.",
            "{prompt}",
        ),
        AiAction::Summarize => PromptTemplate::new(
            "You are a writing assistant. Provide a concise, clear summary of the chapter highlighting key plot points and character development.",
            "Summarize this chapter:\n\n{text}",
        ),
        AiAction::Chat => PromptTemplate::new(
            "You are a creative writing coach and novel development assistant. Help the author with plot development, character arcs, world-building, pacing, themes, and any other aspect of their novel. Be encouraging, insightful, and ask thoughtful questions to help them develop their story.",
            "{prompt}",
        ),
        AiAction::GenerateCharacter => PromptTemplate::new(
            "You are a creative writing assistant specializing in character development. Generate detailed, nuanced character profiles that feel authentic and three-dimensional.",
            format!(
                "Create a detailed character profile for: {{text}}\n\nContext: {{context}}\n\n{}",
                CHARACTER_PROFILE_FORMAT
            ),
        ),
        AiAction::Editor(analysis) => editor(analysis),
    }
}

fn editor(analysis: EditorAnalysis) -> PromptTemplate {
    let (speciality, request, focus): (&str, &str, &[&str]) = match analysis {
        EditorAnalysis::Plot => (
            "specializing in plot structure and narrative consistency. Provide detailed, constructive feedback on plot elements, pacing, and story structure.",
            "Please analyze the plot of this manuscript. Focus on:",
            &[
                "Plot consistency and logic",
                "Story structure and arc",
                "Pacing and tension",
                "Plot holes or inconsistencies",
                "Narrative flow",
            ],
        ),
        EditorAnalysis::Characters => (
            "specializing in character development. Provide detailed, constructive feedback on character arcs, consistency, and depth.",
            "Please analyze the characters in this manuscript. Focus on:",
            &[
                "Character development and arcs",
                "Character consistency",
                "Dialogue authenticity",
                "Character motivations",
                "Relationships between characters",
            ],
        ),
        EditorAnalysis::Pacing => (
            "specializing in narrative pacing and flow. Provide detailed, constructive feedback on pacing, rhythm, and reader engagement.",
            "Please analyze the pacing of this manuscript. Focus on:",
            &[
                "Overall pacing and rhythm",
                "Scene transitions",
                "Tension and release",
                "Reader engagement",
                "Areas that feel rushed or slow",
            ],
        ),
        EditorAnalysis::StyleConsistency => (
            "specializing in prose style. Provide detailed, constructive feedback on how consistently the writing style holds across the manuscript.",
            "Please analyze the consistency of the writing style in this manuscript. Focus on:",
            &[
                "Sentence structure and variety",
                "Word choice and register",
                "Tense and point of view",
                "Formatting of dialogue and thoughts",
                "Passages that break from the established style",
            ],
        ),
        EditorAnalysis::VoiceConsistency => (
            "specializing in narrative and character voice. Provide detailed, constructive feedback on how distinct and consistent each voice is.",
            "Please analyze the consistency of voice in this manuscript. Focus on:",
            &[
                "Narrator voice across chapters",
                "Distinct voices for each character",
                "Speech patterns and vocabulary",
                "Lines that sound out of character",
                "Shifts in voice between scenes",
            ],
        ),
        EditorAnalysis::ToneMood => (
            "specializing in tone and atmosphere. Provide detailed, constructive feedback on the emotional tone and mood of the story.",
            "Please analyze the tone and mood of this manuscript. Focus on:",
            &[
                "Overall tone and how well it fits the genre",
                "Mood of individual scenes",
                "Atmosphere and setting",
                "Emotional shifts and their effectiveness",
                "Tonal inconsistencies",
            ],
        ),
        EditorAnalysis::GrammarStyle => (
            "specializing in line editing. Provide detailed, constructive feedback on grammar, mechanics, and clarity of prose.",
            "Please review the grammar and style of this manuscript. Focus on:",
            &[
                "Grammar and punctuation errors",
                "Awkward or unclear sentences",
                "Repetition and filler words",
                "Passive voice and weak verbs",
                "Readability and clarity",
            ],
        ),
        EditorAnalysis::Overall => {
            return PromptTemplate::new(
                "You are an experienced book editor providing comprehensive editorial feedback. Provide detailed, constructive feedback covering all aspects of the manuscript.",
                "Please provide comprehensive editorial feedback on this manuscript. Cover:\n- Strengths and weaknesses\n- Plot and structure\n- Character development\n- Writing style and voice\n- Pacing and flow\n- Suggestions for improvement\n\nManuscript:\n{text}",
            );
        }
    };

    let bullets: String = focus.iter().map(|f| format!("\n- {}", f)).collect();
    PromptTemplate::new(
        format!("You are an experienced book editor {}", speciality),
        format!("{}{}\n\nManuscript:\n{{text}}", request, bullets),
    )
}
