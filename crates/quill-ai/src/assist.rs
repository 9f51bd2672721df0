//! Writing assistant
//!
//! [`WritingAssistant`] runs AI actions against an [`EditorSession`] and puts
//! the results into the edit buffer. Every failure is reported through the
//! session's notifier and leaves the buffer as it was.

use std::sync::Arc;

use quill_core::{html_to_text, Character, EditorSession, Notification, Notifier, Store};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::action::{AiAction, EditorAnalysis, RewriteStyle};
use crate::client::{AiFunction, AiRequest};
use crate::error::AiError;
use crate::transcribe::Transcriber;

/// Fields filled in by `generate-character`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterProfile {
    pub personality: Option<String>,
    pub background: Option<String>,
    pub description: Option<String>,
}

impl CharacterProfile {
    /// Parse a model reply, accepting a bare JSON object or one inside a
    /// fenced code block.
    pub fn parse(reply: &str) -> Result<Self, AiError> {
        let trimmed = strip_code_fence(reply.trim());
        let start = trimmed.find('{');
        let end = trimmed.rfind('}');
        let json = match (start, end) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => return Err(AiError::InvalidResponse("no JSON object in reply".to_string())),
        };
        serde_json::from_str(json).map_err(|e| AiError::InvalidResponse(e.to_string()))
    }

    /// Copy generated fields onto a character, keeping existing values where
    /// the profile has none.
    pub fn apply_to(&self, character: &mut Character) {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        if let Some(personality) = non_empty(&self.personality) {
            character.personality = Some(personality);
        }
        if let Some(background) = non_empty(&self.background) {
            character.background = Some(background);
        }
        if let Some(description) = non_empty(&self.description) {
            character.description = Some(description);
        }
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop an info string such as `json`
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Last `n` characters of `text`.
fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub struct WritingAssistant<S> {
    session: Arc<EditorSession<S>>,
    ai: Arc<dyn AiFunction>,
    transcriber: Option<Arc<dyn Transcriber>>,
    context_chars: usize,
}

impl<S> WritingAssistant<S>
where
    S: Store + 'static,
{
    pub fn new(
        session: Arc<EditorSession<S>>,
        ai: Arc<dyn AiFunction>,
        context_chars: usize,
    ) -> Self {
        Self {
            session,
            ai,
            transcriber: None,
            context_chars,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn session(&self) -> &Arc<EditorSession<S>> {
        &self.session
    }

    fn notifier(&self) -> &Arc<dyn Notifier> {
        self.session.notifier()
    }

    fn reject(&self, message: &str) -> AiError {
        self.notifier().notify(Notification::error(message));
        AiError::Validation(message.to_string())
    }

    /// Request carrying the buffer's plain text and its trailing context.
    fn buffer_request(&self, action: AiAction) -> (String, AiRequest) {
        let chapter_id = self.session.active_chapter_id();
        let plain = html_to_text(&self.session.buffer());
        let context = tail_chars(&plain, self.context_chars).to_string();
        let request = AiRequest::new(action).with_text(plain).with_context(context);
        (chapter_id, request)
    }

    async fn call(&self, request: &AiRequest) -> Result<String, AiError> {
        match self.ai.invoke(request).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(action = %request.action, error = %e, "AI action failed");
                self.notifier().notify(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Apply `edit` to the buffer if the chapter the request was built from is
    /// still active.
    fn apply(&self, chapter_id: &str, edit: impl FnOnce(&str) -> String) -> Result<(), AiError> {
        if self.session.active_chapter_id() != chapter_id {
            return Err(self.reject("Chapter changed before the AI finished"));
        }
        let updated = edit(&self.session.buffer());
        self.session.update_buffer(updated);
        Ok(())
    }

    /// Continue the story from the end of the active chapter.
    pub async fn autocomplete(&self) -> Result<String, AiError> {
        let (chapter_id, request) = self.buffer_request(AiAction::Autocomplete);
        let result = self.call(&request).await?;
        self.apply(&chapter_id, |buffer| format!("{}<p>{}</p>", buffer, result))?;
        self.notifier()
            .notify(Notification::success("AI continued your story!"));
        Ok(result)
    }

    /// Replace the active chapter with a rewritten version.
    pub async fn rewrite(&self, style: RewriteStyle) -> Result<String, AiError> {
        let (chapter_id, request) = self.buffer_request(AiAction::Rewrite(style));
        let result = self.call(&request).await?;
        self.apply(&chapter_id, |_| format!("<p>{}</p>", result))?;
        self.notifier().notify(Notification::success("Text rewritten!"));
        Ok(result)
    }

    pub async fn generate_scene(&self, prompt: &str) -> Result<String, AiError> {
        if prompt.trim().is_empty() {
            return Err(self.reject("Please enter a scene description"));
        }
        let (chapter_id, request) = self.buffer_request(AiAction::GenerateScene);
        let request = request.with_prompt(prompt);
        let result = self.call(&request).await?;
        self.apply(&chapter_id, |buffer| format!("{}<p>{}</p>", buffer, result))?;
        self.notifier().notify(Notification::success("Scene generated!"));
        Ok(result)
    }

    /// Summary of the active chapter. The buffer is not changed.
    pub async fn summarize(&self) -> Result<String, AiError> {
        if self.session.buffer().trim().is_empty() {
            return Err(self.reject("No content to summarize"));
        }
        let (_, request) = self.buffer_request(AiAction::Summarize);
        let summary = self.call(&request).await?;
        self.notifier()
            .notify(Notification::info(format!("Chapter Summary: {}", summary)));
        Ok(summary)
    }

    /// Whole manuscript as plain text, one `## title` section per chapter.
    pub fn manuscript_text(&self) -> String {
        self.session
            .current_chapters()
            .iter()
            .map(|chapter| {
                format!("## {}\n\n{}", chapter.title, html_to_text(&chapter.content))
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    /// Editorial feedback on the whole manuscript.
    pub async fn analyze(&self, analysis: EditorAnalysis) -> Result<String, AiError> {
        let has_content = self
            .session
            .current_chapters()
            .iter()
            .any(|c| !html_to_text(&c.content).trim().is_empty());
        if !has_content {
            return Err(self.reject("No content to analyze"));
        }

        let text = self.manuscript_text();
        let request = AiRequest::new(AiAction::Editor(analysis))
            .with_text(text.clone())
            .with_context(text);
        let feedback = self.call(&request).await?;
        info!(analysis = analysis.as_str(), "manuscript analysis complete");
        self.notifier().notify(Notification::success("Analysis complete!"));
        Ok(feedback)
    }

    /// Generate personality, background and description for a character.
    pub async fn generate_character(
        &self,
        name: &str,
        role: Option<&str>,
        description: Option<&str>,
    ) -> Result<CharacterProfile, AiError> {
        if name.trim().is_empty() {
            return Err(self.reject("Please enter a character name first"));
        }
        let or_unset = |v: Option<&str>| {
            v.filter(|s| !s.trim().is_empty())
                .unwrap_or("Not specified")
                .to_string()
        };
        let request = AiRequest::new(AiAction::GenerateCharacter)
            .with_text(name.trim())
            .with_context(format!(
                "Role: {}\nDescription: {}",
                or_unset(role),
                or_unset(description)
            ));

        let profile = match self.ai.invoke(&request).await {
            Ok(reply) => CharacterProfile::parse(&reply),
            Err(e) => Err(e),
        };
        match profile {
            Ok(profile) => {
                self.notifier()
                    .notify(Notification::success("Character profile generated!"));
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "failed to generate character profile");
                let message = match &e {
                    AiError::RateLimited { .. } | AiError::PaymentRequired { .. } => {
                        e.user_message()
                    }
                    _ => "Failed to generate profile".to_string(),
                };
                self.notifier().notify(Notification::error(message));
                Err(e)
            }
        }
    }

    /// Transcribe audio and append it to the active chapter.
    ///
    /// The chapter's text is flattened into a single paragraph followed by the
    /// transcript.
    pub async fn dictate(&self, audio: &[u8]) -> Result<String, AiError> {
        let Some(transcriber) = &self.transcriber else {
            return Err(self.reject("Dictation is not configured"));
        };
        let chapter_id = self.session.active_chapter_id();
        let text = match transcriber.transcribe(audio).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "transcription failed");
                self.notifier().notify(Notification::error(format!(
                    "Transcription failed: {}",
                    e.user_message()
                )));
                return Err(e);
            }
        };
        self.apply(&chapter_id, |buffer| {
            let current = html_to_text(buffer).replace('\n', " ");
            format!("<p>{} {}</p>", escape_html(current.trim()), escape_html(&text))
        })?;
        self.notifier()
            .notify(Notification::success("Dictation added to manuscript"));
        Ok(text)
    }
}
