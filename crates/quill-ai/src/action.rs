//! AI action tags
//!
//! Actions travel over the wire as kebab-case tags such as `rewrite-show` or
//! `editor-tone-mood`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteStyle {
    Suspenseful,
    /// "Show, don't tell"
    Show,
    Dialogue,
}

impl RewriteStyle {
    pub const ALL: [RewriteStyle; 3] = [
        RewriteStyle::Suspenseful,
        RewriteStyle::Show,
        RewriteStyle::Dialogue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteStyle::Suspenseful => "suspenseful",
            RewriteStyle::Show => "show",
            RewriteStyle::Dialogue => "dialogue",
        }
    }
}

/// Whole-manuscript editorial analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorAnalysis {
    Plot,
    Characters,
    Pacing,
    StyleConsistency,
    VoiceConsistency,
    ToneMood,
    GrammarStyle,
    Overall,
}

impl EditorAnalysis {
    pub const ALL: [EditorAnalysis; 8] = [
        EditorAnalysis::Plot,
        EditorAnalysis::Characters,
        EditorAnalysis::Pacing,
        EditorAnalysis::StyleConsistency,
        EditorAnalysis::VoiceConsistency,
        EditorAnalysis::ToneMood,
        EditorAnalysis::GrammarStyle,
        EditorAnalysis::Overall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditorAnalysis::Plot => "plot",
            EditorAnalysis::Characters => "characters",
            EditorAnalysis::Pacing => "pacing",
            EditorAnalysis::StyleConsistency => "style-consistency",
            EditorAnalysis::VoiceConsistency => "voice-consistency",
            EditorAnalysis::ToneMood => "tone-mood",
            EditorAnalysis::GrammarStyle => "grammar-style",
            EditorAnalysis::Overall => "overall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AiAction {
    Autocomplete,
    Rewrite(RewriteStyle),
    GenerateScene,
    Summarize,
    Chat,
    GenerateCharacter,
    Editor(EditorAnalysis),
}

impl AiAction {
    /// Every action, in the order the prompt table lists them.
    pub fn all() -> Vec<AiAction> {
        let mut all = vec![AiAction::Autocomplete];
        all.extend(RewriteStyle::ALL.into_iter().map(AiAction::Rewrite));
        all.extend([
            AiAction::GenerateScene,
            AiAction::Summarize,
            AiAction::Chat,
            AiAction::GenerateCharacter,
        ]);
        all.extend(EditorAnalysis::ALL.into_iter().map(AiAction::Editor));
        all
    }

    pub fn tag(&self) -> String {
        match self {
            AiAction::Autocomplete => "autocomplete".to_string(),
            AiAction::Rewrite(style) => format!("rewrite-{}", style.as_str()),
            AiAction::GenerateScene => "generate-scene".to_string(),
            AiAction::Summarize => "summarize".to_string(),
            AiAction::Chat => "chat".to_string(),
            AiAction::GenerateCharacter => "generate-character".to_string(),
            AiAction::Editor(analysis) => format!("editor-{}", analysis.as_str()),
        }
    }
}

impl fmt::Display for AiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl FromStr for AiAction {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "autocomplete" => AiAction::Autocomplete,
            "generate-scene" => AiAction::GenerateScene,
            "summarize" => AiAction::Summarize,
            "chat" => AiAction::Chat,
            "generate-character" => AiAction::GenerateCharacter,
            _ => {
                if let Some(style) = s.strip_prefix("rewrite-") {
                    RewriteStyle::ALL
                        .into_iter()
                        .find(|r| r.as_str() == style)
                        .map(AiAction::Rewrite)
                        .ok_or_else(|| AiError::UnknownAction(s.to_string()))?
                } else if let Some(kind) = s.strip_prefix("editor-") {
                    EditorAnalysis::ALL
                        .into_iter()
                        .find(|a| a.as_str() == kind)
                        .map(AiAction::Editor)
                        .ok_or_else(|| AiError::UnknownAction(s.to_string()))?
                } else {
                    return Err(AiError::UnknownAction(s.to_string()));
                }
            }
        };
        Ok(action)
    }
}

impl From<AiAction> for String {
    fn from(action: AiAction) -> Self {
        action.tag()
    }
}

impl TryFrom<String> for AiAction {
    type Error = AiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
