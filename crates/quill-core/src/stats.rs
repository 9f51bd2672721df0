//! Plain-text extraction and word statistics for chapter HTML.

use serde::{Deserialize, Serialize};

use crate::manuscript::Chapter;

/// Tags whose boundaries separate words even without surrounding whitespace.
const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "li", "ul", "ol", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
];

/// Strip markup from editor HTML.
///
/// Block-level tags become newlines, inline tags vanish, and the handful of
/// entities the editor emits are decoded. Runs of blank lines are collapsed.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '<' => {
                let rest = &html[i + 1..];
                let end = match rest.find('>') {
                    Some(end) => end,
                    None => {
                        out.push_str(&html[i..]);
                        break;
                    }
                };
                let tag = &rest[..end];
                if is_block_tag(tag) && !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
                // Skip past the closing '>'
                let skip_to = i + 1 + end;
                while let Some(&(j, _)) = chars.peek() {
                    if j > skip_to {
                        break;
                    }
                    chars.next();
                }
            }
            '&' => {
                let rest = &html[i..];
                match decode_entity(rest) {
                    Some((decoded, len)) => {
                        out.push(decoded);
                        let skip_to = i + len;
                        while let Some(&(j, _)) = chars.peek() {
                            if j >= skip_to {
                                break;
                            }
                            chars.next();
                        }
                    }
                    None => out.push('&'),
                }
            }
            _ => out.push(c),
        }
    }

    out.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

fn decode_entity(s: &str) -> Option<(char, usize)> {
    const ENTITIES: &[(&str, char)] = &[
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
        ("&apos;", '\''),
        ("&nbsp;", ' '),
    ];
    ENTITIES
        .iter()
        .find(|(name, _)| s.starts_with(name))
        .map(|(name, c)| (*c, name.len()))
}

/// Number of whitespace-separated words in the visible text of `html`.
pub fn word_count(html: &str) -> usize {
    html_to_text(html).split_whitespace().count()
}

/// Daily and per-session word targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WritingGoals {
    pub daily: usize,
    pub session: usize,
}

impl Default for WritingGoals {
    fn default() -> Self {
        Self {
            daily: 1000,
            session: 500,
        }
    }
}

/// Snapshot of the writing progress panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordStats {
    pub chapter_words: usize,
    pub total_words: usize,
    /// Words added since the session baseline; never negative
    pub session_words: usize,
    /// Percent of the daily goal, capped at 100
    pub daily_progress: f64,
    /// Percent of the session goal, capped at 100
    pub session_progress: f64,
}

impl WordStats {
    /// Compute stats for `chapters`, with `session_start` the total word count
    /// when the session began.
    pub fn compute(
        chapters: &[Chapter],
        active_chapter_id: &str,
        session_start: usize,
        goals: WritingGoals,
    ) -> Self {
        let chapter_words = chapters
            .iter()
            .find(|c| c.id == active_chapter_id)
            .map(|c| word_count(&c.content))
            .unwrap_or(0);
        let total_words = total_words(chapters);
        let session_words = total_words.saturating_sub(session_start);

        Self {
            chapter_words,
            total_words,
            session_words,
            daily_progress: progress(session_words, goals.daily),
            session_progress: progress(session_words, goals.session),
        }
    }
}

/// Word count summed over every chapter.
pub fn total_words(chapters: &[Chapter]) -> usize {
    chapters.iter().map(|c| word_count(&c.content)).sum()
}

fn progress(words: usize, goal: usize) -> f64 {
    if goal == 0 {
        return 100.0;
    }
    (words as f64 / goal as f64 * 100.0).min(100.0)
}
