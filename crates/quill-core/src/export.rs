//! Manuscript export to plain text and Markdown.
//!
//! Both formats follow the same outline: the manuscript title, then each
//! chapter heading followed by its paragraphs separated by blank lines.

use crate::manuscript::Chapter;
use crate::stats::html_to_text;

/// Visible paragraphs of a chapter, in order.
fn paragraphs(content: &str) -> Vec<String> {
    html_to_text(content)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn export_plain_text(title: &str, chapters: &[Chapter]) -> String {
    let mut out = String::new();
    out.push_str(title.trim());
    out.push_str("\n\n");

    for chapter in chapters {
        out.push_str(&chapter.title);
        out.push_str("\n\n");
        for paragraph in paragraphs(&chapter.content) {
            out.push_str(&paragraph);
            out.push_str("\n\n");
        }
    }

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

pub fn export_markdown(title: &str, chapters: &[Chapter]) -> String {
    let mut out = format!("# {}\n\n", title.trim());

    for chapter in chapters {
        out.push_str(&format!("## {}\n\n", chapter.title));
        for paragraph in paragraphs(&chapter.content) {
            out.push_str(&paragraph);
            out.push_str("\n\n");
        }
    }

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}
