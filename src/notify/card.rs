//! Digest card construction.
//!
//! The delivery payload is an interactive-card message: a dated header,
//! the cleaned summary, then a numbered list of the top stories with
//! links. Card renderers handle only a subset of markdown, so heavier
//! markup coming back from the LLM is stripped, and paragraphs that look
//! like section headings are promoted to bold.

use crate::models::RankedArticle;
use serde_json::{Value, json};

/// At most this many stories appear in the card's news list.
pub const MAX_LISTED_ARTICLES: usize = 10;

/// Strip markdown constructs the card renderer cannot display. Two known
/// summary section headings keep their emphasis.
pub fn clean_summary(raw: &str) -> String {
    raw.replace("### **关键信息与趋势总结**", "**关键信息与趋势总结**")
        .replace("### **核心趋势提炼**", "**核心趋势提炼**")
        .replace("### ", "")
        .replace("#### ", "")
        .replace('#', "")
        .replace('`', "")
        .replace('_', "")
        .replace('~', "")
}

/// Collapse a paragraph to its non-empty trimmed lines.
fn normalize_paragraph(paragraph: &str) -> String {
    paragraph
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Promote heading-like paragraphs to bold: short numbered lead-ins, the
/// known summary section titles, and short single-colon label lines.
fn promote_heading(paragraph: &str) -> String {
    let p = paragraph.trim();
    if p.starts_with("**") {
        return p.to_string();
    }
    let chars = p.chars().count();
    let numbered =
        matches!(p.chars().next(), Some('1'..='9')) && p[1..].starts_with('.') && chars < 100;
    let known_section = p.starts_with("关键信息与趋势总结") || p.starts_with("核心趋势总结");
    let label_line = chars < 50 && p.matches(':').count() == 1;

    if numbered || known_section || label_line {
        format!("**{p}**")
    } else {
        p.to_string()
    }
}

/// Assemble the full card payload for the given summary and selection.
pub fn build_card(summary: &str, articles: &[RankedArticle], date_label: &str) -> Value {
    let mut elements = Vec::new();

    elements.push(json!({ "tag": "hr" }));
    elements.push(section("**📊 今日AI热点摘要:**"));

    let cleaned = clean_summary(summary);
    for paragraph in cleaned.split("\n\n") {
        let formatted = normalize_paragraph(paragraph);
        if formatted.is_empty() {
            continue;
        }
        elements.push(section(&promote_heading(&formatted)));
    }

    elements.push(json!({ "tag": "hr" }));
    elements.push(section("**📰 详细新闻列表:**"));

    for (index, article) in articles.iter().take(MAX_LISTED_ARTICLES).enumerate() {
        elements.push(section(&format!(
            "{}. [{}]({}) 来源: {} 日期: {}",
            index + 1,
            article.title,
            article.link,
            article.source,
            article.date
        )));
    }

    json!({
        "msg_type": "interactive",
        "card": {
            "config": {
                "wide_screen_mode": true,
                "enable_forward": true
            },
            "header": {
                "template": "blue",
                "title": {
                    "content": format!("🤖 AI日报 - {date_label}"),
                    "tag": "plain_text"
                }
            },
            "elements": elements
        }
    })
}

fn section(content: &str) -> Value {
    json!({
        "tag": "div",
        "text": {
            "tag": "lark_md",
            "content": content
        }
    })
}
