//! Best-effort markdown-to-HTML conversion for a complete result string.
//!
//! This is a fixed, order-dependent pipeline of text substitutions, not a
//! parser: each step assumes the ones before it already ran. Fenced code
//! blocks, inline code, headings 1-3, bold/italic, flat ordered/unordered
//! lists and paragraph breaks are handled. Nested lists, mixed list types
//! and code blocks containing blank or list-like lines are known not to
//! round-trip. Do not rely on the exact HTML structure downstream.

use regex::Regex;

use super::escape_html;

pub fn markdown_to_html(text: &str) -> String {
    let html = code_blocks(text);
    let html = inline_code(&html);
    let html = headings(&html);
    let html = emphasis(&html);
    let html = group_lists(&html);
    paragraphs(&html)
}

/// Fenced code blocks. Code content is the one place that gets escaped here;
/// the remaining steps treat their input as trusted intermediate markup.
fn code_blocks(text: &str) -> String {
    let fence = Regex::new(r"(?s)```(\w+)?\n(.*?)```").unwrap();
    fence
        .replace_all(text, |caps: &regex::Captures| {
            let language = caps.get(1).map(|m| m.as_str()).unwrap_or("text");
            let code = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                language,
                escape_html(code.trim())
            )
        })
        .into_owned()
}

fn inline_code(text: &str) -> String {
    let code = Regex::new(r"`([^`]+)`").unwrap();
    code.replace_all(text, "<code>$1</code>").into_owned()
}

fn headings(text: &str) -> String {
    let h3 = Regex::new(r"(?m)^### (.*)$").unwrap();
    let h2 = Regex::new(r"(?m)^## (.*)$").unwrap();
    let h1 = Regex::new(r"(?m)^# (.*)$").unwrap();
    let html = h3.replace_all(text, "<h3>$1</h3>");
    let html = h2.replace_all(&html, "<h2>$1</h2>");
    h1.replace_all(&html, "<h1>$1</h1>").into_owned()
}

fn emphasis(text: &str) -> String {
    let bold = Regex::new(r"\*\*([^*]+)\*\*").unwrap();
    let italic = Regex::new(r"\*([^*]+)\*").unwrap();
    let html = bold.replace_all(text, "<strong>$1</strong>");
    italic.replace_all(&html, "<em>$1</em>").into_owned()
}

/// Group consecutive list-item lines into one `<ol>` or `<ul>`. A line scan
/// rather than a substitution so a list does not swallow the rest of the
/// document.
fn group_lists(text: &str) -> String {
    let ordered = Regex::new(r"^\d+\.\s+(.*)$").unwrap();
    let unordered = Regex::new(r"^[-*]\s+(.*)$").unwrap();

    let mut out: Vec<String> = Vec::new();
    let mut open: Option<&'static str> = None;

    fn close(out: &mut Vec<String>, open: &mut Option<&'static str>) {
        if let Some(tag) = open.take() {
            out.push(format!("</{}>", tag));
        }
    }

    for line in text.split('\n') {
        if let Some(caps) = ordered.captures(line) {
            if open != Some("ol") {
                close(&mut out, &mut open);
                out.push("<ol>".to_string());
                open = Some("ol");
            }
            out.push(format!("<li>{}</li>", &caps[1]));
        } else if let Some(caps) = unordered.captures(line) {
            if open != Some("ul") {
                close(&mut out, &mut open);
                out.push("<ul>".to_string());
                open = Some("ul");
            }
            out.push(format!("<li>{}</li>", &caps[1]));
        } else {
            close(&mut out, &mut open);
            out.push(line.to_string());
        }
    }
    close(&mut out, &mut open);
    out.join("\n")
}

/// Blank-line paragraph breaks, then unwrap the `<p>` tags this wrongly puts
/// around block elements.
fn paragraphs(text: &str) -> String {
    let mut html = format!("<p>{}</p>", text.replace("\n\n", "</p><p>"));
    html = html.replace("<p></p>", "");

    for (wrong, right) in [
        (r"<p>(<h[1-3]>)", "$1"),
        (r"(</h[1-3]>)</p>", "$1"),
        (r"<p>(<pre>)", "$1"),
        (r"(</pre>)</p>", "$1"),
        (r"<p>(<ul>)", "$1"),
        (r"(</ul>)</p>", "$1"),
        (r"<p>(<ol>)", "$1"),
        (r"(</ol>)</p>", "$1"),
    ] {
        html = Regex::new(wrong).unwrap().replace_all(&html, right).into_owned();
    }
    html
}
