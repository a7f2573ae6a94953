//! Event rendering.
//!
//! Each [`AgentEvent`] maps to exactly one HTML card; a [`Transcript`]
//! collects the cards for one session in arrival order. Every string that
//! originates from the backend or the model passes through [`escape_html`]
//! before it is interpolated into markup — there is no raw-interpolation
//! path, by construction.

pub mod markdown;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::client::AgentResponse;
use crate::events::AgentEvent;

/// Escape text for safe interpolation into HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn card(class: &str, icon: &str, title: &str, content: &str) -> String {
    format!(
        "<div class=\"event-card {class}\">\
         <div class=\"event-header\"><span>{icon}</span><span>{title}</span></div>\
         <div class=\"event-content\">{content}</div>\
         </div>"
    )
}

/// Pretty-print a JSON value into an escaped `<pre>` block.
fn pre_json(value: &Value) -> String {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("<pre>{}</pre>", escape_html(&text))
}

fn tool_icon(tool_name: &str) -> &'static str {
    match tool_name {
        "write_file" => "📝",
        "read_file" => "📖",
        "list_files" => "📂",
        "log_thought" => "💭",
        "finish_task" => "✅",
        _ => "🔧",
    }
}

/// Render one event as one HTML card. Total over all event kinds; an
/// unrecognized kind gets a generic card with the raw payload shown.
pub fn render_event(event: &AgentEvent) -> String {
    match event {
        AgentEvent::TaskStarted { message } => card(
            "task-started-event",
            "🚀",
            "Task Started",
            &escape_html(message.as_deref().unwrap_or("Task accepted")),
        ),
        AgentEvent::IterationStart { iteration, message } => card(
            "iteration-event",
            "🔄",
            &format!("Iteration {}", iteration),
            &escape_html(message),
        ),
        AgentEvent::Thinking { message } => card(
            "thinking-event",
            "💭",
            "Thinking",
            &escape_html(message),
        ),
        AgentEvent::ToolCall {
            tool_name,
            parameters,
        } => {
            let content = if parameters.is_null() {
                String::new()
            } else {
                pre_json(parameters)
            };
            card(
                "tool-call-event",
                tool_icon(tool_name),
                &escape_html(tool_name),
                &content,
            )
        }
        AgentEvent::ToolResult {
            tool_name,
            result,
            details,
        } => {
            let mut content = format_tool_result(tool_name, result);
            if let Some(details) = details {
                content.push_str(&pre_json(details));
            }
            card(
                "tool-result-event",
                tool_icon(tool_name),
                &escape_html(tool_name),
                &content,
            )
        }
        AgentEvent::TaskComplete {
            message,
            additional_info,
        } => {
            let extra = additional_info
                .as_ref()
                .map(|info| {
                    format!(
                        "<div class=\"additional-info\"><strong>Additional Information:</strong>{}</div>",
                        pre_json(info)
                    )
                })
                .unwrap_or_default();
            let content = format!(
                "<div class=\"task-complete-container\">\
                 <h3 class=\"task-complete-heading\">Task Successfully Completed!</h3>\
                 <p class=\"task-complete-message\">{}</p>{extra}\
                 </div>",
                escape_html(message)
            );
            card("complete-event", "✅", "Task Complete", &content)
        }
        AgentEvent::Error { message, details } => {
            let extra = details
                .as_ref()
                .map(|d| {
                    format!(
                        "<div class=\"error-details\"><strong>Details:</strong>{}</div>",
                        pre_json(d)
                    )
                })
                .unwrap_or_default();
            card(
                "error-event",
                "❌",
                "Error",
                &format!("{}{extra}", escape_html(message)),
            )
        }
        AgentEvent::Log { message } => card("log-event", "📋", "Log", &escape_html(message)),
        AgentEvent::Unknown { payload } => {
            card("unknown-event", "❓", "Unknown Event", &pre_json(payload))
        }
    }
}

/// Tool-specific result formatting, mirroring what each tool's output means
/// rather than dumping it raw.
fn format_tool_result(tool_name: &str, result: &str) -> String {
    if result.is_empty() {
        return String::new();
    }

    match tool_name {
        "write_file" if result.starts_with("Success") => {
            let path = result
                .strip_prefix("Success: File written to ")
                .unwrap_or(result);
            format!(
                "<strong>✓ File created:</strong> <code>{}</code>",
                escape_html(path)
            )
        }
        "read_file" => "<strong>✓ File read successfully</strong> (content not displayed)".to_string(),
        "list_files" => {
            let lines: Vec<&str> = result.split('\n').collect();
            if lines.len() > 10 {
                let shown = lines[..10].join("\n");
                format!(
                    "<pre>{}\n... and {} more items</pre>",
                    escape_html(&shown),
                    lines.len() - 10
                )
            } else {
                format!("<pre>{}</pre>", escape_html(result))
            }
        }
        "finish_task" => format_finish_task(result),
        _ => format!("<pre>{}</pre>", escape_html(result)),
    }
}

/// The finish tool reports `{summary, timestamp}` as JSON; fall back to the
/// raw text when it is anything else.
fn format_finish_task(result: &str) -> String {
    let (summary, timestamp) = match serde_json::from_str::<Value>(result) {
        Ok(value) => (
            value
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or("Task completed successfully")
                .to_string(),
            value
                .get("timestamp")
                .and_then(Value::as_str)
                .unwrap_or("Just now")
                .to_string(),
        ),
        Err(_) => (result.to_string(), "Just now".to_string()),
    };
    format!(
        "<div class=\"finish-task-container\">\
         <h3 class=\"finish-task-heading\">Task Complete!</h3>\
         <p class=\"finish-task-message\">{}</p>\
         <div class=\"finish-task-timestamp\">Completed at: {}</div>\
         </div>",
        escape_html(&summary),
        escape_html(&timestamp)
    )
}

/// Render the single terminal card of the non-streaming submit path.
pub fn render_response(response: &AgentResponse) -> String {
    if response.success {
        let body = response
            .result
            .as_deref()
            .map(markdown::markdown_to_html)
            .unwrap_or_else(|| escape_html(response.headline()));
        let extra = response
            .additional_info
            .as_ref()
            .map(|info| {
                format!(
                    "<div class=\"additional-info\"><strong>Additional Information:</strong>{}</div>",
                    pre_json(info)
                )
            })
            .unwrap_or_default();
        let badge = response
            .agent_type
            .as_deref()
            .map(|a| format!("<span class=\"agent-badge\">{}</span>", escape_html(a)))
            .unwrap_or_default();
        let reasoning = response
            .reasoning
            .as_deref()
            .map(|r| format!("<p class=\"reasoning\">{}</p>", escape_html(r)))
            .unwrap_or_default();
        card(
            "complete-event",
            "🎉",
            "Task Complete",
            &format!("{badge}{reasoning}{body}{extra}"),
        )
    } else {
        let extra = response
            .details
            .as_ref()
            .map(|d| {
                format!(
                    "<div class=\"error-details\"><strong>Details:</strong>{}</div>",
                    pre_json(d)
                )
            })
            .unwrap_or_default();
        card(
            "error-event",
            "❌",
            "Error",
            &format!(
                "<p><strong>Error:</strong> {}</p>{extra}",
                escape_html(response.headline())
            ),
        )
    }
}

const LOADING_CARD: &str = "<div class=\"spinner\"><div class=\"spinner-border\"></div>\
                            <p>Processing your request...</p></div>";

/// Append-only output panel for one session.
///
/// Opens with a loading placeholder that is removed exactly once when the
/// first real event arrives; after that, cards are only ever appended.
pub struct Transcript {
    started_at: DateTime<Utc>,
    cards: Vec<String>,
    loading: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            cards: Vec::new(),
            loading: true,
        }
    }

    /// Render and append the card for one delivered event.
    pub fn push(&mut self, event: &AgentEvent) -> &str {
        self.loading = false;
        self.cards.push(render_event(event));
        self.cards.last().expect("card just appended")
    }

    /// Most recently appended card, if any.
    pub fn last_card(&self) -> Option<&str> {
        self.cards.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The whole panel: stream header, then every card in append order (or
    /// the loading placeholder while no event has arrived yet).
    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<div class=\"stream-header\">🔴 Live Response Stream — started {}</div>",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if self.loading {
            html.push_str(LOADING_CARD);
        } else {
            for card in &self.cards {
                html.push_str(card);
            }
        }
        html
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("a & b"), "a &amp; b");
    }

    #[test]
    fn test_event_strings_are_escaped() {
        let html = render_event(&AgentEvent::Error {
            message: "<script>alert(1)</script>".to_string(),
            details: None,
        });
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_tool_result_content_is_escaped() {
        let html = render_event(&AgentEvent::ToolResult {
            tool_name: "grep".to_string(),
            result: "<b>match</b>".to_string(),
            details: None,
        });
        assert!(html.contains("&lt;b&gt;match&lt;/b&gt;"));
    }

    #[test]
    fn test_iteration_card() {
        let html = render_event(&AgentEvent::IterationStart {
            iteration: 2,
            message: "refining".to_string(),
        });
        assert!(html.contains("Iteration 2"));
        assert!(html.contains("refining"));
        assert!(html.contains("iteration-event"));
    }

    #[test]
    fn test_finish_task_parses_summary_json() {
        let html = render_event(&AgentEvent::ToolResult {
            tool_name: "finish_task".to_string(),
            result: "{\"summary\":\"All set\",\"timestamp\":\"2024-01-01T00:00:00Z\"}".to_string(),
            details: None,
        });
        assert!(html.contains("All set"));
        assert!(html.contains("Completed at: 2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_finish_task_falls_back_on_plain_text() {
        let html = render_event(&AgentEvent::ToolResult {
            tool_name: "finish_task".to_string(),
            result: "not json".to_string(),
            details: None,
        });
        assert!(html.contains("not json"));
        assert!(html.contains("Just now"));
    }

    #[test]
    fn test_list_files_truncates_long_listings() {
        let listing: Vec<String> = (0..15).map(|i| format!("file-{}.rs", i)).collect();
        let html = render_event(&AgentEvent::ToolResult {
            tool_name: "list_files".to_string(),
            result: listing.join("\n"),
            details: None,
        });
        assert!(html.contains("file-9.rs"));
        assert!(!html.contains("file-10.rs"));
        assert!(html.contains("... and 5 more items"));
    }

    #[test]
    fn test_unknown_event_shows_payload() {
        let html = render_event(&AgentEvent::Unknown {
            payload: json!({"type": "TELEMETRY", "cpu": 0.5}),
        });
        assert!(html.contains("Unknown Event"));
        assert!(html.contains("TELEMETRY"));
    }

    #[test]
    fn test_transcript_removes_placeholder_once() {
        let mut transcript = Transcript::new();
        assert!(transcript.to_html().contains("Processing your request"));

        transcript.push(&AgentEvent::Log {
            message: "first".to_string(),
        });
        let html = transcript.to_html();
        assert!(!html.contains("Processing your request"));
        assert!(html.contains("first"));
    }

    #[test]
    fn test_transcript_appends_in_order() {
        let mut transcript = Transcript::new();
        transcript.push(&AgentEvent::IterationStart {
            iteration: 1,
            message: "start".to_string(),
        });
        transcript.push(&AgentEvent::ToolResult {
            tool_name: "read_file".to_string(),
            result: "ok".to_string(),
            details: None,
        });
        transcript.push(&AgentEvent::TaskComplete {
            message: "done".to_string(),
            additional_info: None,
        });

        assert_eq!(transcript.len(), 3);
        let html = transcript.to_html();
        let a = html.find("Iteration 1").unwrap();
        let b = html.find("read_file").unwrap();
        let c = html.find("Task Complete").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_render_response_error_shape() {
        let response: AgentResponse = serde_json::from_value(json!({
            "success": false,
            "message": "<img src=x onerror=alert(1)>",
            "details": {"code": 42}
        }))
        .unwrap();
        let html = render_response(&response);
        assert!(html.contains("error-event"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;img"));
        assert!(html.contains("42"));
    }

    #[test]
    fn test_render_response_success_with_markdown_result() {
        let response: AgentResponse = serde_json::from_value(json!({
            "success": true,
            "result": "# Done\n\nWrote **two** files"
        }))
        .unwrap();
        let html = render_response(&response);
        assert!(html.contains("<h1>Done</h1>"));
        assert!(html.contains("<strong>two</strong>"));
    }
}
