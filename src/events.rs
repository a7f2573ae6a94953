//! Agent progress events and wire-format normalization.
//!
//! The backend emits one JSON object per event. The canonical schema uses a
//! `type` discriminant with `toolName` / `result` field names; earlier
//! backend revisions used `eventType`, `tool_name` and `toolResult`. All of
//! that drift is absorbed here, in one decode step, so the rest of the crate
//! only ever sees [`AgentEvent`].

use serde_json::Value;

/// One decoded unit of agent progress.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Task accepted by the backend.
    TaskStarted { message: Option<String> },
    /// A new agent loop iteration began.
    IterationStart { iteration: u32, message: String },
    /// Model reasoning or plan text.
    Thinking { message: String },
    /// Agent is invoking a tool.
    ToolCall { tool_name: String, parameters: Value },
    /// Tool execution finished.
    ToolResult {
        tool_name: String,
        result: String,
        details: Option<Value>,
    },
    /// Terminal: the task finished successfully.
    TaskComplete {
        message: String,
        additional_info: Option<Value>,
    },
    /// Terminal: the task failed.
    Error {
        message: String,
        details: Option<Value>,
    },
    /// Diagnostic line from the backend.
    Log { message: String },
    /// Unrecognized event kind; the raw payload is kept for display.
    Unknown { payload: Value },
}

impl AgentEvent {
    /// Decode one wire payload into an event.
    ///
    /// Never fails: a payload without a recognizable discriminant becomes
    /// [`AgentEvent::Unknown`].
    pub fn decode(value: Value) -> Self {
        let Some(kind) = value
            .get("type")
            .or_else(|| value.get("eventType"))
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            return AgentEvent::Unknown { payload: value };
        };

        match kind.as_str() {
            "TASK_STARTED" => AgentEvent::TaskStarted {
                message: str_field(&value, &["message"]),
            },
            "ITERATION_START" => AgentEvent::IterationStart {
                iteration: value
                    .get("iteration")
                    .and_then(Value::as_u64)
                    .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                    .unwrap_or(0),
                message: str_field(&value, &["message"]).unwrap_or_default(),
            },
            "AI_THINKING" | "AI_RESPONSE" => AgentEvent::Thinking {
                message: str_field(&value, &["message"]).unwrap_or_default(),
            },
            "TOOL_CALL" => AgentEvent::ToolCall {
                tool_name: str_field(&value, &["toolName", "tool_name"]).unwrap_or_default(),
                parameters: params_field(&value),
            },
            "TOOL_RESULT" => AgentEvent::ToolResult {
                tool_name: str_field(&value, &["toolName", "tool_name"]).unwrap_or_default(),
                result: str_field(&value, &["result", "toolResult"]).unwrap_or_default(),
                details: value.get("details").cloned().filter(|v| !v.is_null()),
            },
            "TASK_COMPLETE" => AgentEvent::TaskComplete {
                message: str_field(&value, &["message", "summary"]).unwrap_or_default(),
                additional_info: value
                    .get("additionalInfo")
                    .or_else(|| value.get("additional_info"))
                    .cloned()
                    .filter(|v| !v.is_null()),
            },
            "ERROR" => AgentEvent::Error {
                message: str_field(&value, &["message", "error"]).unwrap_or_default(),
                details: value.get("details").cloned().filter(|v| !v.is_null()),
            },
            "LOG" => AgentEvent::Log {
                message: str_field(&value, &["message"]).unwrap_or_default(),
            },
            _ => AgentEvent::Unknown { payload: value },
        }
    }

    /// Terminal events close the stream; nothing is expected after them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentEvent::TaskComplete { .. } | AgentEvent::Error { .. }
        )
    }

    /// Synthesize the terminal error event used when the transport itself
    /// fails (connection refused, dropped mid-stream).
    pub(crate) fn transport_error(message: impl Into<String>) -> Self {
        AgentEvent::Error {
            message: message.into(),
            details: None,
        }
    }
}

/// First present string field out of the given candidate names.
fn str_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(*name))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Tool parameters. Older backends serialize these as a JSON string; the
/// canonical form is a structured object. A string that parses as JSON is
/// unwrapped, anything else is passed through as-is.
fn params_field(value: &Value) -> Value {
    let raw = value
        .get("parameters")
        .or_else(|| value.get("toolParameters"))
        .cloned()
        .unwrap_or(Value::Null);

    if let Value::String(s) = &raw {
        if let Ok(parsed) = serde_json::from_str::<Value>(s) {
            return parsed;
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_iteration_start() {
        let event = AgentEvent::decode(json!({
            "type": "ITERATION_START",
            "iteration": 3,
            "message": "Planning next step"
        }));
        assert_eq!(
            event,
            AgentEvent::IterationStart {
                iteration: 3,
                message: "Planning next step".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_oversized_iteration_saturates() {
        let event = AgentEvent::decode(json!({
            "type": "ITERATION_START",
            "iteration": u64::MAX,
            "message": "still going"
        }));
        assert_eq!(
            event,
            AgentEvent::IterationStart {
                iteration: u32::MAX,
                message: "still going".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_legacy_discriminant_and_fields() {
        let event = AgentEvent::decode(json!({
            "eventType": "TOOL_RESULT",
            "tool_name": "read_file",
            "toolResult": "ok"
        }));
        assert_eq!(
            event,
            AgentEvent::ToolResult {
                tool_name: "read_file".to_string(),
                result: "ok".to_string(),
                details: None,
            }
        );
    }

    #[test]
    fn test_decode_error_message_alias() {
        let event = AgentEvent::decode(json!({
            "type": "ERROR",
            "error": "boom"
        }));
        assert_eq!(
            event,
            AgentEvent::Error {
                message: "boom".to_string(),
                details: None,
            }
        );
        assert!(event.is_terminal());
    }

    #[test]
    fn test_decode_complete_summary_alias() {
        let event = AgentEvent::decode(json!({
            "type": "TASK_COMPLETE",
            "summary": "all done",
            "additionalInfo": {"files": 2}
        }));
        assert_eq!(
            event,
            AgentEvent::TaskComplete {
                message: "all done".to_string(),
                additional_info: Some(json!({"files": 2})),
            }
        );
    }

    #[test]
    fn test_decode_string_parameters_are_parsed() {
        let event = AgentEvent::decode(json!({
            "type": "TOOL_CALL",
            "toolName": "write_file",
            "parameters": "{\"path\": \"/tmp/a.txt\"}"
        }));
        assert_eq!(
            event,
            AgentEvent::ToolCall {
                tool_name: "write_file".to_string(),
                parameters: json!({"path": "/tmp/a.txt"}),
            }
        );
    }

    #[test]
    fn test_decode_unknown_kind_keeps_payload() {
        let payload = json!({"type": "TELEMETRY", "cpu": 0.5});
        let event = AgentEvent::decode(payload.clone());
        assert_eq!(event, AgentEvent::Unknown { payload });
    }

    #[test]
    fn test_decode_missing_discriminant() {
        let payload = json!({"message": "no type field"});
        let event = AgentEvent::decode(payload.clone());
        assert_eq!(event, AgentEvent::Unknown { payload });
        assert!(!event.is_terminal());
    }
}
