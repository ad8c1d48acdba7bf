use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// One decoded frame of the agent event stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    #[serde(rename_all = "camelCase")]
    Session { session_id: String },
    Status {
        #[serde(default)]
        message: Option<String>,
    },
    Text { content: String },
    TextDelta { content: String },
    #[serde(rename_all = "camelCase")]
    ToolStart {
        tool_id: String,
        tool_name: String,
        #[serde(default)]
        tool_input: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    ToolEnd {
        tool_id: String,
        success: bool,
        #[serde(default)]
        output: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        #[serde(default)]
        updated_data: Option<Value>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Any `type` this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::Session { .. } => "session",
            AgentEvent::Status { .. } => "status",
            AgentEvent::Text { .. } => "text",
            AgentEvent::TextDelta { .. } => "text_delta",
            AgentEvent::ToolStart { .. } => "tool_start",
            AgentEvent::ToolEnd { .. } => "tool_end",
            AgentEvent::Result { .. } => "result",
            AgentEvent::Error { .. } => "error",
            AgentEvent::Unknown => "unknown",
        }
    }
}

/// Parses one frame payload. Malformed payloads are logged and dropped so a
/// single bad frame never ends the stream.
pub fn parse_event(payload: &str) -> Option<AgentEvent> {
    match serde_json::from_str::<AgentEvent>(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!("dropping malformed frame: {err} - payload: {payload}");
            None
        }
    }
}
