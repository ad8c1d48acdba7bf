//! Folds agent events into the ordered parts of the message being generated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::event::AgentEvent;
use crate::core::message::{Message, Part, ToolPart, ToolStatus};

const UNKNOWN_AGENT_ERROR: &str = "the agent reported an unknown error";

/// What happens to tool calls that are still running when a stream ends
/// normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunningToolPolicy {
    /// Treat them as finished successfully.
    #[default]
    #[serde(rename = "complete")]
    Complete,
    /// Treat them as failed.
    #[serde(rename = "error")]
    Fail,
}

impl RunningToolPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RunningToolPolicy::Complete => "complete",
            RunningToolPolicy::Fail => "error",
        }
    }

    fn final_status(self) -> ToolStatus {
        match self {
            RunningToolPolicy::Complete => ToolStatus::Completed,
            RunningToolPolicy::Fail => ToolStatus::Error,
        }
    }
}

impl std::str::FromStr for RunningToolPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "complete" | "completed" => Ok(RunningToolPolicy::Complete),
            "error" | "fail" | "strict" => Ok(RunningToolPolicy::Fail),
            other => Err(format!(
                "invalid running tool policy '{other}' (expected 'complete' or 'error')"
            )),
        }
    }
}

/// Result of applying one event, for the parts of the protocol that reach
/// beyond the message itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Mutated,
    Unchanged,
    Session(String),
    Status(Option<String>),
    UpdatedData(Value),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptAssembler {
    policy: RunningToolPolicy,
}

impl TranscriptAssembler {
    pub fn new(policy: RunningToolPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RunningToolPolicy {
        self.policy
    }

    pub fn apply(&self, message: &mut Message, event: AgentEvent) -> Outcome {
        if !message.is_streaming {
            debug!("ignoring {} event for a finished message", event.kind());
            return Outcome::Unchanged;
        }

        match event {
            AgentEvent::Session { session_id } => Outcome::Session(session_id),
            AgentEvent::Status { message } => Outcome::Status(message),
            AgentEvent::Text { content } => {
                message.parts.push(Part::Text { content });
                Outcome::Mutated
            }
            AgentEvent::TextDelta { content } => {
                append_delta(&mut message.parts, &content);
                Outcome::Mutated
            }
            AgentEvent::ToolStart {
                tool_id,
                tool_name,
                tool_input,
            } => {
                if find_tool_mut(&mut message.parts, &tool_id).is_some() {
                    debug!("duplicate tool_start for {tool_id}; ignoring");
                    return Outcome::Unchanged;
                }
                message.parts.push(Part::Tool(ToolPart {
                    tool_id,
                    tool_name,
                    tool_input,
                    tool_output: None,
                    status: ToolStatus::Running,
                }));
                Outcome::Mutated
            }
            AgentEvent::ToolEnd {
                tool_id,
                success,
                output,
            } => match find_tool_mut(&mut message.parts, &tool_id) {
                Some(tool) => {
                    tool.status = if success {
                        ToolStatus::Completed
                    } else {
                        ToolStatus::Error
                    };
                    if output.is_some() {
                        tool.tool_output = output;
                    }
                    Outcome::Mutated
                }
                None => {
                    debug!("tool_end for unknown tool {tool_id}; ignoring");
                    Outcome::Unchanged
                }
            },
            AgentEvent::Result { updated_data } => match updated_data {
                Some(data) => Outcome::UpdatedData(data),
                None => Outcome::Unchanged,
            },
            AgentEvent::Error { message: text } => {
                let text = text
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| UNKNOWN_AGENT_ERROR.to_string());
                message.parts.push(Part::text(format!("Error: {text}")));
                Outcome::Mutated
            }
            AgentEvent::Unknown => {
                debug!("ignoring unknown event kind");
                Outcome::Unchanged
            }
        }
    }

    /// Normal end of stream: settles running tool calls according to the
    /// policy, then freezes the message.
    pub fn finish(&self, message: &mut Message) {
        let status = self.policy.final_status();
        for part in &mut message.parts {
            if let Part::Tool(tool) = part {
                if tool.is_running() {
                    tool.status = status;
                }
            }
        }
        message.is_streaming = false;
    }

    /// Abort or transport failure: freezes the message as it stands.
    pub fn freeze(message: &mut Message) {
        message.is_streaming = false;
    }

    /// Appends a visible error line for a failed transport.
    pub fn fail(message: &mut Message, error_text: impl Into<String>) {
        message.parts.push(Part::text(error_text));
        message.is_streaming = false;
    }
}

fn append_delta(parts: &mut Vec<Part>, delta: &str) {
    let last_text = parts.iter_mut().rev().find_map(|part| match part {
        Part::Text { content } => Some(content),
        Part::Tool(_) => None,
    });
    match last_text {
        Some(content) => content.push_str(delta),
        None => parts.push(Part::text(delta)),
    }
}

fn find_tool_mut<'a>(parts: &'a mut [Part], tool_id: &str) -> Option<&'a mut ToolPart> {
    parts.iter_mut().find_map(|part| match part {
        Part::Tool(tool) if tool.tool_id == tool_id => Some(tool),
        _ => None,
    })
}
