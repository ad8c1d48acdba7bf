use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Completed,
    Error,
}

/// A single tool invocation inside an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPart {
    pub tool_id: String,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<Value>,
    pub status: ToolStatus,
}

impl ToolPart {
    pub fn running(tool_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            tool_input: None,
            tool_output: None,
            status: ToolStatus::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ToolStatus::Running
    }
}

/// One ordered element of a message transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { content: String },
    Tool(ToolPart),
}

impl Part {
    pub fn text(content: impl Into<String>) -> Self {
        Part::Text {
            content: content.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { content } => Some(content),
            Part::Tool(_) => None,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolPart> {
        match self {
            Part::Tool(tool) => Some(tool),
            Part::Text { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub is_streaming: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::User,
            parts: vec![Part::text(content)],
            is_streaming: false,
        }
    }

    /// Empty assistant message that a stream is about to populate.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: None,
            role: Role::Assistant,
            parts: Vec::new(),
            is_streaming: true,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    /// Concatenated text of every text part, in order.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    pub fn tool_part(&self, tool_id: &str) -> Option<&ToolPart> {
        self.parts
            .iter()
            .filter_map(Part::as_tool)
            .find(|tool| tool.tool_id == tool_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(Role::try_from("system").is_err());
        assert_eq!(Role::try_from("assistant"), Ok(Role::Assistant));
    }

    #[test]
    fn text_skips_tool_parts() {
        let message = Message {
            id: None,
            role: Role::Assistant,
            parts: vec![
                Part::text("Looking it up. "),
                Part::Tool(ToolPart::running("t1", "search")),
                Part::text("Found it."),
            ],
            is_streaming: false,
        };
        assert_eq!(message.text(), "Looking it up. Found it.");
        assert_eq!(message.tool_part("t1").map(|t| t.status), Some(ToolStatus::Running));
        assert!(message.tool_part("t2").is_none());
    }

    #[test]
    fn parts_serialize_with_type_tag() {
        let part = Part::Tool(ToolPart::running("t1", "search"));
        let json = serde_json::to_value(&part).expect("serialize");
        assert_eq!(json["type"], "tool");
        assert_eq!(json["toolId"], "t1");
        assert_eq!(json["status"], "running");

        let text: Part = serde_json::from_str(r#"{"type":"text","content":"hi"}"#).expect("parse");
        assert_eq!(text.as_text(), Some("hi"));
    }
}
