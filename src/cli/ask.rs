//! Non-interactive `ask` command: one prompt, one streamed reply.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::api::sessions::HttpSessionStore;
use crate::core::assembler::{RunningToolPolicy, TranscriptAssembler};
use crate::core::chat_stream::HttpAgentTransport;
use crate::core::config::Settings;
use crate::core::conversation::Conversation;
use crate::core::driver::ConversationDriver;
use crate::core::message::{Message, Part, ToolStatus};
use crate::core::persistence::{DataUpdateSink, SessionStore};
use crate::utils::logging::{tool_status_label, TranscriptLog};

pub struct AskOptions {
    pub prompt: String,
    pub session: Option<String>,
    pub tools: Vec<String>,
    pub strict_tools: bool,
    pub log: Option<PathBuf>,
}

/// Reports `updatedData` payloads on stderr so stdout stays the reply.
struct StderrUpdates;

impl DataUpdateSink for StderrUpdates {
    fn updated_data(&self, data: Value) {
        eprintln!("🔄 data updated: {data}");
    }
}

enum Printed {
    Text(usize),
    Tool { tool_id: String, status: ToolStatus },
}

/// Writes only what changed in a message since the previous call.
///
/// A message that no longer extends what was printed (a refreshed copy from
/// the session store, say) is not diffed by position; only tool status
/// changes, matched by tool id, are reported for it.
pub struct TranscriptPrinter<W: Write> {
    out: W,
    source_id: Option<Option<String>>,
    printed: Vec<Printed>,
    at_line_start: bool,
}

impl<W: Write> TranscriptPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            source_id: None,
            printed: Vec::new(),
            at_line_start: true,
        }
    }

    pub fn render(&mut self, message: &Message) -> io::Result<()> {
        if self.source_id.is_none() {
            self.source_id = Some(message.id.clone());
        }
        if self.continues(message) {
            self.render_diff(message)?;
        } else {
            self.render_tool_changes(message)?;
        }
        self.out.flush()
    }

    fn continues(&self, message: &Message) -> bool {
        if self.source_id.as_ref() != Some(&message.id) || message.parts.len() < self.printed.len()
        {
            return false;
        }
        self.printed
            .iter()
            .zip(&message.parts)
            .all(|(printed, part)| match (printed, part) {
                (Printed::Text(len), Part::Text { content }) => {
                    content.len() >= *len && content.is_char_boundary(*len)
                }
                (Printed::Tool { tool_id, .. }, Part::Tool(tool)) => *tool_id == tool.tool_id,
                _ => false,
            })
    }

    fn render_diff(&mut self, message: &Message) -> io::Result<()> {
        for (index, part) in message.parts.iter().enumerate() {
            match (part, self.printed.get_mut(index)) {
                (Part::Text { content }, Some(Printed::Text(len))) => {
                    if content.len() > *len {
                        let suffix = &content[*len..];
                        *len = content.len();
                        self.write_text(suffix)?;
                    }
                }
                (Part::Tool(tool), Some(Printed::Tool { status, .. })) => {
                    if *status != tool.status {
                        *status = tool.status;
                        self.write_tool_line(&tool.tool_name, tool.status)?;
                    }
                }
                (Part::Text { content }, None) => {
                    self.printed.push(Printed::Text(content.len()));
                    self.write_text(content)?;
                }
                (Part::Tool(tool), None) => {
                    self.printed.push(Printed::Tool {
                        tool_id: tool.tool_id.clone(),
                        status: tool.status,
                    });
                    self.write_tool_line(&tool.tool_name, tool.status)?;
                }
                // Ruled out by `continues`.
                _ => {}
            }
        }
        Ok(())
    }

    fn render_tool_changes(&mut self, message: &Message) -> io::Result<()> {
        for part in &message.parts {
            let Part::Tool(tool) = part else {
                continue;
            };
            let known = self.printed.iter_mut().find_map(|printed| match printed {
                Printed::Tool { tool_id, status } if *tool_id == tool.tool_id => Some(status),
                _ => None,
            });
            if let Some(status) = known {
                if *status != tool.status {
                    *status = tool.status;
                    self.write_tool_line(&tool.tool_name, tool.status)?;
                }
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> io::Result<()> {
        if !self.at_line_start {
            writeln!(self.out)?;
            self.at_line_start = true;
        }
        self.out.flush()
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        write!(self.out, "{text}")?;
        self.at_line_start = text.ends_with('\n');
        Ok(())
    }

    fn write_tool_line(&mut self, name: &str, status: ToolStatus) -> io::Result<()> {
        if !self.at_line_start {
            writeln!(self.out)?;
        }
        writeln!(self.out, "[tool {name} {}]", tool_status_label(status))?;
        self.at_line_start = true;
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

enum Step {
    Update(Option<u64>),
    Interrupted,
}

pub async fn run_ask(settings: &Settings, options: AskOptions) -> Result<(), Box<dyn Error>> {
    if options.prompt.trim().is_empty() {
        eprintln!("Usage: agentdeck ask <prompt>");
        std::process::exit(1);
    }

    let log = options.log.map(TranscriptLog::open).transpose()?;
    let client = super::build_client(settings)?;
    let transport = Arc::new(HttpAgentTransport::new(
        client.clone(),
        &settings.base_url,
        &settings.agent_path,
    ));
    let store = Arc::new(HttpSessionStore::new(
        client,
        &settings.base_url,
        &settings.sessions_path,
    ));

    let policy = if options.strict_tools {
        RunningToolPolicy::Fail
    } else {
        settings.running_tools_on_end
    };
    let mut conversation = Conversation::new(TranscriptAssembler::new(policy));
    if let Some(session_id) = options.session {
        let history = match store.fetch_history(&session_id).await {
            Ok(history) => history,
            Err(err) => {
                warn!("could not load history for {session_id}: {err}");
                Vec::new()
            }
        };
        conversation = conversation.with_session(session_id).with_history(history);
    }
    conversation.set_enabled_tools(if options.tools.is_empty() {
        settings.enabled_tools.clone()
    } else {
        options.tools
    });

    let mut driver = ConversationDriver::new(
        conversation,
        transport,
        store,
        Arc::new(StderrUpdates),
        settings.stream_idle_timeout,
    );

    let mut printer = TranscriptPrinter::new(io::stdout());
    let mut last_status: Option<String> = None;
    driver.send(options.prompt);

    loop {
        let step = tokio::select! {
            update = driver.next_update() => Step::Update(update),
            _ = tokio::signal::ctrl_c() => Step::Interrupted,
        };

        match step {
            Step::Update(None) => break,
            Step::Update(Some(_)) => {
                let conversation = driver.conversation();
                if let Some(message) = conversation.last_message().filter(|m| m.is_assistant()) {
                    printer.render(message)?;
                }
                let status = conversation.status().map(str::to_string);
                if status != last_status {
                    if let Some(text) = &status {
                        eprintln!("⏳ {text}");
                    }
                    last_status = status;
                }
            }
            Step::Interrupted => {
                driver.cancel();
                printer.finish()?;
                eprintln!("⏹  Stopped.");
                break;
            }
        }
    }
    printer.finish()?;

    let conversation = driver.conversation();
    if let Some(session_id) = conversation.session_id() {
        eprintln!("💬 session: {session_id}");
    }

    if let Some(log) = log {
        let messages = conversation.messages();
        let turn_start = messages
            .iter()
            .rposition(Message::is_user)
            .unwrap_or(messages.len());
        for message in &messages[turn_start..] {
            log.append(message)?;
        }
    }

    Ok(())
}
