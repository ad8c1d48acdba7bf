//! Per-conversation stream ownership.
//!
//! A [`Conversation`] holds the transcript and at most one [`StreamHandle`].
//! Starting a new stream cancels the previous one first; messages from a
//! superseded stream are recognised by their stream id and dropped.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{AgentRequest, HistoryEntry};
use crate::core::assembler::{Outcome, TranscriptAssembler};
use crate::core::chat_stream::{StreamMessage, StreamParams};
use crate::core::event::AgentEvent;
use crate::core::message::Message;
use crate::core::session_binder::SessionBinder;

/// The one in-flight request of a conversation.
#[derive(Debug)]
pub struct StreamHandle {
    stream_id: u64,
    cancel_token: CancellationToken,
    message_index: usize,
    binder: SessionBinder,
}

impl StreamHandle {
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    pub fn message_index(&self) -> usize {
        self.message_index
    }

    fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// Work the conversation needs done by its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationCommand {
    BindSession(String),
    ForwardUpdatedData(Value),
    Reconcile { session_id: String },
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    session_id: Option<String>,
    active: Option<StreamHandle>,
    last_stream_id: u64,
    assembler: TranscriptAssembler,
    enabled_tools: Vec<String>,
    status: Option<String>,
}

impl Conversation {
    pub fn new(assembler: TranscriptAssembler) -> Self {
        Self {
            assembler,
            ..Default::default()
        }
    }

    /// Continues an existing durable session.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_history(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn set_enabled_tools(&mut self, tools: Vec<String>) {
        self.enabled_tools = tools;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Latest `status` text of the active stream.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_stream(&self) -> Option<&StreamHandle> {
        self.active.as_ref()
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| handle.stream_id == stream_id)
    }

    /// Starts a new assistant turn for `prompt`, superseding any active
    /// stream. The caller spawns the returned parameters.
    pub fn send(&mut self, prompt: impl Into<String>) -> StreamParams {
        self.cancel_current_stream();

        let prompt = prompt.into();
        let request = self.build_request(&prompt);

        self.messages.push(Message::user(prompt));
        self.messages.push(Message::assistant_placeholder());
        let (cancel_token, stream_id) = self.start_new_stream(self.messages.len() - 1);

        StreamParams {
            request,
            cancel_token,
            stream_id,
        }
    }

    /// Deliberate abort. Returns whether a stream was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.active.is_some();
        self.cancel_current_stream();
        was_active
    }

    /// Drops the latest reply and asks again with the latest user prompt.
    pub fn retry(&mut self) -> Option<StreamParams> {
        let user_index = self.messages.iter().rposition(Message::is_user)?;
        self.cancel_current_stream();

        let prompt = self.messages[user_index].text();
        self.messages.truncate(user_index);
        Some(self.send(prompt))
    }

    pub fn handle_stream_message(
        &mut self,
        stream_id: u64,
        message: StreamMessage,
    ) -> Option<ConversationCommand> {
        if !self.is_current_stream(stream_id) {
            debug!("dropping message from superseded stream {stream_id}");
            return None;
        }

        match message {
            StreamMessage::Event(event) => self.apply_event(event),
            StreamMessage::Error(text) => {
                let handle = self.active.take()?;
                if let Some(target) = self.messages.get_mut(handle.message_index) {
                    TranscriptAssembler::fail(target, text);
                }
                self.status = None;
                None
            }
            StreamMessage::TimedOut => {
                let handle = self.active.take()?;
                if let Some(target) = self.messages.get_mut(handle.message_index) {
                    TranscriptAssembler::freeze(target);
                }
                debug!("stream {stream_id} timed out; keeping partial reply");
                self.status = None;
                None
            }
            StreamMessage::End => {
                let handle = self.active.take()?;
                if let Some(target) = self.messages.get_mut(handle.message_index) {
                    self.assembler.finish(target);
                }
                self.status = None;
                self.session_id
                    .clone()
                    .map(|session_id| ConversationCommand::Reconcile { session_id })
            }
        }
    }

    /// Replaces the local transcript with canonical history from the store.
    ///
    /// Refused while a stream is active, when the conversation has moved to
    /// another session, or when the store has nothing for the session yet.
    pub fn replace_history(&mut self, session_id: &str, messages: Vec<Message>) -> bool {
        if self.active.is_some() || self.session_id.as_deref() != Some(session_id) {
            debug!("skipping history refresh for {session_id}");
            return false;
        }
        if messages.is_empty() {
            debug!("store returned no history for {session_id}; keeping local transcript");
            return false;
        }
        self.messages = messages;
        true
    }

    fn apply_event(&mut self, event: AgentEvent) -> Option<ConversationCommand> {
        let assembler = self.assembler;
        let handle = self.active.as_mut()?;
        let target = self.messages.get_mut(handle.message_index)?;

        match assembler.apply(target, event) {
            Outcome::Session(session_id) => {
                if !handle.binder.observe(&session_id) {
                    return None;
                }
                self.session_id = Some(session_id.clone());
                Some(ConversationCommand::BindSession(session_id))
            }
            Outcome::Status(status) => {
                self.status = status;
                None
            }
            Outcome::UpdatedData(data) => Some(ConversationCommand::ForwardUpdatedData(data)),
            Outcome::Mutated | Outcome::Unchanged => None,
        }
    }

    fn build_request(&self, prompt: &str) -> AgentRequest {
        let history = self
            .messages
            .iter()
            .filter_map(HistoryEntry::from_message)
            .collect();
        let enabled_tools = if self.enabled_tools.is_empty() {
            None
        } else {
            Some(self.enabled_tools.clone())
        };

        AgentRequest {
            prompt: prompt.to_string(),
            history,
            session_id: self.session_id.clone(),
            enabled_tools,
        }
    }

    fn start_new_stream(&mut self, message_index: usize) -> (CancellationToken, u64) {
        self.last_stream_id += 1;
        let token = CancellationToken::new();
        self.active = Some(StreamHandle {
            stream_id: self.last_stream_id,
            cancel_token: token.clone(),
            message_index,
            binder: SessionBinder::new(),
        });
        (token, self.last_stream_id)
    }

    fn cancel_current_stream(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
            if let Some(target) = self.messages.get_mut(handle.message_index) {
                TranscriptAssembler::freeze(target);
            }
            debug!("stream {} cancelled", handle.stream_id);
        }
        self.status = None;
    }
}
