//! Cooperative loop tying a [`Conversation`] to its stream task and its
//! collaborators. All transcript mutation happens here, one stream message
//! at a time, in arrival order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::chat_stream::{AgentTransport, ChatStreamService, StreamMessage};
use crate::core::conversation::{Conversation, ConversationCommand};
use crate::core::persistence::{DataUpdateSink, SessionStore};

pub struct ConversationDriver {
    conversation: Conversation,
    service: ChatStreamService,
    rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    store: Arc<dyn SessionStore>,
    data_sink: Arc<dyn DataUpdateSink>,
}

impl ConversationDriver {
    pub fn new(
        conversation: Conversation,
        transport: Arc<dyn AgentTransport>,
        store: Arc<dyn SessionStore>,
        data_sink: Arc<dyn DataUpdateSink>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let (service, rx) = ChatStreamService::new(transport, idle_timeout);
        Self {
            conversation,
            service,
            rx,
            store,
            data_sink,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Sends `prompt`, superseding any active stream. Returns the new stream id.
    pub fn send(&mut self, prompt: impl Into<String>) -> u64 {
        let params = self.conversation.send(prompt);
        let stream_id = params.stream_id;
        self.service.spawn_stream(params);
        stream_id
    }

    pub fn retry(&mut self) -> Option<u64> {
        let params = self.conversation.retry()?;
        let stream_id = params.stream_id;
        self.service.spawn_stream(params);
        Some(stream_id)
    }

    pub fn cancel(&mut self) -> bool {
        self.conversation.cancel()
    }

    /// Waits for and applies the next stream message.
    ///
    /// Returns the id of the stream the message belonged to, or `None` when no
    /// stream is active.
    pub async fn next_update(&mut self) -> Option<u64> {
        if !self.conversation.is_streaming() {
            return None;
        }
        let (message, stream_id) = self.rx.recv().await?;
        if let Some(command) = self.conversation.handle_stream_message(stream_id, message) {
            self.execute(command).await;
        }
        Some(stream_id)
    }

    /// Drives the active stream, if any, to its end.
    pub async fn run_until_idle(&mut self) {
        while self.next_update().await.is_some() {}
    }

    async fn execute(&mut self, command: ConversationCommand) {
        match command {
            ConversationCommand::BindSession(session_id) => {
                debug!("binding session {session_id}");
                if let Err(err) = self.store.bind_session(&session_id).await {
                    warn!("failed to bind session {session_id}: {err}");
                }
            }
            ConversationCommand::ForwardUpdatedData(data) => {
                self.data_sink.updated_data(data);
            }
            ConversationCommand::Reconcile { session_id } => {
                match self.store.fetch_history(&session_id).await {
                    Ok(messages) => {
                        if self.conversation.replace_history(&session_id, messages) {
                            debug!("transcript refreshed from session {session_id}");
                        }
                    }
                    Err(err) => warn!("failed to refresh session {session_id}: {err}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{Message, Part, ToolStatus};
    use crate::utils::test_utils::{RecordingSink, RecordingStore, ScriptedTransport};
    use serde_json::json;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        store: Arc<RecordingStore>,
        sink: Arc<RecordingSink>,
        driver: ConversationDriver,
    }

    fn harness() -> Harness {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(RecordingStore::default());
        let sink = Arc::new(RecordingSink::default());
        let driver = ConversationDriver::new(
            Conversation::default(),
            transport.clone(),
            store.clone(),
            sink.clone(),
            None,
        );
        Harness {
            transport,
            store,
            sink,
            driver,
        }
    }

    #[tokio::test]
    async fn two_plus_two_end_to_end() {
        let mut h = harness();
        h.transport.push_body(vec![
            "data: {\"type\":\"session\",\"sessionId\":\"s1\"}\n",
            "data: {\"type\":\"text_delta\",\"content\":\"4\"}\n",
            "data: [DONE]\n",
        ]);

        h.driver.send("What is 2+2?");
        h.driver.run_until_idle().await;

        assert_eq!(h.store.bound().await, vec!["s1".to_string()]);
        assert_eq!(h.store.fetched().await, vec!["s1".to_string()]);
        let conversation = h.driver.conversation();
        assert_eq!(conversation.session_id(), Some("s1"));
        let message = conversation.last_message().expect("assistant");
        assert_eq!(message.parts, vec![Part::text("4")]);
        assert!(!message.is_streaming);

        let requests = h.transport.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "What is 2+2?");
    }

    #[tokio::test]
    async fn reconcile_replaces_transcript_with_canonical_history() {
        let mut h = harness();
        h.store
            .set_history(
                "s1",
                vec![
                    Message {
                        id: Some("m1".into()),
                        ..Message::user("What is 2+2?")
                    },
                    Message {
                        id: Some("m2".into()),
                        ..Message::user("4")
                    },
                ],
            )
            .await;
        h.transport.push_body(vec![
            "data: {\"type\":\"session\",\"sessionId\":\"s1\"}\ndata: {\"type\":\"text\",\"content\":\"4\"}\n",
        ]);

        h.driver.send("What is 2+2?");
        h.driver.run_until_idle().await;

        let ids: Vec<Option<&str>> = h
            .driver
            .conversation()
            .messages()
            .iter()
            .map(|m| m.id.as_deref())
            .collect();
        assert_eq!(ids, vec![Some("m1"), Some("m2")]);
    }

    #[tokio::test]
    async fn result_data_is_forwarded_and_running_tools_complete() {
        let mut h = harness();
        h.transport.push_body(vec![
            "data: {\"type\":\"tool_start\",\"toolId\":\"t1\",\"toolName\":\"list_instances\"}\n",
            "data: {\"type\":\"result\",\"updatedData\":{\"instances\":[\"a\"]}}\n",
        ]);

        h.driver.send("list my instances");
        h.driver.run_until_idle().await;

        assert_eq!(h.sink.received(), vec![json!({"instances": ["a"]})]);
        let message = h.driver.conversation().last_message().expect("assistant");
        assert_eq!(
            message.tool_part("t1").map(|t| t.status),
            Some(ToolStatus::Completed)
        );
        assert!(h.store.bound().await.is_empty());
    }

    #[tokio::test]
    async fn supersession_stops_old_stream_mutations() {
        let mut h = harness();
        let first_body = h.transport.push_open_body();
        h.transport.push_body(vec![
            "data: {\"type\":\"text\",\"content\":\"second answer\"}\n",
            "data: [DONE]\n",
        ]);

        let first_id = h.driver.send("first");
        first_body
            .send(Ok(b"data: {\"type\":\"text\",\"content\":\"first partial\"}\n".to_vec()))
            .expect("send chunk");
        assert_eq!(h.driver.next_update().await, Some(first_id));

        let second_id = h.driver.send("second");
        let _ = first_body.send(Ok(
            b"data: {\"type\":\"text\",\"content\":\"first late\"}\n".to_vec(),
        ));
        drop(first_body);
        h.driver.run_until_idle().await;

        let messages = h.driver.conversation().messages();
        assert_ne!(first_id, second_id);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].parts, vec![Part::text("first partial")]);
        assert!(!messages[1].is_streaming);
        assert_eq!(messages[3].parts, vec![Part::text("second answer")]);
        assert!(!messages[3].is_streaming);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_one_error_part() {
        let mut h = harness();
        h.transport.push_failure(crate::core::chat_stream::StreamError::Read(
            "connection reset by peer".into(),
        ));

        h.driver.send("hi");
        h.driver.run_until_idle().await;

        let message = h.driver.conversation().last_message().expect("assistant");
        assert_eq!(message.parts.len(), 1);
        let text = message.parts[0].as_text().expect("text part");
        assert!(text.contains("connection reset by peer"));
        assert!(!message.is_streaming);
        assert!(h.store.fetched().await.is_empty());
    }

    #[tokio::test]
    async fn connect_timeout_surfaces_one_error_part() {
        let mut h = harness();
        h.transport
            .push_failure(crate::core::chat_stream::StreamError::TimedOut);

        h.driver.send("hi");
        h.driver.run_until_idle().await;

        let message = h.driver.conversation().last_message().expect("assistant");
        assert_eq!(message.parts, vec![Part::text("API Error: request timed out")]);
        assert!(!message.is_streaming);
        assert!(!h.driver.conversation().is_streaming());
    }

    #[tokio::test]
    async fn cancel_leaves_no_error_and_goes_idle() {
        let mut h = harness();
        let body = h.transport.push_open_body();
        let id = h.driver.send("long task");
        body.send(Ok(b"data: {\"type\":\"text\",\"content\":\"working\"}\n".to_vec()))
            .expect("send chunk");
        assert_eq!(h.driver.next_update().await, Some(id));

        assert!(h.driver.cancel());
        assert_eq!(h.driver.next_update().await, None);

        let message = h.driver.conversation().last_message().expect("assistant");
        assert_eq!(message.parts, vec![Part::text("working")]);
        assert!(!message.is_streaming);
    }
}
