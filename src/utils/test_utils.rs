use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use crate::api::AgentRequest;
use crate::core::chat_stream::{AgentTransport, ByteStream, StreamError};
use crate::core::message::Message;
use crate::core::persistence::{DataUpdateSink, SessionStore, StoreError};

pub fn sample_request() -> AgentRequest {
    AgentRequest {
        prompt: "What is 2+2?".to_string(),
        history: Vec::new(),
        session_id: None,
        enabled_tools: None,
    }
}

enum Script {
    Body(mpsc::UnboundedReceiver<Result<Vec<u8>, StreamError>>),
    Failure(StreamError),
}

/// Transport that answers each `open` with the next scripted response.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: StdMutex<VecDeque<Script>>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a complete body delivered as the given chunks.
    pub fn push_body(&self, chunks: Vec<&str>) {
        let (tx, rx) = mpsc::unbounded_channel();
        for chunk in chunks {
            let _ = tx.send(Ok(chunk.as_bytes().to_vec()));
        }
        self.push(Script::Body(rx));
    }

    /// Queues a body that stays open until the returned sender is dropped.
    pub fn push_open_body(&self) -> mpsc::UnboundedSender<Result<Vec<u8>, StreamError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Script::Body(rx));
        tx
    }

    pub fn push_failure(&self, err: StreamError) {
        self.push(Script::Failure(err));
    }

    pub async fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().await.clone()
    }

    fn push(&self, script: Script) {
        self.scripts
            .lock()
            .expect("script queue poisoned")
            .push_back(script);
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn open(&self, request: &AgentRequest) -> Result<ByteStream, StreamError> {
        self.requests.lock().await.push(request.clone());
        let script = self
            .scripts
            .lock()
            .expect("script queue poisoned")
            .pop_front();
        match script {
            Some(Script::Body(rx)) => {
                let body = futures_util::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                });
                Ok(Box::pin(body))
            }
            Some(Script::Failure(err)) => Err(err),
            None => Err(StreamError::Read("no scripted response".into())),
        }
    }
}

/// Session store that records calls and serves canned histories.
#[derive(Default)]
pub struct RecordingStore {
    bound: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
    histories: Mutex<HashMap<String, Vec<Message>>>,
}

impl RecordingStore {
    pub async fn set_history(&self, session_id: &str, messages: Vec<Message>) {
        self.histories
            .lock()
            .await
            .insert(session_id.to_string(), messages);
    }

    pub async fn bound(&self) -> Vec<String> {
        self.bound.lock().await.clone()
    }

    pub async fn fetched(&self) -> Vec<String> {
        self.fetched.lock().await.clone()
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn bind_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.bound.lock().await.push(session_id.to_string());
        Ok(())
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        self.fetched.lock().await.push(session_id.to_string());
        Ok(self
            .histories
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    received: StdMutex<Vec<Value>>,
}

impl RecordingSink {
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().expect("sink poisoned").clone()
    }
}

impl DataUpdateSink for RecordingSink {
    fn updated_data(&self, data: Value) {
        self.received.lock().expect("sink poisoned").push(data);
    }
}
