use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::AgentRequest;
use crate::core::event::{parse_event, AgentEvent};
use crate::core::frame::decode_frames;
use crate::utils::url::construct_api_url;

/// Messages forwarded from a stream task, tagged with the stream id.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Event(AgentEvent),
    /// Transport failure, already formatted for display. Terminal.
    Error(String),
    /// Normal end of the frame sequence (sentinel or EOF).
    End,
    /// The body went quiet or its read timed out. Ends the stream like an
    /// abort: no error, no forced tool completion.
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("request failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("agent returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("stream read failed: {0}")]
    Read(String),

    #[error("request timed out")]
    TimedOut,
}

impl StreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::TimedOut)
    }

    /// Text shown in the transcript for this failure.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::Status { status, body } if body.trim().is_empty() => {
                format!("API Error: HTTP {status}")
            }
            StreamError::Status { body, .. } => format_api_error(body),
            other => format_api_error(&other.to_string()),
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StreamError::TimedOut
        } else {
            StreamError::Connect(err)
        }
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, StreamError>> + Send>>;

/// Opens the response body of one agent request.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn open(&self, request: &AgentRequest) -> Result<ByteStream, StreamError>;
}

#[derive(Clone)]
pub struct HttpAgentTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAgentTransport {
    pub fn new(client: reqwest::Client, base_url: &str, agent_path: &str) -> Self {
        Self {
            client,
            endpoint: construct_api_url(base_url, agent_path),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn open(&self, request: &AgentRequest) -> Result<ByteStream, StreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(StreamError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(StreamError::Status { status, body });
        }

        let body = response.bytes_stream().map(|chunk| match chunk {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(err) if err.is_timeout() => Err(StreamError::TimedOut),
            Err(err) => Err(StreamError::Read(err.to_string())),
        });
        Ok(Box::pin(body))
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })
        .or_else(|| {
            ["message", "detail"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
                .map(str::to_owned)
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// Plain-text transcript line for an error body: a one-line summary, then
/// the pretty-printed JSON body when there is one.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty response>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            return match extract_error_summary(&json_value) {
                Some(summary) if !summary.is_empty() => {
                    format!("API Error: {summary}\n{pretty_json}")
                }
                _ => format!("API Error:\n{pretty_json}"),
            };
        }
    }

    if trimmed.contains('\n') {
        format!("API Error:\n{trimmed}")
    } else {
        format!("API Error: {trimmed}")
    }
}

pub struct StreamParams {
    pub request: AgentRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
    transport: Arc<dyn AgentTransport>,
    idle_timeout: Option<Duration>,
}

impl ChatStreamService {
    pub fn new(
        transport: Arc<dyn AgentTransport>,
        idle_timeout: Option<Duration>,
    ) -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                transport,
                idle_timeout,
            },
            rx,
        )
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        let transport = Arc::clone(&self.transport);
        let idle_timeout = self.idle_timeout;

        tokio::spawn(async move {
            let StreamParams {
                request,
                cancel_token,
                stream_id,
            } = params;

            debug!("stream {stream_id} starting");
            tokio::select! {
                _ = read_stream(transport, request, &tx, stream_id, &cancel_token, idle_timeout) => {}
                _ = cancel_token.cancelled() => {
                    debug!("stream {stream_id} cancelled");
                }
            }
        });
    }
}

async fn read_stream(
    transport: Arc<dyn AgentTransport>,
    request: AgentRequest,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
    cancel_token: &CancellationToken,
    idle_timeout: Option<Duration>,
) {
    let body = match transport.open(&request).await {
        Ok(body) => body,
        Err(err) => {
            if !cancel_token.is_cancelled() {
                let _ = tx.send((StreamMessage::Error(err.user_message()), stream_id));
            }
            return;
        }
    };

    let mut frames = std::pin::pin!(decode_frames(body));
    loop {
        if cancel_token.is_cancelled() {
            return;
        }

        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, frames.next()).await {
                Ok(next) => next,
                Err(_) => {
                    debug!("stream {stream_id} idle for {limit:?}; stopping");
                    send_timed_out(tx, stream_id, cancel_token);
                    return;
                }
            },
            None => frames.next().await,
        };

        match next {
            Some(Ok(payload)) => {
                let Some(event) = parse_event(&payload) else {
                    continue;
                };
                if cancel_token.is_cancelled() {
                    return;
                }
                if tx.send((StreamMessage::Event(event), stream_id)).is_err() {
                    return;
                }
            }
            Some(Err(err)) if err.is_timeout() => {
                debug!("stream {stream_id} read timed out; stopping");
                send_timed_out(tx, stream_id, cancel_token);
                return;
            }
            Some(Err(err)) => {
                if !cancel_token.is_cancelled() {
                    let _ = tx.send((StreamMessage::Error(err.user_message()), stream_id));
                }
                return;
            }
            None => break,
        }
    }

    if !cancel_token.is_cancelled() {
        debug!("stream {stream_id} ended");
        let _ = tx.send((StreamMessage::End, stream_id));
    }
}

fn send_timed_out(
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
    cancel_token: &CancellationToken,
) {
    if !cancel_token.is_cancelled() {
        let _ = tx.send((StreamMessage::TimedOut, stream_id));
    }
}
