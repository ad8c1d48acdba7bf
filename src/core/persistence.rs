//! Seams to the durable session store and the side-data consumer.
//!
//! Neither is owned by the streaming client: it only tells the store which
//! session a stream belongs to and asks it for canonical history afterwards.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::message::Message;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("session store returned HTTP {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("session store response from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Called once per stream, when the server first reports its session.
    async fn bind_session(&self, session_id: &str) -> Result<(), StoreError>;

    /// Canonical history of a session, oldest first.
    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>, StoreError>;
}

/// Receives the `updatedData` payload of `result` events.
pub trait DataUpdateSink: Send + Sync {
    fn updated_data(&self, data: Value);
}
