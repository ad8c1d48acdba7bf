//! HTTP client for the durable session store.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{SessionHistoryResponse, StoredMessage};
use crate::core::message::Message;
use crate::core::persistence::{SessionStore, StoreError};
use crate::utils::url::construct_api_url;

pub struct HttpSessionStore {
    client: reqwest::Client,
    base_url: String,
    sessions_path: String,
    bound: Mutex<Option<String>>,
}

impl HttpSessionStore {
    pub fn new(client: reqwest::Client, base_url: &str, sessions_path: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            sessions_path: sessions_path.trim_matches('/').to_string(),
            bound: Mutex::new(None),
        }
    }

    pub fn history_url(&self, session_id: &str) -> String {
        construct_api_url(
            &self.base_url,
            &format!("{}/{}/messages", self.sessions_path, session_id),
        )
    }

    /// Last session this store was told about.
    pub fn bound_session(&self) -> Option<String> {
        self.bound.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn bind_session(&self, session_id: &str) -> Result<(), StoreError> {
        // The server creates the session itself; the client only tracks it.
        debug!("session {session_id} bound");
        if let Ok(mut guard) = self.bound.lock() {
            *guard = Some(session_id.to_string());
        }
        Ok(())
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        let url = self.history_url(session_id);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| StoreError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { url, status, body });
        }

        let history: SessionHistoryResponse =
            response
                .json()
                .await
                .map_err(|source| StoreError::Decode {
                    url: url.clone(),
                    source,
                })?;

        Ok(history
            .messages
            .into_iter()
            .filter_map(StoredMessage::into_message)
            .collect())
    }
}
