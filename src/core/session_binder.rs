use tracing::debug;

/// Captures the server-issued session id of one stream.
///
/// Only the first `session` event of a stream is honoured; the caller is told
/// to bind exactly once.
#[derive(Debug, Default)]
pub struct SessionBinder {
    captured: Option<String>,
}

impl SessionBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `session_id` if this stream has not reported one yet.
    /// Returns `true` when the persistence layer should be told to bind.
    pub fn observe(&mut self, session_id: &str) -> bool {
        match &self.captured {
            Some(existing) => {
                debug!("ignoring repeated session event {session_id} (bound to {existing})");
                false
            }
            None => {
                self.captured = Some(session_id.to_string());
                true
            }
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.captured.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.captured.is_some()
    }
}
