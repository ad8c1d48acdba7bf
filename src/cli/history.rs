//! `history` command: print the canonical transcript of a session.

use std::error::Error;
use std::path::PathBuf;

use crate::api::sessions::HttpSessionStore;
use crate::core::config::Settings;
use crate::core::persistence::SessionStore;
use crate::utils::logging::{render_message, TranscriptLog};

pub async fn run_history(
    settings: &Settings,
    session_id: &str,
    log: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let client = super::build_client(settings)?;
    let store = HttpSessionStore::new(client, &settings.base_url, &settings.sessions_path);
    let messages = store.fetch_history(session_id).await?;

    if messages.is_empty() {
        eprintln!("No messages stored for session {session_id}.");
    }
    for rendered in messages.iter().filter_map(render_message) {
        println!("{rendered}\n");
    }

    if let Some(path) = log {
        let log = TranscriptLog::open(path)?;
        log.rewrite(&messages)?;
        eprintln!("✅ Wrote {} messages to {}", messages.len(), log.path().display());
    }
    Ok(())
}
