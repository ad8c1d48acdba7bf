use crate::core::message::{Message, Part, Role, ToolStatus};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Plain-text transcript of finished messages.
pub struct TranscriptLog {
    path: PathBuf,
}

impl TranscriptLog {
    /// Opens (creating if needed) the log at `path`, failing early when it is
    /// not writable.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.flush()?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, message: &Message) -> io::Result<()> {
        let Some(rendered) = render_message(message) else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        write_block(&mut writer, &rendered)?;
        writer.flush()
    }

    /// Replaces the whole log with `messages`, e.g. after the transcript was
    /// refreshed from the session store.
    pub fn rewrite(&self, messages: &[Message]) -> io::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(parent)?;

        {
            let mut writer = BufWriter::new(temp_file.as_file_mut());
            for rendered in messages.iter().filter_map(render_message) {
                write_block(&mut writer, &rendered)?;
            }
            writer.flush()?;
        }
        temp_file.as_file().sync_all()?;
        temp_file.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

fn write_block<W: Write>(writer: &mut W, rendered: &str) -> io::Result<()> {
    for line in rendered.lines() {
        writeln!(writer, "{line}")?;
    }
    writeln!(writer)
}

pub fn tool_status_label(status: ToolStatus) -> &'static str {
    match status {
        ToolStatus::Running => "running",
        ToolStatus::Completed => "done",
        ToolStatus::Error => "failed",
    }
}

/// Text form of a message; `None` for messages with nothing to show.
pub fn render_message(message: &Message) -> Option<String> {
    let mut out = String::new();
    for part in &message.parts {
        match part {
            Part::Text { content } => out.push_str(content),
            Part::Tool(tool) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&format!(
                    "[tool {} {}]\n",
                    tool.tool_name,
                    tool_status_label(tool.status)
                ));
            }
        }
    }

    let body = out.trim_end();
    if body.is_empty() {
        return None;
    }
    Some(match message.role {
        Role::User => format!("You: {body}"),
        Role::Assistant => body.to_string(),
    })
}
