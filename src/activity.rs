use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only JSONL log of client activity
pub struct ActivityLog {
    pub path: PathBuf,
    client_id: String,
    file: Option<File>,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    client_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

/// A logged event read back for the dashboard
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityEntry {
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl ActivityEntry {
    /// One-line human description
    pub fn message(&self) -> String {
        let field = |name: &str| {
            self.data
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or("?")
                .to_string()
        };
        match self.event_type.as_str() {
            "sign_in" => format!("{} signed in", field("email")),
            "sign_out" => "User signed out".to_string(),
            "upload" => format!("New image \"{}\" uploaded", field("title")),
            "download" => format!("\"{}\" downloaded in {} quality", field("title"), field("quality")),
            "comment_post" => format!("New comment on \"{}\"", field("image_title")),
            "comment_delete" => "Comment deleted".to_string(),
            "comment_moderate" => format!("Comment {}", field("status")),
            "image_delete" => format!("Image \"{}\" deleted", field("title")),
            "image_status" => format!("Image \"{}\" set to {}", field("title"), field("status")),
            "gate" => format!("{} blocked: {}", field("action"), field("decision")),
            other => other.replace('_', " "),
        }
    }
}

impl ActivityLog {
    /// Open (or create) the log at `path`
    pub fn new(path: &Path, client_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            client_id: client_id.to_string(),
            file: Some(file),
        })
    }

    /// A log that records nothing, for ephemeral runs
    pub fn disabled(client_id: &str) -> Self {
        Self {
            path: PathBuf::new(),
            client_id: client_id.to_string(),
            file: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let event = Event {
            ts: Utc::now(),
            client_id: &self.client_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    /// Log, reporting failures as a warning instead of an error
    pub fn record(&mut self, event_type: &str, data: serde_json::Value) {
        if let Err(e) = self.log(event_type, data) {
            eprintln!("Warning: failed to write activity log: {}", e);
        }
    }

    pub fn session_restore(&mut self, outcome: &str, email: Option<&str>) {
        self.record(
            "session_restore",
            serde_json::json!({ "outcome": outcome, "email": email }),
        )
    }

    pub fn sign_in(&mut self, email: &str) {
        self.record("sign_in", serde_json::json!({ "email": email }))
    }

    pub fn sign_out(&mut self) {
        self.record("sign_out", serde_json::json!({}))
    }

    /// Log a gate decision that stopped an action
    pub fn gate(&mut self, action: &str, decision: &str) {
        self.record(
            "gate",
            serde_json::json!({ "action": action, "decision": decision }),
        )
    }

    pub fn download(&mut self, image_id: &str, title: &str, quality: &str) {
        self.record(
            "download",
            serde_json::json!({ "image_id": image_id, "title": title, "quality": quality }),
        )
    }

    pub fn comment_post(&mut self, comment_id: &str, image_id: &str, image_title: &str) {
        self.record(
            "comment_post",
            serde_json::json!({
                "comment_id": comment_id,
                "image_id": image_id,
                "image_title": image_title,
            }),
        )
    }

    pub fn comment_delete(&mut self, comment_id: &str) {
        self.record(
            "comment_delete",
            serde_json::json!({ "comment_id": comment_id }),
        )
    }

    pub fn comment_moderate(&mut self, comment_id: &str, status: &str) {
        self.record(
            "comment_moderate",
            serde_json::json!({ "comment_id": comment_id, "status": status }),
        )
    }

    pub fn upload(&mut self, image_id: &str, title: &str) {
        self.record(
            "upload",
            serde_json::json!({ "image_id": image_id, "title": title }),
        )
    }

    pub fn image_delete(&mut self, image_id: &str, title: &str) {
        self.record(
            "image_delete",
            serde_json::json!({ "image_id": image_id, "title": title }),
        )
    }

    pub fn image_status(&mut self, image_id: &str, title: &str, status: &str) {
        self.record(
            "image_status",
            serde_json::json!({ "image_id": image_id, "title": title, "status": status }),
        )
    }

    /// Most recent entries, newest first. Unparseable lines are skipped.
    pub fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        if !self.is_enabled() || !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries: Vec<ActivityEntry> = reader
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}
