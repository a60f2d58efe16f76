// Download data models
use crate::error::{DownloadError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of the `last_message` written for `(frag N/M)` progress lines
pub const FRAGMENT_MESSAGE_PREFIX: &str = "Fragment ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloading,
    Completed,
    Error,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DownloadStatus::Downloading)
    }

    /// Terminal status is decided by the exit code alone. A process killed by a
    /// signal has no code and counts as a failure.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => DownloadStatus::Completed,
            _ => DownloadStatus::Error,
        }
    }
}

/// Descriptive metadata passed through from the request untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>, // "movie" | "tv" | "anime"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub binary_path: String,
    pub stream_url: String,
    pub name: String,
    pub destination_folder: String,
    #[serde(default)]
    pub metadata: MediaMetadata,
}

impl DownloadRequest {
    /// Every field the downloader invocation needs must be present
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("binary_path", &self.binary_path),
            ("stream_url", &self.stream_url),
            ("name", &self.name),
            ("destination_folder", &self.destination_folder),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DownloadError::InvalidRequest(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadRecord {
    pub id: String,
    pub name: String,
    pub source_url: String,
    pub destination_folder: String,
    pub file_path: Option<String>,
    pub status: DownloadStatus,
    pub progress_percent: u8, // 0-100, capped at 99 until completed
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub size_label: String,
    #[serde(default)]
    pub total_fragments: u32,
    #[serde(default)]
    pub completed_fragments: u32,
    #[serde(default)]
    pub last_message: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub metadata: MediaMetadata,
}

impl DownloadRecord {
    pub fn new(id: String, request: DownloadRequest) -> Self {
        Self {
            id,
            name: request.name,
            source_url: request.stream_url,
            destination_folder: request.destination_folder,
            file_path: None,
            status: DownloadStatus::Downloading,
            progress_percent: 0,
            speed: String::new(),
            size_label: String::new(),
            total_fragments: 0,
            completed_fragments: 0,
            last_message: String::from("Starting…"),
            started_at: Utc::now(),
            completed_at: None,
            metadata: request.metadata,
        }
    }

    /// Stand-in for a record the UI has heard about only through a progress
    /// event, before the start acknowledgment arrived.
    pub fn placeholder(id: String) -> Self {
        Self {
            id,
            name: String::new(),
            source_url: String::new(),
            destination_folder: String::new(),
            file_path: None,
            status: DownloadStatus::Downloading,
            progress_percent: 0,
            speed: String::new(),
            size_label: String::new(),
            total_fragments: 0,
            completed_fragments: 0,
            last_message: String::new(),
            started_at: Utc::now(),
            completed_at: None,
            metadata: MediaMetadata::default(),
        }
    }

    pub fn is_fragment_message(&self) -> bool {
        self.last_message.starts_with(FRAGMENT_MESSAGE_PREFIX)
    }

    /// Shallow merge. A status change is only honoured out of `downloading`;
    /// settled records never move again.
    pub fn apply(&mut self, update: &DownloadUpdate) {
        if let Some(status) = update.status {
            if !self.status.is_terminal() && status.is_terminal() {
                self.status = status;
            }
        }
        if let Some(file_path) = &update.file_path {
            self.file_path = Some(file_path.clone());
        }
        if let Some(percent) = update.progress_percent {
            self.progress_percent = percent.min(100);
        }
        if let Some(speed) = &update.speed {
            self.speed = speed.clone();
        }
        if let Some(size_label) = &update.size_label {
            self.size_label = size_label.clone();
        }
        if let Some(total) = update.total_fragments {
            self.total_fragments = total;
        }
        if let Some(completed) = update.completed_fragments {
            self.completed_fragments = completed;
        }
        if let Some(message) = &update.last_message {
            self.last_message = message.clone();
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
    }
}

/// Partial update derived from one output line or from finalization.
/// Absent fields carry no information.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DownloadUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DownloadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_fragments: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_fragments: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DownloadUpdate {
    pub fn is_empty(&self) -> bool {
        *self == DownloadUpdate::default()
    }
}

/// Progress event payload for the UI: the changed fields plus current status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadProgressEvent {
    pub id: String,
    pub status: DownloadStatus,
    #[serde(flatten)]
    pub changes: DownloadUpdate,
}

impl DownloadProgressEvent {
    pub fn new(id: &str, status: DownloadStatus, mut changes: DownloadUpdate) -> Self {
        // status travels at the top level only
        changes.status = None;
        Self {
            id: id.to_string(),
            status,
            changes,
        }
    }
}

/// `{ok, id}` / `{ok: false, error}` reply shape used at the UI boundary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            id: None,
            error: None,
        }
    }

    pub fn started(id: String) -> Self {
        Self {
            ok: true,
            id: Some(id),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            ok: false,
            id: None,
            error: Some(error.to_string()),
        }
    }
}
