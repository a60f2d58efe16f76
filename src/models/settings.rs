// Settings data models
use crate::file_manager::read_json_file_or_default;
use crate::models::DownloadRequest;
use crate::utils::get_settings_json_path;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Downloader binary used when a request does not name one
    #[serde(default)]
    pub downloader_path: Option<String>,
    /// Destination used when a request does not name one
    #[serde(default)]
    pub download_path: Option<String>,
    /// Admission limit for simultaneous downloads; `None` is unlimited
    #[serde(default)]
    pub max_concurrent_downloads: Option<u32>,
}

impl Settings {
    /// Load from the per-user settings file, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&get_settings_json_path())
    }

    pub fn load_from(path: &Path) -> Self {
        read_json_file_or_default(path).unwrap_or_else(|e| {
            warn!("Ignoring unreadable settings {:?}: {}", path, e);
            Settings::default()
        })
    }

    /// Fill a blank binary path or destination from the configured defaults
    pub fn apply_defaults(&self, request: &mut DownloadRequest) {
        if request.binary_path.trim().is_empty() {
            if let Some(path) = &self.downloader_path {
                request.binary_path = path.clone();
            }
        }
        if request.destination_folder.trim().is_empty() {
            if let Some(path) = &self.download_path {
                request.destination_folder = path.clone();
            }
        }
    }
}
