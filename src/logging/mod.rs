//! Logging utilities for Streamkeep
//! Handles log file cleanup for 7-day retention and, on desktop builds,
//! the log plugin that backs the `log` facade.

use crate::utils::get_logs_dir;
use log::info;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

const LOG_RETENTION_DAYS: u64 = 7;

pub fn cleanup_old_logs() {
    cleanup_logs_in(&get_logs_dir(), SystemTime::now());
}

/// Remove `.log` files in `logs_dir` older than the retention window.
/// Returns how many were deleted.
pub fn cleanup_logs_in(logs_dir: &Path, now: SystemTime) -> usize {
    if !logs_dir.exists() {
        return 0;
    }

    let retention = Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);
    let mut removed = 0;

    if let Ok(entries) = fs::read_dir(logs_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "log") {
                let expired = fs::metadata(&path)
                    .and_then(|meta| meta.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .map_or(false, |age| age > retention);
                if expired && fs::remove_file(&path).is_ok() {
                    info!("Cleaned up old log: {:?}", path.file_name());
                    removed += 1;
                }
            }
        }
    }

    removed
}

/// Log backend for the desktop shell: stdout plus a file under the logs dir
#[cfg(feature = "desktop")]
pub fn plugin<R: tauri::Runtime>() -> tauri::plugin::TauriPlugin<R> {
    use tauri_plugin_log::{Target, TargetKind};

    tauri_plugin_log::Builder::new()
        .level(log::LevelFilter::Info)
        .targets([
            Target::new(TargetKind::Stdout),
            Target::new(TargetKind::Folder {
                path: get_logs_dir(),
                file_name: Some("streamkeep".to_string()),
            }),
        ])
        .build()
}
