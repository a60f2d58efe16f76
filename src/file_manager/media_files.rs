// Downloaded media files: fallback discovery, size probing, removal

use crate::error::Result;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extensions the downloader may produce for a finished video
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "m4v", "avi", "ts", "flv"];

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Most recently modified video file directly inside `dir`.
/// Unreadable directories or entries are skipped, not reported.
pub fn find_latest_video(dir: &Path) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot scan {:?} for output files: {}", dir, e);
            return None;
        }
    };

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !is_video_file(&path) {
            continue;
        }
        let modified = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            _ => continue,
        };
        if latest.as_ref().map_or(true, |(best, _)| modified > *best) {
            latest = Some((modified, path));
        }
    }

    latest.map(|(_, path)| path)
}

/// Human readable size in binary units, e.g. "352.64 MiB"
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Size label computed from the bytes actually on disk
pub fn read_size_label(path: &Path) -> Option<String> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Some(format_size(meta.len())),
        Ok(_) => None,
        Err(e) => {
            debug!("Cannot stat {:?}: {}", path, e);
            None
        }
    }
}

/// Remove a downloaded file. Returns whether something was deleted.
pub fn remove_media_file(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path)?;
    info!("Deleted file: {:?}", path);
    Ok(true)
}
