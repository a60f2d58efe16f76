// Download command handlers exposed to the desktop frontend
use crate::downloads::DownloadManager;
use crate::models::{CommandResponse, DownloadRecord, DownloadRequest, MediaMetadata, Settings};
use log::warn;
use tauri::State;

/// Start downloading an HLS stream. Blank binary path or destination fall
/// back to the configured defaults.
#[tauri::command]
pub async fn start_download(
    manager: State<'_, DownloadManager>,
    binary_path: Option<String>,
    stream_url: String,
    name: String,
    destination_folder: Option<String>,
    metadata: Option<MediaMetadata>,
) -> Result<CommandResponse, String> {
    let mut request = DownloadRequest {
        binary_path: binary_path.unwrap_or_default(),
        stream_url,
        name,
        destination_folder: destination_folder.unwrap_or_default(),
        metadata: metadata.unwrap_or_default(),
    };
    Settings::load().apply_defaults(&mut request);

    Ok(match manager.start_download(request).await {
        Ok(record) => CommandResponse::started(record.id),
        Err(e) => {
            warn!("Download request rejected: {}", e);
            CommandResponse::failed(e)
        }
    })
}

/// List all downloads, in-flight ones included
#[tauri::command]
pub fn list_downloads(manager: State<'_, DownloadManager>) -> Vec<DownloadRecord> {
    manager.list_downloads()
}

/// Delete a download and, when present, its file on disk
#[tauri::command]
pub fn delete_download(
    manager: State<'_, DownloadManager>,
    id: String,
    file_path: Option<String>,
) -> CommandResponse {
    match manager.delete_download(&id, file_path.as_deref()) {
        Ok(()) => CommandResponse::ok(),
        Err(e) => {
            warn!("Failed to delete download {}: {}", id, e);
            CommandResponse::failed(e)
        }
    }
}
