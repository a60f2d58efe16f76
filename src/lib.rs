//! Streamkeep download backend.
//!
//! Launches an external HLS downloader per request, parses its terminal
//! output into progress updates, keeps the download records, persists the
//! settled ones and publishes every change to the UI layer.

#[cfg(feature = "desktop")]
mod commands;
pub mod downloads;
pub mod error;
pub mod file_manager;
pub mod logging;
pub mod models;
pub mod process_manager;
pub mod utils;

pub use downloads::{
    ChannelPublisher, DownloadManager, DownloadMirror, DownloadStore, ProgressPublisher,
    RecordStore,
};
pub use error::{DownloadError, Result};
pub use models::{
    CommandResponse, DownloadProgressEvent, DownloadRecord, DownloadRequest, DownloadStatus,
    DownloadUpdate, MediaMetadata, Settings,
};

/// Create the data directories and open the persisted store with the user's
/// settings applied.
pub fn load_download_manager(publisher: std::sync::Arc<dyn ProgressPublisher>) -> DownloadManager {
    if let Err(e) = utils::initialize_data_directories() {
        log::error!("Failed to initialize app data: {}", e);
    }
    logging::cleanup_old_logs();

    let settings = Settings::load();
    let store = DownloadStore::load(utils::get_downloads_json_path());
    DownloadManager::from_settings(&settings, std::sync::Arc::new(store), publisher)
}

/// Tauri plugin wiring the download commands and progress events into the
/// desktop shell. Register together with [`logging::plugin`].
#[cfg(feature = "desktop")]
pub fn init<R: tauri::Runtime>() -> tauri::plugin::TauriPlugin<R> {
    use std::sync::Arc;
    use tauri::Manager;

    tauri::plugin::Builder::new("downloads")
        .invoke_handler(tauri::generate_handler![
            commands::downloads::start_download,
            commands::downloads::list_downloads,
            commands::downloads::delete_download,
        ])
        .setup(|app, _api| {
            let manager = load_download_manager(Arc::new(app.clone()));
            app.manage(manager);
            Ok(())
        })
        .build()
}
