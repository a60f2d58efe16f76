// Download management: record store, progress publishing, UI reconciliation
pub mod publisher;
pub mod reconcile;
pub mod store;

pub use publisher::*;
pub use reconcile::DownloadMirror;
pub use store::{DownloadStore, RecordStore};

use crate::error::{DownloadError, Result};
use crate::models::{DownloadRecord, DownloadRequest, Settings};
use crate::process_manager::{spawn_downloader, supervise, ProgressPipeline};
use log::{info, warn};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Child;
use tokio::runtime::Handle;

/// Entry point for the UI boundary: start, list and delete downloads
pub struct DownloadManager {
    store: Arc<dyn RecordStore>,
    publisher: Arc<dyn ProgressPublisher>,
    max_concurrent: Option<u32>,
    admission: Mutex<()>,
}

impl DownloadManager {
    pub fn new(store: Arc<dyn RecordStore>, publisher: Arc<dyn ProgressPublisher>) -> Self {
        Self {
            store,
            publisher,
            max_concurrent: None,
            admission: Mutex::new(()),
        }
    }

    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn RecordStore>,
        publisher: Arc<dyn ProgressPublisher>,
    ) -> Self {
        Self::new(store, publisher).with_max_concurrent(settings.max_concurrent_downloads)
    }

    /// Admission limit; `None` lets every request through
    pub fn with_max_concurrent(mut self, limit: Option<u32>) -> Self {
        self.max_concurrent = limit;
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Validate, launch the downloader and register the record.
    ///
    /// Supervision runs on the current Tokio runtime; without one the request
    /// fails with `SpawnFailure`. Nothing is recorded when validation or the
    /// spawn fails.
    pub async fn start_download(&self, request: DownloadRequest) -> Result<DownloadRecord> {
        let runtime = Handle::try_current()
            .map_err(|e| DownloadError::SpawnFailure(format!("no async runtime: {}", e)))?;

        let (record, child) = self.admit(request)?;
        info!("Started download {} ({})", record.id, record.name);

        let pipeline = ProgressPipeline::new(
            record.id.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.publisher),
        );
        runtime.spawn(supervise(child, pipeline));

        Ok(record)
    }

    /// Limit check, spawn and record creation as one step, so concurrent
    /// callers cannot all pass the check before any of them is counted.
    fn admit(&self, request: DownloadRequest) -> Result<(DownloadRecord, Child)> {
        request.validate()?;

        let _slot = self.admission.lock();
        if let Some(limit) = self.max_concurrent {
            let active = self.store.active_count();
            if active >= limit as usize {
                return Err(DownloadError::TooManyActive { active, limit });
            }
        }

        if let Err(e) = fs::create_dir_all(&request.destination_folder) {
            warn!(
                "Could not create destination {:?}: {}",
                request.destination_folder, e
            );
        }

        let child = spawn_downloader(&request)?;
        let record = self.store.create(request)?;
        Ok((record, child))
    }

    pub fn list_downloads(&self) -> Vec<DownloadRecord> {
        self.store.list()
    }

    /// Remove a download and its file. A still-running process is left alone;
    /// its later updates are dropped.
    pub fn delete_download(&self, id: &str, file_path: Option<&str>) -> Result<()> {
        self.store.delete(id, file_path.map(Path::new))?;

        if let Err(e) = self.store.persist() {
            warn!("Failed to persist downloads after deleting {}: {}", id, e);
        }
        Ok(())
    }
}
