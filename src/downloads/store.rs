// In-memory download record store mirrored to downloads.json

use crate::error::{DownloadError, Result};
use crate::file_manager::{read_json_file, remove_media_file, write_json_file};
use crate::models::{
    DownloadProgressEvent, DownloadRecord, DownloadRequest, DownloadStatus, DownloadUpdate,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Operations the supervisor and the UI boundary need from a record store.
/// Every method is one self-contained critical section.
pub trait RecordStore: Send + Sync {
    /// Validate the request and insert a fresh `downloading` record
    fn create(&self, request: DownloadRequest) -> Result<DownloadRecord>;

    /// Shallow-merge an update; `None` when the id is unknown
    fn merge(&self, id: &str, update: DownloadUpdate) -> Option<DownloadProgressEvent>;

    /// Show an unrecognized output line, unless a fragment progress message
    /// is currently displayed
    fn note_message(&self, id: &str, line: &str) -> Option<DownloadProgressEvent>;

    fn get(&self, id: &str) -> Option<DownloadRecord>;

    /// Remove the record, deleting its file (or `file_path`) first when present
    fn delete(&self, id: &str, file_path: Option<&Path>) -> Result<Option<DownloadRecord>>;

    /// Settled records only
    fn snapshot(&self) -> Vec<DownloadRecord>;

    /// All records in insertion order
    fn list(&self) -> Vec<DownloadRecord>;

    fn active_count(&self) -> usize;

    /// Write the snapshot to durable storage, if the store has any
    fn persist(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<String, DownloadRecord>,
    order: Vec<String>,
}

impl Records {
    fn insert(&mut self, record: DownloadRecord) {
        if !self.by_id.contains_key(&record.id) {
            self.order.push(record.id.clone());
        }
        self.by_id.insert(record.id.clone(), record);
    }

    fn remove(&mut self, id: &str) -> Option<DownloadRecord> {
        let record = self.by_id.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(record)
    }

    fn iter(&self) -> impl Iterator<Item = &DownloadRecord> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

/// `RecordStore` backed by a mutex-guarded map keyed by id
#[derive(Debug, Default)]
pub struct DownloadStore {
    records: Mutex<Records>,
    snapshot_path: Option<PathBuf>,
}

impl DownloadStore {
    /// Store without durable storage
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the snapshot at `path`. A missing or corrupt file yields an empty
    /// store; in-flight records never survive a restart.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut records = Records::default();

        if path.exists() {
            match read_json_file::<Vec<DownloadRecord>>(&path) {
                Ok(saved) => {
                    for record in saved {
                        if record.status == DownloadStatus::Downloading {
                            debug!("Dropping stale in-flight download {}", record.id);
                            continue;
                        }
                        records.insert(record);
                    }
                    info!("Loaded {} downloads from {:?}", records.order.len(), path);
                }
                Err(e) => warn!("Ignoring unreadable downloads file {:?}: {}", path, e),
            }
        }

        Self {
            records: Mutex::new(records),
            snapshot_path: Some(path),
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

impl RecordStore for DownloadStore {
    fn create(&self, request: DownloadRequest) -> Result<DownloadRecord> {
        request.validate()?;
        let record = DownloadRecord::new(uuid::Uuid::new_v4().to_string(), request);
        self.records.lock().insert(record.clone());
        Ok(record)
    }

    fn merge(&self, id: &str, update: DownloadUpdate) -> Option<DownloadProgressEvent> {
        let mut records = self.records.lock();
        let Some(record) = records.by_id.get_mut(id) else {
            debug!("Dropping update for unknown download {}", id);
            return None;
        };
        record.apply(&update);
        Some(DownloadProgressEvent::new(id, record.status, update))
    }

    fn note_message(&self, id: &str, line: &str) -> Option<DownloadProgressEvent> {
        let mut records = self.records.lock();
        let record = records.by_id.get_mut(id)?;
        if record.is_fragment_message() || record.last_message == line {
            return None;
        }
        let update = DownloadUpdate {
            last_message: Some(line.to_string()),
            ..Default::default()
        };
        record.apply(&update);
        Some(DownloadProgressEvent::new(id, record.status, update))
    }

    fn get(&self, id: &str) -> Option<DownloadRecord> {
        self.records.lock().by_id.get(id).cloned()
    }

    fn delete(&self, id: &str, file_path: Option<&Path>) -> Result<Option<DownloadRecord>> {
        let mut records = self.records.lock();

        let recorded_path = records
            .by_id
            .get(id)
            .and_then(|record| record.file_path.as_ref())
            .map(PathBuf::from);
        let target = file_path.map(Path::to_path_buf).or(recorded_path);

        // the record stays if its file cannot be removed, so the user can retry
        if let Some(target) = target {
            remove_media_file(&target)?;
        }

        let removed = records.remove(id);
        if removed.is_some() {
            info!("Deleted download: {}", id);
        }
        Ok(removed)
    }

    fn snapshot(&self) -> Vec<DownloadRecord> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.status != DownloadStatus::Downloading)
            .cloned()
            .collect()
    }

    fn list(&self) -> Vec<DownloadRecord> {
        self.records.lock().iter().cloned().collect()
    }

    fn active_count(&self) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| record.status == DownloadStatus::Downloading)
            .count()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        write_json_file(path, &self.snapshot())
            .map_err(|e| DownloadError::Persistence(format!("{:?}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaMetadata;

    fn request(name: &str) -> DownloadRequest {
        DownloadRequest {
            binary_path: "/usr/bin/hls-dl".to_string(),
            stream_url: "https://cdn.example/master.m3u8".to_string(),
            name: name.to_string(),
            destination_folder: "/out".to_string(),
            metadata: MediaMetadata::default(),
        }
    }

    fn settle(store: &DownloadStore, id: &str, status: DownloadStatus) {
        store.merge(
            id,
            DownloadUpdate {
                status: Some(status),
                ..Default::default()
            },
        );
    }

    #[test]
    fn test_create_rejects_incomplete_request() {
        let store = DownloadStore::in_memory();
        let mut req = request("Movie");
        req.stream_url = String::new();

        assert!(matches!(store.create(req), Err(DownloadError::InvalidRequest(_))));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_create_generates_unique_ids() {
        let store = DownloadStore::in_memory();
        let a = store.create(request("A")).unwrap();
        let b = store.create(request("B")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.active_count(), 2);

        let names: Vec<String> = store.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_merge_unknown_id_is_noop() {
        let store = DownloadStore::in_memory();
        store.create(request("A")).unwrap();
        let before = store.list();

        let event = store.merge(
            "missing",
            DownloadUpdate {
                progress_percent: Some(50),
                ..Default::default()
            },
        );
        assert!(event.is_none());
        assert!(store.note_message("missing", "hello").is_none());
        assert_eq!(store.list(), before);
    }

    #[test]
    fn test_merge_returns_changed_fields_and_status() {
        let store = DownloadStore::in_memory();
        let record = store.create(request("A")).unwrap();

        let event = store
            .merge(
                &record.id,
                DownloadUpdate {
                    speed: Some("3.2MiB/s".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(event.id, record.id);
        assert_eq!(event.status, DownloadStatus::Downloading);
        assert_eq!(event.changes.speed.as_deref(), Some("3.2MiB/s"));
        assert_eq!(event.changes.progress_percent, None);
        assert_eq!(store.get(&record.id).unwrap().speed, "3.2MiB/s");
    }

    #[test]
    fn test_note_message_keeps_fragment_progress() {
        let store = DownloadStore::in_memory();
        let id = store.create(request("A")).unwrap().id;

        assert!(store.note_message(&id, "[info] preparing").is_some());
        assert_eq!(store.get(&id).unwrap().last_message, "[info] preparing");

        store.merge(
            &id,
            DownloadUpdate {
                last_message: Some("Fragment 3 / 10".to_string()),
                ..Default::default()
            },
        );
        assert!(store.note_message(&id, "Downloading: 45.0% (100/200 bytes)/s").is_none());
        assert_eq!(store.get(&id).unwrap().last_message, "Fragment 3 / 10");
    }

    #[test]
    fn test_snapshot_excludes_downloading() {
        let store = DownloadStore::in_memory();
        let a = store.create(request("A")).unwrap();
        let b = store.create(request("B")).unwrap();
        let c = store.create(request("C")).unwrap();
        settle(&store, &a.id, DownloadStatus::Completed);
        settle(&store, &c.id, DownloadStatus::Error);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|r| r.status != DownloadStatus::Downloading));
        assert!(snapshot.iter().all(|r| r.id != b.id));
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloads.json");

        let store = DownloadStore::load(&path);
        let done = store.create(request("Done")).unwrap();
        store.create(request("Running")).unwrap();
        settle(&store, &done.id, DownloadStatus::Completed);
        store.persist().unwrap();

        let reloaded = DownloadStore::load(&path);
        let records = reloaded.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, done.id);
        assert_eq!(records[0].status, DownloadStatus::Completed);
    }

    #[test]
    fn test_corrupt_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloads.json");
        std::fs::write(&path, "{{ definitely not json").unwrap();

        let store = DownloadStore::load(&path);
        assert!(store.list().is_empty());
        assert_eq!(store.snapshot_path(), Some(path.as_path()));
    }

    #[test]
    fn test_delete_removes_file_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mp4");
        std::fs::write(&file, b"data").unwrap();

        let store = DownloadStore::in_memory();
        let id = store.create(request("A")).unwrap().id;
        store.merge(
            &id,
            DownloadUpdate {
                file_path: Some(file.to_string_lossy().to_string()),
                ..Default::default()
            },
        );

        let removed = store.delete(&id, None).unwrap();
        assert_eq!(removed.map(|r| r.id), Some(id.clone()));
        assert!(!file.exists());
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_delete_reports_filesystem_errors() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be removed with remove_file
        let blocker = dir.path().join("blocker.mp4");
        std::fs::create_dir(&blocker).unwrap();

        let store = DownloadStore::in_memory();
        let id = store.create(request("A")).unwrap().id;

        let result = store.delete(&id, Some(blocker.as_path()));
        assert!(matches!(result, Err(DownloadError::Io(_))));
        assert!(store.get(&id).is_some());
    }

    #[test]
    fn test_delete_unknown_id() {
        let store = DownloadStore::in_memory();
        assert!(store.delete("missing", None).unwrap().is_none());
    }
}
