// UI-side download list kept in sync from start acknowledgments and events
//
// The start reply and the first progress event race each other. Both paths
// upsert by id, so either order ends with exactly one record.

use crate::models::{DownloadProgressEvent, DownloadRecord, DownloadUpdate};

#[derive(Debug, Default, Clone)]
pub struct DownloadMirror {
    records: Vec<DownloadRecord>,
}

impl DownloadMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a `list_downloads` reply
    pub fn from_records(records: Vec<DownloadRecord>) -> Self {
        let mut mirror = Self::new();
        for record in records {
            mirror.acknowledge(record);
        }
        mirror
    }

    /// Apply the record returned when a download was started (or listed).
    /// Progress already received through events is kept.
    pub fn acknowledge(&mut self, record: DownloadRecord) {
        match self.records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => {
                existing.name = record.name;
                existing.source_url = record.source_url;
                existing.destination_folder = record.destination_folder;
                existing.started_at = record.started_at;
                existing.metadata = record.metadata;
                if existing.file_path.is_none() {
                    existing.file_path = record.file_path;
                }
                if record.status.is_terminal() {
                    existing.apply(&DownloadUpdate {
                        status: Some(record.status),
                        completed_at: record.completed_at,
                        ..Default::default()
                    });
                }
            }
            None => self.records.push(record),
        }
    }

    pub fn apply_event(&mut self, event: &DownloadProgressEvent) {
        let index = match self.records.iter().position(|r| r.id == event.id) {
            Some(index) => index,
            None => {
                self.records.push(DownloadRecord::placeholder(event.id.clone()));
                self.records.len() - 1
            }
        };

        let record = &mut self.records[index];
        record.apply(&event.changes);
        record.apply(&DownloadUpdate {
            status: Some(event.status),
            ..Default::default()
        });
    }

    pub fn remove(&mut self, id: &str) -> Option<DownloadRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&DownloadRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[DownloadRecord] {
        &self.records
    }
}
