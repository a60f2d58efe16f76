// Progress publishing: delivers download events to the UI layer

use crate::models::DownloadProgressEvent;
use tokio::sync::mpsc;

/// Window event name the desktop shell listens on
pub const PROGRESS_EVENT: &str = "download:progress";

/// Receives every accepted merge and the final exit-time update.
/// Called in emission order for each download.
pub trait ProgressPublisher: Send + Sync {
    fn publish(&self, event: DownloadProgressEvent);
}

/// Lossless in-process subscription channel
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<DownloadProgressEvent>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DownloadProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressPublisher for ChannelPublisher {
    fn publish(&self, event: DownloadProgressEvent) {
        if self.tx.send(event).is_err() {
            // subscriber gone; progress is still tracked in the store
            log::debug!("Progress subscriber dropped");
        }
    }
}

#[cfg(feature = "desktop")]
impl<R: tauri::Runtime> ProgressPublisher for tauri::AppHandle<R> {
    fn publish(&self, event: DownloadProgressEvent) {
        use tauri::Emitter;

        if let Err(e) = self.emit(PROGRESS_EVENT, &event) {
            log::warn!("Failed to emit download progress for {}: {}", event.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DownloadStatus, DownloadUpdate};

    #[test]
    fn test_channel_preserves_order() {
        let (publisher, mut rx) = ChannelPublisher::new();
        for percent in [1u8, 2, 3] {
            publisher.publish(DownloadProgressEvent::new(
                "a",
                DownloadStatus::Downloading,
                DownloadUpdate {
                    progress_percent: Some(percent),
                    ..Default::default()
                },
            ));
        }

        let received: Vec<u8> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| event.changes.progress_percent)
            .collect();
        assert_eq!(received, vec![1, 2, 3]);
    }

    #[test]
    fn test_publish_after_subscriber_dropped() {
        let (publisher, rx) = ChannelPublisher::new();
        drop(rx);
        publisher.publish(DownloadProgressEvent::new(
            "a",
            DownloadStatus::Error,
            DownloadUpdate::default(),
        ));
    }
}
