// HLS downloader process management
// Spawns the external downloader and turns its output into record updates

use crate::downloads::{ProgressPublisher, RecordStore};
use crate::error::{DownloadError, Result};
use crate::file_manager::{find_latest_video, read_size_label};
use crate::models::{DownloadRequest, DownloadStatus, DownloadUpdate};
use crate::process_manager::line_splitter::LineSplitter;
use crate::process_manager::progress_parser::{parse_line, ParsedLine};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Combined video+audio MP4 profile
pub const OUTPUT_FORMAT: &str = "mp4 (with Audio)";
pub const QUALITY: &str = "best";
/// Audio bitrate in kbit/s
pub const AUDIO_BITRATE: &str = "320";

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Arguments after the binary path, in a fixed order
pub fn downloader_args(request: &DownloadRequest) -> Vec<String> {
    vec![
        "--cli".to_string(),
        request.stream_url.clone(),
        "-f".to_string(),
        OUTPUT_FORMAT.to_string(),
        "-r".to_string(),
        QUALITY.to_string(),
        "-b".to_string(),
        AUDIO_BITRATE.to_string(),
        "-n".to_string(),
        request.name.clone(),
        "-d".to_string(),
        request.destination_folder.clone(),
    ]
}

/// Launch the downloader with stdin closed and both output streams piped
pub fn spawn_downloader(request: &DownloadRequest) -> Result<Child> {
    let mut cmd = Command::new(&request.binary_path);
    cmd.args(downloader_args(request))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let child = cmd
        .spawn()
        .map_err(|e| DownloadError::SpawnFailure(format!("{}: {}", request.binary_path, e)))?;

    info!(
        "Spawned downloader {} (pid {:?}) for {:?}",
        request.binary_path,
        child.id(),
        request.name
    );
    Ok(child)
}

/// Routes the lines of one download into its record and out to the UI
#[derive(Clone)]
pub struct ProgressPipeline {
    id: String,
    store: Arc<dyn RecordStore>,
    publisher: Arc<dyn ProgressPublisher>,
    // last line no pattern matched, shown when the process fails
    last_diagnostic: Arc<Mutex<Option<String>>>,
}

impl ProgressPipeline {
    pub fn new(
        id: String,
        store: Arc<dyn RecordStore>,
        publisher: Arc<dyn ProgressPublisher>,
    ) -> Self {
        Self {
            id,
            store,
            publisher,
            last_diagnostic: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parse, merge and publish one line. Merges for a deleted record are
    /// dropped without an event.
    pub fn handle_line(&self, line: &str) {
        let event = match parse_line(line) {
            ParsedLine::Update(update) => self.store.merge(&self.id, update),
            ParsedLine::Unrecognized(line) => {
                let event = self.store.note_message(&self.id, &line);
                *self.last_diagnostic.lock() = Some(line);
                event
            }
        };
        if let Some(event) = event {
            self.publisher.publish(event);
        }
    }

    /// Settle the record from the exit code, enrich it from the file on disk,
    /// persist, then publish the final event.
    pub fn finalize(&self, exit_code: Option<i32>) {
        let Some(record) = self.store.get(&self.id) else {
            info!("Download {} was removed before its process exited", self.id);
            return;
        };

        let status = DownloadStatus::from_exit_code(exit_code);
        info!("Download {} exited with code {:?}: {:?}", self.id, exit_code, status);

        let mut file_path = record.file_path.clone();
        if status == DownloadStatus::Completed && file_path.is_none() {
            file_path = find_latest_video(Path::new(&record.destination_folder))
                .map(|path| path.to_string_lossy().to_string());
            if let Some(path) = &file_path {
                debug!("Download {} output found by scan: {}", self.id, path);
            }
        }

        let size_label = file_path
            .as_deref()
            .and_then(|path| read_size_label(Path::new(path)));

        let progress_percent = match status {
            DownloadStatus::Completed => 100,
            _ => record.progress_percent,
        };

        let last_message = match status {
            DownloadStatus::Error => self.last_diagnostic.lock().take(),
            _ => None,
        };

        let update = DownloadUpdate {
            status: Some(status),
            file_path,
            progress_percent: Some(progress_percent),
            speed: Some(String::new()),
            size_label,
            total_fragments: Some(record.total_fragments),
            completed_fragments: Some(record.completed_fragments),
            last_message,
            completed_at: Some(Utc::now()),
        };

        let event = self.store.merge(&self.id, update);

        if let Err(e) = self.store.persist() {
            warn!("Failed to persist downloads after {} finished: {}", self.id, e);
        }

        if let Some(event) = event {
            self.publisher.publish(event);
        }
    }
}

/// Read one output stream to its end, feeding complete lines to the pipeline.
/// A read error ends the stream like EOF does.
pub async fn pump_output<R>(mut reader: R, pipeline: ProgressPipeline, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for line in splitter.push(&buf[..n]) {
                    pipeline.handle_line(&line);
                }
            }
            Err(e) => {
                debug!("Download {} {} read failed: {}", pipeline.id(), stream, e);
                break;
            }
        }
    }

    if let Some(line) = splitter.finish() {
        pipeline.handle_line(&line);
    }
}

/// Drive a spawned downloader to completion: drain stdout and stderr
/// concurrently, then finalize from the exit code.
pub async fn supervise(mut child: Child, pipeline: ProgressPipeline) {
    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump_output(stdout, pipeline.clone(), "stdout")));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump_output(stderr, pipeline.clone(), "stderr")));
    }

    for pump in pumps {
        if let Err(e) = pump.await {
            warn!("Output reader for {} stopped abnormally: {}", pipeline.id(), e);
        }
    }

    let exit_code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            warn!("Failed to wait for downloader of {}: {}", pipeline.id(), e);
            None
        }
    };

    pipeline.finalize(exit_code);
}
