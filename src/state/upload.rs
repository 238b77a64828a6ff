//! Upload dialog state and the sequential upload queue.
//!
//! DESIGN
//! ======
//! Files go up one at a time in queue order. While a request is in flight a
//! ticker nudges the file's progress toward a soft cap so the user sees
//! movement; the real completion snaps it to 100. A failure marks only that
//! file and the queue moves on.
//!
//! TRADE-OFFS
//! ==========
//! Sequential uploads give up throughput for one honest progress bar at a
//! time and a single request in flight.

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::net::api::DocumentUploader;
use crate::notice::Notice;
use crate::util::files::{format_file_size, is_accepted_type, mime_for_path};

pub const PROGRESS_TICK: Duration = Duration::from_millis(200);
pub const PROGRESS_STEP: u8 = 10;
/// Simulated progress never passes this until the request resolves.
pub const PROGRESS_SOFT_CAP: u8 = 90;
/// How long the dialog lingers after a successful batch.
pub const CLOSE_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

const UNSUPPORTED_TYPE: &str = "Unsupported file type. Please upload PDF, PowerPoint, CSV, Word, or text files.";
const UPLOAD_FAILED: &str = "Upload failed";

/// A file chosen for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadSource {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSource")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

impl UploadSource {
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), data }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        Ok(Self::new(name, mime_for_path(path), data))
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_UPLOAD_BYTES }
    }
}

impl From<&ClientConfig> for UploadLimits {
    fn from(config: &ClientConfig) -> Self {
        Self { max_bytes: config.max_upload_bytes }
    }
}

/// Why a file cannot be uploaded, or `None` if it can.
#[must_use]
pub fn validation_error(source: &UploadSource, limits: UploadLimits) -> Option<String> {
    if !is_accepted_type(&source.mime_type) {
        return Some(UNSUPPORTED_TYPE.to_owned());
    }
    if source.size() > limits.max_bytes {
        return Some(format!(
            "File too large. Maximum file size is {}.",
            format_file_size(limits.max_bytes)
        ));
    }
    None
}

/// Per-file upload lifecycle. Transitions only move forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadStatus {
    #[default]
    Pending,
    Uploading,
    Completed,
    Error,
}

impl UploadStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Uploading => "Uploading...",
            Self::Completed => "Completed",
            Self::Error => "Failed",
        }
    }

    fn can_move_to(self, next: Self) -> bool {
        match self {
            Self::Pending => next == Self::Uploading,
            Self::Uploading => next.is_terminal(),
            Self::Completed | Self::Error => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UploadFile {
    source: UploadSource,
    progress: u8,
    status: UploadStatus,
    error: Option<String>,
}

impl UploadFile {
    #[must_use]
    pub fn new(source: UploadSource) -> Self {
        Self { source, progress: 0, status: UploadStatus::Pending, error: None }
    }

    #[must_use]
    pub fn source(&self) -> &UploadSource {
        &self.source
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn status(&self) -> UploadStatus {
        self.status
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn transition(&mut self, next: UploadStatus) -> bool {
        if !self.status.can_move_to(next) {
            tracing::warn!(name = %self.source.name, from = ?self.status, to = ?next, "rejected upload transition");
            return false;
        }
        self.status = next;
        true
    }

    fn complete(&mut self) {
        if self.transition(UploadStatus::Completed) {
            self.progress = 100;
        }
    }

    fn fail(&mut self, message: String) {
        if self.transition(UploadStatus::Error) {
            self.error = Some(message);
        }
    }
}

/// Published while the queue runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadEvent {
    Started { index: usize, name: String },
    Progress { index: usize, percent: u8 },
    Completed { index: usize },
    Failed { index: usize, message: String },
    Drained(UploadSummary),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub completed: usize,
    pub failed: usize,
}

impl UploadSummary {
    /// At least one file landed, so the document list is out of date.
    #[must_use]
    pub fn should_refresh(&self) -> bool {
        self.completed > 0
    }

    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        self.should_refresh().then(|| {
            Notice::info("Upload successful")
                .with_description(format!("{} file(s) uploaded successfully.", self.completed))
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct UploadQueue {
    files: Vec<UploadFile>,
    limits: UploadLimits,
    uploading: bool,
}

impl UploadQueue {
    #[must_use]
    pub fn new(limits: UploadLimits) -> Self {
        Self { files: Vec::new(), limits, uploading: false }
    }

    pub fn add(&mut self, sources: impl IntoIterator<Item = UploadSource>) {
        self.files.extend(sources.into_iter().map(UploadFile::new));
    }

    /// Remove a file that has not started uploading yet.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.uploading {
            return false;
        }
        match self.files.get(index) {
            Some(file) if file.status == UploadStatus::Pending => {
                self.files.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    #[must_use]
    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// The upload button is live only when something is still pending.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.uploading && self.files.iter().any(|file| file.status == UploadStatus::Pending)
    }

    /// Upload every pending file in order, one request at a time.
    pub async fn run<U>(&mut self, uploader: &U, events: Option<&mpsc::UnboundedSender<UploadEvent>>) -> UploadSummary
    where
        U: DocumentUploader + ?Sized,
    {
        let emit = |event: UploadEvent| {
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };

        let limits = self.limits;
        let mut summary = UploadSummary::default();
        self.uploading = true;

        for (index, file) in self.files.iter_mut().enumerate() {
            if file.status != UploadStatus::Pending {
                continue;
            }
            file.transition(UploadStatus::Uploading);
            emit(UploadEvent::Started { index, name: file.source.name.clone() });

            let outcome = match validation_error(&file.source, limits) {
                Some(message) => Err(message),
                None => {
                    let upload = uploader.upload(&file.source);
                    tokio::pin!(upload);
                    let mut ticker = tokio::time::interval_at(Instant::now() + PROGRESS_TICK, PROGRESS_TICK);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        tokio::select! {
                            result = &mut upload => break result.map_err(|e| failure_message(&e)),
                            _ = ticker.tick() => {
                                let percent = file.progress.saturating_add(PROGRESS_STEP).min(PROGRESS_SOFT_CAP);
                                file.progress = percent;
                                emit(UploadEvent::Progress { index, percent });
                            }
                        }
                    }
                }
            };

            match outcome {
                Ok(()) => {
                    file.complete();
                    summary.completed += 1;
                    emit(UploadEvent::Completed { index });
                }
                Err(message) => {
                    tracing::warn!(name = %file.source.name, error = %message, "upload failed");
                    file.fail(message.clone());
                    summary.failed += 1;
                    emit(UploadEvent::Failed { index, message });
                }
            }
        }

        self.uploading = false;
        tracing::info!(completed = summary.completed, failed = summary.failed, "upload queue drained");
        emit(UploadEvent::Drained(summary));
        summary
    }
}

fn failure_message(err: &ApiError) -> String {
    let message = err.user_message();
    if message.trim().is_empty() { UPLOAD_FAILED.to_owned() } else { message }
}

/// Modal wrapper around the queue: open/close plus the post-upload close.
#[derive(Clone, Debug, Default)]
pub struct UploadDialog {
    queue: UploadQueue,
    open: bool,
}

impl UploadDialog {
    #[must_use]
    pub fn new(limits: UploadLimits) -> Self {
        Self { queue: UploadQueue::new(limits), open: false }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut UploadQueue {
        &mut self.queue
    }

    /// Close unless an upload is running.
    pub fn cancel(&mut self) -> bool {
        if self.queue.is_uploading() {
            return false;
        }
        self.open = false;
        true
    }

    /// Run the queue. After any success, call `on_success` (the caller's
    /// refresh hook), wait [`CLOSE_DELAY`], then clear and close.
    pub async fn submit<U, F>(
        &mut self,
        uploader: &U,
        events: Option<&mpsc::UnboundedSender<UploadEvent>>,
        on_success: F,
    ) -> UploadSummary
    where
        U: DocumentUploader + ?Sized,
        F: FnOnce(&UploadSummary),
    {
        if self.queue.files().is_empty() {
            return UploadSummary::default();
        }

        let summary = self.queue.run(uploader, events).await;
        if summary.should_refresh() {
            on_success(&summary);
            tokio::time::sleep(CLOSE_DELAY).await;
            self.queue.clear();
            self.open = false;
        }
        summary
    }
}
