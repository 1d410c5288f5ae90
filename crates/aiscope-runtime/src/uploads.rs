//! Reference file uploads.
//!
//! Uploaded files are processed asynchronously by the provider. The uploader
//! polls until the file is ready and hands back a reference that can be
//! attached to a request. Any failure degrades to `None`: the analysis then
//! runs without that reference.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aiscope_core::{FileReference, FileState};

use crate::providers::FileStore;

/// Uploads local files and waits for them to become usable.
pub struct ReferenceUploader {
    store: Arc<dyn FileStore>,
    poll_interval: Duration,
    max_polls: u32,
}

impl ReferenceUploader {
    /// Poll once per second, for at most five minutes.
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self {
            store,
            poll_interval: Duration::from_secs(1),
            max_polls: 300,
        }
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    /// Upload `path` and wait until it is ready.
    ///
    /// Returns `None` when the upload fails, processing fails, or the file is
    /// still pending after `max_polls` status checks.
    pub async fn upload(&self, path: &Path, display_name: Option<&str>) -> Option<FileReference> {
        let mut file = match self.store.upload(path, display_name).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Upload failed");
                return None;
            }
        };
        tracing::info!(name = %file.name, state = %file.state, "File uploaded");

        let mut polls = 0;
        loop {
            match file.state {
                FileState::Ready => return Some(file),
                FileState::Failed => {
                    tracing::error!(name = %file.name, "File processing failed");
                    return None;
                }
                FileState::Pending if polls >= self.max_polls => {
                    tracing::error!(name = %file.name, polls, "File still processing, giving up");
                    return None;
                }
                FileState::Pending => {}
            }

            tokio::time::sleep(self.poll_interval).await;
            polls += 1;

            file = match self.store.get(&file.name).await {
                Ok(current) => current,
                Err(e) => {
                    tracing::error!(name = %file.name, error = %e, "File status check failed");
                    return None;
                }
            };
            tracing::debug!(name = %file.name, state = %file.state, polls, "Polled file state");
        }
    }
}
