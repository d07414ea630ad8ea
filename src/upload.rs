// SPDX-License-Identifier: GPL-3.0-only

//! Upload integration point
//!
//! The camera screen hands raw photo bytes to an [`UploadSink`]. No transport
//! is defined; [`OutboxSink`] stands in for remote storage by writing the
//! bytes and a small JSON manifest into a local outbox directory, where a
//! sync tool can pick them up.

use crate::errors::UploadError;
use crate::storage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// What the sink reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
    pub location: String,
    pub bytes: usize,
}

/// Storage seam for uploads
pub trait UploadSink: Send + Sync {
    fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadReceipt, UploadError>;
}

/// Sidecar written next to each outbox entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OutboxManifest {
    id: String,
    original_name: String,
    bytes: usize,
    queued_at: String,
}

/// Local directory acting as remote storage
#[derive(Debug, Clone)]
pub struct OutboxSink {
    dir: PathBuf,
}

impl OutboxSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl UploadSink for OutboxSink {
    fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadReceipt, UploadError> {
        let sink_err = |e: std::io::Error| UploadError::SinkFailed(e.to_string());
        std::fs::create_dir_all(&self.dir).map_err(sink_err)?;

        let id = uuid::Uuid::new_v4().to_string();
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let target = self.dir.join(format!("{id}.{extension}"));
        std::fs::write(&target, &bytes).map_err(sink_err)?;

        let manifest = OutboxManifest {
            id: id.clone(),
            original_name: name.to_string(),
            bytes: bytes.len(),
            queued_at: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| UploadError::SinkFailed(e.to_string()))?;
        std::fs::write(self.dir.join(format!("{id}.json")), json).map_err(sink_err)?;

        Ok(UploadReceipt {
            id,
            location: target.to_string_lossy().to_string(),
            bytes: bytes.len(),
        })
    }
}

/// Read the photo at `path` (a plain path or a `file://` URI) and hand its
/// bytes to `sink`
pub fn read_and_upload(path: &Path, sink: &dyn UploadSink) -> Result<UploadReceipt, UploadError> {
    let path = storage::local_path(path);
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo.jpg".to_string());
    let receipt = sink.upload(&name, bytes)?;
    info!(
        path = %path.display(),
        id = %receipt.id,
        bytes = receipt.bytes,
        "Photo handed to storage"
    );
    Ok(receipt)
}

/// [`read_and_upload`] on the blocking pool
pub async fn upload_async(
    path: PathBuf,
    sink: Arc<dyn UploadSink>,
) -> Result<UploadReceipt, UploadError> {
    tokio::task::spawn_blocking(move || read_and_upload(&path, sink.as_ref()))
        .await
        .map_err(|e| UploadError::SinkFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Captures what would have been sent
    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl UploadSink for RecordingSink {
        fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadReceipt, UploadError> {
            let len = bytes.len();
            self.received
                .lock()
                .unwrap()
                .push((name.to_string(), bytes));
            Ok(UploadReceipt {
                id: "1".into(),
                location: "memory".into(),
                bytes: len,
            })
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("snapcam-upload-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn reads_file_uri_and_passes_bytes() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let photo = dir.join("a.jpg");
        std::fs::write(&photo, b"jpegdata").unwrap();

        let sink = RecordingSink::default();
        let uri = format!("file://{}", photo.display());
        let receipt = read_and_upload(Path::new(&uri), &sink).unwrap();

        assert_eq!(receipt.bytes, 8);
        let received = sink.received.lock().unwrap();
        assert_eq!(received[0], ("a.jpg".to_string(), b"jpegdata".to_vec()));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_read_error() {
        let sink = RecordingSink::default();
        let err =
            read_and_upload(Path::new("file:///nonexistent/snapcam/a.jpg"), &sink).unwrap_err();
        assert!(matches!(err, UploadError::ReadFailed(_)));
        assert!(sink.received.lock().unwrap().is_empty());
    }

    #[test]
    fn non_utf8_photo_path_is_read_as_is() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let photo = dir.join(OsStr::from_bytes(b"IMG_caf\xe9.jpg"));
        std::fs::write(&photo, b"raw").unwrap();

        let sink = RecordingSink::default();
        let receipt = read_and_upload(&photo, &sink).unwrap();
        assert_eq!(receipt.bytes, 3);

        let mut uri = b"file://".to_vec();
        uri.extend_from_slice(photo.as_os_str().as_bytes());
        let receipt = read_and_upload(Path::new(OsStr::from_bytes(&uri)), &sink).unwrap();
        assert_eq!(receipt.bytes, 3);

        let received = sink.received.lock().unwrap();
        assert_eq!(received[0].0, "IMG_caf\u{FFFD}.jpg");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn outbox_writes_bytes_and_manifest() {
        let dir = scratch_dir();
        let sink = OutboxSink::new(&dir);
        let receipt = sink.upload("IMG_1.jpg", vec![1, 2, 3]).unwrap();

        assert_eq!(std::fs::read(&receipt.location).unwrap(), vec![1, 2, 3]);
        let manifest: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.join(format!("{}.json", receipt.id))).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["original_name"], "IMG_1.jpg");
        assert_eq!(manifest["bytes"], 3);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
