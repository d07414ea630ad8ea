// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for captured photos and videos

use crate::backends::camera::types::CameraFrame;
use crate::constants::file_formats;
use crate::errors::CaptureError;
use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const APP_DIR: &str = "snapcam";

/// Where photos go, unless the config overrides it
pub fn photo_directory(config_override: Option<&str>) -> PathBuf {
    if let Some(dir) = config_override.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Where videos go, unless the config overrides it
pub fn video_directory(config_override: Option<&str>) -> PathBuf {
    if let Some(dir) = config_override.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::video_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Videos")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default outbox for the upload stand-in
pub fn outbox_directory(config_override: Option<&str>) -> PathBuf {
    if let Some(dir) = config_override.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("outbox")
}

/// `dir/PREFIX_YYYYmmdd_HHMMSS.ext`, with a counter when the name is taken
pub fn timestamped_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let candidate = dir.join(format!("{prefix}_{stamp}.{extension}"));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(format!("{prefix}_{stamp}_{n}.{extension}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Accept both plain paths and `file://` URIs
pub fn path_from_uri(uri: &str) -> PathBuf {
    local_path(Path::new(uri)).to_path_buf()
}

/// `path` without a leading `file://`, keeping non-UTF-8 bytes intact
pub fn local_path(path: &Path) -> &Path {
    match path.as_os_str().as_bytes().strip_prefix(b"file://") {
        Some(rest) => Path::new(OsStr::from_bytes(rest)),
        None => path,
    }
}

/// Encode a frame as JPEG into `dir`
pub fn save_photo(frame: &CameraFrame, dir: &Path) -> Result<PathBuf, CaptureError> {
    std::fs::create_dir_all(dir)?;
    let rgba = frame
        .to_rgba_image()
        .ok_or_else(|| CaptureError::EncodingFailed("frame size mismatch".into()))?;
    let rgb = image::DynamicImage::ImageRgba8(rgba).into_rgb8();

    let path = timestamped_path(dir, file_formats::PHOTO_PREFIX, file_formats::PHOTO_EXTENSION);
    let file = std::fs::File::create(&path)?;
    let mut writer = std::io::BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, file_formats::JPEG_QUALITY).encode_image(&rgb)?;

    info!(path = %path.display(), width = frame.width, height = frame.height, "Photo saved");
    Ok(path)
}

/// [`save_photo`] on the blocking pool
pub async fn save_photo_async(
    frame: Option<Arc<CameraFrame>>,
    dir: PathBuf,
) -> Result<PathBuf, CaptureError> {
    let frame = frame.ok_or(CaptureError::NoFrameAvailable)?;
    tokio::task::spawn_blocking(move || save_photo(&frame, &dir))
        .await
        .map_err(|e| CaptureError::SaveFailed(e.to_string()))?
}

/// Decode an image file to RGBA
pub fn load_rgba(path: &Path) -> Option<image::RgbaImage> {
    match image::open(path) {
        Ok(img) => {
            debug!(path = %path.display(), "Loaded image");
            Some(img.to_rgba8())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load image");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("snapcam-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn file_uri_is_stripped() {
        assert_eq!(path_from_uri("file:///tmp/a.jpg"), PathBuf::from("/tmp/a.jpg"));
        assert_eq!(path_from_uri("/tmp/b.mp4"), PathBuf::from("/tmp/b.mp4"));
    }

    #[test]
    fn local_path_keeps_raw_bytes() {
        let raw = Path::new(OsStr::from_bytes(b"file:///tmp/caf\xe9.jpg"));
        assert_eq!(
            local_path(raw).as_os_str().as_bytes(),
            b"/tmp/caf\xe9.jpg"
        );
    }

    #[test]
    fn override_directory_wins() {
        assert_eq!(photo_directory(Some("/srv/photos")), PathBuf::from("/srv/photos"));
        assert!(photo_directory(Some("")).ends_with(APP_DIR));
    }

    #[test]
    fn saved_photo_is_a_readable_jpeg() {
        let dir = scratch_dir();
        let frame = CameraFrame {
            width: 8,
            height: 6,
            stride: 32,
            data: vec![128u8; 32 * 6].into(),
            captured_at: Instant::now(),
        };
        let path = save_photo(&frame, &dir).expect("photo should save");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        let img = load_rgba(&path).expect("saved photo should decode");
        assert_eq!(img.dimensions(), (8, 6));

        let second = timestamped_path(&dir, file_formats::PHOTO_PREFIX, "jpg");
        assert_ne!(second, path, "taken names get a counter");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_frame_is_reported() {
        let result = save_photo_async(None, scratch_dir()).await;
        assert_eq!(result, Err(CaptureError::NoFrameAvailable));
    }
}
