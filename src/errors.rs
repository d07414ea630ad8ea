// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera screen and its collaborators

use crate::backends::camera::types::Facing;
use crate::screen::permission::PermissionKind;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A required permission was refused
    PermissionDenied(PermissionKind),
    /// No camera matches the requested facing
    DeviceUnavailable(Facing),
    /// Recording failed (logged, never shown to the user)
    Recording(RecordingError),
    /// Photo capture failed
    Capture(CaptureError),
    /// Upload integration point failed
    Upload(UploadError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Recording-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    /// Failed to build or start the recording pipeline
    StartFailed(String),
    /// Failed to finalize the file
    StopFailed(String),
    /// No usable encoder element
    EncoderNotAvailable(String),
    /// The pipeline posted an error while recording
    PipelineError(String),
    /// The recorder went away without reporting
    Interrupted,
}

/// Photo capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No preview frame has arrived yet
    NoFrameAvailable,
    /// JPEG encoding failed
    EncodingFailed(String),
    /// Writing the file failed
    SaveFailed(String),
}

/// Upload errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The photo file could not be read
    ReadFailed(String),
    /// The storage sink refused the bytes
    SinkFailed(String),
    /// Upload requested without a photo under review
    NothingToUpload,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::PermissionDenied(kind) => write!(f, "{} permission denied", kind),
            AppError::DeviceUnavailable(facing) => {
                write!(f, "No {} camera device available", facing)
            }
            AppError::Recording(e) => write!(f, "Recording error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Upload(e) => write!(f, "Upload error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::StartFailed(msg) => write!(f, "Failed to start recording: {}", msg),
            RecordingError::StopFailed(msg) => write!(f, "Failed to stop recording: {}", msg),
            RecordingError::EncoderNotAvailable(msg) => write!(f, "Encoder not available: {}", msg),
            RecordingError::PipelineError(msg) => write!(f, "Pipeline error: {}", msg),
            RecordingError::Interrupted => write!(f, "Recorder stopped unexpectedly"),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoFrameAvailable => write!(f, "No frame available for capture"),
            CaptureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::ReadFailed(msg) => write!(f, "Could not read photo: {}", msg),
            UploadError::SinkFailed(msg) => write!(f, "Storage rejected upload: {}", msg),
            UploadError::NothingToUpload => write!(f, "No photo to upload"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for RecordingError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for UploadError {}

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::Recording(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Upload(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::SaveFailed(err.to_string())
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::EncodingFailed(err.to_string())
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::ReadFailed(err.to_string())
    }
}
