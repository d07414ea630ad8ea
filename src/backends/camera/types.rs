// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for the camera backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Which physical camera the screen asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Front,
    #[default]
    Back,
}

impl Facing {
    /// The other facing
    pub fn toggled(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Back => write!(f, "back"),
        }
    }
}

/// Where a device sits, as far as the system can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPosition {
    Front,
    Back,
    /// USB webcams and anything without location metadata
    External,
}

impl CameraPosition {
    /// Parse the `camera_location` strings reported by libcamera/PipeWire
    pub fn from_location(location: Option<&str>) -> Self {
        match location.map(str::to_ascii_lowercase).as_deref() {
            Some("front") => CameraPosition::Front,
            Some("back") | Some("rear") => CameraPosition::Back,
            _ => CameraPosition::External,
        }
    }

    /// Whether a device at this position serves the requested facing exactly
    pub fn matches(self, facing: Facing) -> bool {
        matches!(
            (self, facing),
            (CameraPosition::Front, Facing::Front) | (CameraPosition::Back, Facing::Back)
        )
    }
}

/// How zoom is realised on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomControl {
    /// `V4L2_CID_ZOOM_ABSOLUTE` with the driver's value range
    Hardware { minimum: i32, maximum: i32 },
    /// Center crop in the preview pipeline
    Digital,
}

/// Camera device information
#[derive(Debug, Clone, PartialEq)]
pub struct CameraDevice {
    /// Human-readable name from the driver card string
    pub name: String,
    /// Device node (e.g. /dev/video0)
    pub path: String,
    pub position: CameraPosition,
    pub zoom: ZoomControl,
}

impl CameraDevice {
    /// Whether the device name suggests an ultra-wide lens
    pub fn is_ultra_wide(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        name.contains("ultra") || name.contains("wide")
    }
}

impl fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}

/// A single RGBA preview frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes, may include padding
    pub stride: u32,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Tightly packed RGBA bytes (stride padding removed)
    pub fn packed_rgba(&self) -> Vec<u8> {
        let row_bytes = (self.width * 4) as usize;
        let stride = self.stride as usize;
        if stride == row_bytes {
            return self.data[..row_bytes * self.height as usize].to_vec();
        }
        let mut out = Vec::with_capacity(row_bytes * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * stride;
            out.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        out
    }

    /// Frame as an `image` buffer
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.packed_rgba())
    }

    /// 8-bit luminance plane (BT.601 weights), used by the code scanner
    pub fn luma(&self) -> Vec<u8> {
        let stride = self.stride as usize;
        let mut out = Vec::with_capacity((self.width * self.height) as usize);
        for row in 0..self.height as usize {
            let line = &self.data[row * stride..row * stride + self.width as usize * 4];
            out.extend(line.chunks_exact(4).map(|px| {
                ((px[0] as u32 * 77 + px[1] as u32 * 150 + px[2] as u32 * 29) >> 8) as u8
            }));
        }
        out
    }
}

/// Output of a finished photo or video capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMedia {
    pub path: PathBuf,
}

/// Frame channel between the preview pipeline and a front end
pub type FrameSender = futures::channel::mpsc::Sender<Arc<CameraFrame>>;
pub type FrameReceiver = futures::channel::mpsc::Receiver<Arc<CameraFrame>>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// V4L2 ioctl failed
    Control(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Control(msg) => write!(f, "Control error: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

impl From<gstreamer::glib::Error> for BackendError {
    fn from(err: gstreamer::glib::Error) -> Self {
        BackendError::InitializationFailed(err.to_string())
    }
}

impl From<gstreamer::StateChangeError> for BackendError {
    fn from(err: gstreamer::StateChangeError) -> Self {
        BackendError::InitializationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, stride: u32, fill: u8) -> CameraFrame {
        CameraFrame {
            width,
            height,
            stride,
            data: vec![fill; (stride * height) as usize].into(),
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn facing_toggle_alternates() {
        assert_eq!(Facing::Back.toggled(), Facing::Front);
        assert_eq!(Facing::Front.toggled(), Facing::Back);
    }

    #[test]
    fn position_parsing() {
        assert_eq!(CameraPosition::from_location(Some("Front")), CameraPosition::Front);
        assert_eq!(CameraPosition::from_location(Some("rear")), CameraPosition::Back);
        assert_eq!(CameraPosition::from_location(None), CameraPosition::External);
        assert!(!CameraPosition::External.matches(Facing::Back));
    }

    #[test]
    fn packed_rgba_drops_stride_padding() {
        let f = frame(2, 3, 16, 7);
        assert_eq!(f.packed_rgba().len(), 2 * 3 * 4);
        assert!(f.to_rgba_image().is_some());
    }

    #[test]
    fn luma_of_white_is_near_white() {
        let f = frame(4, 4, 16, 255);
        let luma = f.luma();
        assert_eq!(luma.len(), 16);
        assert!(luma.iter().all(|&v| v >= 254));
    }
}
