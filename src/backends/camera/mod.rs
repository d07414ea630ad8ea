// SPDX-License-Identifier: MPL-2.0

//! Camera capability
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  CameraScreen (UI)  │  ← decides *which* device and *whether* it is active
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← enumeration + preview sessions
//! └──────────┬──────────┘
//!            │
//!            ▼
//!      ┌───────────┐
//!      │ V4L2 + GSt│  ← v4l2src → RGBA appsink, zoom via V4L2 or crop
//!      └───────────┘
//! ```
//!
//! A [`PreviewSession`] owns the device for as long as it lives. Dropping it
//! is how the preview's `active` flag releases the hardware.

pub mod preview;
pub mod types;
pub mod v4l2_controls;

pub use preview::PreviewSession;
pub use types::*;

use crate::screen::zoom::{SharedZoom, ZoomRange};
use std::collections::HashSet;
use tracing::{debug, info};

/// Camera backend seam
pub trait CameraBackend: Send + Sync {
    /// Enumerate capture devices
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Open the device and start streaming RGBA frames into `sender`.
    ///
    /// The session reads `zoom` on every frame.
    fn start_preview(
        &self,
        device: &CameraDevice,
        zoom: SharedZoom,
        range: ZoomRange,
        sender: FrameSender,
    ) -> BackendResult<PreviewSession>;
}

/// V4L2 devices streamed through GStreamer
#[derive(Debug, Default, Clone, Copy)]
pub struct V4l2Backend;

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        enumerate_v4l2_devices()
    }

    fn start_preview(
        &self,
        device: &CameraDevice,
        zoom: SharedZoom,
        range: ZoomRange,
        sender: FrameSender,
    ) -> BackendResult<PreviewSession> {
        PreviewSession::start(device, zoom, range, sender)
    }
}

/// Default backend for this system
pub fn get_backend() -> Box<dyn CameraBackend> {
    Box::new(V4l2Backend)
}

/// Guess a device position from the driver card string
fn position_from_card(card: &str) -> CameraPosition {
    let lower = card.to_ascii_lowercase();
    if ["front", "user", "selfie"].iter().any(|k| lower.contains(k)) {
        CameraPosition::Front
    } else if ["back", "rear", "world"].iter().any(|k| lower.contains(k)) {
        CameraPosition::Back
    } else {
        CameraPosition::External
    }
}

/// Scan `/dev/video*` for capture-capable nodes, one per physical device
pub fn enumerate_v4l2_devices() -> Vec<CameraDevice> {
    let mut nodes: Vec<_> = v4l::context::enum_devices()
        .into_iter()
        .map(|node| node.path().to_path_buf())
        .collect();
    nodes.sort();

    let mut seen_bus = HashSet::new();
    let mut devices = Vec::new();

    for path in nodes {
        let Ok(dev) = v4l::Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            debug!(path = %path.display(), "Skipping non-capture node");
            continue;
        }
        // UVC exposes a metadata node on the same bus
        if !seen_bus.insert(caps.bus.clone()) {
            continue;
        }

        let path = path.to_string_lossy().to_string();
        let zoom = match v4l2_controls::zoom_control(&path) {
            Some(info) => ZoomControl::Hardware {
                minimum: info.minimum,
                maximum: info.maximum,
            },
            None => ZoomControl::Digital,
        };

        let device = CameraDevice {
            position: position_from_card(&caps.card),
            name: caps.card,
            path,
            zoom,
        };
        info!(
            name = %device.name,
            path = %device.path,
            position = ?device.position,
            zoom = ?device.zoom,
            "Found camera"
        );
        devices.push(device);
    }

    devices
}

/// User overrides for picking a device per facing
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePreferences {
    pub front_path: Option<String>,
    pub back_path: Option<String>,
    /// Prefer an ultra-wide lens when several devices share a facing
    pub prefer_ultra_wide: bool,
}

impl Default for DevicePreferences {
    fn default() -> Self {
        Self {
            front_path: None,
            back_path: None,
            prefer_ultra_wide: true,
        }
    }
}

/// Pick the device serving `facing`.
///
/// Order: configured override, exact position match (ultra-wide first when
/// preferred), then external cameras. With two or more external cameras the
/// front facing takes the second one so that toggling actually switches.
pub fn select_device(
    devices: &[CameraDevice],
    facing: Facing,
    prefs: &DevicePreferences,
) -> Option<CameraDevice> {
    let override_path = match facing {
        Facing::Front => prefs.front_path.as_deref(),
        Facing::Back => prefs.back_path.as_deref(),
    };
    if let Some(path) = override_path
        && let Some(device) = devices.iter().find(|d| d.path == path)
    {
        return Some(device.clone());
    }

    let exact: Vec<&CameraDevice> = devices
        .iter()
        .filter(|d| d.position.matches(facing))
        .collect();
    if !exact.is_empty() {
        let preferred = prefs
            .prefer_ultra_wide
            .then(|| exact.iter().find(|d| d.is_ultra_wide()))
            .flatten();
        return preferred.or(exact.first()).map(|d| (*d).clone());
    }

    let external: Vec<&CameraDevice> = devices
        .iter()
        .filter(|d| d.position == CameraPosition::External)
        .collect();
    let index = match facing {
        Facing::Back => 0,
        Facing::Front if external.len() > 1 => 1,
        Facing::Front => 0,
    };
    external.get(index).map(|d| (*d).clone())
}

/// Zoom limits of a device in zoom-factor units.
///
/// Hardware zoom reports the ratio of its control range (UVC cameras use
/// 100..500 for 1x..5x); digital zoom goes up to `max_digital`.
pub fn zoom_range(device: &CameraDevice, max_digital: f32) -> ZoomRange {
    match device.zoom {
        ZoomControl::Hardware { minimum, maximum } => {
            let base = minimum.max(1) as f32;
            let ratio = (maximum as f32 / base).clamp(1.0, 10.0);
            if ratio <= 1.0 {
                ZoomRange::new(1.0, max_digital.max(1.0), 1.0)
            } else {
                ZoomRange::new(1.0, ratio, 1.0)
            }
        }
        ZoomControl::Digital => ZoomRange::new(1.0, max_digital.max(1.0), 1.0),
    }
}

/// Driver value for a zoom factor, linear across the control range
pub fn zoom_to_control(zoom: f32, range: ZoomRange, minimum: i32, maximum: i32) -> i32 {
    let span = range.max - range.min;
    if span <= f32::EPSILON {
        return minimum;
    }
    let t = ((range.clamp(zoom) - range.min) / span).clamp(0.0, 1.0);
    minimum + ((maximum - minimum) as f32 * t).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, path: &str, position: CameraPosition) -> CameraDevice {
        CameraDevice {
            name: name.into(),
            path: path.into(),
            position,
            zoom: ZoomControl::Digital,
        }
    }

    #[test]
    fn card_names_map_to_positions() {
        assert_eq!(position_from_card("Front Camera"), CameraPosition::Front);
        assert_eq!(position_from_card("imx258 rear"), CameraPosition::Back);
        assert_eq!(position_from_card("Integrated Webcam"), CameraPosition::External);
    }

    #[test]
    fn exact_facing_wins() {
        let devices = vec![
            device("Webcam", "/dev/video0", CameraPosition::External),
            device("Front", "/dev/video2", CameraPosition::Front),
        ];
        let prefs = DevicePreferences::default();
        assert_eq!(
            select_device(&devices, Facing::Front, &prefs).map(|d| d.path),
            Some("/dev/video2".into())
        );
        assert_eq!(
            select_device(&devices, Facing::Back, &prefs).map(|d| d.path),
            Some("/dev/video0".into())
        );
    }

    #[test]
    fn ultra_wide_preferred_by_default() {
        let devices = vec![
            device("Main rear", "/dev/video0", CameraPosition::Back),
            device("Ultra Wide rear", "/dev/video1", CameraPosition::Back),
        ];
        let prefs = DevicePreferences::default();
        assert_eq!(
            select_device(&devices, Facing::Back, &prefs).map(|d| d.path),
            Some("/dev/video1".into())
        );

        let prefs = DevicePreferences {
            prefer_ultra_wide: false,
            ..Default::default()
        };
        assert_eq!(
            select_device(&devices, Facing::Back, &prefs).map(|d| d.path),
            Some("/dev/video0".into())
        );
    }

    #[test]
    fn override_path_is_honoured() {
        let devices = vec![
            device("A", "/dev/video0", CameraPosition::External),
            device("B", "/dev/video4", CameraPosition::External),
        ];
        let prefs = DevicePreferences {
            back_path: Some("/dev/video4".into()),
            ..Default::default()
        };
        assert_eq!(
            select_device(&devices, Facing::Back, &prefs).map(|d| d.path),
            Some("/dev/video4".into())
        );
    }

    #[test]
    fn no_devices_means_unavailable() {
        assert!(select_device(&[], Facing::Back, &DevicePreferences::default()).is_none());
    }

    #[test]
    fn hardware_zoom_range_uses_control_ratio() {
        let mut d = device("UVC", "/dev/video0", CameraPosition::External);
        d.zoom = ZoomControl::Hardware {
            minimum: 100,
            maximum: 500,
        };
        let range = zoom_range(&d, 4.0);
        assert_eq!((range.min, range.max, range.neutral), (1.0, 5.0, 1.0));
        assert_eq!(zoom_to_control(1.0, range, 100, 500), 100);
        assert_eq!(zoom_to_control(3.0, range, 100, 500), 300);
        assert_eq!(zoom_to_control(50.0, range, 100, 500), 500);
    }

    #[test]
    fn digital_zoom_range_uses_configured_max() {
        let d = device("Webcam", "/dev/video0", CameraPosition::External);
        assert_eq!(zoom_range(&d, 4.0).max, 4.0);
        assert_eq!(zoom_range(&d, 0.2).max, 1.0);
    }
}
