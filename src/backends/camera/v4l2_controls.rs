// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera control interface
//!
//! Queries and sets V4L2 controls through raw ioctls. Only the zoom control
//! is used by the camera screen; the helpers themselves are generic.
//!
//! Inspired by [cameractrls](https://github.com/soyersoyer/cameractrls).

use super::types::{BackendError, BackendResult};
use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

/// Absolute optical/digital zoom in driver units
pub const V4L2_CID_ZOOM_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 13;

const V4L2_CTRL_TYPE_INTEGER: u32 = 1;
const V4L2_CTRL_TYPE_BOOLEAN: u32 = 2;
const V4L2_CTRL_TYPE_MENU: u32 = 3;

const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;

// (dir << 30) | (size << 16) | ('V' << 8) | nr
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

/// Information about a V4L2 control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlInfo {
    pub id: u32,
    pub name: String,
    pub ctrl_type: ControlType,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Integer,
    Boolean,
    Menu,
    Unknown(u32),
}

impl From<u32> for ControlType {
    fn from(value: u32) -> Self {
        match value {
            V4L2_CTRL_TYPE_INTEGER => ControlType::Integer,
            V4L2_CTRL_TYPE_BOOLEAN => ControlType::Boolean,
            V4L2_CTRL_TYPE_MENU => ControlType::Menu,
            other => ControlType::Unknown(other),
        }
    }
}

impl ControlInfo {
    pub fn is_disabled(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_DISABLED != 0
    }

    /// Usable integer control with a real range
    pub fn is_usable_range(&self) -> bool {
        self.ctrl_type == ControlType::Integer
            && !self.is_disabled()
            && self.maximum > self.minimum
    }

    /// Snap a value onto the control's step grid and range
    pub fn snap(&self, value: i32) -> i32 {
        let step = self.step.max(1);
        let offset = (value.clamp(self.minimum, self.maximum) - self.minimum) / step * step;
        self.minimum + offset
    }
}

fn extract_name(bytes: &[u8; 32]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(32);
    String::from_utf8_lossy(&bytes[..len]).to_string()
}

/// Query if a control exists and get its information
pub fn query_control(device_path: &str, control_id: u32) -> Option<ControlInfo> {
    let file = File::open(device_path).ok()?;
    let mut qctrl = V4l2Queryctrl {
        id: control_id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    let result = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            VIDIOC_QUERYCTRL,
            &mut qctrl as *mut V4l2Queryctrl,
        )
    };
    if result < 0 {
        return None;
    }

    Some(ControlInfo {
        id: qctrl.id,
        name: extract_name(&qctrl.name),
        ctrl_type: qctrl.ctrl_type.into(),
        minimum: qctrl.minimum,
        maximum: qctrl.maximum,
        step: qctrl.step,
        default_value: qctrl.default_value,
        flags: qctrl.flags,
    })
}

/// Set value of a control on an already open device
pub fn set_control_fd(file: &File, control_id: u32, value: i32) -> BackendResult<i32> {
    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };

    let result =
        unsafe { libc::ioctl(file.as_raw_fd(), VIDIOC_S_CTRL, &mut ctrl as *mut V4l2Control) };
    if result < 0 {
        let errno = std::io::Error::last_os_error();
        warn!(control_id, value, ?errno, "Failed to set V4L2 control");
        return Err(BackendError::Control(errno.to_string()));
    }

    if ctrl.value != value {
        debug!(
            control_id,
            requested = value,
            actual = ctrl.value,
            "V4L2 control value was clamped"
        );
    }
    Ok(ctrl.value)
}

/// Zoom control of a device, if it has a usable one
pub fn zoom_control(device_path: &str) -> Option<ControlInfo> {
    query_control(device_path, V4L2_CID_ZOOM_ABSOLUTE).filter(ControlInfo::is_usable_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoom(min: i32, max: i32, step: i32) -> ControlInfo {
        ControlInfo {
            id: V4L2_CID_ZOOM_ABSOLUTE,
            name: "Zoom, Absolute".into(),
            ctrl_type: ControlType::Integer,
            minimum: min,
            maximum: max,
            step,
            default_value: min,
            flags: 0,
        }
    }

    #[test]
    fn zoom_control_id_matches_kernel_header() {
        assert_eq!(V4L2_CID_ZOOM_ABSOLUTE, 0x009a090d);
    }

    #[test]
    fn snap_respects_step_and_range() {
        let info = zoom(100, 500, 10);
        assert_eq!(info.snap(257), 250);
        assert_eq!(info.snap(9999), 500);
        assert_eq!(info.snap(-3), 100);
    }

    #[test]
    fn disabled_or_flat_controls_are_unusable() {
        assert!(zoom(100, 500, 1).is_usable_range());
        assert!(!zoom(100, 100, 1).is_usable_range());
        let mut disabled = zoom(0, 10, 1);
        disabled.flags = V4L2_CTRL_FLAG_DISABLED;
        assert!(!disabled.is_usable_range());
    }

    #[test]
    fn missing_device_has_no_zoom() {
        assert!(zoom_control("/dev/snapcam-does-not-exist").is_none());
    }
}
