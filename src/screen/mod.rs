// SPDX-License-Identifier: GPL-3.0-only

//! Screen logic shared by every front end
//!
//! Nothing in here draws or touches hardware. The GUI and the terminal mode
//! both drive the same [`CameraScreen`] and [`Navigator`], executing the
//! [`Effect`]s they return.
//!
//! - [`navigator`]: Home and Camera routes with focus events
//! - [`permission`]: camera/microphone gate, one request per kind
//! - [`state`]: the camera screen state machine
//! - [`gesture`]: shutter tap/long-press and two-finger pinch recognition
//! - [`zoom`]: pinch-to-zoom mapping and the gesture thread
//! - [`scanner`]: QR and EAN-13 decoding of preview frames

pub mod gesture;
pub mod navigator;
pub mod permission;
pub mod scanner;
pub mod state;
pub mod zoom;

pub use navigator::{NavEvent, Navigator, Route};
pub use permission::{PermissionGate, PermissionKind};
pub use scanner::{CodeScanner, ScannedCode, Symbology};
pub use state::{
    CameraScreen, CapturePhase, CaptureResult, Effect, MountId, Notice, ScreenMode,
    ScreenSettings, Surface,
};
pub use zoom::{GestureContext, GestureHandle, GestureReport, SharedZoom, ZoomRange};
