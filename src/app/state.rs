// SPDX-License-Identifier: GPL-3.0-only

//! Application state types

use crate::backends::camera::types::{CameraDevice, CameraFrame};
use crate::backends::recorder::RecordingHandle;
use crate::config::Config;
use crate::errors::{CaptureError, RecordingError, UploadError};
use crate::flash::Torch;
use crate::screen::permission::PermissionKind;
use crate::screen::zoom::{FingerEvent, GestureHandle, GestureReport};
use crate::screen::{CameraScreen, CodeScanner, MountId, Navigator, Route, ScannedCode};
use crate::upload::{UploadReceipt, UploadSink};
use cosmic::cosmic_config;
use cosmic::widget::about::About;
use futures::channel::mpsc::UnboundedReceiver;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Context drawer pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextPage {
    #[default]
    About,
}

/// Gesture thread plus the receiving end of its reports.
///
/// The receiver is taken once by the report subscription.
pub struct GestureLink {
    pub handle: GestureHandle,
    pub reports: Arc<tokio::sync::Mutex<Option<UnboundedReceiver<GestureReport>>>>,
    /// Distinguishes successive gesture threads in subscription ids
    pub generation: u64,
}

/// Camera screen runtime state the pure [`CameraScreen`] does not hold
#[derive(Default)]
pub struct CameraRuntime {
    pub current_frame: Option<Arc<CameraFrame>>,
    pub review_frame: Option<Arc<CameraFrame>>,
    pub recording: Option<RecordingHandle>,
    /// White overlay shown in place of a hardware flash
    pub screen_flash: bool,
    pub scan_in_flight: bool,
    pub last_scan: Option<Instant>,
    /// Press id of the shutter press in progress
    pub shutter_press: Option<u64>,
    pub last_preview_error: Option<String>,
}

pub struct AppModel {
    pub core: cosmic::Core,
    pub context_page: ContextPage,
    pub about: About,
    pub config: Config,
    pub config_handler: Option<cosmic_config::Config>,
    pub navigator: Navigator,
    /// Present while the camera route is mounted
    pub camera: Option<CameraScreen>,
    pub runtime: CameraRuntime,
    pub gesture: Option<GestureLink>,
    pub gesture_generation: u64,
    pub torch: Torch,
    pub scanner: CodeScanner,
    pub upload_sink: Arc<dyn UploadSink>,
}

#[derive(Debug, Clone)]
pub enum Message {
    // ===== Application =====
    LaunchUrl(String),
    ToggleContextPage(ContextPage),
    UpdateConfig(Config),
    WindowFocus(bool),

    // ===== Navigation =====
    Navigate(Route),
    Back,

    // ===== Camera screen lifecycle =====
    // Results of screen effects carry the mount that asked for them
    PermissionsChecked(MountId, bool, bool),
    PermissionResolved(MountId, PermissionKind, bool),
    DevicesEnumerated(MountId, Vec<CameraDevice>),
    CameraFrame(Arc<CameraFrame>),
    PreviewFailed(String),
    ReviewFrame(Arc<CameraFrame>),

    // ===== Controls =====
    ToggleFacing,
    ToggleFlash,
    ToggleMode,
    ShutterPressed,
    ShutterHeld(MountId, u64),
    ShutterReleased,

    // ===== Zoom =====
    Finger(FingerEvent),
    ZoomStep(f32),
    GestureReport(GestureReport),

    // ===== Capture results =====
    FlashReady(MountId),
    ScreenFlashDone,
    PhotoCaptured(MountId, Result<PathBuf, CaptureError>),
    RecordingFinished(MountId, Result<PathBuf, RecordingError>),
    ExitReview,
    Upload,
    UploadFinished(MountId, Result<UploadReceipt, UploadError>),
    DismissNotice,
    NoticeExpired(MountId),

    // ===== Scanner =====
    CodesScanned(MountId, Vec<ScannedCode>),
}
