// SPDX-License-Identifier: GPL-3.0-only

//! Camera screen state machine
//!
//! [`CameraScreen`] owns everything the camera screen knows: permissions,
//! devices, mode, facing, flash, focus, capture result and the recording
//! flag. It never touches hardware. User actions and collaborator results
//! go in as method calls; commands come out as [`Effect`]s that a front end
//! executes, feeding the results back in later.
//!
//! Exactly one [`Surface`] is shown at a time, and the preview is only
//! powered while [`CameraScreen::preview_active`] holds.

use super::gesture::{ShutterGesture, ShutterRecognizer};
use super::permission::{GateState, PermissionGate, PermissionKind, PermissionStatus};
use super::scanner::ScannedCode;
use super::zoom::{GestureReport, ZoomRange};
use crate::backends::camera::{self, CameraDevice, DevicePreferences, Facing};
use crate::config::Config;
use crate::constants::{gesture as gesture_consts, zoom as zoom_consts};
use crate::errors::{AppError, CaptureError, RecordingError, UploadError};
use crate::flash::FlashMode;
use crate::upload::UploadReceipt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

static NEXT_MOUNT: AtomicU64 = AtomicU64::new(1);

/// Identifies one mount of the camera screen.
///
/// Front ends tag every effect's result with the id of the screen that
/// asked for it, and drop results whose screen has since been unmounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(u64);

impl MountId {
    fn next() -> Self {
        MountId(NEXT_MOUNT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which capture view is mounted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScreenMode {
    #[default]
    Camera,
    QrScan,
}

impl ScreenMode {
    pub fn toggled(self) -> Self {
        match self {
            ScreenMode::Camera => ScreenMode::QrScan,
            ScreenMode::QrScan => ScreenMode::Camera,
        }
    }
}

/// Result under review, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CaptureResult {
    #[default]
    None,
    Photo(PathBuf),
    Video(PathBuf),
}

impl CaptureResult {
    pub fn is_none(&self) -> bool {
        matches!(self, CaptureResult::None)
    }
}

/// What the screen shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    /// Permissions or devices not known yet
    Loading,
    PermissionDenied(PermissionKind),
    DeviceUnavailable(Facing),
    Live(ScreenMode),
    PhotoReview(PathBuf),
    VideoReview(PathBuf),
}

/// Capture/record controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Recording,
    ReviewingPhoto,
    ReviewingVideo,
}

/// Transient message shown over the screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CaptureFailed(String),
    UploadFailed(String),
    Uploaded,
}

/// Commands for the front end to execute
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    CheckPermissions,
    RequestPermission(PermissionKind),
    EnumerateDevices,
    TakePhoto { flash: FlashMode },
    StartRecording { flash: FlashMode, audio: bool },
    StopRecording,
    Upload { path: PathBuf },
    /// The active device changed; the gesture context must use this range
    ApplyZoomRange(ZoomRange),
}

/// Settings the screen reads at mount
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSettings {
    pub default_facing: Facing,
    pub long_press: Duration,
    pub max_digital_zoom: f32,
    pub record_audio: bool,
    pub devices: DevicePreferences,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            default_facing: Facing::Back,
            long_press: Duration::from_millis(gesture_consts::DEFAULT_LONG_PRESS_MS),
            max_digital_zoom: zoom_consts::DEFAULT_MAX_DIGITAL_ZOOM,
            record_audio: true,
            devices: DevicePreferences::default(),
        }
    }
}

impl From<&Config> for ScreenSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_facing: config.default_facing,
            long_press: Duration::from_millis(config.long_press_ms.max(1)),
            max_digital_zoom: config.max_digital_zoom,
            record_audio: config.record_audio,
            devices: DevicePreferences {
                front_path: config.front_camera.clone(),
                back_path: config.back_camera.clone(),
                prefer_ultra_wide: config.prefer_ultra_wide,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraScreen {
    mount: MountId,
    settings: ScreenSettings,
    gate: PermissionGate,
    /// `None` until enumeration finishes
    devices: Option<Vec<CameraDevice>>,
    device: Option<CameraDevice>,
    mode: ScreenMode,
    facing: Facing,
    flash: FlashMode,
    active: bool,
    capture: CaptureResult,
    recording: bool,
    photo_pending: bool,
    upload_pending: bool,
    notice: Option<Notice>,
    shutter: ShutterRecognizer,
}

impl CameraScreen {
    /// Fresh screen state plus the effects that start the permission and
    /// device checks
    pub fn mount(settings: ScreenSettings) -> (Self, Vec<Effect>) {
        let screen = Self {
            mount: MountId::next(),
            shutter: ShutterRecognizer::new(settings.long_press),
            facing: settings.default_facing,
            settings,
            gate: PermissionGate::new(),
            devices: None,
            device: None,
            mode: ScreenMode::Camera,
            flash: FlashMode::Off,
            active: false,
            capture: CaptureResult::None,
            recording: false,
            photo_pending: false,
            upload_pending: false,
            notice: None,
        };
        (screen, vec![Effect::CheckPermissions, Effect::EnumerateDevices])
    }

    // ===== Queries =====

    pub fn mount_id(&self) -> MountId {
        self.mount
    }

    /// Whether a result tagged with `mount` belongs to this screen
    pub fn owns(&self, mount: MountId) -> bool {
        self.mount == mount
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn flash(&self) -> FlashMode {
        self.flash
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_photo_pending(&self) -> bool {
        self.photo_pending
    }

    pub fn is_upload_pending(&self) -> bool {
        self.upload_pending
    }

    pub fn capture(&self) -> &CaptureResult {
        &self.capture
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn device(&self) -> Option<&CameraDevice> {
        self.device.as_ref()
    }

    pub fn devices(&self) -> &[CameraDevice] {
        self.devices.as_deref().unwrap_or_default()
    }

    pub fn permissions(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn shutter_threshold(&self) -> Duration {
        self.shutter.threshold()
    }

    /// Zoom limits of the active device
    pub fn zoom_range(&self) -> ZoomRange {
        self.device
            .as_ref()
            .map(|d| camera::zoom_range(d, self.settings.max_digital_zoom))
            .unwrap_or(ZoomRange::FALLBACK)
    }

    pub fn surface(&self) -> Surface {
        match self.gate.state() {
            GateState::Denied(kind) => return Surface::PermissionDenied(kind),
            GateState::Pending => return Surface::Loading,
            GateState::Open => {}
        }
        if self.devices.is_none() {
            return Surface::Loading;
        }
        if self.device.is_none() {
            return Surface::DeviceUnavailable(self.facing);
        }
        match &self.capture {
            CaptureResult::None => Surface::Live(self.mode),
            CaptureResult::Photo(path) => Surface::PhotoReview(path.clone()),
            CaptureResult::Video(path) => Surface::VideoReview(path.clone()),
        }
    }

    /// The error behind a blocking full-screen state, if any
    pub fn blocking_error(&self) -> Option<AppError> {
        match self.surface() {
            Surface::PermissionDenied(kind) => Some(AppError::PermissionDenied(kind)),
            Surface::DeviceUnavailable(facing) => Some(AppError::DeviceUnavailable(facing)),
            _ => None,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        match (&self.capture, self.recording) {
            (CaptureResult::Photo(_), _) => CapturePhase::ReviewingPhoto,
            (CaptureResult::Video(_), _) => CapturePhase::ReviewingVideo,
            (CaptureResult::None, true) => CapturePhase::Recording,
            (CaptureResult::None, false) => CapturePhase::Idle,
        }
    }

    /// Whether the view for `mode` should be powered
    pub fn preview_active_for(&self, mode: ScreenMode) -> bool {
        self.active && self.capture.is_none() && self.mode == mode && self.surface() == Surface::Live(mode)
    }

    /// Whether the live preview (of the current mode) should be powered
    pub fn preview_active(&self) -> bool {
        self.preview_active_for(self.mode)
    }

    /// Whether mode and facing controls accept input
    pub fn controls_locked(&self) -> bool {
        self.recording || !self.capture.is_none()
    }

    // ===== Lifecycle =====

    pub fn on_focus(&mut self) {
        debug!("Camera screen focused");
        self.active = true;
    }

    pub fn on_blur(&mut self) -> Vec<Effect> {
        debug!("Camera screen blurred");
        self.active = false;
        self.shutter.cancel();
        if self.recording {
            // The preview is about to release the device
            return vec![Effect::StopRecording];
        }
        Vec::new()
    }

    // ===== Permission gate =====

    pub fn on_permissions_checked(&mut self, camera: bool, microphone: bool) -> Vec<Effect> {
        self.gate
            .checked(camera, microphone)
            .into_iter()
            .map(Effect::RequestPermission)
            .collect()
    }

    pub fn on_permission_resolved(&mut self, kind: PermissionKind, granted: bool) {
        if self.gate.status(kind) != PermissionStatus::Requesting {
            debug!(%kind, "Ignoring answer to a request this screen did not make");
            return;
        }
        if granted {
            info!(%kind, "Permission granted");
        } else {
            warn!(%kind, "Permission denied");
        }
        self.gate.resolved(kind, granted);
    }

    // ===== Devices =====

    pub fn on_devices(&mut self, devices: Vec<CameraDevice>) -> Vec<Effect> {
        info!(count = devices.len(), "Camera devices enumerated");
        self.devices = Some(devices);
        self.reselect_device()
    }

    fn reselect_device(&mut self) -> Vec<Effect> {
        let selected = camera::select_device(self.devices(), self.facing, &self.settings.devices);
        if selected == self.device {
            return Vec::new();
        }
        match &selected {
            Some(device) => info!(device = %device, facing = %self.facing, "Selected camera"),
            None => warn!(facing = %self.facing, "Camera device not found"),
        }
        self.device = selected;
        vec![Effect::ApplyZoomRange(self.zoom_range())]
    }

    // ===== Mode & facing =====

    pub fn toggle_facing(&mut self) -> Vec<Effect> {
        if self.recording {
            debug!("Facing toggle ignored while recording");
            return Vec::new();
        }
        self.facing = self.facing.toggled();
        info!(facing = %self.facing, "Facing toggled");
        self.reselect_device()
    }

    pub fn toggle_flash(&mut self) {
        self.flash = self.flash.toggled();
        info!(flash = %self.flash, "Flash toggled");
    }

    pub fn set_mode(&mut self, mode: ScreenMode) {
        if mode == self.mode {
            return;
        }
        if self.controls_locked() {
            debug!(?mode, "Mode switch ignored while reviewing or recording");
            return;
        }
        self.shutter.cancel();
        self.mode = mode;
        info!(?mode, "Mode switched");
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.toggled());
    }

    // ===== Shutter =====

    pub fn shutter_pressed(&mut self, now: Instant) -> u64 {
        self.shutter.press(now)
    }

    /// Timer callback for press `id`
    pub fn shutter_held(&mut self, id: u64, now: Instant) -> Vec<Effect> {
        match self.shutter.poll(id, now) {
            Some(gesture) => self.shutter_gesture(gesture),
            None => Vec::new(),
        }
    }

    pub fn shutter_released(&mut self, now: Instant) -> Vec<Effect> {
        match self.shutter.release(now) {
            Some(gesture) => self.shutter_gesture(gesture),
            None => Vec::new(),
        }
    }

    pub fn shutter_cancelled(&mut self) {
        self.shutter.cancel();
    }

    fn shutter_gesture(&mut self, gesture: ShutterGesture) -> Vec<Effect> {
        match gesture {
            ShutterGesture::Tap => self.take_picture(),
            ShutterGesture::LongPress => self.start_recording(),
        }
    }

    // ===== Capture & record =====

    /// Shutter tap: stop a running recording, otherwise take a photo
    pub fn take_picture(&mut self) -> Vec<Effect> {
        if self.recording {
            info!("Shutter tapped while recording, stopping");
            return vec![Effect::StopRecording];
        }
        if !self.can_capture() {
            debug!(phase = ?self.phase(), mode = ?self.mode, "Photo request ignored");
            return Vec::new();
        }
        self.photo_pending = true;
        self.notice = None;
        vec![Effect::TakePhoto { flash: self.flash }]
    }

    /// Sustained press: begin recording. Never starts a second one.
    pub fn start_recording(&mut self) -> Vec<Effect> {
        if self.recording {
            debug!("Already recording");
            return Vec::new();
        }
        if !self.can_capture() {
            debug!(phase = ?self.phase(), mode = ?self.mode, "Recording request ignored");
            return Vec::new();
        }
        self.recording = true;
        self.notice = None;
        let audio = self.settings.record_audio
            && self.gate.status(PermissionKind::Microphone) == PermissionStatus::Granted;
        info!(flash = %self.flash, audio, "Recording requested");
        vec![Effect::StartRecording {
            flash: self.flash,
            audio,
        }]
    }

    fn can_capture(&self) -> bool {
        self.mode == ScreenMode::Camera
            && self.capture.is_none()
            && !self.photo_pending
            && self.preview_active()
    }

    pub fn on_photo_captured(&mut self, result: Result<PathBuf, CaptureError>) {
        if !self.photo_pending {
            debug!("Ignoring photo result, no photo was requested");
            return;
        }
        self.photo_pending = false;
        match result {
            Ok(path) => {
                info!(path = %path.display(), "Photo captured");
                self.capture = CaptureResult::Photo(path);
            }
            Err(e) => {
                error!(error = %e, "Photo capture failed");
                self.notice = Some(Notice::CaptureFailed(e.to_string()));
            }
        }
    }

    /// Recording finished callback
    pub fn on_recording_finished(&mut self, path: PathBuf) {
        if !self.recording {
            debug!(path = %path.display(), "Ignoring recording result, not recording");
            return;
        }
        self.recording = false;
        info!(path = %path.display(), "Recording finished");
        self.capture = CaptureResult::Video(path);
    }

    /// Recording error callback. Logged only; the screen returns to idle.
    pub fn on_recording_failed(&mut self, err: &RecordingError) {
        if !self.recording {
            debug!(error = %err, "Ignoring recording error, not recording");
            return;
        }
        self.recording = false;
        error!(error = %err, "Recording error");
    }

    pub fn exit_review(&mut self) {
        if self.capture.is_none() {
            return;
        }
        debug!(mode = ?self.mode, "Leaving review");
        self.capture = CaptureResult::None;
        self.upload_pending = false;
        self.notice = None;
    }

    pub fn upload(&mut self) -> Vec<Effect> {
        let CaptureResult::Photo(path) = &self.capture else {
            debug!("Upload ignored, no photo under review");
            return Vec::new();
        };
        if self.upload_pending {
            return Vec::new();
        }
        self.upload_pending = true;
        self.notice = None;
        vec![Effect::Upload { path: path.clone() }]
    }

    pub fn on_upload_finished(&mut self, result: Result<UploadReceipt, UploadError>) {
        if !self.upload_pending {
            debug!("Ignoring upload result, no upload in flight");
            return;
        }
        self.upload_pending = false;
        match result {
            Ok(receipt) => {
                info!(id = %receipt.id, location = %receipt.location, "Upload finished");
                self.notice = Some(Notice::Uploaded);
            }
            Err(e) => {
                error!(error = %e, "Upload failed");
                self.notice = Some(Notice::UploadFailed(e.to_string()));
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // ===== Observers =====

    /// Scanner callback. Observation only: logs, never mutates.
    pub fn on_codes_scanned(&self, codes: &[ScannedCode]) {
        if codes.is_empty() {
            return;
        }
        info!("Scanned {} codes!", codes.len());
        info!(code = %codes[0], "First scanned code");
    }

    /// Messages from the gesture context
    pub fn on_gesture_report(&self, report: GestureReport) {
        match report {
            GestureReport::SessionEnded { zoom } => debug!(zoom, "Pinch ended"),
            GestureReport::RangeApplied { zoom, range } => {
                debug!(zoom, min = range.min, max = range.max, "Zoom range applied")
            }
        }
    }

    /// Path of the media under review
    pub fn review_path(&self) -> Option<&Path> {
        match &self.capture {
            CaptureResult::Photo(p) | CaptureResult::Video(p) => Some(p),
            CaptureResult::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{CameraPosition, ZoomControl};

    fn webcam() -> CameraDevice {
        CameraDevice {
            name: "Webcam".into(),
            path: "/dev/video0".into(),
            position: CameraPosition::External,
            zoom: ZoomControl::Digital,
        }
    }

    fn ready_screen() -> CameraScreen {
        let (mut screen, _) = CameraScreen::mount(ScreenSettings::default());
        screen.on_permissions_checked(true, true);
        screen.on_devices(vec![webcam()]);
        screen.on_focus();
        screen
    }

    #[test]
    fn mount_defaults() {
        let (screen, effects) = CameraScreen::mount(ScreenSettings::default());
        assert_eq!(screen.mode(), ScreenMode::Camera);
        assert_eq!(screen.facing(), Facing::Back);
        assert_eq!(screen.flash(), FlashMode::Off);
        assert!(screen.capture().is_none());
        assert!(!screen.is_active());
        assert_eq!(effects, vec![Effect::CheckPermissions, Effect::EnumerateDevices]);
        assert_eq!(screen.surface(), Surface::Loading);
    }

    #[test]
    fn photo_in_flight_blocks_second_photo_and_recording() {
        let mut screen = ready_screen();
        assert_eq!(screen.take_picture().len(), 1);
        assert!(screen.take_picture().is_empty());
        assert!(screen.start_recording().is_empty());
        assert!(!screen.is_recording());
    }

    #[test]
    fn failed_photo_shows_notice_and_returns_to_idle() {
        let mut screen = ready_screen();
        screen.take_picture();
        screen.on_photo_captured(Err(CaptureError::NoFrameAvailable));
        assert_eq!(screen.phase(), CapturePhase::Idle);
        assert!(matches!(screen.notice(), Some(Notice::CaptureFailed(_))));
        assert!(screen.preview_active());
    }

    #[test]
    fn blur_stops_recording() {
        let mut screen = ready_screen();
        screen.start_recording();
        assert_eq!(screen.on_blur(), vec![Effect::StopRecording]);
        assert!(!screen.preview_active());
    }

    #[test]
    fn audio_follows_microphone_permission() {
        let (mut screen, _) = CameraScreen::mount(ScreenSettings::default());
        screen.on_permissions_checked(true, false);
        screen.on_permission_resolved(PermissionKind::Microphone, true);
        screen.on_devices(vec![webcam()]);
        screen.on_focus();
        assert_eq!(
            screen.start_recording(),
            vec![Effect::StartRecording {
                flash: FlashMode::Off,
                audio: true
            }]
        );
    }

    #[test]
    fn upload_failure_is_visible() {
        let mut screen = ready_screen();
        screen.take_picture();
        screen.on_photo_captured(Ok("/tmp/a.jpg".into()));
        assert_eq!(screen.upload().len(), 1);
        assert!(screen.upload().is_empty(), "no duplicate upload while pending");
        screen.on_upload_finished(Err(UploadError::ReadFailed("gone".into())));
        assert!(matches!(screen.notice(), Some(Notice::UploadFailed(_))));
        assert_eq!(screen.phase(), CapturePhase::ReviewingPhoto);
    }
}
