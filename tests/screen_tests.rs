// SPDX-License-Identifier: GPL-3.0-only

//! Camera screen flows driven the way the front ends drive them

use snapcam::backends::camera::{CameraDevice, CameraPosition, Facing, ZoomControl};
use snapcam::errors::{CaptureError, RecordingError, UploadError};
use snapcam::flash::FlashMode;
use snapcam::screen::permission::PermissionStatus;
use snapcam::screen::{
    CameraScreen, CapturePhase, CaptureResult, Effect, Notice, PermissionKind, ScannedCode,
    ScreenMode, ScreenSettings, Surface, Symbology,
};
use snapcam::storage::path_from_uri;
use snapcam::upload::UploadReceipt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn device(name: &str, path: &str, position: CameraPosition) -> CameraDevice {
    CameraDevice {
        name: name.into(),
        path: path.into(),
        position,
        zoom: ZoomControl::Digital,
    }
}

fn phone_cameras() -> Vec<CameraDevice> {
    vec![
        device("Rear camera", "/dev/video0", CameraPosition::Back),
        device("Front camera", "/dev/video2", CameraPosition::Front),
    ]
}

/// Mounted, focused, permitted and with devices: the live camera preview
fn live_screen() -> CameraScreen {
    let (mut screen, effects) = CameraScreen::mount(ScreenSettings::default());
    assert_eq!(effects, vec![Effect::CheckPermissions, Effect::EnumerateDevices]);
    screen.on_focus();
    assert!(screen.on_permissions_checked(true, true).is_empty());
    screen.on_devices(phone_cameras());
    assert_eq!(screen.surface(), Surface::Live(ScreenMode::Camera));
    screen
}

fn tap(screen: &mut CameraScreen) -> Vec<Effect> {
    let now = Instant::now();
    screen.shutter_pressed(now);
    screen.shutter_released(now + Duration::from_millis(50))
}

fn long_press(screen: &mut CameraScreen) -> Vec<Effect> {
    let now = Instant::now();
    let id = screen.shutter_pressed(now);
    let held = now + screen.shutter_threshold();
    let effects = screen.shutter_held(id, held);
    // Releasing after the long press already fired does nothing
    assert!(screen.shutter_released(held + Duration::from_millis(10)).is_empty());
    effects
}

#[test]
fn photo_capture_then_review() {
    let mut screen = live_screen();

    let effects = tap(&mut screen);
    assert_eq!(effects, vec![Effect::TakePhoto { flash: FlashMode::Off }]);
    assert!(screen.is_photo_pending());

    // A second tap while the photo is in flight is ignored
    assert!(tap(&mut screen).is_empty());

    screen.on_photo_captured(Ok(path_from_uri("file:///tmp/a.jpg")));
    assert_eq!(screen.capture(), &CaptureResult::Photo(PathBuf::from("/tmp/a.jpg")));
    assert_eq!(screen.surface(), Surface::PhotoReview(PathBuf::from("/tmp/a.jpg")));
    assert_eq!(screen.phase(), CapturePhase::ReviewingPhoto);
    assert!(!screen.preview_active());
}

#[test]
fn video_recording_then_review() {
    let mut screen = live_screen();
    assert_eq!(screen.flash(), FlashMode::Off);

    let effects = long_press(&mut screen);
    assert_eq!(
        effects,
        vec![Effect::StartRecording {
            flash: FlashMode::Off,
            audio: true,
        }]
    );
    assert!(screen.is_recording());
    assert!(screen.controls_locked());

    // Tap while recording stops, and produces no photo
    assert_eq!(tap(&mut screen), vec![Effect::StopRecording]);
    assert!(!screen.is_photo_pending());

    screen.on_recording_finished(path_from_uri("file:///tmp/b.mp4"));
    assert!(!screen.is_recording());
    assert_eq!(screen.capture(), &CaptureResult::Video(PathBuf::from("/tmp/b.mp4")));
    assert_eq!(screen.surface(), Surface::VideoReview(PathBuf::from("/tmp/b.mp4")));
}

#[test]
fn second_long_press_does_not_start_another_recording() {
    let mut screen = live_screen();
    assert_eq!(long_press(&mut screen).len(), 1);
    assert!(screen.start_recording().is_empty());
}

#[test]
fn recording_uses_flash_selection() {
    let mut screen = live_screen();
    screen.toggle_flash();
    assert_eq!(
        screen.start_recording(),
        vec![Effect::StartRecording {
            flash: FlashMode::On,
            audio: true,
        }]
    );
}

#[test]
fn recording_error_returns_to_idle_without_review() {
    let mut screen = live_screen();
    screen.start_recording();
    screen.on_recording_failed(&RecordingError::Interrupted);
    assert!(!screen.is_recording());
    assert!(screen.capture().is_none());
    assert_eq!(screen.phase(), CapturePhase::Idle);
    assert_eq!(screen.notice(), None);
}

#[test]
fn qr_scan_observes_without_mutation() {
    let mut screen = live_screen();
    screen.toggle_mode();
    assert_eq!(screen.mode(), ScreenMode::QrScan);
    assert!(screen.preview_active_for(ScreenMode::QrScan));
    assert!(!screen.preview_active_for(ScreenMode::Camera));

    let before = screen.clone();
    screen.on_codes_scanned(&[ScannedCode {
        symbology: Symbology::Qr,
        value: "http://x".into(),
    }]);
    assert_eq!(screen.surface(), before.surface());
    assert_eq!(screen.capture(), before.capture());
    assert_eq!(screen.mode(), before.mode());

    // No shutter in scan mode
    assert!(tap(&mut screen).is_empty());
}

#[test]
fn facing_alternates_and_reselects_device() {
    let mut screen = live_screen();
    assert_eq!(screen.facing(), Facing::Back);
    assert_eq!(screen.device().map(|d| d.path.as_str()), Some("/dev/video0"));

    let effects = screen.toggle_facing();
    assert_eq!(screen.facing(), Facing::Front);
    assert_eq!(screen.device().map(|d| d.path.as_str()), Some("/dev/video2"));
    assert!(matches!(effects.as_slice(), [Effect::ApplyZoomRange(_)]));

    screen.toggle_facing();
    assert_eq!(screen.facing(), Facing::Back);
}

#[test]
fn facing_and_mode_are_locked_while_recording() {
    let mut screen = live_screen();
    screen.start_recording();

    assert!(screen.toggle_facing().is_empty());
    assert_eq!(screen.facing(), Facing::Back);
    screen.toggle_mode();
    assert_eq!(screen.mode(), ScreenMode::Camera);
}

#[test]
fn missing_facing_shows_unavailable() {
    let (mut screen, _) = CameraScreen::mount(ScreenSettings::default());
    screen.on_focus();
    screen.on_permissions_checked(true, true);
    screen.on_devices(vec![device("Rear camera", "/dev/video0", CameraPosition::Back)]);

    screen.toggle_facing();
    assert_eq!(screen.surface(), Surface::DeviceUnavailable(Facing::Front));
    assert!(!screen.preview_active());
}

#[test]
fn exit_review_returns_to_live() {
    let mut screen = live_screen();
    tap(&mut screen);
    screen.on_photo_captured(Ok(PathBuf::from("/tmp/a.jpg")));

    screen.exit_review();
    assert!(screen.capture().is_none());
    assert_eq!(screen.surface(), Surface::Live(ScreenMode::Camera));
    assert!(screen.preview_active());

    // Idempotent outside review
    screen.exit_review();
    assert!(screen.capture().is_none());
}

#[test]
fn failed_photo_sets_notice_and_stays_live() {
    let mut screen = live_screen();
    tap(&mut screen);
    screen.on_photo_captured(Err(CaptureError::NoFrameAvailable));

    assert!(screen.capture().is_none());
    assert!(matches!(screen.notice(), Some(Notice::CaptureFailed(_))));
    screen.dismiss_notice();
    assert_eq!(screen.notice(), None);
}

#[test]
fn upload_only_from_photo_review() {
    let mut screen = live_screen();
    assert!(screen.upload().is_empty());

    tap(&mut screen);
    screen.on_photo_captured(Ok(PathBuf::from("/tmp/a.jpg")));
    assert_eq!(
        screen.upload(),
        vec![Effect::Upload {
            path: PathBuf::from("/tmp/a.jpg")
        }]
    );
    // No duplicate while one is in flight
    assert!(screen.upload().is_empty());

    screen.on_upload_finished(Ok(UploadReceipt {
        id: "1".into(),
        location: "/outbox/1.jpg".into(),
        bytes: 3,
    }));
    assert!(!screen.is_upload_pending());
    assert_eq!(screen.notice(), Some(&Notice::Uploaded));
}

#[test]
fn upload_failure_is_reported() {
    let mut screen = live_screen();
    tap(&mut screen);
    screen.on_photo_captured(Ok(PathBuf::from("/tmp/a.jpg")));
    screen.upload();
    screen.on_upload_finished(Err(UploadError::ReadFailed("gone".into())));
    assert!(matches!(screen.notice(), Some(Notice::UploadFailed(_))));
    // Still reviewing, so a retry is possible
    assert_eq!(screen.upload().len(), 1);
}

#[test]
fn blur_stops_recording_and_preview() {
    let mut screen = live_screen();
    screen.start_recording();

    assert_eq!(screen.on_blur(), vec![Effect::StopRecording]);
    assert!(!screen.preview_active());

    screen.on_focus();
    screen.on_recording_finished(PathBuf::from("/tmp/b.mp4"));
    assert_eq!(screen.phase(), CapturePhase::ReviewingVideo);
}

#[test]
fn ungranted_permissions_are_requested_once() {
    let (mut screen, _) = CameraScreen::mount(ScreenSettings::default());
    screen.on_focus();
    screen.on_devices(phone_cameras());

    let effects = screen.on_permissions_checked(false, true);
    assert_eq!(effects, vec![Effect::RequestPermission(PermissionKind::Camera)]);
    assert_eq!(screen.surface(), Surface::Loading);

    screen.on_permission_resolved(PermissionKind::Camera, true);
    assert_eq!(screen.surface(), Surface::Live(ScreenMode::Camera));

    // A later check does not prompt again
    assert!(screen.on_permissions_checked(false, true).is_empty());
}

#[test]
fn denied_camera_blocks_the_preview() {
    let (mut screen, _) = CameraScreen::mount(ScreenSettings::default());
    screen.on_focus();
    screen.on_devices(phone_cameras());
    screen.on_permissions_checked(false, true);
    screen.on_permission_resolved(PermissionKind::Camera, false);

    assert_eq!(
        screen.surface(),
        Surface::PermissionDenied(PermissionKind::Camera)
    );
    assert!(!screen.preview_active());
    assert!(tap(&mut screen).is_empty());
}

#[test]
fn audio_follows_setting_and_microphone_grant() {
    let settings = ScreenSettings {
        record_audio: true,
        ..ScreenSettings::default()
    };
    let (mut screen, _) = CameraScreen::mount(settings);
    screen.on_focus();
    screen.on_devices(phone_cameras());
    screen.on_permissions_checked(true, true);
    assert_eq!(
        screen.permissions().status(PermissionKind::Microphone),
        PermissionStatus::Granted
    );

    let settings = ScreenSettings {
        record_audio: false,
        ..ScreenSettings::default()
    };
    let (mut quiet, _) = CameraScreen::mount(settings);
    quiet.on_focus();
    quiet.on_devices(phone_cameras());
    quiet.on_permissions_checked(true, true);
    assert_eq!(
        quiet.start_recording(),
        vec![Effect::StartRecording {
            flash: FlashMode::Off,
            audio: false,
        }]
    );
}

#[test]
fn each_mount_gets_its_own_id() {
    let first = live_screen();
    let old = first.mount_id();
    drop(first);

    let second = live_screen();
    assert_ne!(second.mount_id(), old);
    assert!(second.owns(second.mount_id()));
    assert!(!second.owns(old), "results for the old screen must be dropped");
}

#[test]
fn unrequested_photo_result_is_ignored() {
    let mut screen = live_screen();
    screen.on_photo_captured(Ok(PathBuf::from("/old/IMG_prev.jpg")));
    assert_eq!(screen.surface(), Surface::Live(ScreenMode::Camera));
    assert!(screen.capture().is_none());

    screen.on_photo_captured(Err(CaptureError::NoFrameAvailable));
    assert_eq!(screen.notice(), None);
}

#[test]
fn recording_results_ignored_when_not_recording() {
    let mut screen = live_screen();
    screen.on_recording_finished(PathBuf::from("/old/VID_prev.mp4"));
    assert!(screen.capture().is_none());
    assert_eq!(screen.phase(), CapturePhase::Idle);

    screen.on_recording_failed(&RecordingError::Interrupted);
    assert_eq!(screen.phase(), CapturePhase::Idle);

    // A real recording still completes normally afterwards
    screen.start_recording();
    screen.on_recording_finished(PathBuf::from("/tmp/b.mp4"));
    assert_eq!(screen.surface(), Surface::VideoReview(PathBuf::from("/tmp/b.mp4")));
}

#[test]
fn unrequested_upload_result_is_ignored() {
    let mut screen = live_screen();
    tap(&mut screen);
    screen.on_photo_captured(Ok(PathBuf::from("/tmp/a.jpg")));

    screen.on_upload_finished(Err(UploadError::ReadFailed("stale".into())));
    assert_eq!(screen.notice(), None);
    assert!(!screen.is_upload_pending());
}

#[test]
fn repeated_permission_check_keeps_loading_while_request_in_flight() {
    let (mut screen, _) = CameraScreen::mount(ScreenSettings::default());
    screen.on_focus();
    screen.on_devices(phone_cameras());

    let first = screen.on_permissions_checked(false, true);
    assert_eq!(first, vec![Effect::RequestPermission(PermissionKind::Camera)]);
    let second = screen.on_permissions_checked(false, true);
    assert!(second.is_empty());
    assert_eq!(screen.surface(), Surface::Loading);

    screen.on_permission_resolved(PermissionKind::Camera, true);
    assert_eq!(screen.surface(), Surface::Live(ScreenMode::Camera));
}

#[test]
fn answer_to_a_request_never_made_is_ignored() {
    let (mut screen, _) = CameraScreen::mount(ScreenSettings::default());
    screen.on_focus();
    screen.on_devices(phone_cameras());

    screen.on_permission_resolved(PermissionKind::Camera, false);
    assert_eq!(screen.surface(), Surface::Loading);

    screen.on_permissions_checked(true, true);
    assert_eq!(screen.surface(), Surface::Live(ScreenMode::Camera));
}
