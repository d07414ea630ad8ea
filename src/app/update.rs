// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! The `update()` dispatcher routes each message to a handler in
//! `handlers`:
//!
//! - `handlers::navigation`: routes, focus, mounting the camera screen
//! - `handlers::camera`: permissions, devices, frames, zoom, scanner
//! - `handlers::capture`: shutter, flash, photo, recording, review, upload

use crate::app::state::{AppModel, Message};
use cosmic::Task;
use tracing::info;

impl AppModel {
    pub fn update(&mut self, message: Message) -> Task<cosmic::Action<Message>> {
        match message {
            // ===== Application =====
            Message::LaunchUrl(url) => {
                if let Err(e) = open::that_detached(&url) {
                    tracing::error!(%url, error = %e, "Failed to open URL");
                }
                Task::none()
            }
            Message::ToggleContextPage(page) => {
                if self.context_page == page {
                    self.core.window.show_context = !self.core.window.show_context;
                } else {
                    self.context_page = page;
                    self.core.window.show_context = true;
                }
                Task::none()
            }
            Message::UpdateConfig(config) => {
                info!("Configuration updated");
                self.config = config;
                Task::none()
            }
            Message::WindowFocus(focused) => self.handle_window_focus(focused),

            // ===== Navigation =====
            Message::Navigate(route) => self.handle_navigate(route),
            Message::Back => self.handle_back(),

            // ===== Camera screen lifecycle =====
            Message::PermissionsChecked(mount, camera, microphone) => {
                self.handle_permissions_checked(mount, camera, microphone)
            }
            Message::PermissionResolved(mount, kind, granted) => {
                self.handle_permission_resolved(mount, kind, granted)
            }
            Message::DevicesEnumerated(mount, devices) => self.handle_devices(mount, devices),
            Message::CameraFrame(frame) => self.handle_camera_frame(frame),
            Message::PreviewFailed(error) => self.handle_preview_failed(error),
            Message::ReviewFrame(frame) => {
                self.runtime.review_frame = Some(frame);
                Task::none()
            }

            // ===== Controls =====
            Message::ToggleFacing => self.handle_toggle_facing(),
            Message::ToggleFlash => self.handle_toggle_flash(),
            Message::ToggleMode => self.handle_toggle_mode(),
            Message::ShutterPressed => self.handle_shutter_pressed(),
            Message::ShutterHeld(mount, id) => self.handle_shutter_held(mount, id),
            Message::ShutterReleased => self.handle_shutter_released(),

            // ===== Zoom =====
            Message::Finger(event) => self.handle_finger(event),
            Message::ZoomStep(scale) => self.handle_zoom_step(scale),
            Message::GestureReport(report) => {
                if let Some(screen) = &self.camera {
                    screen.on_gesture_report(report);
                }
                Task::none()
            }

            // ===== Capture results =====
            Message::FlashReady(mount) => self.handle_flash_ready(mount),
            Message::ScreenFlashDone => {
                self.runtime.screen_flash = false;
                Task::none()
            }
            Message::PhotoCaptured(mount, result) => self.handle_photo_captured(mount, result),
            Message::RecordingFinished(mount, result) => {
                self.handle_recording_finished(mount, result)
            }
            Message::ExitReview => self.handle_exit_review(),
            Message::Upload => self.handle_upload(),
            Message::UploadFinished(mount, result) => self.handle_upload_finished(mount, result),
            Message::DismissNotice => {
                if let Some(screen) = &mut self.camera {
                    screen.dismiss_notice();
                }
                Task::none()
            }
            Message::NoticeExpired(mount) => {
                if let Some(screen) = self.screen_for(mount) {
                    screen.dismiss_notice();
                }
                Task::none()
            }

            // ===== Scanner =====
            Message::CodesScanned(mount, codes) => self.handle_codes_scanned(mount, codes),
        }
    }
}
