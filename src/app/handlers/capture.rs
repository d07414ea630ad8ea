// SPDX-License-Identifier: GPL-3.0-only

//! Capture handlers
//!
//! Shutter gestures, flash, photo capture, recording, review and upload.

use crate::app::state::{AppModel, Message};
use crate::backends::recorder::{self, RecordingRequest};
use crate::constants::{BitratePreset, file_formats, millis, timing};
use crate::errors::{CaptureError, RecordingError, UploadError};
use crate::flash::FlashMode;
use crate::screen::MountId;
use crate::storage;
use crate::upload::UploadReceipt;
use cosmic::Task;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

impl AppModel {
    /// Create a delayed task that sends a message after `delay`
    pub(crate) fn delay_task(delay: Duration, message: Message) -> Task<cosmic::Action<Message>> {
        let millis = millis(delay);
        Task::perform(
            async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(millis)).await;
                message
            },
            cosmic::Action::App,
        )
    }

    // ===== Shutter =====

    pub(crate) fn handle_shutter_pressed(&mut self) -> Task<cosmic::Action<Message>> {
        let Some(screen) = &mut self.camera else {
            return Task::none();
        };
        let id = screen.shutter_pressed(Instant::now());
        self.runtime.shutter_press = Some(id);
        Self::delay_task(
            screen.shutter_threshold(),
            Message::ShutterHeld(screen.mount_id(), id),
        )
    }

    pub(crate) fn handle_shutter_held(
        &mut self,
        mount: MountId,
        id: u64,
    ) -> Task<cosmic::Action<Message>> {
        let Some(screen) = self.screen_for(mount) else {
            return Task::none();
        };
        let effects = screen.shutter_held(id, Instant::now());
        self.run_effects(effects)
    }

    pub(crate) fn handle_shutter_released(&mut self) -> Task<cosmic::Action<Message>> {
        let Some(screen) = &mut self.camera else {
            return Task::none();
        };
        if self.runtime.shutter_press.take().is_none() {
            return Task::none();
        }
        let effects = screen.shutter_released(Instant::now());
        self.run_effects(effects)
    }

    // ===== Flash =====

    /// Only changes the selection for the next photo or recording
    pub(crate) fn handle_toggle_flash(&mut self) -> Task<cosmic::Action<Message>> {
        if let Some(screen) = &mut self.camera {
            screen.toggle_flash();
        }
        Task::none()
    }

    // ===== Photo =====

    pub(crate) fn begin_photo(
        &mut self,
        mount: MountId,
        flash: FlashMode,
    ) -> Task<cosmic::Action<Message>> {
        if !flash.is_on() {
            return self.capture_current_frame(mount);
        }
        if self.torch.light_for(flash) {
            info!("Flash LED on before capture");
            Self::delay_task(timing::FLASH_LEAD, Message::FlashReady(mount))
        } else {
            info!("No flash LED, using screen flash");
            self.runtime.screen_flash = true;
            Self::delay_task(timing::SCREEN_FLASH, Message::FlashReady(mount))
        }
    }

    pub(crate) fn handle_flash_ready(&mut self, mount: MountId) -> Task<cosmic::Action<Message>> {
        if self.screen_for(mount).is_none() {
            return Task::none();
        }
        let capture = self.capture_current_frame(mount);
        if self.runtime.screen_flash {
            return Task::batch([
                capture,
                Self::delay_task(timing::SCREEN_FLASH, Message::ScreenFlashDone),
            ]);
        }
        capture
    }

    fn capture_current_frame(&mut self, mount: MountId) -> Task<cosmic::Action<Message>> {
        let frame = self.runtime.current_frame.clone();
        let dir = storage::photo_directory(self.config.save_dir_override());
        debug!(has_frame = frame.is_some(), dir = %dir.display(), "Capturing photo");
        Task::perform(storage::save_photo_async(frame, dir), move |result| {
            cosmic::Action::App(Message::PhotoCaptured(mount, result))
        })
    }

    pub(crate) fn handle_photo_captured(
        &mut self,
        mount: MountId,
        result: Result<PathBuf, CaptureError>,
    ) -> Task<cosmic::Action<Message>> {
        let Some(screen) = self.screen_for(mount) else {
            return Task::none();
        };
        screen.on_photo_captured(result);
        if self.runtime.recording.is_none() {
            self.torch.release();
        }
        self.notice_timeout()
    }

    // ===== Recording =====

    pub(crate) fn begin_recording(
        &mut self,
        mount: MountId,
        flash: FlashMode,
        audio: bool,
    ) -> Task<cosmic::Action<Message>> {
        let request = self.runtime.current_frame.as_ref().map(|frame| {
            let dir = storage::video_directory(self.config.save_dir_override());
            RecordingRequest {
                output: storage::timestamped_path(
                    &dir,
                    file_formats::VIDEO_PREFIX,
                    file_formats::VIDEO_EXTENSION,
                ),
                width: frame.width,
                height: frame.height,
                audio,
                bitrate_kbps: BitratePreset::default().bitrate_kbps(frame.width),
            }
        });

        let started = request
            .ok_or_else(|| RecordingError::StartFailed("No preview frame yet".into()))
            .and_then(|request| {
                if let Some(dir) = request.output.parent() {
                    std::fs::create_dir_all(dir)
                        .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
                }
                recorder::start_recording(request)
            });

        match started {
            Ok(mut handle) => {
                self.torch.light_for(flash);
                let outcome = handle.take_outcome();
                self.runtime.recording = Some(handle);
                match outcome {
                    Some(outcome) => Task::perform(outcome, move |result| {
                        cosmic::Action::App(Message::RecordingFinished(mount, result))
                    }),
                    None => Task::none(),
                }
            }
            Err(e) => {
                if let Some(screen) = &mut self.camera {
                    screen.on_recording_failed(&e);
                }
                Task::none()
            }
        }
    }

    pub(crate) fn handle_recording_finished(
        &mut self,
        mount: MountId,
        result: Result<PathBuf, RecordingError>,
    ) -> Task<cosmic::Action<Message>> {
        // Unmounting already released that screen's recorder and torch
        if self.screen_for(mount).is_none() {
            match result {
                Ok(path) => info!(path = %path.display(), "Recording finished after leaving the screen"),
                Err(e) => error!(error = %e, "Recording failed after leaving the screen"),
            }
            return Task::none();
        }
        self.runtime.recording = None;
        self.torch.release();
        let Some(screen) = self.screen_for(mount) else {
            return Task::none();
        };
        match result {
            Ok(path) => screen.on_recording_finished(path),
            Err(e) => screen.on_recording_failed(&e),
        }
        Task::none()
    }

    // ===== Review & upload =====

    pub(crate) fn handle_exit_review(&mut self) -> Task<cosmic::Action<Message>> {
        if let Some(screen) = &mut self.camera {
            screen.exit_review();
        }
        self.runtime.review_frame = None;
        // The next frame comes from the restarted preview
        self.runtime.current_frame = None;
        Task::none()
    }

    pub(crate) fn handle_upload(&mut self) -> Task<cosmic::Action<Message>> {
        let Some(screen) = &mut self.camera else {
            return Task::none();
        };
        let effects = screen.upload();
        self.run_effects(effects)
    }

    pub(crate) fn handle_upload_finished(
        &mut self,
        mount: MountId,
        result: Result<UploadReceipt, UploadError>,
    ) -> Task<cosmic::Action<Message>> {
        let Some(screen) = self.screen_for(mount) else {
            return Task::none();
        };
        screen.on_upload_finished(result);
        self.notice_timeout()
    }

    fn notice_timeout(&self) -> Task<cosmic::Action<Message>> {
        match &self.camera {
            Some(screen) if screen.notice().is_some() => Self::delay_task(
                timing::NOTICE_TIMEOUT,
                Message::NoticeExpired(screen.mount_id()),
            ),
            _ => Task::none(),
        }
    }
}
