// SPDX-License-Identifier: GPL-3.0-only

//! Camera screen handlers
//!
//! Executes [`Effect`]s and feeds permission, device, frame and zoom
//! results back into the screen.

use crate::app::state::{AppModel, Message};
use crate::backends::camera::{self, CameraDevice, CameraFrame};
use crate::backends::permissions;
use crate::screen::permission::PermissionKind;
use crate::screen::zoom::{FingerEvent, GestureCommand};
use crate::screen::{CameraScreen, Effect, MountId, ScannedCode, ScreenMode};
use cosmic::Task;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

impl AppModel {
    /// The camera screen, if it is still the mount `mount` refers to
    pub(crate) fn screen_for(&mut self, mount: MountId) -> Option<&mut CameraScreen> {
        match &mut self.camera {
            Some(screen) if screen.owns(mount) => Some(screen),
            _ => {
                debug!(%mount, "Dropping result for an unmounted camera screen");
                None
            }
        }
    }

    /// Turn screen effects into tasks
    pub(crate) fn run_effects(&mut self, effects: Vec<Effect>) -> Task<cosmic::Action<Message>> {
        let Some(mount) = self.camera.as_ref().map(CameraScreen::mount_id) else {
            return Task::none();
        };
        let tasks: Vec<_> = effects
            .into_iter()
            .map(|effect| self.run_effect(mount, effect))
            .collect();
        Task::batch(tasks)
    }

    fn run_effect(&mut self, mount: MountId, effect: Effect) -> Task<cosmic::Action<Message>> {
        debug!(?effect, %mount, "Running effect");
        match effect {
            Effect::CheckPermissions => {
                Task::perform(permissions::check_all(), move |(camera, mic)| {
                    cosmic::Action::App(Message::PermissionsChecked(mount, camera, mic))
                })
            }
            Effect::RequestPermission(kind) => {
                Task::perform(permissions::request(kind), move |granted| {
                    cosmic::Action::App(Message::PermissionResolved(mount, kind, granted))
                })
            }
            Effect::EnumerateDevices => Task::perform(
                async {
                    tokio::task::spawn_blocking(|| camera::get_backend().enumerate_cameras())
                        .await
                        .unwrap_or_default()
                },
                move |devices| cosmic::Action::App(Message::DevicesEnumerated(mount, devices)),
            ),
            Effect::TakePhoto { flash } => self.begin_photo(mount, flash),
            Effect::StartRecording { flash, audio } => self.begin_recording(mount, flash, audio),
            Effect::StopRecording => {
                if let Some(recording) = &self.runtime.recording {
                    recording.stop();
                }
                Task::none()
            }
            Effect::Upload { path } => Task::perform(
                crate::upload::upload_async(path, self.upload_sink.clone()),
                move |result| cosmic::Action::App(Message::UploadFinished(mount, result)),
            ),
            Effect::ApplyZoomRange(range) => {
                if let Some(link) = &self.gesture {
                    link.handle.send(GestureCommand::SetRange(range));
                }
                Task::none()
            }
        }
    }

    pub(crate) fn handle_permissions_checked(
        &mut self,
        mount: MountId,
        camera: bool,
        microphone: bool,
    ) -> Task<cosmic::Action<Message>> {
        let Some(screen) = self.screen_for(mount) else {
            return Task::none();
        };
        let effects = screen.on_permissions_checked(camera, microphone);
        self.run_effects(effects)
    }

    pub(crate) fn handle_permission_resolved(
        &mut self,
        mount: MountId,
        kind: PermissionKind,
        granted: bool,
    ) -> Task<cosmic::Action<Message>> {
        if let Some(screen) = self.screen_for(mount) {
            screen.on_permission_resolved(kind, granted);
        }
        Task::none()
    }

    pub(crate) fn handle_devices(
        &mut self,
        mount: MountId,
        devices: Vec<CameraDevice>,
    ) -> Task<cosmic::Action<Message>> {
        let Some(screen) = self.screen_for(mount) else {
            return Task::none();
        };
        let effects = screen.on_devices(devices);
        self.run_effects(effects)
    }

    pub(crate) fn handle_camera_frame(
        &mut self,
        frame: Arc<CameraFrame>,
    ) -> Task<cosmic::Action<Message>> {
        let Some(screen) = &self.camera else {
            return Task::none();
        };
        if !screen.preview_active() {
            return Task::none();
        }
        self.runtime.last_preview_error = None;
        if let Some(recording) = &self.runtime.recording {
            recording.push_frame(frame.clone());
        }
        self.runtime.current_frame = Some(frame.clone());

        if screen.mode() == ScreenMode::QrScan {
            let mount = screen.mount_id();
            return self.maybe_scan(mount, frame);
        }
        Task::none()
    }

    fn maybe_scan(
        &mut self,
        mount: MountId,
        frame: Arc<CameraFrame>,
    ) -> Task<cosmic::Action<Message>> {
        let interval = Duration::from_millis(self.config.scan_interval_ms);
        let due = self
            .runtime
            .last_scan
            .is_none_or(|last| last.elapsed() >= interval);
        if self.runtime.scan_in_flight || !due {
            return Task::none();
        }
        self.runtime.scan_in_flight = true;
        self.runtime.last_scan = Some(Instant::now());
        let scanner = self.scanner.clone();
        Task::perform(
            async move { scanner.scan_async(frame).await },
            move |codes| cosmic::Action::App(Message::CodesScanned(mount, codes)),
        )
    }

    pub(crate) fn handle_codes_scanned(
        &mut self,
        mount: MountId,
        codes: Vec<ScannedCode>,
    ) -> Task<cosmic::Action<Message>> {
        let Some(screen) = self.screen_for(mount) else {
            return Task::none();
        };
        screen.on_codes_scanned(&codes);
        self.runtime.scan_in_flight = false;
        Task::none()
    }

    pub(crate) fn handle_preview_failed(&mut self, error: String) -> Task<cosmic::Action<Message>> {
        warn!(%error, "Preview unavailable");
        self.runtime.current_frame = None;
        self.runtime.last_preview_error = Some(error);
        Task::none()
    }

    pub(crate) fn handle_toggle_facing(&mut self) -> Task<cosmic::Action<Message>> {
        let Some(screen) = &mut self.camera else {
            return Task::none();
        };
        let effects = screen.toggle_facing();
        if !effects.is_empty() {
            // The old device's last frame must not be captured
            self.runtime.current_frame = None;
        }
        self.run_effects(effects)
    }

    pub(crate) fn handle_toggle_mode(&mut self) -> Task<cosmic::Action<Message>> {
        if let Some(screen) = &mut self.camera {
            screen.toggle_mode();
        }
        Task::none()
    }

    pub(crate) fn handle_finger(&mut self, event: FingerEvent) -> Task<cosmic::Action<Message>> {
        let lifting = matches!(event, FingerEvent::Up { .. });
        if let Some(link) = &self.gesture
            && (lifting || self.camera.as_ref().is_some_and(|s| s.preview_active()))
        {
            link.handle.send(GestureCommand::Finger(event));
        }
        Task::none()
    }

    pub(crate) fn handle_zoom_step(&mut self, scale: f32) -> Task<cosmic::Action<Message>> {
        if let Some(link) = &self.gesture
            && self.camera.as_ref().is_some_and(|s| s.preview_active())
        {
            link.handle.step(scale);
        }
        Task::none()
    }
}
