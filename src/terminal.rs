// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Drives the same navigator and camera screen as the desktop app, drawing
//! the preview with Unicode half-blocks. Keys stand in for touches:
//! a key press is a tap, `r` is a long press.

use crate::backends::camera::{self, CameraFrame, FrameReceiver, PreviewSession};
use crate::backends::playback::LoopingPlayer;
use crate::backends::recorder::{self, RecordingHandle, RecordingRequest};
use crate::backends::permissions;
use crate::config::Config;
use crate::constants::{BitratePreset, app_info, file_formats, pipeline, timing, zoom};
use crate::errors::{CaptureError, RecordingError, UploadError};
use crate::flash::{FlashMode, FlashUnit, Torch};
use crate::screen::permission::PermissionKind;
use crate::screen::zoom::{GestureCommand, GestureContext, GestureHandle, GestureReport};
use crate::screen::{
    CameraScreen, CodeScanner, Effect, MountId, NavEvent, Navigator, Notice, Route,
    ScannedCode, ScreenMode, ScreenSettings, Surface,
};
use crate::storage;
use crate::upload::{self, OutboxSink, UploadReceipt, UploadSink};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::channel::mpsc::UnboundedReceiver;
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Run the terminal front end
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    crate::runtime::init();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = TerminalApp::new().and_then(|mut app| app.run(&mut terminal));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Results of background work, delivered back to the loop tagged with the
/// mount that started it
enum Completion {
    PermissionsChecked(bool, bool),
    PermissionResolved(PermissionKind, bool),
    Devices(Vec<camera::CameraDevice>),
    PhotoCaptured(Result<PathBuf, CaptureError>),
    RecordingFinished(Result<PathBuf, RecordingError>),
    UploadFinished(Result<UploadReceipt, UploadError>),
    CodesScanned(Vec<ScannedCode>),
}

/// Frame stream plus whatever owns the pipeline behind it
struct FrameSource<T> {
    _owner: T,
    frames: FrameReceiver,
    key: String,
}

impl<T> FrameSource<T> {
    /// Drain the channel, keeping only the newest frame
    fn latest(&mut self) -> Option<Arc<CameraFrame>> {
        let mut latest = None;
        while let Ok(Some(frame)) = self.frames.try_next() {
            latest = Some(frame);
        }
        latest
    }
}

struct TerminalApp {
    config: Config,
    navigator: Navigator,
    screen: Option<CameraScreen>,
    gesture: Option<(GestureHandle, UnboundedReceiver<GestureReport>)>,
    preview: Option<FrameSource<PreviewSession>>,
    player: Option<FrameSource<LoopingPlayer>>,
    frame: FrameWidget,
    recording: Option<RecordingHandle>,
    torch: Torch,
    scanner: CodeScanner,
    scan_in_flight: bool,
    last_scan: Option<Instant>,
    upload_sink: Arc<dyn UploadSink>,
    runtime: tokio::runtime::Runtime,
    completions: (
        mpsc::Sender<(MountId, Completion)>,
        mpsc::Receiver<(MountId, Completion)>,
    ),
    status: String,
}

impl TerminalApp {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let (_, config) = Config::load(app_info::APP_ID);
        let outbox = storage::outbox_directory(config.upload_dir_override());
        Ok(Self {
            navigator: Navigator::new(),
            screen: None,
            gesture: None,
            preview: None,
            player: None,
            frame: FrameWidget::default(),
            recording: None,
            torch: Torch::new(FlashUnit::detect()),
            scanner: CodeScanner::default(),
            scan_in_flight: false,
            last_scan: None,
            upload_sink: Arc::new(OutboxSink::new(outbox)),
            runtime: tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()?,
            completions: mpsc::channel(),
            status: String::new(),
            config,
        })
    }

    fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let start = self.navigator.start();
        self.apply_nav_events(start);

        loop {
            self.pump();

            terminal.draw(|f| {
                let area = f.area();
                let body = Rect {
                    height: area.height.saturating_sub(1),
                    ..area
                };
                let status_area = Rect {
                    y: area.height.saturating_sub(1),
                    height: 1,
                    ..area
                };
                match self.navigator.current() {
                    Route::Home => f.render_widget(HomeWidget, body),
                    Route::CameraScreen => f.render_widget(&self.frame, body),
                }
                f.render_widget(
                    StatusBar {
                        message: &self.status_line(),
                    },
                    status_area,
                );
            })?;

            if event::poll(Duration::from_millis(16))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                if key.code == KeyCode::Char('q')
                    || (key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL))
                {
                    break;
                }
                self.handle_key(key.code);
            }
        }

        // Unmounting the camera screen stops any recording
        while self.navigator.can_go_back() {
            let events = self.navigator.back();
            self.apply_nav_events(events);
        }
        Ok(())
    }

    /// Poll frames, gesture reports and background results
    fn pump(&mut self) {
        while let Ok((mount, completion)) = self.completions.1.try_recv() {
            self.complete(mount, completion);
        }

        if let Some((_, reports)) = &mut self.gesture {
            while let Ok(Some(report)) = reports.try_next() {
                if let Some(screen) = &self.screen {
                    screen.on_gesture_report(report);
                }
            }
        }

        let live = self.preview.as_mut().and_then(FrameSource::latest);
        if let Some(frame) = live {
            self.on_frame(frame);
        }
        let review = self.player.as_mut().and_then(FrameSource::latest);
        if let Some(frame) = review {
            self.frame.frame = Some(frame);
        }
    }

    fn status_line(&self) -> String {
        let Some(screen) = &self.screen else {
            return format!("{} | Enter: open camera | q: quit", self.status);
        };
        let surface = match screen.surface() {
            Surface::Loading => "Loading camera...".to_string(),
            Surface::PermissionDenied(_) | Surface::DeviceUnavailable(_) => screen
                .blocking_error()
                .map(|e| e.to_string())
                .unwrap_or_default(),
            Surface::Live(ScreenMode::Camera) => {
                let zoom = self.gesture.as_ref().map_or(1.0, |(g, _)| g.zoom());
                format!(
                    "{}{} | flash {} | {zoom:.1}x | space: photo  r: video  f: flip  l: flash  m: scan  +/-: zoom",
                    if screen.is_recording() { "REC " } else { "" },
                    screen.facing(),
                    if screen.flash().is_on() { "on" } else { "off" },
                )
            }
            Surface::Live(ScreenMode::QrScan) => "Scanning | m: camera".to_string(),
            Surface::PhotoReview(path) => {
                let upload = if screen.is_upload_pending() {
                    "uploading..."
                } else {
                    "u: upload"
                };
                format!("{} | {upload} | Esc: back", path.display())
            }
            Surface::VideoReview(path) => format!("{} | Esc: back", path.display()),
        };
        let notice = match screen.notice() {
            Some(Notice::CaptureFailed(reason)) => format!(" | capture failed: {reason}"),
            Some(Notice::UploadFailed(reason)) => format!(" | upload failed: {reason}"),
            Some(Notice::Uploaded) => " | uploaded".to_string(),
            None => String::new(),
        };
        format!("{surface}{notice}")
    }

    fn handle_key(&mut self, code: KeyCode) {
        if code == KeyCode::Esc {
            if let Some(screen) = &mut self.screen
                && screen.review_path().is_some()
            {
                screen.exit_review();
                self.frame.frame = None;
            } else {
                let events = self.navigator.back();
                self.apply_nav_events(events);
            }
            self.sync_sources();
            return;
        }
        if code == KeyCode::Enter && self.navigator.current() == Route::Home {
            let events = self.navigator.navigate(Route::CameraScreen);
            self.apply_nav_events(events);
            return;
        }

        let Some(screen) = &mut self.screen else {
            return;
        };
        let effects = match code {
            KeyCode::Char(' ') => {
                let now = Instant::now();
                screen.shutter_pressed(now);
                screen.shutter_released(now)
            }
            KeyCode::Char('r') => {
                let now = Instant::now();
                let held = now + screen.shutter_threshold();
                let id = screen.shutter_pressed(now);
                let mut effects = screen.shutter_held(id, held);
                effects.extend(screen.shutter_released(held));
                effects
            }
            KeyCode::Char('f') => {
                self.frame.frame = None;
                screen.toggle_facing()
            }
            KeyCode::Char('l') => {
                screen.toggle_flash();
                Vec::new()
            }
            KeyCode::Char('m') => {
                screen.toggle_mode();
                Vec::new()
            }
            KeyCode::Char('u') => screen.upload(),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                if let Some((gesture, _)) = &self.gesture {
                    gesture.step(zoom::KEY_STEP_SCALE);
                }
                Vec::new()
            }
            KeyCode::Char('-') => {
                if let Some((gesture, _)) = &self.gesture {
                    gesture.step(1.0 / zoom::KEY_STEP_SCALE);
                }
                Vec::new()
            }
            _ => Vec::new(),
        };
        self.run_effects(effects);
    }

    fn apply_nav_events(&mut self, events: Vec<NavEvent>) {
        for event in events {
            debug!(?event, "Navigation event");
            match event {
                NavEvent::Mount(Route::CameraScreen) => {
                    let (screen, effects) =
                        CameraScreen::mount(ScreenSettings::from(&self.config));
                    match GestureContext::spawn(screen.zoom_range()) {
                        Ok(gesture) => self.gesture = Some(gesture),
                        Err(e) => error!(error = %e, "Failed to start gesture thread"),
                    }
                    self.screen = Some(screen);
                    self.run_effects(effects);
                }
                NavEvent::Focus(Route::CameraScreen) => {
                    if let Some(screen) = &mut self.screen {
                        screen.on_focus();
                    }
                }
                NavEvent::Blur(Route::CameraScreen) => {
                    if let Some(screen) = &mut self.screen {
                        let effects = screen.on_blur();
                        self.run_effects(effects);
                    }
                }
                NavEvent::Unmount(Route::CameraScreen) => {
                    if let Some(recording) = self.recording.take() {
                        recording.stop();
                    }
                    self.torch.release();
                    self.scan_in_flight = false;
                    self.last_scan = None;
                    self.screen = None;
                    self.gesture = None;
                    self.frame.frame = None;
                }
                NavEvent::Focus(Route::Home) => self.status = "Home".to_string(),
                NavEvent::Mount(Route::Home)
                | NavEvent::Blur(Route::Home)
                | NavEvent::Unmount(Route::Home) => {}
            }
        }
        self.sync_sources();
    }

    /// Start or stop the preview and review player to match the screen
    fn sync_sources(&mut self) {
        let wanted_preview = self
            .screen
            .as_ref()
            .filter(|s| s.preview_active())
            .and_then(|s| s.device().cloned());
        let wanted_clip = match self.screen.as_ref().map(CameraScreen::surface) {
            Some(Surface::VideoReview(path)) => Some(path),
            _ => None,
        };

        match wanted_preview {
            Some(device) if self.preview.as_ref().is_none_or(|p| p.key != device.path) => {
                // Release the old device before opening the next one
                self.preview = None;
                let (Some(screen), Some((gesture, _))) = (&self.screen, &self.gesture) else {
                    return;
                };
                let (sender, frames) =
                    futures::channel::mpsc::channel(pipeline::FRAME_CHANNEL_CAPACITY);
                match camera::get_backend().start_preview(
                    &device,
                    gesture.shared(),
                    screen.zoom_range(),
                    sender,
                ) {
                    Ok(session) => {
                        self.preview = Some(FrameSource {
                            _owner: session,
                            frames,
                            key: device.path.clone(),
                        });
                    }
                    Err(e) => {
                        error!(device = %device, error = %e, "Failed to start preview");
                        self.status = format!("Preview failed: {e}");
                    }
                }
            }
            Some(_) => {}
            None => self.preview = None,
        }

        match wanted_clip {
            Some(path) => {
                let key = path.to_string_lossy().to_string();
                if self.player.as_ref().is_none_or(|p| p.key != key) {
                    let (sender, frames) =
                        futures::channel::mpsc::channel(pipeline::FRAME_CHANNEL_CAPACITY);
                    match LoopingPlayer::start(&path, sender) {
                        Ok(player) => {
                            self.player = Some(FrameSource {
                                _owner: player,
                                frames,
                                key,
                            })
                        }
                        Err(e) => error!(path = %path.display(), error = %e, "Failed to play recording"),
                    }
                }
            }
            None => self.player = None,
        }
    }

    fn on_frame(&mut self, frame: Arc<CameraFrame>) {
        let Some(screen) = &self.screen else {
            return;
        };
        if let Some(recording) = &self.recording {
            recording.push_frame(frame.clone());
        }
        self.frame.frame = Some(frame.clone());

        if screen.mode() != ScreenMode::QrScan || self.scan_in_flight {
            return;
        }
        let interval = Duration::from_millis(self.config.scan_interval_ms);
        if self.last_scan.is_some_and(|at| at.elapsed() < interval) {
            return;
        }
        self.scan_in_flight = true;
        self.last_scan = Some(Instant::now());
        let scanner = self.scanner.clone();
        let mount = screen.mount_id();
        self.spawn(mount, async move {
            Completion::CodesScanned(scanner.scan_async(frame).await)
        });
    }

    fn spawn(&self, mount: MountId, work: impl Future<Output = Completion> + Send + 'static) {
        let tx = self.completions.0.clone();
        self.runtime.spawn(async move {
            let _ = tx.send((mount, work.await));
        });
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        let Some(mount) = self.screen.as_ref().map(CameraScreen::mount_id) else {
            return;
        };
        for effect in effects {
            debug!(?effect, %mount, "Running effect");
            match effect {
                Effect::CheckPermissions => self.spawn(mount, async {
                    let (camera, microphone) = permissions::check_all().await;
                    Completion::PermissionsChecked(camera, microphone)
                }),
                Effect::RequestPermission(kind) => self.spawn(mount, async move {
                    Completion::PermissionResolved(kind, permissions::request(kind).await)
                }),
                Effect::EnumerateDevices => self.spawn(mount, async {
                    let devices =
                        tokio::task::spawn_blocking(|| camera::get_backend().enumerate_cameras())
                            .await
                            .unwrap_or_default();
                    Completion::Devices(devices)
                }),
                Effect::TakePhoto { flash } => {
                    let led = self.torch.light_for(flash);
                    let frame = self.frame.frame.clone();
                    let dir = storage::photo_directory(self.config.save_dir_override());
                    self.spawn(mount, async move {
                        if led {
                            tokio::time::sleep(timing::FLASH_LEAD).await;
                        }
                        Completion::PhotoCaptured(storage::save_photo_async(frame, dir).await)
                    });
                }
                Effect::StartRecording { flash, audio } => self.begin_recording(mount, flash, audio),
                Effect::StopRecording => {
                    if let Some(recording) = &self.recording {
                        recording.stop();
                    }
                }
                Effect::Upload { path } => {
                    let sink = self.upload_sink.clone();
                    self.spawn(mount, async move {
                        Completion::UploadFinished(upload::upload_async(path, sink).await)
                    });
                }
                Effect::ApplyZoomRange(range) => {
                    if let Some((gesture, _)) = &self.gesture {
                        gesture.send(GestureCommand::SetRange(range));
                    }
                }
            }
        }
        self.sync_sources();
    }

    fn begin_recording(&mut self, mount: MountId, flash: FlashMode, audio: bool) {
        let Some(frame) = self.frame.frame.clone() else {
            warn!("No preview frame yet, cannot record");
            if let Some(screen) = &mut self.screen {
                screen.on_recording_failed(&RecordingError::StartFailed(
                    "No preview frame yet".into(),
                ));
            }
            return;
        };
        let dir = storage::video_directory(self.config.save_dir_override());
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "Cannot create video directory");
        }
        let request = RecordingRequest {
            output: storage::timestamped_path(
                &dir,
                file_formats::VIDEO_PREFIX,
                file_formats::VIDEO_EXTENSION,
            ),
            width: frame.width,
            height: frame.height,
            audio,
            bitrate_kbps: BitratePreset::default().bitrate_kbps(frame.width),
        };
        match recorder::start_recording(request) {
            Ok(mut handle) => {
                self.torch.light_for(flash);
                if let Some(outcome) = handle.take_outcome() {
                    self.spawn(mount, async move {
                        Completion::RecordingFinished(outcome.await)
                    });
                }
                self.recording = Some(handle);
            }
            Err(e) => {
                if let Some(screen) = &mut self.screen {
                    screen.on_recording_failed(&e);
                }
            }
        }
    }

    fn complete(&mut self, mount: MountId, completion: Completion) {
        // Unmounting already released that screen's recorder and torch
        if !self.screen.as_ref().is_some_and(|s| s.owns(mount)) {
            match completion {
                Completion::RecordingFinished(Ok(path)) => {
                    info!(path = %path.display(), "Recording finished after leaving the screen")
                }
                _ => debug!(%mount, "Dropping result for an unmounted camera screen"),
            }
            return;
        }

        if let Completion::RecordingFinished(_) = &completion {
            self.recording = None;
            self.torch.release();
        }
        if let Completion::PhotoCaptured(_) = &completion
            && self.recording.is_none()
        {
            self.torch.release();
        }
        if let Completion::CodesScanned(_) = &completion {
            self.scan_in_flight = false;
        }

        let Some(screen) = &mut self.screen else {
            return;
        };
        let effects = match completion {
            Completion::PermissionsChecked(camera, microphone) => {
                screen.on_permissions_checked(camera, microphone)
            }
            Completion::PermissionResolved(kind, granted) => {
                screen.on_permission_resolved(kind, granted);
                Vec::new()
            }
            Completion::Devices(devices) => screen.on_devices(devices),
            Completion::PhotoCaptured(result) => {
                screen.on_photo_captured(result);
                Vec::new()
            }
            Completion::RecordingFinished(Ok(path)) => {
                self.frame.frame = None;
                screen.on_recording_finished(path);
                Vec::new()
            }
            Completion::RecordingFinished(Err(e)) => {
                screen.on_recording_failed(&e);
                Vec::new()
            }
            Completion::UploadFinished(result) => {
                screen.on_upload_finished(result);
                Vec::new()
            }
            Completion::CodesScanned(codes) => {
                screen.on_codes_scanned(&codes);
                if let Some(first) = codes.first() {
                    self.status = format!("Scanned {first}");
                }
                Vec::new()
            }
        };
        self.run_effects(effects);
    }
}

/// Centered title on the Home route
struct HomeWidget;

impl Widget for HomeWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = "Home";
        let hint = "[ Enter: Go to Camera Screen ]";
        let style = ratatui::style::Style::default().fg(Color::White);
        for (offset, line) in [title, hint].into_iter().enumerate() {
            let x = area.x + area.width.saturating_sub(line.len() as u16) / 2;
            let y = area.y + area.height / 2 + offset as u16 * 2;
            if y < area.y + area.height {
                buf.set_string(x, y, line, style);
            }
        }
    }
}

/// Renders a frame using half-block characters
#[derive(Default)]
struct FrameWidget {
    frame: Option<Arc<CameraFrame>>,
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };
        if frame.width == 0 || frame.height == 0 || area.width == 0 || area.height == 0 {
            return;
        }

        // Each cell holds two vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            ((h * frame_aspect) as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            (w as u16, (w / frame_aspect / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;
        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let top = sample_pixel(frame, src_x, (ty as f64 * 2.0 * y_scale) as u32);
                let bottom = sample_pixel(frame, src_x, ((ty as f64 * 2.0 + 1.0) * y_scale) as u32);
                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let x = x.min(frame.width - 1);
    let y = y.min(frame.height - 1);
    let idx = (y * frame.stride + x * 4) as usize;
    match frame.data.get(idx..idx + 3) {
        Some(&[r, g, b]) => Color::Rgb(r, g, b),
        _ => Color::Black,
    }
}

struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }
        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> CameraFrame {
        CameraFrame {
            width,
            height,
            stride: width * 4,
            data: rgba.repeat((width * height) as usize).into(),
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn sample_pixel_reads_rgb() {
        let frame = solid(2, 2, [10, 20, 30, 255]);
        assert_eq!(sample_pixel(&frame, 1, 1), Color::Rgb(10, 20, 30));
        // Out of range coordinates clamp to the edge
        assert_eq!(sample_pixel(&frame, 9, 9), Color::Rgb(10, 20, 30));
    }

    #[test]
    fn frame_widget_fills_cells() {
        let widget = FrameWidget {
            frame: Some(Arc::new(solid(4, 4, [200, 0, 0, 255]))),
        };
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);
        let cell = buf.cell((1, 0)).map(|c| c.fg);
        assert_eq!(cell, Some(Color::Rgb(200, 0, 0)));
    }
}
