// SPDX-License-Identifier: GPL-3.0-only

//! Navigation handlers
//!
//! Turns navigator lifecycle events into camera screen mount, focus, blur
//! and unmount.

use crate::app::state::{AppModel, CameraRuntime, GestureLink, Message};
use crate::fl;
use crate::screen::zoom::GestureContext;
use crate::screen::{CameraScreen, NavEvent, Route, ScreenSettings};
use cosmic::Task;
use cosmic::app::ApplicationExt;
use std::sync::Arc;
use tracing::{debug, error, info};

impl AppModel {
    pub(crate) fn handle_navigate(&mut self, route: Route) -> Task<cosmic::Action<Message>> {
        let events = self.navigator.navigate(route);
        self.apply_nav_events(events)
    }

    pub(crate) fn handle_back(&mut self) -> Task<cosmic::Action<Message>> {
        // Escape leaves review before it leaves the screen
        if let Some(screen) = &self.camera
            && screen.review_path().is_some()
        {
            return self.handle_exit_review();
        }
        let events = self.navigator.back();
        self.apply_nav_events(events)
    }

    pub(crate) fn handle_window_focus(&mut self, focused: bool) -> Task<cosmic::Action<Message>> {
        let event = self.navigator.window_focus(focused);
        self.apply_nav_events(vec![event])
    }

    pub(crate) fn apply_nav_events(&mut self, events: Vec<NavEvent>) -> Task<cosmic::Action<Message>> {
        let mut tasks = Vec::new();
        for event in events {
            debug!(?event, "Navigation event");
            match event {
                NavEvent::Mount(Route::CameraScreen) => tasks.push(self.mount_camera()),
                NavEvent::Focus(Route::CameraScreen) => {
                    if let Some(screen) = &mut self.camera {
                        screen.on_focus();
                    }
                }
                NavEvent::Blur(Route::CameraScreen) => {
                    self.runtime.shutter_press = None;
                    if let Some(screen) = &mut self.camera {
                        let effects = screen.on_blur();
                        tasks.push(self.run_effects(effects));
                    }
                }
                NavEvent::Unmount(Route::CameraScreen) => self.unmount_camera(),
                NavEvent::Mount(Route::Home)
                | NavEvent::Focus(Route::Home)
                | NavEvent::Blur(Route::Home)
                | NavEvent::Unmount(Route::Home) => {}
            }
            if let NavEvent::Focus(route) = event {
                tasks.push(self.update_title(route));
            }
        }
        Task::batch(tasks)
    }

    fn update_title(&mut self, route: Route) -> Task<cosmic::Action<Message>> {
        let title = match route {
            Route::Home => fl!("home-title"),
            Route::CameraScreen => fl!("camera-title"),
        };
        self.set_header_title(title.clone());
        match self.core.main_window_id() {
            Some(id) => self.set_window_title(title, id),
            None => Task::none(),
        }
    }

    fn mount_camera(&mut self) -> Task<cosmic::Action<Message>> {
        let settings = ScreenSettings::from(&self.config);
        let (screen, effects) = CameraScreen::mount(settings);
        info!(facing = %screen.facing(), "Camera screen mounted");

        match GestureContext::spawn(screen.zoom_range()) {
            Ok((handle, reports)) => {
                self.gesture_generation += 1;
                self.gesture = Some(GestureLink {
                    handle,
                    reports: Arc::new(tokio::sync::Mutex::new(Some(reports))),
                    generation: self.gesture_generation,
                });
            }
            Err(e) => error!(error = %e, "Failed to start gesture thread"),
        }

        self.runtime = CameraRuntime::default();
        self.camera = Some(screen);
        self.run_effects(effects)
    }

    fn unmount_camera(&mut self) {
        if let Some(recording) = self.runtime.recording.take() {
            // The outcome task still resolves; the screen is gone by then
            recording.stop();
        }
        self.torch.release();
        self.runtime = CameraRuntime::default();
        self.camera = None;
        self.gesture = None;
        info!("Camera screen unmounted");
    }
}
