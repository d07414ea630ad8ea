// SPDX-License-Identifier: MPL-2.0

//! Desktop front end
//!
//! # Architecture
//!
//! - `state`: `AppModel`, `Message` and runtime-only camera state
//! - `update`: message dispatcher
//! - `handlers`: navigation, camera and capture handlers
//! - `view`: Home and camera screen rendering
//! - `controls`: shutter button
//!
//! The camera screen's decisions live in [`crate::screen::CameraScreen`].
//! This module executes its effects and owns everything with a lifetime:
//! the preview session (held by a subscription that only exists while the
//! preview is active), the recorder, the looping review player and the
//! gesture thread.

mod controls;
mod handlers;
mod state;
mod update;
mod view;

use crate::backends::camera::{self, types::FrameSender};
use crate::backends::playback::LoopingPlayer;
use crate::config::Config;
use crate::constants::{app_info, pipeline};
use crate::fl;
use crate::flash::{FlashUnit, Torch};
use crate::screen::zoom::FingerEvent;
use crate::screen::{CodeScanner, Navigator, Surface};
use crate::upload::OutboxSink;
use cosmic::app::context_drawer;
use cosmic::iced::{Event, Subscription, event, keyboard, touch, window};
use cosmic::widget::{self, about::About};
use cosmic::{Element, Task};
use futures::{SinkExt, StreamExt};
pub use state::{AppModel, ContextPage, Message};
use std::sync::Arc;
use tracing::{error, info};

const REPOSITORY: &str = "https://github.com/cosmic-utils/snapcam";

impl cosmic::Application for AppModel {
    type Executor = cosmic::executor::Default;

    type Flags = ();

    type Message = Message;

    const APP_ID: &'static str = app_info::APP_ID;

    fn core(&self) -> &cosmic::Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut cosmic::Core {
        &mut self.core
    }

    fn init(
        core: cosmic::Core,
        _flags: Self::Flags,
    ) -> (Self, Task<cosmic::Action<Self::Message>>) {
        let about = About::default()
            .name(fl!("app-title"))
            .icon(widget::icon::from_name("camera-photo-symbolic"))
            .version(env!("GIT_VERSION"))
            .links([(fl!("repository"), REPOSITORY)])
            .license(env!("CARGO_PKG_LICENSE"));

        let (config_handler, config) = Config::load(Self::APP_ID);

        crate::runtime::init();

        let outbox = crate::storage::outbox_directory(config.upload_dir_override());
        info!(outbox = %outbox.display(), "Upload sink ready");

        let navigator = Navigator::new();
        let start = navigator.start();

        let mut app = AppModel {
            core,
            context_page: ContextPage::default(),
            about,
            config,
            config_handler,
            navigator,
            camera: None,
            runtime: state::CameraRuntime::default(),
            gesture: None,
            gesture_generation: 0,
            torch: Torch::new(FlashUnit::detect()),
            scanner: CodeScanner::default(),
            upload_sink: Arc::new(OutboxSink::new(outbox)),
        };

        let task = app.apply_nav_events(start);
        (app, task)
    }

    fn header_start(&self) -> Vec<Element<'_, Self::Message>> {
        if self.navigator.can_go_back() {
            vec![
                widget::button::icon(widget::icon::from_name("go-previous-symbolic"))
                    .on_press(Message::Back)
                    .into(),
            ]
        } else {
            vec![]
        }
    }

    fn header_end(&self) -> Vec<Element<'_, Self::Message>> {
        vec![
            widget::button::icon(widget::icon::from_name("help-about-symbolic"))
                .on_press(Message::ToggleContextPage(ContextPage::About))
                .into(),
        ]
    }

    fn context_drawer(&self) -> Option<context_drawer::ContextDrawer<'_, Self::Message>> {
        if !self.core.window.show_context {
            return None;
        }

        Some(match self.context_page {
            ContextPage::About => context_drawer::about(
                &self.about,
                |url| Message::LaunchUrl(url.to_string()),
                Message::ToggleContextPage(ContextPage::About),
            ),
        })
    }

    fn view(&self) -> Element<'_, Self::Message> {
        self.view()
    }

    fn subscription(&self) -> Subscription<Self::Message> {
        let config_sub = self
            .core()
            .watch_config::<Config>(Self::APP_ID)
            .map(|update| Message::UpdateConfig(update.config));

        let events_sub = event::listen_with(|event, status, _window| match event {
            Event::Touch(touch) => finger_event(touch).map(Message::Finger),
            Event::Window(window::Event::Focused) => Some(Message::WindowFocus(true)),
            Event::Window(window::Event::Unfocused) => Some(Message::WindowFocus(false)),
            Event::Keyboard(keyboard::Event::KeyPressed {
                key: keyboard::Key::Named(keyboard::key::Named::Escape),
                ..
            }) if status == event::Status::Ignored => Some(Message::Back),
            _ => None,
        });

        let mut subscriptions = vec![config_sub, events_sub];
        subscriptions.extend(self.gesture_subscription());
        subscriptions.extend(self.preview_subscription());
        subscriptions.extend(self.playback_subscription());
        Subscription::batch(subscriptions)
    }

    fn update(&mut self, message: Self::Message) -> Task<cosmic::Action<Self::Message>> {
        self.update(message)
    }
}

fn finger_event(event: touch::Event) -> Option<FingerEvent> {
    Some(match event {
        touch::Event::FingerPressed { id, position } => FingerEvent::Down {
            id: id.0,
            x: position.x,
            y: position.y,
        },
        touch::Event::FingerMoved { id, position } => FingerEvent::Moved {
            id: id.0,
            x: position.x,
            y: position.y,
        },
        touch::Event::FingerLifted { id, .. } | touch::Event::FingerLost { id, .. } => {
            FingerEvent::Up { id: id.0 }
        }
    })
}

impl AppModel {
    /// Forwards reports from the gesture thread for as long as it lives
    fn gesture_subscription(&self) -> Option<Subscription<Message>> {
        let link = self.gesture.as_ref()?;
        let reports = link.reports.clone();
        Some(Subscription::run_with_id(
            ("gesture-reports", link.generation),
            cosmic::iced::stream::channel(16, move |mut output| async move {
                let Some(mut receiver) = reports.lock().await.take() else {
                    return;
                };
                while let Some(report) = receiver.next().await {
                    if output.send(Message::GestureReport(report)).await.is_err() {
                        break;
                    }
                }
            }),
        ))
    }

    /// Holds the preview session. Exists only while the preview is active,
    /// so dropping the subscription releases the device.
    fn preview_subscription(&self) -> Option<Subscription<Message>> {
        let screen = self.camera.as_ref()?;
        if !screen.preview_active() {
            return None;
        }
        let device = screen.device()?.clone();
        let link = self.gesture.as_ref()?;
        let zoom = link.handle.shared();
        let range = screen.zoom_range();

        Some(Subscription::run_with_id(
            ("preview", device.path.clone(), link.generation),
            cosmic::iced::stream::channel(pipeline::FRAME_CHANNEL_CAPACITY, move |mut output| async move {
                let (sender, mut receiver): (FrameSender, _) =
                    futures::channel::mpsc::channel(pipeline::FRAME_CHANNEL_CAPACITY);
                let backend = camera::get_backend();
                let session = match backend.start_preview(&device, zoom, range, sender) {
                    Ok(session) => session,
                    Err(e) => {
                        error!(device = %device, error = %e, "Failed to start preview");
                        let _ = output.send(Message::PreviewFailed(e.to_string())).await;
                        return;
                    }
                };
                while let Some(frame) = receiver.next().await {
                    if output.send(Message::CameraFrame(frame)).await.is_err() {
                        break;
                    }
                }
                drop(session);
            }),
        ))
    }

    /// Loops the recorded clip while it is under review
    fn playback_subscription(&self) -> Option<Subscription<Message>> {
        let Surface::VideoReview(path) = self.camera.as_ref()?.surface() else {
            return None;
        };
        Some(Subscription::run_with_id(
            ("playback", path.clone()),
            cosmic::iced::stream::channel(pipeline::FRAME_CHANNEL_CAPACITY, move |mut output| async move {
                let (sender, mut receiver): (FrameSender, _) =
                    futures::channel::mpsc::channel(pipeline::FRAME_CHANNEL_CAPACITY);
                let player = match LoopingPlayer::start(&path, sender) {
                    Ok(player) => player,
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "Failed to play recording");
                        return;
                    }
                };
                while let Some(frame) = receiver.next().await {
                    if output.send(Message::ReviewFrame(frame)).await.is_err() {
                        break;
                    }
                }
                drop(player);
            }),
        ))
    }
}
