// SPDX-License-Identifier: GPL-3.0-only

//! Main application view
//!
//! Home is a title and one button. The camera screen shows exactly one
//! surface: a status message, the live preview with its controls, or the
//! review of the last capture.

use crate::app::controls::capture_button::color;
use crate::app::state::{AppModel, Message};
use crate::backends::camera::types::CameraFrame;
use crate::constants::style::{self, CONTROLS, HOME, NOTICE, STATUS};
use crate::constants::zoom::SCROLL_STEP_SCALE;
use crate::fl;
use crate::screen::{CameraScreen, Notice, PermissionKind, Route, ScreenMode, Surface};
use cosmic::Element;
use cosmic::iced::mouse::ScrollDelta;
use cosmic::iced::{Alignment, Background, Border, Color, ContentFit, Length};
use cosmic::widget::{self, icon};
use std::path::Path;

/// Solid or translucent panel behind overlay controls
fn panel<'a>(
    content: impl Into<Element<'a, Message>>,
    look: style::OverlayStyle,
) -> Element<'a, Message> {
    widget::container(content)
        .padding(look.padding)
        .style(move |_theme| widget::container::Style {
            background: Some(Background::Color(color(look.background, look.background_alpha))),
            text_color: Some(Color::WHITE),
            border: Border {
                radius: look.radius.into(),
                ..Default::default()
            },
            ..Default::default()
        })
        .into()
}

fn overlay_icon(name: &'static str, on_press: Option<Message>) -> Element<'static, Message> {
    widget::button::icon(icon::from_name(name).size(CONTROLS.icon_size))
        .on_press_maybe(on_press)
        .into()
}

fn frame_image(frame: &CameraFrame) -> Element<'static, Message> {
    let handle = widget::image::Handle::from_rgba(frame.width, frame.height, frame.packed_rgba());
    widget::image(handle)
        .content_fit(ContentFit::Cover)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Full-screen message on black
fn status_view<'a>(message: String) -> Element<'a, Message> {
    let [r, g, b] = STATUS.text.color.to_floats();
    widget::container(widget::text(message).size(STATUS.text.size))
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .style(move |_theme| widget::container::Style {
            background: Some(Background::Color(Color::BLACK)),
            text_color: Some(Color::from_rgb(r, g, b)),
            ..Default::default()
        })
        .into()
}

fn scroll_scale(delta: ScrollDelta) -> f32 {
    let y = match delta {
        ScrollDelta::Lines { y, .. } | ScrollDelta::Pixels { y, .. } => y,
    };
    if y > 0.0 {
        SCROLL_STEP_SCALE
    } else {
        1.0 / SCROLL_STEP_SCALE
    }
}

impl AppModel {
    pub fn view(&self) -> Element<'_, Message> {
        match (self.navigator.current(), &self.camera) {
            (Route::CameraScreen, Some(screen)) => self.camera_view(screen),
            _ => self.home_view(),
        }
    }

    fn home_view(&self) -> Element<'_, Message> {
        let title = widget::text(fl!("home-title")).size(HOME.title.size);
        let [r, g, b] = HOME.title.color.to_floats();
        let [br, bg, bb] = HOME.background.to_floats();

        let content = widget::column()
            .push(title)
            .push(
                widget::button::suggested(fl!("go-to-camera"))
                    .on_press(Message::Navigate(Route::CameraScreen)),
            )
            .spacing(HOME.title_spacing)
            .align_x(Alignment::Center);

        widget::container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .style(move |_theme| widget::container::Style {
                background: Some(Background::Color(Color::from_rgb(br, bg, bb))),
                text_color: Some(Color::from_rgb(r, g, b)),
                ..Default::default()
            })
            .into()
    }

    fn camera_view<'a>(&'a self, screen: &'a CameraScreen) -> Element<'a, Message> {
        let surface = match screen.surface() {
            Surface::Loading => status_view(fl!("loading-camera")),
            Surface::PermissionDenied(PermissionKind::Camera) => {
                status_view(fl!("camera-permission-denied"))
            }
            Surface::PermissionDenied(PermissionKind::Microphone) => {
                status_view(fl!("microphone-permission-denied"))
            }
            Surface::DeviceUnavailable(_) => status_view(fl!("no-camera")),
            Surface::Live(mode) => self.live_view(screen, mode),
            Surface::PhotoReview(path) => self.photo_review(screen, &path),
            Surface::VideoReview(_) => self.video_review(),
        };

        let mut layers = cosmic::iced::widget::Stack::new()
            .width(Length::Fill)
            .height(Length::Fill)
            .push(surface);

        if self.runtime.screen_flash {
            layers = layers.push(
                widget::container(widget::Space::new(Length::Fill, Length::Fill))
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .style(|_theme| widget::container::Style {
                        background: Some(Background::Color(Color::WHITE)),
                        ..Default::default()
                    }),
            );
        }

        if let Some(notice) = screen.notice() {
            layers = layers.push(self.notice_banner(notice));
        }

        layers.into()
    }

    fn notice_banner(&self, notice: &Notice) -> Element<'_, Message> {
        let text = match notice {
            Notice::CaptureFailed(reason) => format!("{} ({reason})", fl!("capture-failed")),
            Notice::UploadFailed(reason) => format!("{} ({reason})", fl!("upload-failed")),
            Notice::Uploaded => fl!("uploaded"),
        };
        let banner = panel(
            widget::row()
                .push(widget::text(text).size(NOTICE.icon_size))
                .push(overlay_icon("window-close-symbolic", Some(Message::DismissNotice)))
                .spacing(8)
                .align_y(Alignment::Center),
            NOTICE,
        );
        widget::container(banner)
            .width(Length::Fill)
            .center_x(Length::Fill)
            .padding(16)
            .into()
    }

    fn preview(&self) -> Element<'_, Message> {
        let content = match (&self.runtime.current_frame, &self.runtime.last_preview_error) {
            (Some(frame), _) => frame_image(frame),
            (None, Some(error)) => status_view(format!("{}: {error}", fl!("preview-failed"))),
            (None, None) => status_view(fl!("starting-camera")),
        };
        widget::mouse_area(content)
            .on_scroll(|delta| Message::ZoomStep(scroll_scale(delta)))
            .into()
    }

    fn live_view<'a>(&'a self, screen: &'a CameraScreen, mode: ScreenMode) -> Element<'a, Message> {
        let locked = screen.controls_locked();
        let zoom = self.gesture.as_ref().map_or(1.0, |g| g.handle.zoom());

        let mode_icon = match mode {
            ScreenMode::Camera => "view-grid-symbolic",
            ScreenMode::QrScan => "camera-photo-symbolic",
        };
        let mut top = widget::row()
            .push(overlay_icon(mode_icon, (!locked).then_some(Message::ToggleMode)))
            .push(widget::Space::new(Length::Fill, Length::Shrink))
            .align_y(Alignment::Center);
        if screen.is_recording() {
            top = top.push(panel(
                widget::text(fl!("recording")).size(STATUS.text.size),
                NOTICE,
            ));
        }
        top = top.push(panel(
            widget::text(format!("{zoom:.1}x")).size(STATUS.text.size),
            NOTICE,
        ));
        if mode == ScreenMode::Camera {
            top = top.push(overlay_icon(
                screen.flash().icon_name(),
                Some(Message::ToggleFlash),
            ));
        }

        let bottom: Element<'_, Message> = match mode {
            ScreenMode::Camera => widget::row()
                .push(widget::Space::new(Length::Fill, Length::Shrink))
                .push(self.build_capture_button(screen.preview_active()))
                .push(
                    widget::container(overlay_icon(
                        "camera-switch-symbolic",
                        (!screen.is_recording()).then_some(Message::ToggleFacing),
                    ))
                    .width(Length::Fill)
                    .center_x(Length::Fill),
                )
                .align_y(Alignment::Center)
                .into(),
            ScreenMode::QrScan => widget::container(panel(
                widget::text(fl!("scan-hint")).size(STATUS.text.size),
                CONTROLS,
            ))
            .width(Length::Fill)
            .center_x(Length::Fill)
            .into(),
        };

        let controls = widget::column()
            .push(panel(top, CONTROLS))
            .push(widget::Space::new(Length::Shrink, Length::Fill))
            .push(panel(bottom, CONTROLS))
            .padding(CONTROLS.padding)
            .width(Length::Fill)
            .height(Length::Fill);

        cosmic::iced::widget::stack![self.preview(), controls]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn review_bar<'a>(&'a self, extra: Option<Element<'a, Message>>) -> Element<'a, Message> {
        let mut bar = widget::row()
            .push(overlay_icon("go-previous-symbolic", Some(Message::ExitReview)))
            .push(widget::Space::new(Length::Fill, Length::Shrink))
            .align_y(Alignment::Center);
        if let Some(extra) = extra {
            bar = bar.push(extra);
        }
        panel(bar, CONTROLS)
    }

    fn photo_review<'a>(&'a self, screen: &'a CameraScreen, path: &Path) -> Element<'a, Message> {
        let image = widget::image(widget::image::Handle::from_path(path))
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill);

        let upload_label = if screen.is_upload_pending() {
            fl!("uploading")
        } else {
            fl!("upload")
        };
        let upload = widget::button::suggested(upload_label)
            .on_press_maybe((!screen.is_upload_pending()).then_some(Message::Upload));

        let overlay = widget::column()
            .push(self.review_bar(Some(upload.into())))
            .padding(CONTROLS.padding)
            .width(Length::Fill)
            .height(Length::Fill);

        cosmic::iced::widget::stack![
            widget::container(image)
                .width(Length::Fill)
                .height(Length::Fill)
                .style(|_theme| widget::container::Style {
                    background: Some(Background::Color(Color::BLACK)),
                    ..Default::default()
                }),
            overlay
        ]
        .into()
    }

    fn video_review(&self) -> Element<'_, Message> {
        let content = match &self.runtime.review_frame {
            Some(frame) => frame_image(frame),
            None => status_view(fl!("loading-video")),
        };
        let overlay = widget::column()
            .push(self.review_bar(None))
            .padding(CONTROLS.padding)
            .width(Length::Fill)
            .height(Length::Fill);
        cosmic::iced::widget::stack![content, overlay].into()
    }
}
