// SPDX-License-Identifier: MPL-2.0

//! Shutter button
//!
//! A white ring around a filled circle. The fill turns red while recording.
//! Press and release go through a mouse area rather than a button so the
//! screen can tell a tap from a sustained press.

use crate::app::state::{AppModel, Message};
use crate::constants::style::{self, SHUTTER};
use cosmic::Element;
use cosmic::iced::{Background, Border, Color, Length};
use cosmic::widget;

pub(crate) fn color(rgb: style::Rgb, alpha: f32) -> Color {
    let [r, g, b] = rgb.to_floats();
    Color::from_rgba(r, g, b, alpha)
}

impl AppModel {
    pub fn build_capture_button(&self, enabled: bool) -> Element<'_, Message> {
        let recording = self.camera.as_ref().is_some_and(|s| s.is_recording());
        let pending = self.camera.as_ref().is_some_and(|s| s.is_photo_pending());

        let fill = match (enabled, recording) {
            (_, true) => color(SHUTTER.recording, 1.0),
            (false, false) => color(SHUTTER.idle, 0.3),
            (true, false) if pending => color(SHUTTER.idle, 0.7),
            (true, false) => color(SHUTTER.idle, 1.0),
        };
        let inner = if recording {
            SHUTTER.inner * 0.6
        } else {
            SHUTTER.inner
        };

        let core = widget::container(widget::Space::new(
            Length::Fixed(inner),
            Length::Fixed(inner),
        ))
        .style(move |_theme| widget::container::Style {
            background: Some(Background::Color(fill)),
            border: Border {
                radius: (if recording { 8.0 } else { inner / 2.0 }).into(),
                ..Default::default()
            },
            ..Default::default()
        });

        let ring = widget::container(core)
            .width(Length::Fixed(SHUTTER.outer))
            .height(Length::Fixed(SHUTTER.outer))
            .center_x(Length::Fixed(SHUTTER.outer))
            .center_y(Length::Fixed(SHUTTER.outer))
            .style(|_theme| widget::container::Style {
                border: Border {
                    color: color(SHUTTER.ring, 1.0),
                    width: 3.0,
                    radius: (SHUTTER.outer / 2.0).into(),
                },
                ..Default::default()
            });

        if enabled {
            widget::mouse_area(ring)
                .on_press(Message::ShutterPressed)
                .on_release(Message::ShutterReleased)
                .into()
        } else {
            ring.into()
        }
    }
}
