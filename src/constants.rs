// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Video encoder bitrate presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitratePreset {
    /// Smaller files, reduced quality
    Low,
    #[default]
    Medium,
    /// Larger files, better quality
    High,
}

impl BitratePreset {
    pub const ALL: [BitratePreset; 3] = [
        BitratePreset::Low,
        BitratePreset::Medium,
        BitratePreset::High,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BitratePreset::Low => "Low",
            BitratePreset::Medium => "Medium",
            BitratePreset::High => "High",
        }
    }

    /// Target bitrate in kbps for a frame width
    ///
    /// SD 1/2/4, HD 2.5/5/10, Full HD 4/8/16 Mbps.
    pub fn bitrate_kbps(&self, width: u32) -> u32 {
        let tier = if width >= resolution_thresholds::THRESHOLD_FULL_HD {
            2
        } else if width >= resolution_thresholds::THRESHOLD_720P {
            1
        } else {
            0
        };
        const TABLE: [[u32; 3]; 3] = [
            [1_000, 2_000, 4_000],
            [2_500, 5_000, 10_000],
            [4_000, 8_000, 16_000],
        ];
        let column = match self {
            BitratePreset::Low => 0,
            BitratePreset::Medium => 1,
            BitratePreset::High => 2,
        };
        TABLE[tier][column]
    }
}

pub mod resolution_thresholds {
    pub const THRESHOLD_FULL_HD: u32 = 1920;
    pub const THRESHOLD_720P: u32 = 1280;
}

/// GStreamer pipeline settings
pub mod pipeline {
    /// Appsink queue depth; older frames are dropped
    pub const MAX_BUFFERS: u32 = 2;
    /// Preview frames are capped to this size before reaching the UI
    pub const PREVIEW_MAX_WIDTH: u32 = 1280;
    pub const PREVIEW_MAX_HEIGHT: u32 = 960;
    /// Preview frame channel capacity
    pub const FRAME_CHANNEL_CAPACITY: usize = 4;
    /// Recorder input queue, in frames
    pub const RECORDER_QUEUE_FRAMES: usize = 8;
    /// Frame rate advertised to the recording encoder
    pub const RECORD_FRAMERATE: i32 = 30;
    /// H.264 encoders tried in order
    pub const VIDEO_ENCODERS: &[&str] = &["x264enc", "openh264enc", "vah264enc", "vaapih264enc"];
    /// AAC encoders tried in order
    pub const AUDIO_ENCODERS: &[&str] = &["fdkaacenc", "avenc_aac", "voaacenc"];
}

pub mod timing {
    use std::time::Duration;

    /// Log frame stats every N frames
    pub const FRAME_LOG_INTERVAL: u64 = 30;
    pub const STOP_TIMEOUT_SECS: u64 = 2;
    pub const START_TIMEOUT_SECS: u64 = 5;
    /// How long the recorder waits for the muxer to finish after EOS
    pub const EOS_TIMEOUT_SECS: u64 = 5;
    /// LED on before the photo frame is taken
    pub const FLASH_LEAD: Duration = Duration::from_millis(200);
    /// White overlay when there is no LED
    pub const SCREEN_FLASH: Duration = Duration::from_millis(150);
    /// Notice banners hide after this long
    pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(4);
    /// Camera permission portal request timeout
    pub const PORTAL_TIMEOUT: Duration = Duration::from_secs(120);
}

/// Pinch and zoom tuning
pub mod zoom {
    /// Digital zoom ceiling when the device has no zoom control
    pub const DEFAULT_MAX_DIGITAL_ZOOM: f32 = 4.0;
    /// Pinch scale of one scroll-wheel notch
    pub const SCROLL_STEP_SCALE: f32 = 1.1;
    /// Pinch scale of one keyboard step in the terminal front end
    pub const KEY_STEP_SCALE: f32 = 1.25;
}

pub mod gesture {
    /// Press duration that turns a tap into a long press
    pub const DEFAULT_LONG_PRESS_MS: u64 = 500;
}

pub mod scanner {
    /// Minimum time between scanned frames
    pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 250;
}

/// Typed style options per UI element
pub mod style {
    /// 8-bit sRGB color
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Rgb(pub u8, pub u8, pub u8);

    impl Rgb {
        pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);
        pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);

        pub fn to_floats(self) -> [f32; 3] {
            [
                self.0 as f32 / 255.0,
                self.1 as f32 / 255.0,
                self.2 as f32 / 255.0,
            ]
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct TextStyle {
        pub size: u16,
        pub color: Rgb,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct HomeStyle {
        pub background: Rgb,
        pub title: TextStyle,
        /// Gap between title and button
        pub title_spacing: u16,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ShutterStyle {
        pub outer: f32,
        pub inner: f32,
        pub ring: Rgb,
        pub idle: Rgb,
        pub recording: Rgb,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct OverlayStyle {
        pub background: Rgb,
        pub background_alpha: f32,
        pub radius: f32,
        pub padding: u16,
        pub icon_size: u16,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct StatusStyle {
        pub text: TextStyle,
        pub spinner_size: f32,
    }

    pub const HOME: HomeStyle = HomeStyle {
        background: Rgb(0x2c, 0x3e, 0x50),
        title: TextStyle {
            size: 24,
            color: Rgb::WHITE,
        },
        title_spacing: 20,
    };

    pub const SHUTTER: ShutterStyle = ShutterStyle {
        outer: 75.0,
        inner: 63.0,
        ring: Rgb::WHITE,
        idle: Rgb::WHITE,
        recording: Rgb(0xe5, 0x39, 0x35),
    };

    pub const CONTROLS: OverlayStyle = OverlayStyle {
        background: Rgb::BLACK,
        background_alpha: 0.4,
        radius: 24.0,
        padding: 12,
        icon_size: 28,
    };

    pub const NOTICE: OverlayStyle = OverlayStyle {
        background: Rgb(0x30, 0x30, 0x30),
        background_alpha: 0.85,
        radius: 8.0,
        padding: 10,
        icon_size: 16,
    };

    pub const STATUS: StatusStyle = StatusStyle {
        text: TextStyle {
            size: 18,
            color: Rgb::WHITE,
        },
        spinner_size: 48.0,
    };
}

/// File names for captured media
pub mod file_formats {
    pub const PHOTO_PREFIX: &str = "IMG";
    pub const VIDEO_PREFIX: &str = "VID";
    pub const PHOTO_EXTENSION: &str = "jpg";
    pub const VIDEO_EXTENSION: &str = "mp4";
    pub const JPEG_QUALITY: u8 = 92;
}

/// Application information utilities
pub mod app_info {
    use std::path::Path;

    /// Reverse-DNS id used for config and the window
    pub const APP_ID: &str = "io.github.cosmic_utils.snapcam";

    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    pub fn is_flatpak() -> bool {
        Path::new("/.flatpak-info").exists()
    }
}

/// Delay before a [`Duration`]-based task fires, in whole milliseconds
pub fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_tiers_follow_width() {
        assert_eq!(BitratePreset::Medium.bitrate_kbps(640), 2_000);
        assert_eq!(BitratePreset::Medium.bitrate_kbps(1280), 5_000);
        assert_eq!(BitratePreset::High.bitrate_kbps(1920), 16_000);
    }

    #[test]
    fn home_style_matches_palette() {
        assert_eq!(style::HOME.background, style::Rgb(0x2c, 0x3e, 0x50));
        assert_eq!(style::HOME.title.size, 24);
    }
}
