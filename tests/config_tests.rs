// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use snapcam::Config;
use snapcam::backends::camera::Facing;
use snapcam::screen::ScreenSettings;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.default_facing, Facing::Back);
    assert!(config.record_audio, "Audio should be recorded by default");
    assert_eq!(config.long_press_ms, 500);
    assert!(config.prefer_ultra_wide, "Ultra-wide lens is requested by default");
    assert!(ScreenSettings::from(&config).devices.prefer_ultra_wide);
}

#[test]
fn test_config_empty_dirs_mean_default() {
    let config = Config::default();
    assert_eq!(config.save_dir_override(), None);
    assert_eq!(config.upload_dir_override(), None);

    let config = Config {
        save_dir: "/srv/captures".into(),
        ..Config::default()
    };
    assert_eq!(config.save_dir_override(), Some("/srv/captures"));
}

#[test]
fn test_screen_settings_follow_config() {
    let config = Config {
        default_facing: Facing::Front,
        long_press_ms: 800,
        front_camera: Some("/dev/video2".into()),
        ..Config::default()
    };
    let settings = ScreenSettings::from(&config);

    assert_eq!(settings.default_facing, Facing::Front);
    assert_eq!(settings.long_press, Duration::from_millis(800));
    assert_eq!(settings.devices.front_path.as_deref(), Some("/dev/video2"));
}
