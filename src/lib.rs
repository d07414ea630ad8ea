// SPDX-License-Identifier: MPL-2.0

//! Snapcam - a two-screen camera app for the COSMIC desktop
//!
//! A Home screen leads to a camera screen that takes photos, records video,
//! reviews the result, hands photos to an upload sink and scans QR and
//! EAN-13 codes.
//!
//! # Architecture
//!
//! - [`screen`]: platform-free screen logic (navigator, permission gate,
//!   shutter and pinch recognizers, code scanner, camera screen state)
//! - [`backends`]: V4L2 preview, recorder, playback, audio and permissions
//! - [`app`]: the libcosmic front end
//! - [`terminal`]: the same screens rendered in a terminal
//! - [`config`]: user configuration handling
//! - [`storage`]: where captures are written
//! - [`upload`]: the upload sink seam

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod i18n;
pub mod runtime;
pub mod screen;
pub mod storage;
pub mod terminal;
pub mod upload;

// Re-export commonly used types
pub use app::{AppModel, Message};
pub use config::Config;
pub use constants::BitratePreset;
pub use screen::{CameraScreen, Effect, Navigator, Route, ScreenMode};
