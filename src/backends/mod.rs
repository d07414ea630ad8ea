// SPDX-License-Identifier: MPL-2.0

//! Hardware access
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            App / terminal / CLI              │
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────┴───────────────────────┐
//! │                Backend layer                 │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────────┐  │
//! │  │  Camera  │ │ Recorder │ │   Playback   │  │
//! │  │  (V4L2)  │ │ (GSt mux)│ │ (GSt decode) │  │
//! │  └──────────┘ └──────────┘ └──────────────┘  │
//! │  ┌──────────┐ ┌────────────────────────────┐ │
//! │  │  Audio   │ │ Permissions (portal/D-Bus) │ │
//! │  │(PipeWire)│ └────────────────────────────┘ │
//! │  └──────────┘                                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: device enumeration, facing selection and preview sessions
//! - [`recorder`]: H.264/MP4 recording fed with preview frames
//! - [`playback`]: looping decode of recorded clips for review
//! - [`audio`]: microphone discovery
//! - [`permissions`]: camera and microphone access checks

pub mod audio;
pub mod camera;
pub mod permissions;
pub mod playback;
pub mod recorder;
