// SPDX-License-Identifier: MPL-2.0

//! Capture controls: the shutter button

pub mod capture_button;
