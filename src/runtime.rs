// SPDX-License-Identifier: GPL-3.0-only

//! One-time process setup shared by all entry points

use std::sync::Once;
use tracing::error;

static INIT: Once = Once::new();

/// Initialize GStreamer. Safe to call repeatedly.
pub fn init() {
    INIT.call_once(|| {
        if let Err(e) = gstreamer::init() {
            error!(error = %e, "Failed to initialize GStreamer");
        }
    });
}
