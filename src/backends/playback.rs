// SPDX-License-Identifier: GPL-3.0-only

//! Looping playback of a recorded clip
//!
//! Decodes the file to RGBA frames on an appsink clocked in real time. A bus
//! watcher thread seeks back to the start on every EOS, so the clip repeats
//! until the player is dropped.

use crate::backends::camera::preview::frame_from_sample;
use crate::backends::camera::types::{BackendError, BackendResult, FrameSender};
use crate::constants::pipeline;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct LoopingPlayer {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    stop: Arc<AtomicBool>,
    watcher: Option<std::thread::JoinHandle<()>>,
    path: PathBuf,
}

impl std::fmt::Debug for LoopingPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopingPlayer")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// `filesrc` pipeline with a quoted location and RGBA output
pub fn playback_description(path: &Path) -> String {
    format!(
        "filesrc location=\"{}\" ! decodebin ! videoconvert ! videoscale ! \
         video/x-raw,format=RGBA,width=(int)[1,{}],height=(int)[1,{}] ! appsink name=sink",
        path.to_string_lossy().replace('"', "\\\""),
        pipeline::PREVIEW_MAX_WIDTH,
        pipeline::PREVIEW_MAX_HEIGHT,
    )
}

impl LoopingPlayer {
    pub fn start(path: &Path, mut sender: FrameSender) -> BackendResult<Self> {
        info!(path = %path.display(), "Starting looping playback");

        let pipeline = gstreamer::parse::launch(&playback_description(path))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Not a pipeline".into()))?;
        let appsink = pipeline
            .by_name("sink")
            .and_then(|e| e.dynamic_cast::<AppSink>().ok())
            .ok_or_else(|| BackendError::InitializationFailed("Missing appsink".into()))?;

        appsink.set_property("sync", true);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let frame = frame_from_sample(&sample, 1.0, Instant::now())?;
                    match sender.try_send(Arc::new(frame)) {
                        Err(e) if e.is_disconnected() => Err(gstreamer::FlowError::Eos),
                        _ => Ok(gstreamer::FlowSuccess::Ok),
                    }
                })
                .build(),
        );

        pipeline.set_state(gstreamer::State::Playing)?;

        let stop = Arc::new(AtomicBool::new(false));
        let watcher = {
            let pipeline = pipeline.clone();
            let stop = stop.clone();
            std::thread::Builder::new()
                .name("playback-loop".into())
                .spawn(move || watch_bus(&pipeline, &stop))?
        };

        Ok(Self {
            pipeline,
            appsink,
            stop,
            watcher: Some(watcher),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn watch_bus(pipeline: &gstreamer::Pipeline, stop: &AtomicBool) {
    let Some(bus) = pipeline.bus() else {
        warn!("Playback pipeline has no bus");
        return;
    };
    while !stop.load(Ordering::SeqCst) {
        let Some(msg) = bus.timed_pop_filtered(
            gstreamer::ClockTime::from_mseconds(100),
            &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
        ) else {
            continue;
        };
        match msg.view() {
            gstreamer::MessageView::Eos(_) => {
                debug!("Clip ended, looping");
                if let Err(e) = pipeline.seek_simple(
                    gstreamer::SeekFlags::FLUSH | gstreamer::SeekFlags::KEY_UNIT,
                    gstreamer::ClockTime::ZERO,
                ) {
                    warn!(error = %e, "Failed to rewind clip");
                    return;
                }
            }
            gstreamer::MessageView::Error(err) => {
                warn!(error = %err.error(), "Playback error");
                return;
            }
            _ => {}
        }
    }
}

impl Drop for LoopingPlayer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to stop playback pipeline");
        }
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
        debug!(path = %self.path.display(), "Playback released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_quotes_path() {
        let desc = playback_description(Path::new("/tmp/my clips/b.mp4"));
        assert!(desc.starts_with("filesrc location=\"/tmp/my clips/b.mp4\""));
        assert!(desc.ends_with("appsink name=sink"));
    }
}
