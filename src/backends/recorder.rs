// SPDX-License-Identifier: GPL-3.0-only

//! Video recording from preview frames
//!
//! The recorder runs its own GStreamer pipeline on a dedicated thread:
//!
//! ```text
//! appsrc (RGBA) → videoconvert → H.264 → mp4mux → filesink
//! autoaudiosrc  → audioconvert → AAC  ↗
//! ```
//!
//! Preview frames are pushed in through [`RecordingHandle::push_frame`].
//! [`RecordingHandle::stop`] finishes the file with EOS. The outcome (file
//! path or error) arrives once through [`RecordingHandle::take_outcome`],
//! which is how the start request's finished/error callbacks are delivered.

use crate::backends::camera::types::CameraFrame;
use crate::constants::{pipeline as consts, timing};
use crate::errors::RecordingError;
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// What to record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingRequest {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub audio: bool,
    pub bitrate_kbps: u32,
}

pub type RecordingOutcome = Result<PathBuf, RecordingError>;

/// Handle to a running recording
#[derive(Debug)]
pub struct RecordingHandle {
    frames: SyncSender<Arc<CameraFrame>>,
    stop: Arc<AtomicBool>,
    outcome: Option<oneshot::Receiver<RecordingOutcome>>,
    output: PathBuf,
}

impl RecordingHandle {
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Queue a frame; frames are dropped while the encoder is behind
    pub fn push_frame(&self, frame: Arc<CameraFrame>) {
        match self.frames.try_send(frame) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                debug!("Recorder thread already finished");
            }
        }
    }

    /// Ask the recorder to finish the file. Idempotent.
    pub fn stop(&self) {
        if !self.stop.swap(true, Ordering::SeqCst) {
            info!(path = %self.output.display(), "Stopping recording");
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Future resolving to the recording outcome. Available once.
    pub fn take_outcome(&mut self) -> Option<impl Future<Output = RecordingOutcome> + use<>> {
        let rx = self.outcome.take()?;
        Some(async move { rx.await.unwrap_or(Err(RecordingError::Interrupted)) })
    }
}

/// First candidate for which `available` returns true
pub fn pick_element<'a>(candidates: &[&'a str], available: impl Fn(&str) -> bool) -> Option<&'a str> {
    candidates.iter().copied().find(|name| available(name))
}

fn element_available(name: &str) -> bool {
    gstreamer::ElementFactory::find(name).is_some()
}

fn video_encoder_fragment(name: &str, bitrate_kbps: u32) -> String {
    match name {
        "x264enc" => format!("x264enc tune=zerolatency speed-preset=veryfast bitrate={bitrate_kbps}"),
        "openh264enc" => format!("openh264enc bitrate={}", bitrate_kbps * 1000),
        other => other.to_string(),
    }
}

/// Pipeline description for a request, given the chosen encoders
pub fn pipeline_description(
    request: &RecordingRequest,
    video_encoder: &str,
    audio_encoder: Option<&str>,
) -> String {
    let location = request.output.to_string_lossy().replace('"', "\\\"");
    let mut description = format!(
        "appsrc name=src is-live=true format=time do-timestamp=true ! queue ! videoconvert ! \
         {} ! h264parse ! mp4mux name=mux ! filesink location=\"{}\"",
        video_encoder_fragment(video_encoder, request.bitrate_kbps),
        location
    );
    if let Some(audio) = audio_encoder {
        description.push_str(&format!(
            " autoaudiosrc ! queue ! audioconvert ! audioresample ! {audio} ! queue ! mux."
        ));
    }
    description
}

/// Build the pipeline and start the recorder thread
pub fn start_recording(request: RecordingRequest) -> Result<RecordingHandle, RecordingError> {
    let video_encoder = pick_element(consts::VIDEO_ENCODERS, element_available).ok_or_else(|| {
        RecordingError::EncoderNotAvailable(consts::VIDEO_ENCODERS.join(", "))
    })?;
    let audio_encoder = if request.audio {
        let found = pick_element(consts::AUDIO_ENCODERS, element_available);
        if found.is_none() {
            warn!("No AAC encoder available, recording without audio");
        }
        found
    } else {
        None
    };

    let description = pipeline_description(&request, video_encoder, audio_encoder);
    debug!(%description, "Recording pipeline");

    let pipeline = gstreamer::parse::launch(&description)
        .map_err(|e| RecordingError::StartFailed(e.to_string()))?
        .dynamic_cast::<gstreamer::Pipeline>()
        .map_err(|_| RecordingError::StartFailed("Not a pipeline".into()))?;

    let appsrc = pipeline
        .by_name("src")
        .and_then(|e| e.dynamic_cast::<AppSrc>().ok())
        .ok_or_else(|| RecordingError::StartFailed("Missing appsrc".into()))?;

    let caps = gstreamer_video::VideoInfo::builder(
        gstreamer_video::VideoFormat::Rgba,
        request.width,
        request.height,
    )
    .fps(gstreamer::Fraction::new(consts::RECORD_FRAMERATE, 1))
    .build()
    .and_then(|info| info.to_caps())
    .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
    appsrc.set_caps(Some(&caps));

    pipeline
        .set_state(gstreamer::State::Playing)
        .map_err(|e| RecordingError::StartFailed(e.to_string()))?;

    let (frames_tx, frames_rx) = std::sync::mpsc::sync_channel(consts::RECORDER_QUEUE_FRAMES);
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let stop = Arc::new(AtomicBool::new(false));

    let worker = RecorderWorker {
        pipeline,
        appsrc,
        frames: frames_rx,
        stop: stop.clone(),
        request: request.clone(),
    };
    std::thread::Builder::new()
        .name("recorder".into())
        .spawn(move || {
            let outcome = worker.run();
            let _ = outcome_tx.send(outcome);
        })
        .map_err(|e| RecordingError::StartFailed(e.to_string()))?;

    info!(
        path = %request.output.display(),
        video_encoder,
        audio_encoder = ?audio_encoder,
        "Recording started"
    );

    Ok(RecordingHandle {
        frames: frames_tx,
        stop,
        outcome: Some(outcome_rx),
        output: request.output,
    })
}

struct RecorderWorker {
    pipeline: gstreamer::Pipeline,
    appsrc: AppSrc,
    frames: Receiver<Arc<CameraFrame>>,
    stop: Arc<AtomicBool>,
    request: RecordingRequest,
}

impl RecorderWorker {
    fn run(self) -> RecordingOutcome {
        let result = self.record();
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to reset recording pipeline");
        }
        match &result {
            Ok(path) => info!(path = %path.display(), "Recording saved"),
            Err(e) => error!(error = %e, "Recording failed"),
        }
        result
    }

    fn record(&self) -> RecordingOutcome {
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| RecordingError::StartFailed("No bus available".into()))?;

        loop {
            if let Some(msg) = bus.pop_filtered(&[gstreamer::MessageType::Error])
                && let gstreamer::MessageView::Error(err) = msg.view()
            {
                return Err(RecordingError::PipelineError(err.error().to_string()));
            }
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            match self.frames.recv_timeout(Duration::from_millis(50)) {
                Ok(frame) => self.push(&frame)?,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.appsrc
            .end_of_stream()
            .map_err(|e| RecordingError::StopFailed(format!("{:?}", e)))?;

        match bus.timed_pop_filtered(
            gstreamer::ClockTime::from_seconds(timing::EOS_TIMEOUT_SECS),
            &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
        ) {
            Some(msg) => match msg.view() {
                gstreamer::MessageView::Error(err) => {
                    Err(RecordingError::StopFailed(err.error().to_string()))
                }
                _ => Ok(self.request.output.clone()),
            },
            None => Err(RecordingError::StopFailed("Timed out waiting for EOS".into())),
        }
    }

    fn push(&self, frame: &CameraFrame) -> Result<(), RecordingError> {
        if frame.width != self.request.width || frame.height != self.request.height {
            debug!(
                width = frame.width,
                height = frame.height,
                "Skipping frame with mismatched size"
            );
            return Ok(());
        }
        let buffer = gstreamer::Buffer::from_mut_slice(frame.packed_rgba());
        self.appsrc
            .push_buffer(buffer)
            .map(|_| ())
            .map_err(|e| RecordingError::PipelineError(format!("push failed: {:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(audio: bool) -> RecordingRequest {
        RecordingRequest {
            output: PathBuf::from("/tmp/snapcam test/b.mp4"),
            width: 640,
            height: 480,
            audio,
            bitrate_kbps: 2_000,
        }
    }

    #[test]
    fn picks_first_available_encoder() {
        let available = |name: &str| name == "openh264enc" || name == "vah264enc";
        assert_eq!(
            pick_element(consts::VIDEO_ENCODERS, available),
            Some("openh264enc")
        );
        assert_eq!(pick_element(consts::VIDEO_ENCODERS, |_| false), None);
    }

    #[test]
    fn description_quotes_location_and_sets_bitrate() {
        let desc = pipeline_description(&request(false), "x264enc", None);
        assert!(desc.contains("location=\"/tmp/snapcam test/b.mp4\""));
        assert!(desc.contains("bitrate=2000"));
        assert!(!desc.contains("autoaudiosrc"));
    }

    #[test]
    fn description_adds_audio_branch() {
        let desc = pipeline_description(&request(true), "openh264enc", Some("avenc_aac"));
        assert!(desc.contains("openh264enc bitrate=2000000"));
        assert!(desc.contains("avenc_aac ! queue ! mux."));
    }
}
