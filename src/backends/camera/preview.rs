// SPDX-License-Identifier: GPL-3.0-only

//! Live preview session
//!
//! `v4l2src → decodebin → videoconvert → videoscale → RGBA appsink`.
//! Every frame reads the shared zoom value. Devices with a V4L2 zoom control
//! get the value written to the driver when it changes; other devices are
//! zoomed by cropping the frame center and scaling it back to full size, so
//! the frame dimensions stay constant for the recorder.

use super::types::*;
use super::v4l2_controls::{self, V4L2_CID_ZOOM_ABSOLUTE};
use super::zoom_to_control;
use crate::constants::{pipeline, timing};
use crate::screen::zoom::{SharedZoom, ZoomRange};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A running preview. Dropping it stops the pipeline and frees the device.
pub struct PreviewSession {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    device: CameraDevice,
}

impl std::fmt::Debug for PreviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSession")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Applies the shared zoom to each frame
struct ZoomApplier {
    zoom: SharedZoom,
    range: ZoomRange,
    control: Option<(std::fs::File, i32, i32)>,
    last_applied: Option<i32>,
}

impl ZoomApplier {
    fn new(device: &CameraDevice, zoom: SharedZoom, range: ZoomRange) -> Self {
        let control = match device.zoom {
            ZoomControl::Hardware { minimum, maximum } => std::fs::File::options()
                .read(true)
                .write(true)
                .open(&device.path)
                .map_err(|e| warn!(path = %device.path, error = %e, "Cannot open zoom control, using crop"))
                .ok()
                .map(|file| (file, minimum, maximum)),
            ZoomControl::Digital => None,
        };
        Self {
            zoom,
            range,
            control,
            last_applied: None,
        }
    }

    /// Returns the crop factor still to apply in software
    fn apply(&mut self) -> f32 {
        let zoom = self.range.clamp(self.zoom.load());
        let Some((file, minimum, maximum)) = &self.control else {
            return zoom;
        };
        let value = zoom_to_control(zoom, self.range, *minimum, *maximum);
        if self.last_applied != Some(value) {
            match v4l2_controls::set_control_fd(file, V4L2_CID_ZOOM_ABSOLUTE, value) {
                Ok(_) => self.last_applied = Some(value),
                Err(e) => {
                    warn!(error = %e, "Hardware zoom failed, switching to crop");
                    self.control = None;
                    return zoom;
                }
            }
        }
        1.0
    }
}

impl PreviewSession {
    pub fn start(
        device: &CameraDevice,
        zoom: SharedZoom,
        range: ZoomRange,
        mut sender: FrameSender,
    ) -> BackendResult<Self> {
        info!(device = %device, "Starting preview");

        let description = format!(
            "v4l2src device={} ! decodebin ! videoconvert ! videoscale ! \
             video/x-raw,format=RGBA,width=(int)[1,{}],height=(int)[1,{}] ! \
             appsink name=sink",
            device.path,
            pipeline::PREVIEW_MAX_WIDTH,
            pipeline::PREVIEW_MAX_HEIGHT,
        );
        let pipeline = gstreamer::parse::launch(&description)?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Not a pipeline".into()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".into()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| BackendError::InitializationFailed("Failed to cast appsink".into()))?;

        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let mut applier = ZoomApplier::new(device, zoom, range);
        let mut frame_num: u64 = 0;

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let captured_at = Instant::now();
                    frame_num += 1;

                    let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let frame = frame_from_sample(&sample, applier.apply(), captured_at)?;

                    if let Err(e) = sender.try_send(Arc::new(frame)) {
                        if e.is_disconnected() {
                            return Err(gstreamer::FlowError::Eos);
                        }
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            debug!(frame = frame_num, "Frame dropped (channel full)");
                        }
                    }
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline.set_state(gstreamer::State::Playing)?;

        if let Some(bus) = pipeline.bus()
            && let Some(msg) = bus.timed_pop_filtered(
                gstreamer::ClockTime::from_mseconds(200),
                &[gstreamer::MessageType::Error],
            )
            && let gstreamer::MessageView::Error(err) = msg.view()
        {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::InitializationFailed(format!(
                "{}: {}",
                device.path,
                err.error()
            )));
        }

        Ok(Self {
            pipeline,
            appsink,
            device: device.clone(),
        })
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to stop preview pipeline");
        }
        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
        debug!(?result, ?state, device = %self.device.path, "Preview released");
    }
}

/// Copy an RGBA sample into a [`CameraFrame`], cropping when `crop > 1`
pub(crate) fn frame_from_sample(
    sample: &gstreamer::Sample,
    crop: f32,
    captured_at: Instant,
) -> Result<CameraFrame, gstreamer::FlowError> {
    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
    let info = VideoInfo::from_caps(caps).map_err(|e| {
        error!(error = ?e, "Failed to get video info");
        gstreamer::FlowError::Error
    })?;
    let map = buffer.map_readable().map_err(|_| gstreamer::FlowError::Error)?;

    let (width, height) = (info.width(), info.height());
    let stride = info.stride()[0] as u32;
    Ok(if crop > 1.0 + f32::EPSILON {
        CameraFrame {
            width,
            height,
            stride: width * 4,
            data: crop_center(map.as_slice(), width, height, stride, crop).into(),
            captured_at,
        }
    } else {
        CameraFrame {
            width,
            height,
            stride,
            data: Arc::from(map.as_slice()),
            captured_at,
        }
    })
}

/// Crop the center `1/factor` of an RGBA frame and scale it back to
/// `width x height` with nearest-neighbour sampling
pub fn crop_center(data: &[u8], width: u32, height: u32, stride: u32, factor: f32) -> Vec<u8> {
    let (w, h, stride) = (width as usize, height as usize, stride as usize);
    let factor = factor.max(1.0);
    let crop_w = (w as f32 / factor).max(1.0);
    let crop_h = (h as f32 / factor).max(1.0);
    let x0 = (w as f32 - crop_w) / 2.0;
    let y0 = (h as f32 - crop_h) / 2.0;

    let mut out = Vec::with_capacity(w * h * 4);
    for y in 0..h {
        let sy = ((y0 + (y as f32 + 0.5) * crop_h / h as f32) as usize).min(h - 1);
        let row = &data[sy * stride..];
        for x in 0..w {
            let sx = ((x0 + (x as f32 + 0.5) * crop_w / w as f32) as usize).min(w - 1);
            out.extend_from_slice(&row[sx * 4..sx * 4 + 4]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 frame where each pixel's red channel is its index
    fn indexed_frame() -> Vec<u8> {
        (0..16u8).flat_map(|i| [i, 0, 0, 255]).collect()
    }

    #[test]
    fn crop_factor_one_is_identity() {
        let data = indexed_frame();
        assert_eq!(crop_center(&data, 4, 4, 16, 1.0), data);
    }

    #[test]
    fn crop_factor_two_magnifies_center() {
        let out = crop_center(&indexed_frame(), 4, 4, 16, 2.0);
        let reds: Vec<u8> = out.chunks_exact(4).map(|p| p[0]).collect();
        assert_eq!(reds, vec![5, 5, 6, 6, 5, 5, 6, 6, 9, 9, 10, 10, 9, 9, 10, 10]);
    }

    #[test]
    fn crop_keeps_dimensions_with_padding() {
        let mut padded = Vec::new();
        for row in indexed_frame().chunks_exact(16) {
            padded.extend_from_slice(row);
            padded.extend_from_slice(&[0; 8]);
        }
        let out = crop_center(&padded, 4, 4, 24, 3.0);
        assert_eq!(out.len(), 4 * 4 * 4);
    }
}
