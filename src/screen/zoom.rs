// SPDX-License-Identifier: GPL-3.0-only

//! Pinch-to-zoom mapping and the gesture context.
//!
//! The gesture context is a dedicated thread that receives touch and pinch
//! input, computes the live zoom factor and writes it into a single
//! [`SharedZoom`] value. The preview pipeline reads that value directly on
//! every frame, so zoom feedback never waits on the UI event loop.
//!
//! Anything else the context wants to say (session ended, range re-clamped)
//! travels to the UI thread as a [`GestureReport`] message.

use super::gesture::{PinchPhase, PinchRecognizer};
use futures::channel::mpsc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Pinch candidates are interpreted on this domain before being mapped onto
/// the device range
pub const ZOOM_DOMAIN_MIN: f32 = 1.0;
pub const ZOOM_DOMAIN_MAX: f32 = 10.0;

/// Zoom limits reported by a device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f32,
    pub max: f32,
    pub neutral: f32,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl ZoomRange {
    /// Used when a device reports nothing usable
    pub const FALLBACK: ZoomRange = ZoomRange {
        min: 1.0,
        max: 10.0,
        neutral: 1.0,
    };

    /// Build a range, repairing reversed or non-finite limits
    pub fn new(min: f32, max: f32, neutral: f32) -> Self {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || max <= 0.0 {
            return Self::FALLBACK;
        }
        let (min, max) = if max < min { (max, min) } else { (min, max) };
        let neutral = if neutral.is_finite() {
            neutral.clamp(min, max)
        } else {
            min
        };
        Self { min, max, neutral }
    }

    pub fn clamp(&self, zoom: f32) -> f32 {
        if zoom.is_nan() {
            return self.neutral;
        }
        zoom.clamp(self.min, self.max)
    }

    /// Map a pinch candidate from `[1, 10]` onto `[min, max]`, clamped.
    ///
    /// Never extrapolates: anything past the domain ends at the range edge.
    pub fn map(&self, candidate: f32) -> f32 {
        if candidate.is_nan() {
            return self.neutral;
        }
        let span = self.max - self.min;
        if span <= f32::EPSILON {
            return self.min;
        }
        let t = ((candidate - ZOOM_DOMAIN_MIN) / (ZOOM_DOMAIN_MAX - ZOOM_DOMAIN_MIN)).clamp(0.0, 1.0);
        self.clamp(self.min + t * span)
    }
}

/// The one value the gesture context may write
#[derive(Debug, Clone)]
pub struct SharedZoom(Arc<AtomicU32>);

impl SharedZoom {
    pub fn new(initial: f32) -> Self {
        Self(Arc::new(AtomicU32::new(initial.to_bits())))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, zoom: f32) {
        self.0.store(zoom.to_bits(), Ordering::Release);
    }
}

/// Per-session pinch mapping
#[derive(Debug, Clone, Default)]
pub struct PinchMapper {
    range: ZoomRange,
    /// Committed zoom captured when the session began
    offset: Option<f32>,
}

impl PinchMapper {
    pub fn new(range: ZoomRange) -> Self {
        Self {
            range,
            offset: None,
        }
    }

    pub fn range(&self) -> ZoomRange {
        self.range
    }

    pub fn set_range(&mut self, range: ZoomRange) {
        self.range = range;
    }

    pub fn in_session(&self) -> bool {
        self.offset.is_some()
    }

    pub fn begin(&mut self, committed: f32) {
        self.offset = Some(committed);
    }

    /// Live zoom for the current pinch scale, or `None` outside a session
    pub fn update(&self, scale: f32) -> Option<f32> {
        let offset = self.offset?;
        Some(self.range.map(offset * scale))
    }

    pub fn end(&mut self) {
        self.offset = None;
    }
}

/// Raw touch input forwarded from a front end
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FingerEvent {
    Down { id: u64, x: f32, y: f32 },
    Moved { id: u64, x: f32, y: f32 },
    Up { id: u64 },
}

/// Input accepted by the gesture context
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureCommand {
    Finger(FingerEvent),
    /// Already-recognized pinch input (scroll wheel, keyboard steps)
    Pinch(PinchPhase),
    /// Active device changed
    SetRange(ZoomRange),
    Shutdown,
}

/// Messages from the gesture context to the UI thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureReport {
    SessionEnded { zoom: f32 },
    RangeApplied { zoom: f32, range: ZoomRange },
}

/// The state the gesture thread owns
#[derive(Debug)]
pub struct GestureContext {
    shared: SharedZoom,
    mapper: PinchMapper,
    recognizer: PinchRecognizer,
    reports: mpsc::UnboundedSender<GestureReport>,
}

impl GestureContext {
    /// Spawn the gesture thread. The shared value starts at the range's
    /// neutral zoom.
    pub fn spawn(
        range: ZoomRange,
    ) -> std::io::Result<(GestureHandle, mpsc::UnboundedReceiver<GestureReport>)> {
        let shared = SharedZoom::new(range.neutral);
        let (report_tx, report_rx) = mpsc::unbounded();
        let (command_tx, command_rx) = std::sync::mpsc::channel();

        let mut context = GestureContext {
            shared: shared.clone(),
            mapper: PinchMapper::new(range),
            recognizer: PinchRecognizer::new(),
            reports: report_tx,
        };

        let join = std::thread::Builder::new()
            .name("gesture-context".into())
            .spawn(move || {
                while let Ok(command) = command_rx.recv() {
                    if command == GestureCommand::Shutdown {
                        break;
                    }
                    context.handle(command);
                }
                debug!("Gesture context stopped");
            })?;

        Ok((
            GestureHandle {
                commands: command_tx,
                shared,
                join: Some(join),
            },
            report_rx,
        ))
    }

    fn handle(&mut self, command: GestureCommand) {
        match command {
            GestureCommand::Finger(event) => {
                let phase = match event {
                    FingerEvent::Down { id, x, y } => self.recognizer.finger_down(id, x, y),
                    FingerEvent::Moved { id, x, y } => self.recognizer.finger_moved(id, x, y),
                    FingerEvent::Up { id } => self.recognizer.finger_up(id),
                };
                if let Some(phase) = phase {
                    self.pinch(phase);
                }
            }
            GestureCommand::Pinch(phase) => self.pinch(phase),
            GestureCommand::SetRange(range) => {
                self.mapper.set_range(range);
                let zoom = range.clamp(self.shared.load());
                self.shared.store(zoom);
                self.report(GestureReport::RangeApplied { zoom, range });
            }
            GestureCommand::Shutdown => {}
        }
    }

    fn pinch(&mut self, phase: PinchPhase) {
        match phase {
            PinchPhase::Begin => self.mapper.begin(self.shared.load()),
            PinchPhase::Update(scale) => {
                if let Some(zoom) = self.mapper.update(scale) {
                    self.shared.store(zoom);
                }
            }
            PinchPhase::End => {
                if self.mapper.in_session() {
                    self.mapper.end();
                    self.report(GestureReport::SessionEnded {
                        zoom: self.shared.load(),
                    });
                }
            }
        }
    }

    fn report(&self, report: GestureReport) {
        if self.reports.unbounded_send(report).is_err() {
            warn!("UI thread dropped gesture reports");
        }
    }
}

/// UI-side handle to the gesture thread
#[derive(Debug)]
pub struct GestureHandle {
    commands: std::sync::mpsc::Sender<GestureCommand>,
    shared: SharedZoom,
    join: Option<JoinHandle<()>>,
}

impl GestureHandle {
    pub fn send(&self, command: GestureCommand) {
        if self.commands.send(command).is_err() {
            warn!(?command, "Gesture context is gone");
        }
    }

    /// Convenience for discrete zoom steps: a whole pinch session at `scale`
    pub fn step(&self, scale: f32) {
        self.send(GestureCommand::Pinch(PinchPhase::Begin));
        self.send(GestureCommand::Pinch(PinchPhase::Update(scale)));
        self.send(GestureCommand::Pinch(PinchPhase::End));
    }

    /// Read-only view of the live zoom
    pub fn zoom(&self) -> f32 {
        self.shared.load()
    }

    pub fn shared(&self) -> SharedZoom {
        self.shared.clone()
    }
}

impl Drop for GestureHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(GestureCommand::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_identity_on_fallback_range() {
        let r = ZoomRange::FALLBACK;
        assert_eq!(r.map(1.0), 1.0);
        assert_eq!(r.map(5.5), 5.5);
        assert_eq!(r.map(10.0), 10.0);
    }

    #[test]
    fn map_interpolates_onto_device_range() {
        let r = ZoomRange::new(1.0, 4.0, 1.0);
        assert!((r.map(5.5) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn map_clamps_extremes() {
        let r = ZoomRange::new(0.5, 8.0, 1.0);
        assert_eq!(r.map(1000.0), 8.0);
        assert_eq!(r.map(0.0), 0.5);
        assert_eq!(r.map(f32::INFINITY), 8.0);
        assert_eq!(r.map(f32::NAN), 1.0);
    }

    #[test]
    fn new_repairs_bad_limits() {
        let r = ZoomRange::new(4.0, 2.0, 9.0);
        assert_eq!((r.min, r.max, r.neutral), (2.0, 4.0, 4.0));
        assert_eq!(ZoomRange::new(f32::NAN, 2.0, 1.0), ZoomRange::FALLBACK);
    }

    #[test]
    fn degenerate_range_maps_to_min() {
        let r = ZoomRange::new(2.0, 2.0, 2.0);
        assert_eq!(r.map(7.0), 2.0);
    }

    #[test]
    fn mapper_uses_offset_from_begin() {
        let mut m = PinchMapper::new(ZoomRange::FALLBACK);
        assert_eq!(m.update(2.0), None);
        m.begin(2.0);
        assert_eq!(m.update(1.5), Some(3.0));
        m.end();
        assert_eq!(m.update(1.5), None);
    }

    #[test]
    fn shared_zoom_roundtrips_bits() {
        let z = SharedZoom::new(1.25);
        z.store(3.75);
        assert_eq!(z.load(), 3.75);
    }
}
