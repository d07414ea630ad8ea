// SPDX-License-Identifier: GPL-3.0-only

//! Gesture recognition for the shutter control and the preview surface.
//!
//! The shutter is a single control with two meanings: a short press takes a
//! photo (or stops a recording), a sustained press starts a recording. The
//! [`ShutterRecognizer`] makes the split explicit with a duration threshold.
//! A long press fires as soon as the threshold elapses while the control is
//! still held; releasing afterwards produces nothing.
//!
//! [`PinchRecognizer`] turns raw finger positions into a pinch session with
//! a scale relative to the distance at session start.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What a completed shutter interaction means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterGesture {
    Tap,
    LongPress,
}

/// State of the shutter recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutterState {
    #[default]
    Idle,
    /// Held, threshold not reached yet
    Pressed { id: u64, since: Instant },
    /// Held past the threshold; the long press has already been reported
    LongPressFired { id: u64 },
}

/// Tap vs. long-press state machine
#[derive(Debug, Clone)]
pub struct ShutterRecognizer {
    threshold: Duration,
    state: ShutterState,
    next_id: u64,
}

impl ShutterRecognizer {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: ShutterState::Idle,
            next_id: 0,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn state(&self) -> ShutterState {
        self.state
    }

    /// Start a press. Returns an id the caller uses to schedule [`Self::poll`].
    pub fn press(&mut self, now: Instant) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.state = ShutterState::Pressed {
            id: self.next_id,
            since: now,
        };
        self.next_id
    }

    /// Check whether press `id` crossed the threshold.
    ///
    /// Stale ids (released or superseded presses) yield `None`.
    pub fn poll(&mut self, id: u64, now: Instant) -> Option<ShutterGesture> {
        match self.state {
            ShutterState::Pressed { id: current, since }
                if current == id && now.duration_since(since) >= self.threshold =>
            {
                self.state = ShutterState::LongPressFired { id };
                Some(ShutterGesture::LongPress)
            }
            _ => None,
        }
    }

    /// End the press
    pub fn release(&mut self, now: Instant) -> Option<ShutterGesture> {
        let gesture = match self.state {
            ShutterState::Pressed { since, .. } => {
                if now.duration_since(since) >= self.threshold {
                    // Timer never got a chance to poll
                    Some(ShutterGesture::LongPress)
                } else {
                    Some(ShutterGesture::Tap)
                }
            }
            ShutterState::LongPressFired { .. } | ShutterState::Idle => None,
        };
        self.state = ShutterState::Idle;
        gesture
    }

    /// Abandon the press (pointer left the control, screen blurred)
    pub fn cancel(&mut self) {
        self.state = ShutterState::Idle;
    }
}

/// Pinch session progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinchPhase {
    Begin,
    /// Scale relative to the finger distance at session start
    Update(f32),
    End,
}

/// Below this finger distance the scale is too noisy to use
const MIN_PINCH_DISTANCE: f32 = 8.0;

/// Two-finger pinch recognizer
#[derive(Debug, Default)]
pub struct PinchRecognizer {
    fingers: HashMap<u64, (f32, f32)>,
    /// The two fingers driving the session
    pair: Option<(u64, u64)>,
    initial_distance: Option<f32>,
}

impl PinchRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.pair.is_some()
    }

    pub fn finger_down(&mut self, id: u64, x: f32, y: f32) -> Option<PinchPhase> {
        self.fingers.insert(id, (x, y));
        if self.pair.is_some() || self.fingers.len() < 2 {
            return None;
        }
        let other = self.fingers.keys().copied().find(|&k| k != id)?;
        self.pair = Some((other, id));
        self.initial_distance = self.pair_distance();
        Some(PinchPhase::Begin)
    }

    pub fn finger_moved(&mut self, id: u64, x: f32, y: f32) -> Option<PinchPhase> {
        if let Some(pos) = self.fingers.get_mut(&id) {
            *pos = (x, y);
        }
        let (a, b) = self.pair?;
        if id != a && id != b {
            return None;
        }
        let initial = self.initial_distance?;
        let current = self.pair_distance()?;
        if initial < MIN_PINCH_DISTANCE {
            // Fingers started on top of each other; rebase once they separate
            self.initial_distance = Some(current);
            return None;
        }
        Some(PinchPhase::Update(current / initial))
    }

    pub fn finger_up(&mut self, id: u64) -> Option<PinchPhase> {
        self.fingers.remove(&id);
        match self.pair {
            Some((a, b)) if id == a || id == b => {
                self.pair = None;
                self.initial_distance = None;
                Some(PinchPhase::End)
            }
            _ => None,
        }
    }

    fn pair_distance(&self) -> Option<f32> {
        let (a, b) = self.pair?;
        let (ax, ay) = *self.fingers.get(&a)?;
        let (bx, by) = *self.fingers.get(&b)?;
        Some(((ax - bx).powi(2) + (ay - by).powi(2)).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(500);

    #[test]
    fn short_press_is_tap() {
        let mut r = ShutterRecognizer::new(THRESHOLD);
        let t0 = Instant::now();
        let id = r.press(t0);
        assert_eq!(r.poll(id, t0 + Duration::from_millis(100)), None);
        assert_eq!(r.release(t0 + Duration::from_millis(120)), Some(ShutterGesture::Tap));
        assert_eq!(r.state(), ShutterState::Idle);
    }

    #[test]
    fn held_press_fires_long_press_once() {
        let mut r = ShutterRecognizer::new(THRESHOLD);
        let t0 = Instant::now();
        let id = r.press(t0);
        assert_eq!(r.poll(id, t0 + THRESHOLD), Some(ShutterGesture::LongPress));
        assert_eq!(r.poll(id, t0 + THRESHOLD * 2), None);
        assert_eq!(r.release(t0 + Duration::from_secs(3)), None);
    }

    #[test]
    fn late_release_without_poll_is_long_press() {
        let mut r = ShutterRecognizer::new(THRESHOLD);
        let t0 = Instant::now();
        r.press(t0);
        assert_eq!(r.release(t0 + Duration::from_millis(800)), Some(ShutterGesture::LongPress));
    }

    #[test]
    fn stale_timer_is_ignored() {
        let mut r = ShutterRecognizer::new(THRESHOLD);
        let t0 = Instant::now();
        let first = r.press(t0);
        r.release(t0 + Duration::from_millis(50));
        let _second = r.press(t0 + Duration::from_millis(400));
        assert_eq!(r.poll(first, t0 + Duration::from_millis(550)), None);
    }

    #[test]
    fn release_without_press_is_nothing() {
        let mut r = ShutterRecognizer::new(THRESHOLD);
        assert_eq!(r.release(Instant::now()), None);
    }

    #[test]
    fn pinch_apart_scales_up() {
        let mut p = PinchRecognizer::new();
        assert_eq!(p.finger_down(1, 100.0, 100.0), None);
        assert_eq!(p.finger_down(2, 200.0, 100.0), Some(PinchPhase::Begin));
        p.finger_moved(1, 50.0, 100.0);
        let phase = p.finger_moved(2, 250.0, 100.0);
        assert_eq!(phase, Some(PinchPhase::Update(2.0)));
        assert_eq!(p.finger_up(2), Some(PinchPhase::End));
        assert!(!p.is_active());
    }

    #[test]
    fn third_finger_does_not_restart_session() {
        let mut p = PinchRecognizer::new();
        p.finger_down(1, 0.0, 0.0);
        p.finger_down(2, 100.0, 0.0);
        assert_eq!(p.finger_down(3, 50.0, 50.0), None);
        assert_eq!(p.finger_moved(3, 60.0, 60.0), None);
        assert_eq!(p.finger_up(3), None);
        assert!(p.is_active());
    }
}
