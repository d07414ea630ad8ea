// SPDX-License-Identifier: GPL-3.0-only

//! Pinch-to-zoom mapping and the gesture thread

use snapcam::screen::gesture::PinchPhase;
use snapcam::screen::zoom::{FingerEvent, GestureCommand, GestureContext, PinchMapper};
use snapcam::screen::{GestureReport, ZoomRange};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[test]
fn huge_scale_clamps_to_max() {
    let range = ZoomRange::new(1.0, 4.0, 1.0);
    let mut mapper = PinchMapper::new(range);
    mapper.begin(1.0);
    assert_eq!(mapper.update(1000.0), Some(4.0));
}

#[test]
fn tiny_scale_clamps_to_min() {
    let range = ZoomRange::new(1.0, 4.0, 1.0);
    let mut mapper = PinchMapper::new(range);
    mapper.begin(2.0);
    assert_eq!(mapper.update(0.0001), Some(1.0));
}

#[test]
fn update_outside_session_is_ignored() {
    let mapper = PinchMapper::new(ZoomRange::default());
    assert_eq!(mapper.update(2.0), None);
}

#[test]
fn candidate_domain_maps_linearly() {
    let range = ZoomRange::new(1.0, 5.5, 1.0);
    // Halfway through [1, 10] lands halfway through [1, 5.5]
    assert!(approx(range.map(5.5), 3.25));
    assert!(approx(range.map(1.0), 1.0));
    assert!(approx(range.map(10.0), 5.5));
}

#[test]
fn reversed_range_is_repaired() {
    let range = ZoomRange::new(4.0, 1.0, 9.0);
    assert_eq!((range.min, range.max), (1.0, 4.0));
    assert_eq!(range.neutral, 4.0);
    assert_eq!(range.clamp(f32::NAN), 4.0);
}

#[test]
fn gesture_thread_reports_session_end() {
    let range = ZoomRange::new(1.0, 10.0, 1.0);
    let (handle, mut reports) = GestureContext::spawn(range).expect("spawn gesture thread");
    assert_eq!(handle.zoom(), 1.0);

    handle.send(GestureCommand::Finger(FingerEvent::Down { id: 1, x: 0.0, y: 0.0 }));
    handle.send(GestureCommand::Finger(FingerEvent::Down { id: 2, x: 100.0, y: 0.0 }));
    handle.send(GestureCommand::Finger(FingerEvent::Moved { id: 2, x: 200.0, y: 0.0 }));
    handle.send(GestureCommand::Finger(FingerEvent::Up { id: 2 }));

    let report = futures::executor::block_on(futures::StreamExt::next(&mut reports));
    let Some(GestureReport::SessionEnded { zoom }) = report else {
        panic!("expected a session end, got {report:?}");
    };
    // Fingers twice as far apart: 1x * 2 on the [1, 10] domain
    assert!(approx(zoom, 2.0));
    assert!(approx(handle.zoom(), 2.0));
}

#[test]
fn range_change_clamps_live_zoom() {
    let (handle, mut reports) =
        GestureContext::spawn(ZoomRange::new(1.0, 10.0, 1.0)).expect("spawn gesture thread");
    handle.send(GestureCommand::Pinch(PinchPhase::Begin));
    handle.send(GestureCommand::Pinch(PinchPhase::Update(8.0)));
    handle.send(GestureCommand::Pinch(PinchPhase::End));
    let first = futures::executor::block_on(futures::StreamExt::next(&mut reports));
    assert!(matches!(first, Some(GestureReport::SessionEnded { .. })));

    let smaller = ZoomRange::new(1.0, 2.0, 1.0);
    handle.send(GestureCommand::SetRange(smaller));
    let report = futures::executor::block_on(futures::StreamExt::next(&mut reports));
    assert_eq!(
        report,
        Some(GestureReport::RangeApplied {
            zoom: 2.0,
            range: smaller,
        })
    );
    assert_eq!(handle.zoom(), 2.0);
}
