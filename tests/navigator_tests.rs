// SPDX-License-Identifier: GPL-3.0-only

//! Route stack and lifecycle events

use snapcam::screen::{NavEvent, Navigator, Route};

#[test]
fn home_to_camera_and_back() {
    let mut nav = Navigator::new();
    assert_eq!(
        nav.start(),
        vec![NavEvent::Mount(Route::Home), NavEvent::Focus(Route::Home)]
    );

    assert_eq!(
        nav.navigate(Route::CameraScreen),
        vec![
            NavEvent::Blur(Route::Home),
            NavEvent::Mount(Route::CameraScreen),
            NavEvent::Focus(Route::CameraScreen),
        ]
    );
    assert_eq!(nav.current(), Route::CameraScreen);
    assert!(nav.can_go_back());

    assert_eq!(
        nav.back(),
        vec![
            NavEvent::Blur(Route::CameraScreen),
            NavEvent::Unmount(Route::CameraScreen),
            NavEvent::Focus(Route::Home),
        ]
    );
    assert_eq!(nav.current(), Route::Home);
}

#[test]
fn back_at_root_is_a_no_op() {
    let mut nav = Navigator::new();
    assert!(nav.back().is_empty());
    assert_eq!(nav.depth(), 1);
}

#[test]
fn navigating_to_current_route_does_nothing() {
    let mut nav = Navigator::new();
    nav.navigate(Route::CameraScreen);
    assert!(nav.navigate(Route::CameraScreen).is_empty());
    assert_eq!(nav.depth(), 2);
}

#[test]
fn navigating_home_pops_instead_of_pushing() {
    let mut nav = Navigator::new();
    nav.navigate(Route::CameraScreen);
    let events = nav.navigate(Route::Home);
    assert!(events.contains(&NavEvent::Unmount(Route::CameraScreen)));
    assert_eq!(events.last(), Some(&NavEvent::Focus(Route::Home)));
    assert_eq!(nav.depth(), 1);
}

#[test]
fn window_focus_targets_top_route() {
    let mut nav = Navigator::new();
    nav.navigate(Route::CameraScreen);
    assert_eq!(nav.window_focus(false), NavEvent::Blur(Route::CameraScreen));
    assert_eq!(nav.window_focus(true), NavEvent::Focus(Route::CameraScreen));
}

#[test]
fn route_names_round_trip() {
    for route in [Route::Home, Route::CameraScreen] {
        assert_eq!(Route::from_name(route.name()), Some(route));
    }
    assert_eq!(Route::from_name("Settings"), None);
}
