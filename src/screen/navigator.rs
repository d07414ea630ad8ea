// SPDX-License-Identifier: GPL-3.0-only

//! Stack navigation between the two screens

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    CameraScreen,
}

impl Route {
    pub const INITIAL: Route = Route::Home;

    pub fn name(self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::CameraScreen => "CameraScreen",
        }
    }

    pub fn from_name(name: &str) -> Option<Route> {
        match name {
            "Home" => Some(Route::Home),
            "CameraScreen" => Some(Route::CameraScreen),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle notifications for screens, in the order they happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Mount(Route),
    Focus(Route),
    Blur(Route),
    Unmount(Route),
}

/// Route stack. Screens below the top stay mounted but blurred.
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Route>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            stack: vec![Route::INITIAL],
        }
    }

    /// Events for the initial route
    pub fn start(&self) -> Vec<NavEvent> {
        vec![NavEvent::Mount(Route::INITIAL), NavEvent::Focus(Route::INITIAL)]
    }

    pub fn current(&self) -> Route {
        self.stack.last().copied().unwrap_or(Route::INITIAL)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn can_go_back(&self) -> bool {
        self.stack.len() > 1
    }

    /// Go to `route`. If it is already on the stack, pop back to it
    /// instead of pushing a duplicate.
    pub fn navigate(&mut self, route: Route) -> Vec<NavEvent> {
        let current = self.current();
        if current == route {
            return Vec::new();
        }
        if let Some(index) = self.stack.iter().position(|r| *r == route) {
            let mut events = vec![NavEvent::Blur(current)];
            while self.stack.len() > index + 1 {
                if let Some(popped) = self.stack.pop() {
                    events.push(NavEvent::Unmount(popped));
                }
            }
            events.push(NavEvent::Focus(route));
            return events;
        }
        self.stack.push(route);
        vec![
            NavEvent::Blur(current),
            NavEvent::Mount(route),
            NavEvent::Focus(route),
        ]
    }

    /// Pop the top screen; no-op at the root
    pub fn back(&mut self) -> Vec<NavEvent> {
        if !self.can_go_back() {
            return Vec::new();
        }
        let mut events = Vec::new();
        if let Some(popped) = self.stack.pop() {
            events.push(NavEvent::Blur(popped));
            events.push(NavEvent::Unmount(popped));
        }
        events.push(NavEvent::Focus(self.current()));
        events
    }

    /// Window focus changes apply to the top screen only
    pub fn window_focus(&self, focused: bool) -> NavEvent {
        if focused {
            NavEvent::Focus(self.current())
        } else {
            NavEvent::Blur(self.current())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_home() {
        let nav = Navigator::new();
        assert_eq!(nav.current(), Route::Home);
        assert!(!nav.can_go_back());
    }

    #[test]
    fn navigating_twice_does_not_duplicate() {
        let mut nav = Navigator::new();
        nav.navigate(Route::CameraScreen);
        assert!(nav.navigate(Route::CameraScreen).is_empty());
        assert_eq!(nav.depth(), 2);
    }

    #[test]
    fn route_names_roundtrip() {
        for route in [Route::Home, Route::CameraScreen] {
            assert_eq!(Route::from_name(route.name()), Some(route));
        }
        assert_eq!(Route::from_name("Settings"), None);
    }
}
