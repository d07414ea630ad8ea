// SPDX-License-Identifier: GPL-3.0-only

//! Permission gate for camera and microphone access

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionKind {
    Camera,
    Microphone,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::Camera => write!(f, "Camera"),
            PermissionKind::Microphone => write!(f, "Microphone"),
        }
    }
}

/// Access state of one permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionStatus {
    /// Not checked yet
    #[default]
    Unknown,
    /// Checked, not granted, request in flight
    Requesting,
    Granted,
    Denied,
}

/// Overall outcome of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Denied(PermissionKind),
    Open,
}

/// Tracks both permissions, requesting each at most once per mount
#[derive(Debug, Clone, Default)]
pub struct PermissionGate {
    camera: PermissionStatus,
    microphone: PermissionStatus,
    camera_requested: bool,
    microphone_requested: bool,
}

impl PermissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, kind: PermissionKind) -> PermissionStatus {
        match kind {
            PermissionKind::Camera => self.camera,
            PermissionKind::Microphone => self.microphone,
        }
    }

    /// Record the initial check. Returns the permissions that still need a
    /// request; each kind is returned at most once for the gate's lifetime.
    pub fn checked(&mut self, camera: bool, microphone: bool) -> Vec<PermissionKind> {
        let mut requests = Vec::new();
        for (kind, granted) in [
            (PermissionKind::Camera, camera),
            (PermissionKind::Microphone, microphone),
        ] {
            if granted {
                self.set(kind, PermissionStatus::Granted);
            } else if self.status(kind) == PermissionStatus::Requesting {
                // Still waiting on the answer
            } else if !self.take_request(kind) {
                self.set(kind, PermissionStatus::Denied);
            } else {
                self.set(kind, PermissionStatus::Requesting);
                requests.push(kind);
            }
        }
        requests
    }

    /// Record the answer to a request. Answers to requests that are not in
    /// flight are ignored.
    pub fn resolved(&mut self, kind: PermissionKind, granted: bool) {
        if self.status(kind) != PermissionStatus::Requesting {
            return;
        }
        let status = if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        self.set(kind, status);
    }

    pub fn state(&self) -> GateState {
        match (self.camera, self.microphone) {
            (PermissionStatus::Granted, PermissionStatus::Granted) => GateState::Open,
            (PermissionStatus::Denied, _) => GateState::Denied(PermissionKind::Camera),
            (_, PermissionStatus::Denied) => GateState::Denied(PermissionKind::Microphone),
            _ => GateState::Pending,
        }
    }

    fn take_request(&mut self, kind: PermissionKind) -> bool {
        let flag = match kind {
            PermissionKind::Camera => &mut self.camera_requested,
            PermissionKind::Microphone => &mut self.microphone_requested,
        };
        !std::mem::replace(flag, true)
    }

    fn set(&mut self, kind: PermissionKind, status: PermissionStatus) {
        match kind {
            PermissionKind::Camera => self.camera = status,
            PermissionKind::Microphone => self.microphone = status,
        }
    }
}
