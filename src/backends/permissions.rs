// SPDX-License-Identifier: GPL-3.0-only

//! Camera and microphone access checks
//!
//! Sandboxed builds ask the XDG camera portal over D-Bus. Native builds have
//! no prompt: access means the device nodes can be opened. The microphone
//! has no desktop permission prompt, so it is granted when PipeWire exposes
//! an audio source.

use crate::constants::{app_info, timing};
use crate::screen::permission::PermissionKind;
use futures::StreamExt;
use std::collections::HashMap;
use std::io::ErrorKind;
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

const PORTAL_SERVICE: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const CAMERA_INTERFACE: &str = "org.freedesktop.portal.Camera";
const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

/// Current status of both permissions, without prompting
pub async fn check_all() -> (bool, bool) {
    let camera = check(PermissionKind::Camera).await;
    let microphone = check(PermissionKind::Microphone).await;
    (camera, microphone)
}

/// Status without prompting
pub async fn check(kind: PermissionKind) -> bool {
    match kind {
        PermissionKind::Camera => {
            // The portal only answers through a prompt
            !app_info::is_flatpak() && devices_accessible()
        }
        PermissionKind::Microphone => microphone_granted().await,
    }
}

/// Prompt where a prompt exists; resolves to the grant result
pub async fn request(kind: PermissionKind) -> bool {
    match kind {
        PermissionKind::Camera => match access_camera_portal().await {
            Ok(granted) => granted,
            Err(e) => {
                warn!(error = %e, "Camera portal unavailable, checking device access");
                devices_accessible()
            }
        },
        PermissionKind::Microphone => microphone_granted().await,
    }
}

async fn microphone_granted() -> bool {
    tokio::task::spawn_blocking(super::audio::microphone_available)
        .await
        .unwrap_or(false)
}

/// Native access: denied only when every video node refuses us
pub fn devices_accessible() -> bool {
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return false;
    };
    let outcomes: Vec<Result<(), ErrorKind>> = entries
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("video"))
        .map(|e| {
            std::fs::File::options()
                .read(true)
                .write(true)
                .open(e.path())
                .map(|_| ())
                .map_err(|err| err.kind())
        })
        .collect();
    access_from_outcomes(&outcomes)
}

/// No nodes at all is not a denial; the screen reports the missing device
pub fn access_from_outcomes(outcomes: &[Result<(), ErrorKind>]) -> bool {
    outcomes.is_empty()
        || outcomes
            .iter()
            .any(|o| !matches!(o, Err(ErrorKind::PermissionDenied)))
}

/// Object path the portal will use for a request with `token`
pub fn request_path(unique_name: &str, token: &str) -> String {
    let sender = unique_name.trim_start_matches(':').replace('.', "_");
    format!("{PORTAL_PATH}/request/{sender}/{token}")
}

async fn access_camera_portal() -> zbus::Result<bool> {
    let connection = zbus::Connection::session().await?;

    let camera = zbus::Proxy::new(&connection, PORTAL_SERVICE, PORTAL_PATH, CAMERA_INTERFACE).await?;
    let present: bool = camera.get_property("IsCameraPresent").await?;
    debug!(present, "Camera portal answered");

    let token = format!("snapcam_{}", uuid::Uuid::new_v4().simple());
    let unique_name = connection
        .unique_name()
        .map(|n| n.as_str().to_string())
        .unwrap_or_default();
    let expected = request_path(&unique_name, &token);

    // Subscribe before calling so the response cannot be missed
    let request = zbus::Proxy::new(&connection, PORTAL_SERVICE, expected, REQUEST_INTERFACE).await?;
    let mut responses = request.receive_signal("Response").await?;

    let mut options: HashMap<&str, Value<'_>> = HashMap::new();
    options.insert("handle_token", Value::from(token.as_str()));
    let handle: OwnedObjectPath = camera.call("AccessCamera", &(options,)).await?;
    debug!(handle = %handle, "Camera access requested");

    let response = tokio::time::timeout(timing::PORTAL_TIMEOUT, responses.next())
        .await
        .map_err(|_| zbus::Error::Failure("Camera portal timed out".into()))?
        .ok_or_else(|| zbus::Error::Failure("Portal closed the request".into()))?;

    let (code, _results): (u32, HashMap<String, OwnedValue>) = response.body().deserialize()?;
    let granted = code == 0;
    info!(code, granted, "Camera portal response");
    Ok(granted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_path_follows_portal_convention() {
        assert_eq!(
            request_path(":1.42", "snapcam_abc"),
            "/org/freedesktop/portal/desktop/request/1_42/snapcam_abc"
        );
    }

    #[test]
    fn access_needs_only_one_openable_node() {
        assert!(access_from_outcomes(&[]));
        assert!(access_from_outcomes(&[
            Err(ErrorKind::PermissionDenied),
            Ok(())
        ]));
        assert!(access_from_outcomes(&[Err(ErrorKind::NotFound)]));
        assert!(!access_from_outcomes(&[
            Err(ErrorKind::PermissionDenied),
            Err(ErrorKind::PermissionDenied)
        ]));
    }
}
