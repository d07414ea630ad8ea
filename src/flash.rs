// SPDX-License-Identifier: GPL-3.0-only

//! Flash selection and the LEDs that realise it
//!
//! Flash LEDs are exposed at `/sys/class/leds/*:flash`. The brightness file
//! is used in torch mode, which is group-writable by `feedbackd` on phones.
//! When no LED is usable the front end falls back to a white screen flash.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Flash selection applied to the next capture or recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashMode {
    #[default]
    Off,
    On,
}

impl FlashMode {
    pub fn toggled(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Off,
        }
    }

    pub fn is_on(self) -> bool {
        self == FlashMode::On
    }

    /// Symbolic icon for the toggle button
    pub fn icon_name(self) -> &'static str {
        match self {
            FlashMode::Off => "camera-flash-off-symbolic",
            FlashMode::On => "camera-flash-symbolic",
        }
    }
}

impl fmt::Display for FlashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashMode::Off => write!(f, "off"),
            FlashMode::On => write!(f, "on"),
        }
    }
}

/// A flash LED discovered via sysfs
#[derive(Debug, Clone)]
pub struct FlashDevice {
    path: PathBuf,
    max_brightness: u32,
    name: String,
}

impl FlashDevice {
    /// Scan `/sys/class/leds/` for writable `*:flash` entries
    pub fn discover() -> Vec<FlashDevice> {
        Self::discover_in(Path::new("/sys/class/leds"))
    }

    pub fn discover_in(leds_dir: &Path) -> Vec<FlashDevice> {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            warn!(dir = %leds_dir.display(), "Cannot read LED class directory, flash discovery skipped");
            return Vec::new();
        };

        let mut devices: Vec<FlashDevice> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                if !name.ends_with(":flash") {
                    return None;
                }
                Self::inspect(entry.path(), name)
            })
            .collect();

        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    fn inspect(path: PathBuf, name: String) -> Option<FlashDevice> {
        let max_path = path.join("max_brightness");
        let max_brightness = match std::fs::read_to_string(&max_path) {
            Ok(s) => match s.trim().parse::<u32>() {
                Ok(v) if v > 0 => v,
                _ => {
                    warn!(path = %max_path.display(), "Invalid max_brightness value");
                    return None;
                }
            },
            Err(e) => {
                warn!(path = %max_path.display(), error = %e, "Cannot read max_brightness");
                return None;
            }
        };

        let brightness = path.join("brightness");
        if let Err(e) = std::fs::OpenOptions::new().write(true).open(&brightness) {
            warn!(
                path = %brightness.display(),
                error = %e,
                "Flash LED found but not writable, user may need to be in 'feedbackd' group"
            );
            return None;
        }

        info!(name = %name, max_brightness, "Discovered flash LED");
        Some(FlashDevice {
            path,
            max_brightness,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set raw brightness value (0 = off, max_brightness = full)
    pub fn set_brightness(&self, value: u32) -> io::Result<()> {
        let clamped = value.min(self.max_brightness);
        std::fs::write(self.path.join("brightness"), clamped.to_string())
    }

    pub fn off(&self) -> io::Result<()> {
        self.set_brightness(0)
    }

    /// Turn on at a fraction of max brightness
    pub fn torch(&self, intensity: f32) -> io::Result<()> {
        let value = (intensity.clamp(0.0, 1.0) * self.max_brightness as f32).round() as u32;
        self.set_brightness(value)
    }
}

/// All flash LEDs, driven together
#[derive(Debug, Clone, Default)]
pub struct FlashUnit {
    devices: Vec<FlashDevice>,
}

impl FlashUnit {
    pub fn detect() -> Self {
        Self {
            devices: FlashDevice::discover(),
        }
    }

    pub fn from_devices(devices: Vec<FlashDevice>) -> Self {
        Self { devices }
    }

    /// Whether a hardware LED can be driven
    pub fn has_hardware(&self) -> bool {
        !self.devices.is_empty()
    }

    pub fn set(&self, on: bool) {
        for dev in &self.devices {
            let result = if on { dev.torch(1.0) } else { dev.off() };
            if let Err(e) = result {
                warn!(device = %dev.name, on, error = %e, "Failed to switch flash LED");
            }
        }
    }
}

/// The LEDs as lit for the capture in progress.
///
/// Only a photo or recording request switches the LED, using the flash mode
/// that request carried. Changing the selection afterwards leaves it alone.
#[derive(Debug, Default)]
pub struct Torch {
    unit: FlashUnit,
    lit: bool,
}

impl Torch {
    pub fn new(unit: FlashUnit) -> Self {
        Self { unit, lit: false }
    }

    pub fn has_hardware(&self) -> bool {
        self.unit.has_hardware()
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Light the LED for a request made with `mode`. Returns whether it is lit.
    pub fn light_for(&mut self, mode: FlashMode) -> bool {
        if mode.is_on() && self.unit.has_hardware() {
            self.switch(true);
        }
        self.lit
    }

    pub fn release(&mut self) {
        self.switch(false);
    }

    fn switch(&mut self, on: bool) {
        if self.lit != on {
            info!(on, "Switching flash LED");
            self.unit.set(on);
            self.lit = on;
        }
    }
}
