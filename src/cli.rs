// SPDX-License-Identifier: GPL-3.0-only

//! Headless commands: list cameras, take a photo, record a clip, scan codes

use snapcam::backends::camera::{
    self, CameraDevice, DevicePreferences, Facing, FrameReceiver, PreviewSession,
};
use snapcam::backends::{audio, recorder};
use snapcam::config::Config;
use snapcam::constants::{BitratePreset, app_info, file_formats, pipeline};
use snapcam::errors::{AppError, AppResult};
use snapcam::screen::{CodeScanner, SharedZoom};
use snapcam::storage;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Frames dropped while auto-exposure settles
const WARMUP: Duration = Duration::from_millis(800);

/// List available cameras
pub fn list_cameras() -> CliResult {
    snapcam::runtime::init();
    let cameras = camera::get_backend().enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, cam) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, cam.name);
        println!("      Path: {}", cam.path);
        println!("      Position: {:?}", cam.position);
        println!("      Zoom: {:?}", cam.zoom);
    }

    Ok(())
}

/// Running preview plus its frame stream
struct Capture {
    _session: PreviewSession,
    frames: FrameReceiver,
    device: CameraDevice,
}

impl Capture {
    fn open(facing: Facing, config: &Config) -> AppResult<Self> {
        snapcam::runtime::init();
        let backend = camera::get_backend();
        let devices = backend.enumerate_cameras();
        let prefs = DevicePreferences {
            front_path: config.front_camera.clone(),
            back_path: config.back_camera.clone(),
            prefer_ultra_wide: config.prefer_ultra_wide,
        };
        let device = camera::select_device(&devices, facing, &prefs)
            .ok_or(AppError::DeviceUnavailable(facing))?;
        println!("Using camera: {device}");

        let range = camera::zoom_range(&device, config.max_digital_zoom);
        let zoom = SharedZoom::new(range.neutral);
        let (sender, frames) = futures::channel::mpsc::channel(pipeline::FRAME_CHANNEL_CAPACITY);
        let session = backend
            .start_preview(&device, zoom, range, sender)
            .map_err(|e| AppError::Other(e.to_string()))?;

        Ok(Self {
            _session: session,
            frames,
            device,
        })
    }

    /// Next frame, waiting at most `timeout`
    fn next_frame(&mut self, timeout: Duration) -> Option<Arc<camera::CameraFrame>> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            match self.frames.try_next() {
                Ok(Some(frame)) => return Some(frame),
                // Pipeline closed the channel
                Ok(None) => return None,
                Err(_) => std::thread::sleep(Duration::from_millis(5)),
            }
        }
        None
    }

    /// Keep reading until the warm-up has passed, returning the newest frame
    fn settled_frame(&mut self) -> Option<Arc<camera::CameraFrame>> {
        let start = Instant::now();
        let mut latest = None;
        while start.elapsed() < WARMUP || latest.is_none() {
            match self.next_frame(Duration::from_secs(5)) {
                Some(frame) => latest = Some(frame),
                None => break,
            }
        }
        latest
    }
}

fn stop_flag() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;
    Ok(flag)
}

fn move_to(saved: PathBuf, output: Option<PathBuf>) -> Result<PathBuf, std::io::Error> {
    let Some(output) = output else {
        return Ok(saved);
    };
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    // Rename fails across filesystems
    if std::fs::rename(&saved, &output).is_err() {
        std::fs::copy(&saved, &output)?;
        std::fs::remove_file(&saved)?;
    }
    Ok(output)
}

/// Take a single photo
pub fn take_photo(facing: Facing, output: Option<PathBuf>) -> CliResult {
    let (_, config) = Config::load(app_info::APP_ID);
    let mut capture = Capture::open(facing, &config)?;

    println!("Capturing...");
    let frame = capture
        .settled_frame()
        .ok_or_else(|| format!("No frames from {}", capture.device))?;

    let dir = storage::photo_directory(config.save_dir_override());
    let saved = storage::save_photo(&frame, &dir)?;
    let path = move_to(saved, output)?;

    println!("Photo saved: {}", path.display());
    println!("Resolution: {}x{}", frame.width, frame.height);
    Ok(())
}

/// Record a clip until `duration` elapses or Ctrl+C
pub fn record_video(
    facing: Facing,
    duration: u64,
    output: Option<PathBuf>,
    no_audio: bool,
) -> CliResult {
    let (_, config) = Config::load(app_info::APP_ID);
    let mut capture = Capture::open(facing, &config)?;
    let first = capture
        .next_frame(Duration::from_secs(5))
        .ok_or_else(|| format!("No frames from {}", capture.device))?;

    let audio = !no_audio && config.record_audio && audio::microphone_available();
    let output = output.unwrap_or_else(|| {
        storage::timestamped_path(
            &storage::video_directory(config.save_dir_override()),
            file_formats::VIDEO_PREFIX,
            file_formats::VIDEO_EXTENSION,
        )
    });
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    println!("Recording to: {}", output.display());
    println!("Resolution: {}x{}", first.width, first.height);
    println!("Audio: {}", if audio { "enabled" } else { "disabled" });
    println!("Duration: {duration} seconds (Ctrl+C to stop early)");

    let mut handle = recorder::start_recording(recorder::RecordingRequest {
        output,
        width: first.width,
        height: first.height,
        audio,
        bitrate_kbps: BitratePreset::default().bitrate_kbps(first.width),
    })?;
    let outcome = handle.take_outcome();
    handle.push_frame(first);

    let stop = stop_flag()?;
    let start = Instant::now();
    let target = Duration::from_secs(duration);
    let mut last_print = 0;

    while start.elapsed() < target {
        if stop.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        if let Some(frame) = capture.next_frame(Duration::from_millis(100)) {
            handle.push_frame(frame);
        }
        let elapsed = start.elapsed().as_secs();
        if elapsed != last_print {
            last_print = elapsed;
            print!("\rRecording... {elapsed}/{duration}s");
            use std::io::Write;
            let _ = std::io::stdout().flush();
        }
    }
    println!();

    handle.stop();
    let Some(outcome) = outcome else {
        return Err("Recording outcome unavailable".into());
    };
    let path = futures::executor::block_on(outcome)?;
    println!("Video saved: {}", path.display());
    Ok(())
}

/// Print every code seen until one is found or `timeout` seconds pass
pub fn scan(facing: Facing, timeout: u64) -> CliResult {
    let (_, config) = Config::load(app_info::APP_ID);
    let mut capture = Capture::open(facing, &config)?;
    let scanner = CodeScanner::default();
    let stop = stop_flag()?;

    println!("Scanning for {timeout} seconds (Ctrl+C to stop)...");
    let start = Instant::now();
    let interval = Duration::from_millis(config.scan_interval_ms);
    let mut last_scan: Option<Instant> = None;

    while start.elapsed() < Duration::from_secs(timeout) && !stop.load(Ordering::SeqCst) {
        let Some(frame) = capture.next_frame(Duration::from_millis(200)) else {
            continue;
        };
        if last_scan.is_some_and(|at| at.elapsed() < interval) {
            continue;
        }
        last_scan = Some(Instant::now());

        let codes = scanner.scan(&frame);
        if !codes.is_empty() {
            println!("Scanned {} codes!", codes.len());
            for code in &codes {
                println!("  {code}");
            }
            return Ok(());
        }
    }

    println!("No codes found.");
    Ok(())
}
