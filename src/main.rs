// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use snapcam::app::AppModel;
use snapcam::backends::camera::Facing;
use snapcam::i18n;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "snapcam")]
#[command(about = "Two-screen camera app: capture, record, review and scan codes")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FacingArg {
    Front,
    Back,
}

impl From<FacingArg> for Facing {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::Front => Facing::Front,
            FacingArg::Back => Facing::Back,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the screens in the terminal
    Terminal,

    /// List available cameras
    List,

    /// Take a photo
    Photo {
        #[arg(short, long, value_enum, default_value = "back")]
        facing: FacingArg,

        /// Output file path (default: ~/Pictures/snapcam/IMG_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a video
    Video {
        #[arg(short, long, value_enum, default_value = "back")]
        facing: FacingArg,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Output file path (default: ~/Videos/snapcam/VID_TIMESTAMP.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record without a microphone track
        #[arg(long)]
        no_audio: bool,
    },

    /// Scan QR and EAN-13 codes
    Scan {
        #[arg(short, long, value_enum, default_value = "back")]
        facing: FacingArg,

        /// Give up after this many seconds
        #[arg(short, long, default_value = "30")]
        timeout: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG controls the level, e.g. RUST_LOG=snapcam=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Terminal) => snapcam::terminal::run(),
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Photo { facing, output }) => cli::take_photo(facing.into(), output),
        Some(Commands::Video {
            facing,
            duration,
            output,
            no_audio,
        }) => cli::record_video(facing.into(), duration, output, no_audio),
        Some(Commands::Scan { facing, timeout }) => cli::scan(facing.into(), timeout),
        None => run_gui(),
    }
}

fn run_gui() -> Result<(), Box<dyn std::error::Error>> {
    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();
    i18n::init(&requested_languages);

    let settings = cosmic::app::Settings::default().size_limits(
        cosmic::iced::Limits::NONE
            .min_width(360.0)
            .min_height(480.0),
    );

    cosmic::app::run::<AppModel>(settings, ())?;

    Ok(())
}
