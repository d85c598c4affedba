use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_PATH;
use crate::types::Mode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Camera index, overrides the config file (0-4)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=4))]
    pub cam_index: Option<u32>,

    /// Control mode to start in
    #[arg(long, value_enum, default_value_t = Mode::Media)]
    pub mode: Mode,

    /// Path to the hand landmark ONNX model
    #[arg(long)]
    pub model: Option<String>,

    /// Cursor smoothing factor (1 = none)
    #[arg(long)]
    pub smoothing: Option<f32>,

    /// Log actions instead of touching volume, brightness, keys or the mouse
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Start capturing immediately instead of waiting for Space
    #[arg(long, default_value_t = false)]
    pub autostart: bool,

    /// List available cameras
    #[arg(long)]
    pub list: bool,

    /// Config file, created with defaults if missing
    #[arg(long, default_value = DEFAULT_PATH)]
    pub config: PathBuf,
}
