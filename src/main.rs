use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use image::RgbImage;
use minifb::Key;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hand_control::actuator::{Actuator, LoggingActuator, SystemActuator};
use hand_control::args::Args;
use hand_control::camera::{list_cameras, CAMERA_INDICES};
use hand_control::config::{AppConfig, UiConfig};
use hand_control::output::WindowOutput;
use hand_control::overlay::Overlay;
use hand_control::session::{FrameReport, Session, SessionConfig, Tick};
use hand_control::types::Mode;

const TITLE: &str = "Hand Gesture Controller";
/// Screen size reported by the dry-run actuator.
const DRY_RUN_SCREEN: (u32, u32) = (1920, 1080);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hand_control=info,ort=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

fn camera_key(key: Key) -> Option<u32> {
    let index = match key {
        Key::Key0 | Key::NumPad0 => 0,
        Key::Key1 | Key::NumPad1 => 1,
        Key::Key2 | Key::NumPad2 => 2,
        Key::Key3 | Key::NumPad3 => 3,
        Key::Key4 | Key::NumPad4 => 4,
        _ => return None,
    };
    CAMERA_INDICES.contains(&index).then_some(index)
}

fn frame_title(mode: Mode, report: &FrameReport) -> String {
    match (report.volume_percent, report.brightness_percent) {
        (Some(volume), Some(brightness)) => format!(
            "{} | Volume: {} % | Brightness: {} % | FPS: {}",
            TITLE,
            volume,
            brightness,
            report.fps.round() as i32
        ),
        _ => format!("{} | {} | FPS: {}", TITLE, mode.label(), report.fps.round() as i32),
    }
}

struct Controls {
    mode: Mode,
    camera: u32,
}

impl Controls {
    fn idle_title(&self) -> String {
        format!("{} | Stopped | {} | Camera {}", TITLE, self.mode.label(), self.camera)
    }

    fn idle_frame(&self, overlay: &Overlay, size: (u32, u32)) -> RgbImage {
        overlay.idle_frame(size.0, size.1, self.mode, self.camera)
    }
}

fn start_session(config: &AppConfig, controls: &Controls, screen: (u32, u32)) -> Option<Session> {
    let session_config = SessionConfig {
        camera_index: controls.camera,
        ..SessionConfig::for_mode(config, controls.mode)
    };
    match Session::start(session_config, &config.ui, screen) {
        Ok(session) => Some(session),
        Err(e) => {
            error!("Could not start session: {:#}", e);
            None
        }
    }
}

fn build_actuator(args: &Args, config: &AppConfig) -> Result<Box<dyn Actuator>> {
    if args.dry_run {
        println!("{}", "Dry run: no system changes will be made".yellow());
        return Ok(Box::new(LoggingActuator::new(DRY_RUN_SCREEN)));
    }
    let actuator = SystemActuator::new(config.commands.clone()).context("Failed to set up input injection")?;
    Ok(Box::new(actuator))
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if args.list {
        return list_cameras();
    }

    let mut config = AppConfig::load(&args.config)?;
    if let Some(index) = args.cam_index {
        config.camera.index = index;
    }
    if let Some(model) = &args.model {
        config.model.landmark_model = model.clone();
    }
    if let Some(smoothing) = args.smoothing {
        config.gestures.smoothing = smoothing;
    }

    let mut actuator = build_actuator(&args, &config)?;
    let screen = actuator.screen_size();

    let frame_size = (config.camera.width, config.camera.height);
    let mut window = WindowOutput::new(TITLE, frame_size.0 as usize, frame_size.1 as usize)?;
    let idle_overlay = Overlay::new(&UiConfig {
        show_fps: false,
        ..config.ui.clone()
    });

    let mut controls = Controls {
        mode: args.mode,
        camera: config.camera.index,
    };
    let mut session = if args.autostart {
        start_session(&config, &controls, screen)
    } else {
        None
    };
    let mut idle = controls.idle_frame(&idle_overlay, frame_size);

    println!("{}", "Controls: [Space] Start/Stop [M] Mode [0-4] Camera [Esc] Quit".cyan());

    'main: while window.is_open() {
        let mut restart = false;
        let keys = window.keys_pressed();
        for &key in &keys {
            match key {
                Key::Escape => break 'main,
                Key::Space => {
                    if session.take().is_some() {
                        info!("Stopped");
                    } else {
                        restart = true;
                    }
                }
                Key::M => {
                    controls.mode = controls.mode.toggled();
                    info!("Mode: {}", controls.mode.label());
                    restart |= session.is_some();
                }
                other => {
                    if let Some(index) = camera_key(other) {
                        controls.camera = index;
                        info!("Camera: {}", index);
                        restart |= session.is_some();
                    }
                }
            }
        }

        if restart {
            // The old session must release the camera before a new one opens it.
            drop(session.take());
            session = start_session(&config, &controls, screen);
        }
        if !keys.is_empty() {
            idle = controls.idle_frame(&idle_overlay, frame_size);
        }

        let tick = match session.as_mut() {
            Some(running) => running.tick(actuator.as_mut(), Instant::now()),
            None => {
                window.set_title(&controls.idle_title());
                window.update(&idle)?;
                continue;
            }
        };

        match tick {
            Ok(Tick::Frame(report)) => {
                window.set_title(&frame_title(controls.mode, &report));
                window.update(&report.frame)?;
            }
            Ok(Tick::Retry(delay)) => {
                window.refresh();
                std::thread::sleep(delay);
            }
            Err(e) => {
                error!("Session ended: {:#}", e);
                session = None;
            }
        }
    }

    Ok(())
}
