//! OS-facing side effects: volume, brightness, media keys and the pointer.

use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use std::process::Command;
use tracing::{debug, info};

use crate::config::CommandConfig;
use crate::error::{ActuatorError, ActuatorResult};
use crate::types::{GestureEvent, MediaKey};

/// Fire-and-forget OS controls. Failures are reported, never retried.
pub trait Actuator {
    /// `level` in `[0, 1]`.
    fn set_volume_scalar(&mut self, level: f32) -> ActuatorResult<()>;
    /// `percent` in `[0, 100]`.
    fn set_brightness(&mut self, percent: u8) -> ActuatorResult<()>;
    fn send_media_key(&mut self, key: MediaKey) -> ActuatorResult<()>;
    fn move_cursor(&mut self, x: f32, y: f32) -> ActuatorResult<()>;
    fn click(&mut self) -> ActuatorResult<()>;
    fn screen_size(&self) -> (u32, u32);
}

/// Routes one gesture to the matching actuator call.
pub fn apply_event(actuator: &mut dyn Actuator, event: GestureEvent) -> ActuatorResult<()> {
    match event {
        GestureEvent::SetVolume(percent) => actuator.set_volume_scalar(percent as f32 / 100.0),
        GestureEvent::SetBrightness(percent) => actuator.set_brightness(percent),
        GestureEvent::MoveCursor(x, y) => actuator.move_cursor(x, y),
        GestureEvent::Click => actuator.click(),
        transport => match transport.media_key() {
            Some(key) => actuator.send_media_key(key),
            None => Ok(()),
        },
    }
}

/// Substitutes `{percent}`, `{scalar}` and `{u16}` in a command template.
pub fn expand_template(template: &[String], level: f32) -> Vec<String> {
    let percent = (level * 100.0).round() as u32;
    let scalar = format!("{:.2}", level);
    let word = (level * 65535.0).round() as u32;
    template
        .iter()
        .map(|arg| {
            arg.replace("{percent}", &percent.to_string())
                .replace("{scalar}", &scalar)
                .replace("{u16}", &word.to_string())
        })
        .collect()
}

fn run_command(argv: &[String], what: &'static str) -> ActuatorResult<()> {
    let (program, args) = argv.split_first().ok_or(ActuatorError::Unconfigured(what))?;
    debug!(%program, ?args, "running {} command", what);
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| ActuatorError::Spawn {
            program: program.clone(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(ActuatorError::Command {
            program: program.clone(),
            status: status.to_string(),
        })
    }
}

fn check_unit(level: f32) -> ActuatorResult<()> {
    if (0.0..=1.0).contains(&level) {
        Ok(())
    } else {
        Err(ActuatorError::InvalidValue(level))
    }
}

/// Real OS actuator: enigo for input injection, helper commands for volume/brightness.
pub struct SystemActuator {
    enigo: Enigo,
    commands: CommandConfig,
    screen: (u32, u32),
}

impl SystemActuator {
    pub fn new(commands: CommandConfig) -> ActuatorResult<Self> {
        let enigo = Enigo::new(&Settings::default())?;
        let (w, h) = enigo.main_display()?;
        info!("Screen size: {}x{}", w, h);
        Ok(Self {
            enigo,
            commands,
            screen: (w.max(1) as u32, h.max(1) as u32),
        })
    }
}

impl Actuator for SystemActuator {
    fn set_volume_scalar(&mut self, level: f32) -> ActuatorResult<()> {
        check_unit(level)?;
        run_command(&expand_template(&self.commands.volume, level), "volume")
    }

    fn set_brightness(&mut self, percent: u8) -> ActuatorResult<()> {
        if percent > 100 {
            return Err(ActuatorError::InvalidValue(percent as f32));
        }
        let level = percent as f32 / 100.0;
        run_command(&expand_template(&self.commands.brightness, level), "brightness")
    }

    fn send_media_key(&mut self, key: MediaKey) -> ActuatorResult<()> {
        let key = match key {
            MediaKey::PlayPause => Key::MediaPlayPause,
            MediaKey::Next => Key::MediaNextTrack,
            MediaKey::Prev => Key::MediaPrevTrack,
        };
        self.enigo.key(key, Direction::Click)?;
        Ok(())
    }

    fn move_cursor(&mut self, x: f32, y: f32) -> ActuatorResult<()> {
        let x = (x.round() as i32).clamp(0, self.screen.0 as i32 - 1);
        let y = (y.round() as i32).clamp(0, self.screen.1 as i32 - 1);
        self.enigo.move_mouse(x, y, Coordinate::Abs)?;
        Ok(())
    }

    fn click(&mut self) -> ActuatorResult<()> {
        self.enigo.button(Button::Left, Direction::Click)?;
        Ok(())
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }
}

/// Dry-run actuator: logs every call and touches nothing.
pub struct LoggingActuator {
    screen: (u32, u32),
}

impl LoggingActuator {
    pub fn new(screen: (u32, u32)) -> Self {
        Self { screen }
    }
}

impl Actuator for LoggingActuator {
    fn set_volume_scalar(&mut self, level: f32) -> ActuatorResult<()> {
        check_unit(level)?;
        info!("[dry-run] volume -> {:.2}", level);
        Ok(())
    }

    fn set_brightness(&mut self, percent: u8) -> ActuatorResult<()> {
        info!("[dry-run] brightness -> {}%", percent);
        Ok(())
    }

    fn send_media_key(&mut self, key: MediaKey) -> ActuatorResult<()> {
        info!("[dry-run] media key {:?}", key);
        Ok(())
    }

    fn move_cursor(&mut self, x: f32, y: f32) -> ActuatorResult<()> {
        debug!("[dry-run] cursor -> ({:.0}, {:.0})", x, y);
        Ok(())
    }

    fn click(&mut self) -> ActuatorResult<()> {
        info!("[dry-run] click");
        Ok(())
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Volume(f32),
    Brightness(u8),
    MediaKey(MediaKey),
    MoveCursor(f32, f32),
    Click,
}

/// Keeps every call in memory. Optionally rejects calls to exercise error paths.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub calls: Vec<ActuatorCall>,
    pub screen: (u32, u32),
    pub fail: bool,
}

impl RecordingActuator {
    pub fn new(screen: (u32, u32)) -> Self {
        Self {
            calls: Vec::new(),
            screen,
            fail: false,
        }
    }

    fn record(&mut self, call: ActuatorCall) -> ActuatorResult<()> {
        if self.fail {
            return Err(ActuatorError::Command {
                program: "recording".to_string(),
                status: "rejected".to_string(),
            });
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Actuator for RecordingActuator {
    fn set_volume_scalar(&mut self, level: f32) -> ActuatorResult<()> {
        check_unit(level)?;
        self.record(ActuatorCall::Volume(level))
    }

    fn set_brightness(&mut self, percent: u8) -> ActuatorResult<()> {
        self.record(ActuatorCall::Brightness(percent))
    }

    fn send_media_key(&mut self, key: MediaKey) -> ActuatorResult<()> {
        self.record(ActuatorCall::MediaKey(key))
    }

    fn move_cursor(&mut self, x: f32, y: f32) -> ActuatorResult<()> {
        self.record(ActuatorCall::MoveCursor(x, y))
    }

    fn click(&mut self) -> ActuatorResult<()> {
        self.record(ActuatorCall::Click)
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }
}
