use anyhow::{anyhow, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use hand_control::actuator::{ActuatorCall, RecordingActuator};
use hand_control::camera::FrameSource;
use hand_control::config::{AppConfig, UiConfig};
use hand_control::overlay::Overlay;
use hand_control::pipeline::{simulated_hand, Pipeline, SimulatedPose};
use hand_control::session::{CaptureBackoff, Session, SessionConfig, Tick};
use hand_control::types::{HandLandmarks, MediaKey, Mode};

const SCREEN: (u32, u32) = (1920, 1080);
const CENTER: (f32, f32) = (320.0, 240.0);

struct BlankCamera {
    broken: bool,
}

impl FrameSource for BlankCamera {
    fn capture(&mut self) -> Result<RgbImage> {
        if self.broken {
            Err(anyhow!("device unplugged"))
        } else {
            Ok(RgbImage::new(640, 480))
        }
    }

    fn resolution(&self) -> (u32, u32) {
        (640, 480)
    }

    fn name(&self) -> String {
        "blank".to_string()
    }
}

/// Plays back a fixed list of poses, one per frame, then reports no hand.
struct ScriptedHands {
    poses: VecDeque<Option<SimulatedPose>>,
}

impl ScriptedHands {
    fn new(poses: &[Option<SimulatedPose>]) -> Self {
        Self {
            poses: poses.iter().copied().collect(),
        }
    }
}

impl Pipeline for ScriptedHands {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn process(&mut self, _frame: &RgbImage) -> Result<Vec<HandLandmarks>> {
        Ok(match self.poses.pop_front().flatten() {
            Some(pose) => vec![simulated_hand(pose, CENTER)],
            None => Vec::new(),
        })
    }
}

fn session(mode: Mode, poses: &[Option<SimulatedPose>]) -> Session {
    let config = SessionConfig::for_mode(&AppConfig::default(), mode);
    Session::with_parts(
        config,
        Box::new(BlankCamera { broken: false }),
        Box::new(ScriptedHands::new(poses)),
        Overlay::bitmap(&UiConfig::default()),
        SCREEN,
    )
}

fn media_keys(calls: &[ActuatorCall]) -> Vec<MediaKey> {
    calls
        .iter()
        .filter_map(|c| match c {
            ActuatorCall::MediaKey(k) => Some(*k),
            _ => None,
        })
        .collect()
}

fn frame(tick: Tick) -> hand_control::session::FrameReport {
    match tick {
        Tick::Frame(report) => report,
        Tick::Retry(_) => panic!("expected a frame"),
    }
}

#[test]
fn test_play_pause_fires_once_per_cooldown() {
    let play = Some(SimulatedPose::PlayPause);
    let mut s = session(Mode::Media, &[play, play, play]);
    let mut rec = RecordingActuator::new(SCREEN);
    let t0 = Instant::now();

    s.tick(&mut rec, t0).unwrap();
    s.tick(&mut rec, t0 + Duration::from_millis(100)).unwrap();
    assert_eq!(media_keys(&rec.calls), vec![MediaKey::PlayPause]);

    s.tick(&mut rec, t0 + Duration::from_millis(600)).unwrap();
    assert_eq!(media_keys(&rec.calls), vec![MediaKey::PlayPause, MediaKey::PlayPause]);
}

#[test]
fn test_repeated_volume_is_sent_once() {
    let pose = Some(SimulatedPose::Volume { pinch: 125.0 });
    let mut s = session(Mode::Media, &[pose, pose, pose]);
    let mut rec = RecordingActuator::new(SCREEN);
    let t0 = Instant::now();

    for i in 0..3 {
        let report = frame(s.tick(&mut rec, t0 + Duration::from_millis(33 * i)).unwrap());
        assert_eq!(report.volume_percent, Some(50));
        assert_eq!(report.hands, 1);
    }
    let volumes: Vec<_> = rec
        .calls
        .iter()
        .filter(|c| matches!(c, ActuatorCall::Volume(_)))
        .collect();
    assert_eq!(volumes, vec![&ActuatorCall::Volume(0.5)]);
}

#[test]
fn test_volume_resent_after_failed_call() {
    let pose = Some(SimulatedPose::Volume { pinch: 125.0 });
    let mut s = session(Mode::Media, &[pose, pose, pose]);
    let mut rec = RecordingActuator::new(SCREEN);
    let t0 = Instant::now();

    rec.fail = true;
    let report = frame(s.tick(&mut rec, t0).unwrap());
    assert!(report.actuator_failures > 0);

    rec.fail = false;
    s.tick(&mut rec, t0 + Duration::from_millis(33)).unwrap();
    s.tick(&mut rec, t0 + Duration::from_millis(66)).unwrap();
    let volumes: Vec<_> = rec
        .calls
        .iter()
        .filter(|c| matches!(c, ActuatorCall::Volume(_)))
        .collect();
    assert_eq!(volumes, vec![&ActuatorCall::Volume(0.5)]);
}

#[test]
fn test_no_hand_keeps_last_levels() {
    let mut s = session(Mode::Media, &[Some(SimulatedPose::Volume { pinch: 200.0 }), None]);
    let mut rec = RecordingActuator::new(SCREEN);
    let t0 = Instant::now();

    frame(s.tick(&mut rec, t0).unwrap());
    let report = frame(s.tick(&mut rec, t0 + Duration::from_millis(33)).unwrap());
    assert_eq!(report.hands, 0);
    assert!(report.events.is_empty());
    assert_eq!(report.volume_percent, Some(100));
}

#[test]
fn test_mouse_mode_smooths_cursor() {
    let point = Some(SimulatedPose::Point { tip: (320.0, 240.0) });
    let mut s = session(Mode::Mouse, &[point, point]);
    let mut rec = RecordingActuator::new(SCREEN);
    let t0 = Instant::now();

    let report = frame(s.tick(&mut rec, t0).unwrap());
    assert_eq!(report.volume_percent, None);
    s.tick(&mut rec, t0 + Duration::from_millis(33)).unwrap();

    let moves: Vec<(f32, f32)> = rec
        .calls
        .iter()
        .filter_map(|c| match c {
            ActuatorCall::MoveCursor(x, y) => Some((*x, *y)),
            _ => None,
        })
        .collect();
    assert_eq!(moves.len(), 2);
    assert!((moves[0].0 - 960.0 / 7.0).abs() < 0.01);
    assert!((moves[0].1 - 540.0 / 7.0).abs() < 0.01);
    // second step closes another seventh of the remaining gap
    let expected_x = moves[0].0 + (960.0 - moves[0].0) / 7.0;
    assert!((moves[1].0 - expected_x).abs() < 0.01);
}

#[test]
fn test_click_in_mouse_mode() {
    let mut s = session(Mode::Mouse, &[Some(SimulatedPose::Click)]);
    let mut rec = RecordingActuator::new(SCREEN);
    s.tick(&mut rec, Instant::now()).unwrap();
    assert_eq!(rec.calls, vec![ActuatorCall::Click]);
}

#[test]
fn test_actuator_failures_do_not_stop_the_session() {
    let pose = Some(SimulatedPose::Volume { pinch: 125.0 });
    let mut s = session(Mode::Media, &[pose]);
    let mut rec = RecordingActuator::new(SCREEN);
    rec.fail = true;

    let report = frame(s.tick(&mut rec, Instant::now()).unwrap());
    assert!(report.actuator_failures > 0);
    assert!(rec.calls.is_empty());
}

#[test]
fn test_capture_failures_back_off_then_give_up() {
    let config = SessionConfig::for_mode(&AppConfig::default(), Mode::Media);
    let mut s = Session::with_parts(
        config,
        Box::new(BlankCamera { broken: true }),
        Box::new(ScriptedHands::new(&[])),
        Overlay::bitmap(&UiConfig::default()),
        SCREEN,
    )
    .with_backoff(CaptureBackoff::new(Duration::from_millis(10), Duration::from_millis(500), 3));
    let mut rec = RecordingActuator::new(SCREEN);
    let now = Instant::now();

    assert!(matches!(s.tick(&mut rec, now).unwrap(), Tick::Retry(d) if d == Duration::from_millis(10)));
    assert!(matches!(s.tick(&mut rec, now).unwrap(), Tick::Retry(d) if d == Duration::from_millis(20)));
    assert!(s.tick(&mut rec, now).is_err());
    assert_eq!(s.frames(), 0);
}
