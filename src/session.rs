//! One running capture session: camera, landmark pipeline, mode controller and overlay.
//!
//! A session owns its camera exclusively. Switching mode or camera means
//! dropping the session (which releases the device) and starting a new one.
//! Frames are processed one at a time by [`Session::tick`]; nothing overlaps.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::actuator::{apply_event, Actuator};
use crate::camera::{CameraSource, FrameSource};
use crate::classifier::{MediaClassifier, MediaFrame, MouseClassifier, MouseFrame};
use crate::config::{AppConfig, GestureConfig, UiConfig};
use crate::error::ActuatorError;
use crate::hand_landmark::TrackingSettings;
use crate::overlay::Overlay;
use crate::pipeline::{create_pipeline, Pipeline};
use crate::smoother::PointerSmoother;
use crate::types::{GestureEvent, HandLandmarks, Mode};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: Mode,
    pub camera_index: u32,
    pub capture_size: (u32, u32),
    pub capture_fps: u32,
    pub model_path: String,
    pub tracking: TrackingSettings,
    pub gestures: GestureConfig,
}

impl SessionConfig {
    /// Session settings for `mode`, taking mode-specific confidences from the model section.
    pub fn for_mode(config: &AppConfig, mode: Mode) -> Self {
        let (det, track) = config.model.confidences(mode);
        Self {
            mode,
            camera_index: config.camera.index,
            capture_size: (config.camera.width, config.camera.height),
            capture_fps: config.camera.fps,
            model_path: config.model.landmark_model.clone(),
            tracking: TrackingSettings {
                min_detection_confidence: det,
                min_tracking_confidence: track,
                max_hands: config.model.max_hands,
            },
            gestures: config.gestures.clone(),
        }
    }
}

/// Exponential retry delay for frames that fail to arrive.
#[derive(Debug, Clone)]
pub struct CaptureBackoff {
    consecutive: u32,
    initial: Duration,
    max: Duration,
    limit: u32,
}

impl CaptureBackoff {
    pub fn new(initial: Duration, max: Duration, limit: u32) -> Self {
        Self {
            consecutive: 0,
            initial,
            max,
            limit,
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Delay before the next attempt, or `None` once `limit` failures in a row are reached.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.consecutive += 1;
        if self.consecutive >= self.limit {
            return None;
        }
        let shift = (self.consecutive - 1).min(16);
        Some(self.initial.saturating_mul(1 << shift).min(self.max))
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }
}

impl Default for CaptureBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(10), Duration::from_millis(500), 50)
    }
}

#[derive(Debug, Default)]
pub struct FpsMeter {
    last: Option<Instant>,
}

impl FpsMeter {
    pub fn tick(&mut self, now: Instant) -> f32 {
        let fps = match self.last {
            Some(prev) => {
                let secs = now.saturating_duration_since(prev).as_secs_f32();
                if secs > 0.0 {
                    1.0 / secs
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last = Some(now);
        fps
    }
}

#[derive(Debug, Clone)]
pub enum ModeFrame {
    Media(MediaFrame),
    Mouse(MouseFrame),
}

/// What a controller did with one frame.
#[derive(Debug)]
pub struct FrameOutcome {
    pub mode: ModeFrame,
    /// Events as actuated (cursor moves carry the smoothed position).
    pub events: Vec<GestureEvent>,
    pub errors: Vec<ActuatorError>,
}

pub struct MediaController {
    classifier: MediaClassifier,
    last_volume: Option<u8>,
    last_brightness: Option<u8>,
}

impl MediaController {
    pub fn new(gestures: GestureConfig) -> Self {
        Self {
            classifier: MediaClassifier::new(gestures),
            last_volume: None,
            last_brightness: None,
        }
    }

    fn level_slot(&mut self, event: GestureEvent) -> Option<(&mut Option<u8>, u8)> {
        match event {
            GestureEvent::SetVolume(v) => Some((&mut self.last_volume, v)),
            GestureEvent::SetBrightness(v) => Some((&mut self.last_brightness, v)),
            _ => None,
        }
    }

    /// Whether `event` repeats the last level the actuator accepted.
    fn is_repeat(&mut self, event: GestureEvent) -> bool {
        matches!(self.level_slot(event), Some((slot, value)) if *slot == Some(value))
    }

    fn mark_applied(&mut self, event: GestureEvent) {
        if let Some((slot, value)) = self.level_slot(event) {
            *slot = Some(value);
        }
    }

    pub fn handle(
        &mut self,
        hand: Option<&HandLandmarks>,
        now: Instant,
        actuator: &mut dyn Actuator,
    ) -> FrameOutcome {
        let frame = self.classifier.classify(hand, now);
        let mut errors = Vec::new();
        for &event in &frame.events {
            if self.is_repeat(event) {
                continue;
            }
            debug!(?event, "media gesture");
            match apply_event(actuator, event) {
                Ok(()) => self.mark_applied(event),
                Err(e) => errors.push(e),
            }
        }
        FrameOutcome {
            events: frame.events.clone(),
            mode: ModeFrame::Media(frame),
            errors,
        }
    }
}

pub struct MouseController {
    classifier: MouseClassifier,
    smoother: PointerSmoother,
}

impl MouseController {
    pub fn new(gestures: GestureConfig, frame_size: (u32, u32), screen_size: (u32, u32)) -> Self {
        let smoother = PointerSmoother::new(gestures.smoothing);
        Self {
            classifier: MouseClassifier::new(gestures, frame_size, screen_size),
            smoother,
        }
    }

    pub fn handle(&mut self, hand: Option<&HandLandmarks>, actuator: &mut dyn Actuator) -> FrameOutcome {
        let frame = self.classifier.classify(hand);
        let mut events = Vec::with_capacity(frame.events.len());
        let mut errors = Vec::new();

        for &event in &frame.events {
            let event = match event {
                GestureEvent::MoveCursor(x, y) => {
                    let (cx, cy) = self.smoother.step((x, y));
                    GestureEvent::MoveCursor(cx, cy)
                }
                other => other,
            };
            if let Err(e) = apply_event(actuator, event) {
                errors.push(e);
            }
            events.push(event);
        }

        FrameOutcome {
            mode: ModeFrame::Mouse(frame),
            events,
            errors,
        }
    }
}

pub enum Controller {
    Media(MediaController),
    Mouse(MouseController),
}

impl Controller {
    pub fn new(mode: Mode, gestures: GestureConfig, frame_size: (u32, u32), screen_size: (u32, u32)) -> Self {
        match mode {
            Mode::Media => Controller::Media(MediaController::new(gestures)),
            Mode::Mouse => Controller::Mouse(MouseController::new(gestures, frame_size, screen_size)),
        }
    }

    pub fn handle(
        &mut self,
        hand: Option<&HandLandmarks>,
        now: Instant,
        actuator: &mut dyn Actuator,
    ) -> FrameOutcome {
        match self {
            Controller::Media(c) => c.handle(hand, now, actuator),
            Controller::Mouse(c) => c.handle(hand, actuator),
        }
    }
}

/// Result of one fully processed frame.
pub struct FrameReport {
    pub frame: RgbImage,
    pub hands: usize,
    pub events: Vec<GestureEvent>,
    pub volume_percent: Option<u8>,
    pub brightness_percent: Option<u8>,
    pub fps: f32,
    pub actuator_failures: usize,
}

pub enum Tick {
    Frame(FrameReport),
    /// No frame this time; try again after the delay.
    Retry(Duration),
}

pub struct Session {
    config: SessionConfig,
    source: Box<dyn FrameSource>,
    pipeline: Box<dyn Pipeline>,
    controller: Controller,
    overlay: Overlay,
    fps: FpsMeter,
    backoff: CaptureBackoff,
    frames: u64,
}

impl Session {
    /// Opens the configured camera and landmark pipeline.
    pub fn start(config: SessionConfig, ui: &UiConfig, screen_size: (u32, u32)) -> Result<Self> {
        let (w, h) = config.capture_size;
        let source = CameraSource::new(config.camera_index, w, h, config.capture_fps)?;
        let pipeline = create_pipeline(&config.model_path, config.tracking)?;
        Ok(Self::with_parts(
            config,
            Box::new(source),
            pipeline,
            Overlay::new(ui),
            screen_size,
        ))
    }

    pub fn with_parts(
        config: SessionConfig,
        source: Box<dyn FrameSource>,
        pipeline: Box<dyn Pipeline>,
        overlay: Overlay,
        screen_size: (u32, u32),
    ) -> Self {
        let frame_size = source.resolution();
        let gestures = config.gestures.scaled_to(frame_size.0, frame_size.1);
        let controller = Controller::new(config.mode, gestures, frame_size, screen_size);
        info!(
            "Session started: {} on {} ({}x{}) with {}",
            config.mode.label(),
            source.name(),
            frame_size.0,
            frame_size.1,
            pipeline.name()
        );
        Self {
            config,
            source,
            pipeline,
            controller,
            overlay,
            fps: FpsMeter::default(),
            backoff: CaptureBackoff::default(),
            frames: 0,
        }
    }

    pub fn with_backoff(mut self, backoff: CaptureBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn skip_frame(&mut self, reason: anyhow::Error) -> Result<Tick> {
        match self.backoff.record_failure() {
            Some(delay) => {
                warn!("Skipping frame ({}): {:#}", self.backoff.consecutive(), reason);
                Ok(Tick::Retry(delay))
            }
            None => Err(anyhow!(
                "no usable frame after {} attempts: {:#}",
                self.backoff.consecutive(),
                reason
            )),
        }
    }

    /// Captures, classifies, actuates and renders exactly one frame.
    pub fn tick(&mut self, actuator: &mut dyn Actuator, now: Instant) -> Result<Tick> {
        let mut frame = match self.source.capture() {
            Ok(frame) => frame,
            Err(e) => return self.skip_frame(e),
        };
        let mut hands = match self.pipeline.process(&frame) {
            Ok(hands) => hands,
            Err(e) => return self.skip_frame(e),
        };
        self.backoff.record_success();
        hands.truncate(self.config.tracking.max_hands);

        let outcome = self.controller.handle(hands.first(), now, actuator);
        for e in &outcome.errors {
            warn!("Actuator failed: {}", e);
        }

        let fps = self.fps.tick(now);
        self.overlay.draw(&mut frame, &hands, &outcome, fps);
        self.frames += 1;

        let (volume_percent, brightness_percent) = match &outcome.mode {
            ModeFrame::Media(m) => (Some(m.volume.percent), Some(m.brightness.percent)),
            ModeFrame::Mouse(_) => (None, None),
        };

        Ok(Tick::Frame(FrameReport {
            frame,
            hands: hands.len(),
            events: outcome.events,
            volume_percent,
            brightness_percent,
            fps,
            actuator_failures: outcome.errors.len(),
        }))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        info!("Session stopped after {} frames", self.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{ActuatorCall, RecordingActuator};
    use crate::pipeline::{simulated_hand, SimulatedPose};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut b = CaptureBackoff::new(Duration::from_millis(10), Duration::from_millis(50), 10);
        assert_eq!(b.record_failure(), Some(Duration::from_millis(10)));
        assert_eq!(b.record_failure(), Some(Duration::from_millis(20)));
        assert_eq!(b.record_failure(), Some(Duration::from_millis(40)));
        assert_eq!(b.record_failure(), Some(Duration::from_millis(50)));
        b.record_success();
        assert_eq!(b.consecutive(), 0);
        assert_eq!(b.record_failure(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_backoff_gives_up_at_limit() {
        let mut b = CaptureBackoff::new(Duration::from_millis(1), Duration::from_millis(1), 3);
        assert!(b.record_failure().is_some());
        assert!(b.record_failure().is_some());
        assert!(b.record_failure().is_none());
    }

    #[test]
    fn test_media_level_kept_pending_until_accepted() {
        let hand = simulated_hand(SimulatedPose::Volume { pinch: 125.0 }, (320.0, 240.0));
        let mut controller = MediaController::new(GestureConfig::default());
        let mut rec = RecordingActuator::new((1920, 1080));
        let now = Instant::now();

        rec.fail = true;
        let outcome = controller.handle(Some(&hand), now, &mut rec);
        assert!(!outcome.errors.is_empty());
        assert_eq!(controller.last_volume, None);

        rec.fail = false;
        controller.handle(Some(&hand), now, &mut rec);
        assert_eq!(controller.last_volume, Some(50));
        assert!(rec.calls.contains(&ActuatorCall::Volume(0.5)));

        let sent = rec.calls.len();
        controller.handle(Some(&hand), now, &mut rec);
        assert_eq!(rec.calls.len(), sent);
    }

    #[test]
    fn test_fps_meter() {
        let mut m = FpsMeter::default();
        let t0 = Instant::now();
        assert_eq!(m.tick(t0), 0.0);
        let fps = m.tick(t0 + Duration::from_millis(40));
        assert!((fps - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_for_mode_uses_mode_confidences() {
        let app = AppConfig::default();
        let media = SessionConfig::for_mode(&app, Mode::Media);
        assert_eq!(media.tracking.min_detection_confidence, 0.7);
        let mouse = SessionConfig::for_mode(&app, Mode::Mouse);
        assert_eq!(mouse.tracking.min_detection_confidence, 0.5);
        assert_eq!(mouse.tracking.max_hands, 1);
        assert_eq!(mouse.capture_size, (640, 480));
    }
}
