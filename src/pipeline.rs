use anyhow::Result;
use image::RgbImage;
use std::path::Path;
use tracing::{info, warn};

use crate::hand_landmark::{HandLandmarkPipeline, TrackingSettings};
use crate::types::{HandLandmarks, INDEX_TIP, LANDMARK_COUNT, MIDDLE_TIP, PINKY_TIP, RING_TIP, THUMB_TIP};

/// Per-frame landmark source.
pub trait Pipeline {
    fn name(&self) -> String;
    /// Returns every detected hand in the frame, in frame-pixel coordinates.
    fn process(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarks>>;
}

/// Loads the ONNX landmark model when it exists, otherwise falls back to the simulator.
pub fn create_pipeline(model_path: &str, settings: TrackingSettings) -> Result<Box<dyn Pipeline>> {
    if Path::new(model_path).exists() {
        let pipeline = HandLandmarkPipeline::new(model_path, settings)?;
        info!("Active pipeline: {}", pipeline.name());
        Ok(Box::new(pipeline))
    } else {
        warn!("Landmark model {} not found, using simulated hand", model_path);
        Ok(Box::new(SimulatedPipeline::new()))
    }
}

/// Built-in poses for the simulated hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulatedPose {
    Open,
    Fist,
    /// Thumb-index pinch of `pinch` px with the pinky curled.
    Volume { pinch: f32 },
    /// Four-finger pose with index and middle tips `spread` px apart.
    Brightness { spread: f32 },
    PlayPause,
    NextTrack,
    PrevTrack,
    /// Index finger alone, tip placed at `tip`.
    Point { tip: (f32, f32) },
    Click,
}

const HAND_SCALE: f32 = 1.3;

// Finger columns (x) and knuckle heights (y) for index..pinky, relative to the palm centre.
const FINGER_X: [f32; 4] = [20.0, -5.0, -30.0, -55.0];
const KNUCKLE_Y: [f32; 4] = [0.0, -5.0, 0.0, 10.0];

fn skeleton_offsets(up: [bool; 5]) -> [(f32, f32); LANDMARK_COUNT] {
    let mut pts = [(0.0, 0.0); LANDMARK_COUNT];
    pts[0] = (0.0, 110.0);

    pts[1] = (30.0, 80.0);
    if up[0] {
        pts[2] = (55.0, 55.0);
        pts[3] = (75.0, 35.0);
        pts[4] = (95.0, 20.0);
    } else {
        pts[2] = (50.0, 55.0);
        pts[3] = (55.0, 35.0);
        pts[4] = (35.0, 25.0);
    }

    for finger in 0..4 {
        let base = 5 + finger * 4;
        let x = FINGER_X[finger];
        let y = KNUCKLE_Y[finger];
        let (pip, dip, tip) = if up[finger + 1] {
            (-40.0, -70.0, -95.0)
        } else {
            (-35.0, -15.0, 5.0)
        };
        pts[base] = (x, y);
        pts[base + 1] = (x, y + pip);
        pts[base + 2] = (x, y + dip);
        pts[base + 3] = (x, y + tip);
    }
    pts
}

fn place(up: [bool; 5], center: (f32, f32)) -> [(i32, i32); LANDMARK_COUNT] {
    skeleton_offsets(up).map(|(dx, dy)| {
        (
            (center.0 + dx * HAND_SCALE).round() as i32,
            (center.1 + dy * HAND_SCALE).round() as i32,
        )
    })
}

/// Builds a right-hand-like landmark set for `pose` around `center`.
pub fn simulated_hand(pose: SimulatedPose, center: (f32, f32)) -> HandLandmarks {
    let coords = match pose {
        SimulatedPose::Open => place([true; 5], center),
        SimulatedPose::Fist => place([false; 5], center),
        SimulatedPose::Volume { pinch } => {
            let mut c = place([true, true, false, false, false], center);
            let tip = (c[INDEX_TIP].0 + pinch.round() as i32, c[INDEX_TIP].1);
            c[THUMB_TIP] = tip;
            c[THUMB_TIP - 1] = (tip.0 - 20, tip.1 + 15);
            c
        }
        SimulatedPose::Brightness { spread } => {
            let mut c = place([true, true, true, false, true], center);
            c[INDEX_TIP] = (c[MIDDLE_TIP].0 + spread.round() as i32, c[MIDDLE_TIP].1);
            c
        }
        SimulatedPose::PlayPause => {
            let mut c = place([true, true, false, false, true], center);
            c[THUMB_TIP] = (c[PINKY_TIP].0 + 10, c[PINKY_TIP].1);
            c
        }
        SimulatedPose::NextTrack => {
            let mut c = place([true, true, true, false, false], center);
            c[THUMB_TIP] = (c[MIDDLE_TIP].0 + 10, c[MIDDLE_TIP].1);
            c
        }
        SimulatedPose::PrevTrack => {
            let mut c = place([true, true, false, true, false], center);
            c[THUMB_TIP] = (c[RING_TIP].0 + 10, c[RING_TIP].1);
            c
        }
        SimulatedPose::Point { tip } => {
            let up = [false, true, false, false, false];
            let (dx, dy) = skeleton_offsets(up)[INDEX_TIP];
            let origin = (tip.0 - dx * HAND_SCALE, tip.1 - dy * HAND_SCALE);
            let mut c = place(up, origin);
            c[INDEX_TIP] = (tip.0.round() as i32, tip.1.round() as i32);
            c
        }
        SimulatedPose::Click => {
            let mut c = place([false, true, true, false, false], center);
            c[INDEX_TIP] = (c[MIDDLE_TIP].0 + 15, c[MIDDLE_TIP].1);
            c
        }
    };

    HandLandmarks::from_array(coords)
}

/// Frames spent on each step of the demo cycle.
const SEGMENT_FRAMES: u32 = 90;

/// Stand-in landmark source used when no model is available.
///
/// Cycles through every gesture so both modes can be exercised end to end.
pub struct SimulatedPipeline {
    frame_count: u32,
}

impl SimulatedPipeline {
    pub fn new() -> Self {
        Self { frame_count: 0 }
    }

    fn pose_at(frame_count: u32, width: f32, height: f32) -> Option<SimulatedPose> {
        let segment = frame_count / SEGMENT_FRAMES;
        let t = (frame_count % SEGMENT_FRAMES) as f32 / SEGMENT_FRAMES as f32;
        match segment % 8 {
            0 => Some(SimulatedPose::Volume { pinch: 50.0 + 150.0 * t }),
            1 => Some(SimulatedPose::Brightness { spread: 30.0 + 120.0 * t }),
            2 => Some(SimulatedPose::PlayPause),
            3 => Some(SimulatedPose::NextTrack),
            4 => Some(SimulatedPose::PrevTrack),
            5 => {
                let angle = t * std::f32::consts::TAU;
                let tip = (
                    width / 2.0 + angle.cos() * width * 0.25,
                    height / 2.0 + angle.sin() * height * 0.2,
                );
                Some(SimulatedPose::Point { tip })
            }
            6 => Some(SimulatedPose::Click),
            _ => None,
        }
    }
}

impl Default for SimulatedPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline for SimulatedPipeline {
    fn name(&self) -> String {
        "Simulated Hand (no model)".to_string()
    }

    fn process(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarks>> {
        let (w, h) = (frame.width() as f32, frame.height() as f32);
        let pose = Self::pose_at(self.frame_count, w, h);
        self.frame_count = self.frame_count.wrapping_add(1);

        let Some(pose) = pose else {
            return Ok(Vec::new());
        };
        let max_x = frame.width().saturating_sub(1) as i32;
        let max_y = frame.height().saturating_sub(1) as i32;
        let hand = simulated_hand(pose, (w / 2.0, h / 2.0))
            .map_coords(|x, y| (x.clamp(0, max_x), y.clamp(0, max_y)));
        Ok(vec![hand])
    }
}
