use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::{debug, info};

use crate::pipeline::Pipeline;
use crate::types::{BoundingBox, HandLandmarks, LANDMARK_COUNT};

/// Side length of the square landmark-model input.
const INPUT_SIZE: u32 = 224;
/// Extra context around the previous hand box when cropping for tracking.
const ROI_PADDING: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSettings {
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub max_hands: usize,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            max_hands: 1,
        }
    }
}

/// Square region of the frame fed to the model, in frame pixels.
///
/// The square may extend past the frame edges; that part is fed as black
/// padding so the model always sees an undistorted image.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Roi {
    x: i32,
    y: i32,
    side: u32,
}

impl Roi {
    /// Whole frame, letterboxed to a square.
    fn full(frame_w: u32, frame_h: u32) -> Self {
        let side = frame_w.max(frame_h).max(1);
        Self {
            x: (frame_w as i32 - side as i32) / 2,
            y: (frame_h as i32 - side as i32) / 2,
            side,
        }
    }

    /// Padded square around `bbox`.
    fn around(bbox: &BoundingBox, frame_w: u32, frame_h: u32) -> Self {
        let cx = (bbox.xmin + bbox.xmax) as f32 / 2.0;
        let cy = (bbox.ymin + bbox.ymax) as f32 / 2.0;
        let side = bbox.width().max(bbox.height()) as f32 * (1.0 + ROI_PADDING);

        let on_frame = cx >= 0.0 && cy >= 0.0 && cx < frame_w as f32 && cy < frame_h as f32;
        if side < 2.0 || !on_frame {
            return Self::full(frame_w, frame_h);
        }
        Self {
            x: (cx - side / 2.0).round() as i32,
            y: (cy - side / 2.0).round() as i32,
            side: side.round() as u32,
        }
    }
}

/// 21-point hand landmark model run through ONNX Runtime.
///
/// Expects an NHWC `[1, 224, 224, 3]` float input in `[0, 1]`; output 0 holds
/// 63 floats (x, y, z per landmark in input pixels) and output 1 the
/// hand-presence score.
pub struct HandLandmarkPipeline {
    session: Session,
    settings: TrackingSettings,
    tracked: Option<BoundingBox>,
}

impl HandLandmarkPipeline {
    pub fn new(model_path: &str, settings: TrackingSettings) -> Result<Self> {
        info!("Loading hand landmark model from {}...", model_path);
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .with_execution_providers([
                ort::execution_providers::CoreMLExecutionProvider::default().build(),
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load {}", model_path))?;

        Ok(Self {
            session,
            settings,
            tracked: None,
        })
    }

    fn threshold(&self) -> f32 {
        if self.tracked.is_some() {
            self.settings.min_tracking_confidence
        } else {
            self.settings.min_detection_confidence
        }
    }

    fn preprocess(frame: &RgbImage, roi: Roi) -> Vec<f32> {
        let mut square = RgbImage::new(roi.side, roi.side);
        image::imageops::replace(&mut square, frame, -(roi.x as i64), -(roi.y as i64));
        let resized = image::imageops::resize(&square, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

        let mut input = Vec::with_capacity((INPUT_SIZE * INPUT_SIZE * 3) as usize);
        for pixel in resized.pixels() {
            input.push(pixel[0] as f32 / 255.0);
            input.push(pixel[1] as f32 / 255.0);
            input.push(pixel[2] as f32 / 255.0);
        }
        input
    }
}

/// Some exports leave the presence head as a logit.
fn presence_probability(raw: f32) -> f32 {
    if (0.0..=1.0).contains(&raw) {
        raw
    } else {
        1.0 / (1.0 + (-raw).exp())
    }
}

/// Maps model-space landmarks back into frame pixels, clamped to the frame.
fn project(raw: &[f32], roi: Roi, frame_w: u32, frame_h: u32) -> Option<HandLandmarks> {
    if raw.len() < LANDMARK_COUNT * 3 {
        return None;
    }
    let scale = roi.side as f32 / INPUT_SIZE as f32;
    let max_x = frame_w.saturating_sub(1) as i32;
    let max_y = frame_h.saturating_sub(1) as i32;

    let mut coords = [(0, 0); LANDMARK_COUNT];
    for (i, c) in coords.iter_mut().enumerate() {
        let mx = raw[i * 3];
        let my = raw[i * 3 + 1];
        let x = (roi.x as f32 + mx * scale).round() as i32;
        let y = (roi.y as f32 + my * scale).round() as i32;
        *c = (x.clamp(0, max_x), y.clamp(0, max_y));
    }
    Some(HandLandmarks::from_array(coords))
}

impl Pipeline for HandLandmarkPipeline {
    fn name(&self) -> String {
        "Hand Landmarks (21 pts)".to_string()
    }

    fn process(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarks>> {
        let (fw, fh) = frame.dimensions();
        if self.settings.max_hands == 0 || fw == 0 || fh == 0 {
            return Ok(Vec::new());
        }

        let roi = match &self.tracked {
            Some(bbox) => Roi::around(bbox, fw, fh),
            None => Roi::full(fw, fh),
        };
        let threshold = self.threshold();

        let input_data = Self::preprocess(frame, roi);
        let shape = vec![1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3];
        let input = Tensor::from_array((shape, input_data))?;
        let outputs = self.session.run(ort::inputs![input])?;

        let (_, landmarks) = outputs[0].try_extract_tensor::<f32>()?;
        let (_, presence) = outputs[1].try_extract_tensor::<f32>()?;
        let score = presence_probability(
            *presence.first().ok_or_else(|| anyhow!("empty presence output"))?,
        );

        if score < threshold {
            debug!(score, threshold, "hand lost");
            self.tracked = None;
            return Ok(Vec::new());
        }

        match project(landmarks, roi, fw, fh) {
            Some(hand) => {
                self.tracked = Some(hand.bounding_box());
                Ok(vec![hand])
            }
            None => {
                self.tracked = None;
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_accepts_probability_or_logit() {
        assert_eq!(presence_probability(0.8), 0.8);
        assert!(presence_probability(4.0) > 0.98);
        assert!(presence_probability(-4.0) < 0.02);
    }

    #[test]
    fn test_full_frame_is_letterboxed_square() {
        let roi = Roi::full(640, 480);
        assert_eq!(roi, Roi { x: 0, y: -80, side: 640 });
    }

    #[test]
    fn test_roi_around_box_is_square() {
        let roi = Roi::around(&BoundingBox::new(10, 20, 110, 220), 640, 480);
        assert_eq!(roi.side, 320);
        assert_eq!((roi.x, roi.y), (-100, -40));
    }

    #[test]
    fn test_degenerate_roi_falls_back_to_full_frame() {
        let roi = Roi::around(&BoundingBox::new(700, 500, 700, 500), 640, 480);
        assert_eq!(roi, Roi::full(640, 480));
    }

    #[test]
    fn test_preprocess_keeps_aspect_with_padding() {
        let frame = RgbImage::from_pixel(640, 480, image::Rgb([255, 255, 255]));
        let input = HandLandmarkPipeline::preprocess(&frame, Roi::full(640, 480));
        assert_eq!(input.len(), (INPUT_SIZE * INPUT_SIZE * 3) as usize);
        let at = |x: u32, y: u32| input[((y * INPUT_SIZE + x) * 3) as usize];
        // top rows are letterbox padding, the middle is the frame
        assert!(at(112, 2) < 0.01);
        assert!(at(112, 112) > 0.99);
    }

    #[test]
    fn test_project_scales_roi_space() {
        let mut raw = vec![0.0; LANDMARK_COUNT * 3];
        raw[0] = 112.0;
        raw[1] = 224.0;
        raw[3] = 500.0;
        let roi = Roi { x: 100, y: -50, side: 448 };
        let hand = project(&raw, roi, 640, 480).unwrap();
        assert_eq!((hand.point(0).x, hand.point(0).y), (324, 398));
        assert_eq!(hand.point(1).x, 639);
        assert_eq!(hand.point(1).y, 0);
        assert!(project(&raw[..30], roi, 640, 480).is_none());
    }
}
