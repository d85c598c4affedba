use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Number of points in one hand-pose topology.
pub const LANDMARK_COUNT: usize = 21;

pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP: usize = 16;
pub const PINKY_TIP: usize = 20;

/// Tip ids in finger order: thumb, index, middle, ring, pinky.
pub const TIP_IDS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Bone connections used when drawing the skeleton.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (17, 18), (18, 19), (19, 20),
    (0, 17),
];

/// A single landmark in frame-pixel space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub id: usize,
    pub x: i32,
    pub y: i32,
}

impl LandmarkPoint {
    pub fn new(id: usize, x: i32, y: i32) -> Self {
        Self { id, x, y }
    }
}

/// One detected hand. Always holds exactly [`LANDMARK_COUNT`] points, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandLandmarks {
    points: [LandmarkPoint; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Builds a hand from `(x, y)` pairs in id order.
    pub fn from_coords(coords: &[(i32, i32)]) -> Result<Self, GeometryError> {
        if coords.is_empty() {
            return Err(GeometryError::EmptyHand);
        }
        if coords.len() != LANDMARK_COUNT {
            return Err(GeometryError::PartialHand(coords.len()));
        }
        let mut array = [(0, 0); LANDMARK_COUNT];
        array.copy_from_slice(coords);
        Ok(Self::from_array(array))
    }

    pub fn from_array(coords: [(i32, i32); LANDMARK_COUNT]) -> Self {
        let mut points = [LandmarkPoint::default(); LANDMARK_COUNT];
        for (id, (x, y)) in coords.into_iter().enumerate() {
            points[id] = LandmarkPoint::new(id, x, y);
        }
        Self { points }
    }

    pub fn points(&self) -> &[LandmarkPoint; LANDMARK_COUNT] {
        &self.points
    }

    pub fn point(&self, id: usize) -> LandmarkPoint {
        self.points[id]
    }

    /// Checked lookup for ids coming from outside the crate.
    pub fn try_point(&self, id: usize) -> Result<LandmarkPoint, GeometryError> {
        self.points
            .get(id)
            .copied()
            .ok_or(GeometryError::LandmarkOutOfRange(id))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let first = self.points[0];
        let mut bbox = BoundingBox {
            xmin: first.x,
            ymin: first.y,
            xmax: first.x,
            ymax: first.y,
        };
        for p in &self.points[1..] {
            bbox.xmin = bbox.xmin.min(p.x);
            bbox.ymin = bbox.ymin.min(p.y);
            bbox.xmax = bbox.xmax.max(p.x);
            bbox.ymax = bbox.ymax.max(p.y);
        }
        bbox
    }

    /// Applies `f` to every coordinate pair, keeping ids.
    pub fn map_coords(&self, mut f: impl FnMut(i32, i32) -> (i32, i32)) -> Self {
        let mut points = self.points;
        for p in points.iter_mut() {
            let (x, y) = f(p.x, p.y);
            p.x = x;
            p.y = y;
        }
        Self { points }
    }
}

/// Min/max extent of a hand. `xmin <= xmax` and `ymin <= ymax` always hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl BoundingBox {
    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self {
            xmin: xmin.min(xmax),
            ymin: ymin.min(ymax),
            xmax: xmin.max(xmax),
            ymax: ymin.max(ymax),
        }
    }

    pub fn width(&self) -> i32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i32 {
        self.ymax - self.ymin
    }
}

/// Up/down state of the five digits for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    pub fn from_array(up: [bool; 5]) -> Self {
        Self {
            thumb: up[0],
            index: up[1],
            middle: up[2],
            ring: up[3],
            pinky: up[4],
        }
    }

    pub fn as_array(&self) -> [bool; 5] {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKey {
    PlayPause,
    Next,
    Prev,
}

/// Output of a pinch measurement between two landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pinch {
    pub length: f32,
    pub start: (i32, i32),
    pub end: (i32, i32),
    pub midpoint: (i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    PlayPause,
    NextTrack,
    PrevTrack,
    SetVolume(u8),
    SetBrightness(u8),
    MoveCursor(f32, f32),
    Click,
}

impl GestureEvent {
    /// Media key for the discrete transport gestures.
    pub fn media_key(&self) -> Option<MediaKey> {
        match self {
            GestureEvent::PlayPause => Some(MediaKey::PlayPause),
            GestureEvent::NextTrack => Some(MediaKey::Next),
            GestureEvent::PrevTrack => Some(MediaKey::Prev),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Media,
    Mouse,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Media => Mode::Mouse,
            Mode::Mouse => Mode::Media,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Media => "Media/Volume/Brightness",
            Mode::Mouse => "Mouse Control",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_hand() -> Vec<(i32, i32)> {
        (0..LANDMARK_COUNT as i32).map(|i| (100 + i * 3, 300 - i * 7)).collect()
    }

    #[test]
    fn test_rejects_partial_and_empty_hands() {
        assert_eq!(HandLandmarks::from_coords(&[]), Err(GeometryError::EmptyHand));
        assert_eq!(
            HandLandmarks::from_coords(&[(0, 0); 12]),
            Err(GeometryError::PartialHand(12))
        );
    }

    #[test]
    fn test_ids_follow_position() {
        let hand = HandLandmarks::from_coords(&open_hand()).unwrap();
        for (i, p) in hand.points().iter().enumerate() {
            assert_eq!(p.id, i);
        }
        assert_eq!(hand.try_point(21), Err(GeometryError::LandmarkOutOfRange(21)));
    }

    #[test]
    fn test_bounding_box_extent() {
        let hand = HandLandmarks::from_coords(&open_hand()).unwrap();
        let bbox = hand.bounding_box();
        assert_eq!(bbox, BoundingBox { xmin: 100, ymin: 160, xmax: 160, ymax: 300 });
        assert!(bbox.xmin <= bbox.xmax && bbox.ymin <= bbox.ymax);
    }

    #[test]
    fn test_bounding_box_new_orders_corners() {
        let bbox = BoundingBox::new(150, 150, 50, 50);
        assert_eq!((bbox.width(), bbox.height()), (100, 100));
    }
}
