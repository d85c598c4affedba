//! Pure geometry over a single frame's hand landmarks.
//!
//! Nothing here carries state between frames: finger states, bounding boxes
//! and pinch distances are re-derived from each snapshot.

use crate::types::{BoundingBox, FingerState, HandLandmarks, Pinch, TIP_IDS};

/// Divisor applied to the raw box area so it lands in the gate's range.
pub const AREA_SCALE: i32 = 100;

/// Classifies each digit as up or down.
///
/// The thumb extends sideways, so it is compared on x against the joint one id
/// below its tip. The other digits compare tip y against the joint two ids
/// below; image y grows downward, so "up" means a smaller y.
pub fn finger_state_of(hand: &HandLandmarks) -> FingerState {
    let mut up = [false; 5];

    let thumb_tip = hand.point(TIP_IDS[0]);
    let thumb_joint = hand.point(TIP_IDS[0] - 1);
    up[0] = thumb_tip.x > thumb_joint.x;

    for finger in 1..5 {
        let tip = hand.point(TIP_IDS[finger]);
        let joint = hand.point(TIP_IDS[finger] - 2);
        up[finger] = tip.y < joint.y;
    }

    FingerState::from_array(up)
}

/// Euclidean distance between two landmarks, with their midpoint for overlay feedback.
///
/// Both ids must be in `0..=20`.
pub fn distance(hand: &HandLandmarks, id_a: usize, id_b: usize) -> Pinch {
    let a = hand.point(id_a);
    let b = hand.point(id_b);
    let dx = (b.x - a.x) as f32;
    let dy = (b.y - a.y) as f32;
    Pinch {
        length: dx.hypot(dy),
        start: (a.x, a.y),
        end: (b.x, b.y),
        midpoint: ((a.x + b.x).div_euclid(2), (a.y + b.y).div_euclid(2)),
    }
}

/// Box area scaled down by [`AREA_SCALE`]; used as a rough hand-to-camera distance gate.
pub fn bounding_box_area(bbox: &BoundingBox) -> i32 {
    (bbox.width() * bbox.height()).div_euclid(AREA_SCALE)
}

/// Affine map of `value` from `from` to `to`. Values outside `from` are extrapolated.
pub fn remap(value: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    to.0 + (value - from.0) * (to.1 - to.0) / (from.1 - from.0)
}

/// Like [`remap`] but pinned to the `to` range, whichever direction it runs.
pub fn remap_clamped(value: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    let lo = to.0.min(to.1);
    let hi = to.0.max(to.1);
    remap(value, from, to).clamp(lo, hi)
}

/// Rounds to the nearest multiple of ten; exact halves go to the even decile.
pub fn round_to_decile(value: f32) -> f32 {
    10.0 * (value / 10.0).round_ties_even()
}

/// Remaps a pinch length to a whole percentage in steps of ten.
pub fn pinch_percent(length: f32, from: (f32, f32)) -> u8 {
    round_to_decile(remap(length, from, (0.0, 100.0))).clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{INDEX_TIP, LANDMARK_COUNT, MIDDLE_TIP, PINKY_TIP, THUMB_TIP};

    /// Hand with every joint stacked at the same spot, then overridden per test.
    fn hand_with(overrides: &[(usize, (i32, i32))]) -> HandLandmarks {
        let mut coords = vec![(200, 200); LANDMARK_COUNT];
        for &(id, xy) in overrides {
            coords[id] = xy;
        }
        HandLandmarks::from_coords(&coords).unwrap()
    }

    #[test]
    fn test_thumb_up_when_tip_right_of_joint() {
        let hand = hand_with(&[(3, (100, 200)), (THUMB_TIP, (120, 200))]);
        assert!(finger_state_of(&hand).thumb);

        let hand = hand_with(&[(3, (120, 200)), (THUMB_TIP, (100, 200))]);
        assert!(!finger_state_of(&hand).thumb);

        // Equal x is not "greater than"
        let hand = hand_with(&[(3, (100, 200)), (THUMB_TIP, (100, 150))]);
        assert!(!finger_state_of(&hand).thumb);
    }

    #[test]
    fn test_fingers_compare_against_joint_two_below() {
        // Index tip above PIP (id 6), pinky tip below PIP (id 18)
        let hand = hand_with(&[
            (6, (200, 150)),
            (INDEX_TIP, (200, 100)),
            (7, (200, 300)),
            (18, (200, 150)),
            (PINKY_TIP, (200, 180)),
            (19, (200, 10)),
        ]);
        let fingers = finger_state_of(&hand);
        assert!(fingers.index);
        assert!(!fingers.pinky);
        assert!(!fingers.middle);
        assert!(!fingers.ring);
    }

    #[test]
    fn test_distance_symmetric_and_zero_on_self() {
        let hand = hand_with(&[(THUMB_TIP, (13, 40)), (MIDDLE_TIP, (101, 7))]);
        let ab = distance(&hand, THUMB_TIP, MIDDLE_TIP);
        let ba = distance(&hand, MIDDLE_TIP, THUMB_TIP);
        assert_eq!(ab.length, ba.length);
        assert_eq!(distance(&hand, THUMB_TIP, THUMB_TIP).length, 0.0);
    }

    #[test]
    fn test_distance_midpoint_and_scenario() {
        let hand = hand_with(&[(THUMB_TIP, (100, 100)), (INDEX_TIP, (100, 150))]);
        let pinch = distance(&hand, THUMB_TIP, INDEX_TIP);
        assert_eq!(pinch.length, 50.0);
        assert_eq!(pinch.midpoint, (100, 125));
        assert_eq!(pinch.start, (100, 100));
        assert_eq!(pinch.end, (100, 150));
        assert_eq!(pinch_percent(pinch.length, (50.0, 200.0)), 0);
    }

    #[test]
    fn test_bounding_box_area_scaled() {
        assert_eq!(bounding_box_area(&BoundingBox::new(50, 50, 150, 150)), 100);
        assert_eq!(bounding_box_area(&BoundingBox::new(0, 0, 199, 199)), 396);
    }

    #[test]
    fn test_remap_endpoints_and_extrapolation() {
        assert_eq!(remap(50.0, (50.0, 200.0), (0.0, 100.0)), 0.0);
        assert_eq!(remap(200.0, (50.0, 200.0), (0.0, 100.0)), 100.0);
        assert_eq!(remap(125.0, (50.0, 200.0), (0.0, 100.0)), 50.0);
        assert_eq!(remap(20.0, (50.0, 200.0), (0.0, 100.0)), -20.0);
        assert_eq!(remap(275.0, (50.0, 200.0), (400.0, 150.0)), 25.0);
    }

    #[test]
    fn test_remap_is_monotonic() {
        let mut last = f32::NEG_INFINITY;
        for v in (0..300).map(|v| v as f32) {
            let r = remap(v, (30.0, 150.0), (0.0, 100.0));
            assert!(r >= last);
            last = r;
        }
    }

    #[test]
    fn test_remap_clamped_handles_inverted_target() {
        assert_eq!(remap_clamped(0.0, (50.0, 200.0), (400.0, 150.0)), 400.0);
        assert_eq!(remap_clamped(500.0, (50.0, 200.0), (400.0, 150.0)), 150.0);
    }

    #[test]
    fn test_round_to_decile() {
        assert_eq!(round_to_decile(44.9), 40.0);
        assert_eq!(round_to_decile(35.1), 40.0);
        assert_eq!(round_to_decile(96.0), 100.0);
        assert_eq!(round_to_decile(25.0), 20.0);
        assert_eq!(round_to_decile(35.0), 40.0);
    }

    #[test]
    fn test_pinch_percent_clamps() {
        assert_eq!(pinch_percent(10.0, (50.0, 200.0)), 0);
        assert_eq!(pinch_percent(400.0, (50.0, 200.0)), 100);
        assert_eq!(pinch_percent(90.0, (30.0, 150.0)), 50);
    }
}
