//! Per-frame gesture decisions for the two control modes.
//!
//! Media mode turns pinches into transport keys, volume and brightness.
//! Mouse mode turns the index fingertip into a pointer target and an
//! index/middle pinch into a click.

use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

use crate::config::GestureConfig;
use crate::geometry::{bounding_box_area, distance, finger_state_of, pinch_percent, remap_clamped};
use crate::types::{
    BoundingBox, FingerState, GestureEvent, HandLandmarks, MediaKey, Pinch, INDEX_TIP, MIDDLE_TIP,
    PINKY_TIP, RING_TIP, THUMB_TIP,
};

/// Screen-y of an empty level bar.
pub const BAR_BOTTOM: f32 = 400.0;
/// Screen-y of a full level bar.
pub const BAR_TOP: f32 = 150.0;

/// Last computed value of a continuous control, kept for display between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub percent: u8,
    pub bar_y: f32,
}

impl Default for Level {
    fn default() -> Self {
        Self { percent: 0, bar_y: BAR_BOTTOM }
    }
}

impl Level {
    fn from_pinch(length: f32, range: (f32, f32)) -> Self {
        Self {
            percent: pinch_percent(length, range),
            bar_y: remap_clamped(length, range, (BAR_BOTTOM, BAR_TOP)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaFrame {
    pub events: Vec<GestureEvent>,
    pub area: Option<i32>,
    pub in_range: bool,
    pub fingers: Option<FingerState>,
    pub volume_pinch: Option<Pinch>,
    pub brightness_pinch: Option<Pinch>,
    pub volume_applied: bool,
    pub brightness_applied: bool,
    pub cooling_down: bool,
    pub volume: Level,
    pub brightness: Level,
}

pub struct MediaClassifier {
    config: GestureConfig,
    last_fired: HashMap<MediaKey, Instant>,
    volume: Level,
    brightness: Level,
}

impl MediaClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            last_fired: HashMap::new(),
            volume: Level::default(),
            brightness: Level::default(),
        }
    }

    pub fn volume(&self) -> Level {
        self.volume
    }

    pub fn brightness(&self) -> Level {
        self.brightness
    }

    /// True once every transport key is past its cooldown.
    pub fn transport_ready(&self, now: Instant) -> bool {
        let cooldown = self.config.cooldown();
        self.last_fired
            .values()
            .all(|fired| now.saturating_duration_since(*fired) >= cooldown)
    }

    pub fn classify(&mut self, hand: Option<&HandLandmarks>, now: Instant) -> MediaFrame {
        let mut frame = MediaFrame {
            volume: self.volume,
            brightness: self.brightness,
            cooling_down: !self.transport_ready(now),
            ..MediaFrame::default()
        };

        let Some(hand) = hand else {
            return frame;
        };

        let area = bounding_box_area(&hand.bounding_box());
        frame.area = Some(area);
        if area <= self.config.area_min || area >= self.config.area_max {
            debug!(area, "hand outside distance gate");
            return frame;
        }
        frame.in_range = true;

        let threshold = self.config.pinch_threshold_px;
        let transport = [
            (PINKY_TIP, MediaKey::PlayPause, GestureEvent::PlayPause),
            (MIDDLE_TIP, MediaKey::Next, GestureEvent::NextTrack),
            (RING_TIP, MediaKey::Prev, GestureEvent::PrevTrack),
        ];
        for (tip, key, event) in transport {
            if !self.transport_ready(now) {
                break;
            }
            let pinch = distance(hand, THUMB_TIP, tip);
            if pinch.length < threshold {
                debug!(?key, length = pinch.length, "transport pinch");
                self.last_fired.insert(key, now);
                frame.events.push(event);
            }
        }
        frame.cooling_down = !self.transport_ready(now);

        let fingers = finger_state_of(hand);
        frame.fingers = Some(fingers);

        let volume_pinch = distance(hand, THUMB_TIP, INDEX_TIP);
        self.volume = Level::from_pinch(volume_pinch.length, self.config.volume_range_px);
        frame.volume_pinch = Some(volume_pinch);
        if !fingers.pinky {
            frame.volume_applied = true;
            frame.events.push(GestureEvent::SetVolume(self.volume.percent));
        }

        let brightness_pinch = distance(hand, INDEX_TIP, MIDDLE_TIP);
        self.brightness =
            Level::from_pinch(brightness_pinch.length, self.config.brightness_range_px);
        frame.brightness_pinch = Some(brightness_pinch);
        if fingers.as_array() == [true, true, true, false, true] {
            frame.brightness_applied = true;
            frame.events.push(GestureEvent::SetBrightness(self.brightness.percent));
        }

        frame.volume = self.volume;
        frame.brightness = self.brightness;
        frame
    }
}

#[derive(Debug, Clone, Default)]
pub struct MouseFrame {
    pub events: Vec<GestureEvent>,
    pub fingers: Option<FingerState>,
    pub index_tip: Option<(i32, i32)>,
    pub click_pinch: Option<Pinch>,
    pub clicked: bool,
    pub region: BoundingBox,
}

/// Maps the index fingertip inside an inset capture region onto the screen.
pub struct MouseClassifier {
    config: GestureConfig,
    frame_size: (u32, u32),
    screen_size: (u32, u32),
}

impl MouseClassifier {
    pub fn new(config: GestureConfig, frame_size: (u32, u32), screen_size: (u32, u32)) -> Self {
        Self {
            config,
            frame_size,
            screen_size,
        }
    }

    /// Capture-space rectangle that maps onto the full screen.
    pub fn active_region(&self) -> BoundingBox {
        let m = self.config.frame_margin_px.round() as i32;
        BoundingBox::new(
            m,
            m,
            self.frame_size.0 as i32 - m,
            self.frame_size.1 as i32 - m,
        )
    }

    /// Screen target for a fingertip, mirrored horizontally when configured.
    pub fn screen_target(&self, tip: (i32, i32)) -> (f32, f32) {
        let region = self.active_region();
        let (sw, sh) = (self.screen_size.0 as f32, self.screen_size.1 as f32);
        let x = remap_clamped(
            tip.0 as f32,
            (region.xmin as f32, region.xmax as f32),
            (0.0, sw),
        );
        let y = remap_clamped(
            tip.1 as f32,
            (region.ymin as f32, region.ymax as f32),
            (0.0, sh),
        );
        if self.config.mirror_x {
            (sw - x, y)
        } else {
            (x, y)
        }
    }

    pub fn classify(&self, hand: Option<&HandLandmarks>) -> MouseFrame {
        let mut frame = MouseFrame {
            region: self.active_region(),
            ..MouseFrame::default()
        };
        let Some(hand) = hand else {
            return frame;
        };

        let fingers = finger_state_of(hand);
        frame.fingers = Some(fingers);
        let tip = hand.point(INDEX_TIP);
        frame.index_tip = Some((tip.x, tip.y));

        if fingers.index && !fingers.middle {
            let (x, y) = self.screen_target((tip.x, tip.y));
            frame.events.push(GestureEvent::MoveCursor(x, y));
        }

        if fingers.index && fingers.middle {
            let pinch = distance(hand, INDEX_TIP, MIDDLE_TIP);
            frame.click_pinch = Some(pinch);
            if pinch.length < self.config.pinch_threshold_px {
                frame.clicked = true;
                frame.events.push(GestureEvent::Click);
            }
        }

        frame
    }
}
