//! Annotations drawn into the camera frame before it is shown.

use image::{Rgb, RgbImage};

use crate::classifier::{Level, MediaFrame, MouseFrame, BAR_BOTTOM, BAR_TOP};
use crate::config::UiConfig;
use crate::font;
use crate::session::{FrameOutcome, ModeFrame};
use crate::ttf::FontRenderer;
use crate::types::{BoundingBox, HandLandmarks, Mode, Pinch, HAND_CONNECTIONS};

const MAGENTA: Rgb<u8> = Rgb([255, 0, 255]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const CYAN: Rgb<u8> = Rgb([0, 255, 255]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const IDLE_BACKGROUND: Rgb<u8> = Rgb([0x23, 0x29, 0x46]);

/// Padding around the hand box.
const BOX_PADDING: i32 = 20;
const VOLUME_BAR_X: (i32, i32) = (50, 85);
const BRIGHTNESS_BAR_X: (i32, i32) = (100, 135);

pub fn parse_hex(hex: &str) -> (u8, u8, u8) {
    if hex.len() == 7 && hex.starts_with('#') {
        let r = u8::from_str_radix(&hex[1..3], 16).unwrap_or(255);
        let g = u8::from_str_radix(&hex[3..5], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[5..7], 16).unwrap_or(0);
        (r, g, b)
    } else {
        (255, 0, 0) // Default Red
    }
}

fn rgb(hex: &str) -> Rgb<u8> {
    let (r, g, b) = parse_hex(hex);
    Rgb([r, g, b])
}

fn put(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

pub fn fill_circle(image: &mut RgbImage, (cx, cy): (i32, i32), radius: i32, color: Rgb<u8>) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put(image, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Circle outline `thickness` pixels wide, drawn inward from `radius`.
pub fn ring(image: &mut RgbImage, (cx, cy): (i32, i32), radius: i32, thickness: i32, color: Rgb<u8>) {
    let outer = radius * radius;
    let inner = (radius - thickness).max(0).pow(2);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d = dx * dx + dy * dy;
            if d <= outer && d >= inner {
                put(image, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Bresenham line, stamped with a disc for thickness above 1.
pub fn line(image: &mut RgbImage, from: (i32, i32), to: (i32, i32), thickness: i32, color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = thickness / 2;

    loop {
        if radius > 0 {
            fill_circle(image, (x, y), radius, color);
        } else {
            put(image, x, y, color);
        }
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

pub fn rect(image: &mut RgbImage, bbox: &BoundingBox, thickness: i32, color: Rgb<u8>) {
    let (x0, y0, x1, y1) = (bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax);
    for t in 0..thickness.max(1) {
        for x in x0..=x1 {
            put(image, x, y0 + t, color);
            put(image, x, y1 - t, color);
        }
        for y in y0..=y1 {
            put(image, x0 + t, y, color);
            put(image, x1 - t, y, color);
        }
    }
}

pub fn fill_rect(image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    for y in bbox.ymin..=bbox.ymax {
        for x in bbox.xmin..=bbox.xmax {
            put(image, x, y, color);
        }
    }
}

pub struct Overlay {
    font: Option<FontRenderer>,
    font_size: f32,
    bitmap_scale: u32,
    dot_size: i32,
    landmark_color: Rgb<u8>,
    skeleton_color: Rgb<u8>,
    show_fps: bool,
}

impl Overlay {
    pub fn new(ui: &UiConfig) -> Self {
        Self::with_font(ui, FontRenderer::try_load(&ui.font_family))
    }

    /// Overlay that always uses the bitmap font.
    pub fn bitmap(ui: &UiConfig) -> Self {
        Self::with_font(ui, None)
    }

    fn with_font(ui: &UiConfig, font: Option<FontRenderer>) -> Self {
        Self {
            font,
            font_size: ui.font_size_pt as f32,
            bitmap_scale: ui.bitmap_scale.max(1),
            dot_size: ui.dot_size.max(1) as i32,
            landmark_color: rgb(&ui.landmark_color_hex),
            skeleton_color: rgb(&ui.skeleton_color_hex),
            show_fps: ui.show_fps,
        }
    }

    fn text(&self, image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match &self.font {
            Some(renderer) => renderer.draw_text(image, x, y, text, color, self.font_size),
            None => font::draw_text_line(image, x, y, text, color, self.bitmap_scale),
        }
    }

    fn line_height(&self) -> i32 {
        match &self.font {
            Some(renderer) => renderer.measure_height(self.font_size) as i32,
            None => 5 * self.bitmap_scale as i32,
        }
    }

    pub fn draw(&self, image: &mut RgbImage, hands: &[HandLandmarks], outcome: &FrameOutcome, fps: f32) {
        for hand in hands {
            self.draw_hand(image, hand);
        }

        let fps_at = match &outcome.mode {
            ModeFrame::Media(frame) => {
                if let Some(hand) = hands.first() {
                    self.draw_media(image, hand, frame);
                }
                self.draw_bars(image, frame.volume, frame.brightness);
                (500, 50)
            }
            ModeFrame::Mouse(frame) => {
                self.draw_mouse(image, frame);
                (20, 50)
            }
        };

        if self.show_fps {
            self.text(image, fps_at.0, fps_at.1, &format!("FPS: {}", fps.round() as i32), BLUE);
        }
    }

    fn draw_hand(&self, image: &mut RgbImage, hand: &HandLandmarks) {
        for &(a, b) in HAND_CONNECTIONS.iter() {
            let (pa, pb) = (hand.point(a), hand.point(b));
            line(image, (pa.x, pa.y), (pb.x, pb.y), 2, self.skeleton_color);
        }
        for p in hand.points() {
            fill_circle(image, (p.x, p.y), self.dot_size, self.landmark_color);
        }
    }

    fn draw_pinch(&self, image: &mut RgbImage, pinch: &Pinch, applied: Option<Rgb<u8>>) {
        fill_circle(image, pinch.start, 10, MAGENTA);
        fill_circle(image, pinch.end, 10, MAGENTA);
        line(image, pinch.start, pinch.end, 3, MAGENTA);
        fill_circle(image, pinch.midpoint, 10, applied.unwrap_or(MAGENTA));
    }

    fn draw_media(&self, image: &mut RgbImage, hand: &HandLandmarks, frame: &MediaFrame) {
        let bbox = hand.bounding_box();
        let padded = BoundingBox::new(
            bbox.xmin - BOX_PADDING,
            bbox.ymin - BOX_PADDING,
            bbox.xmax + BOX_PADDING,
            bbox.ymax + BOX_PADDING,
        );
        rect(image, &padded, 2, GREEN);

        if let Some(pinch) = &frame.volume_pinch {
            self.draw_pinch(image, pinch, frame.volume_applied.then_some(GREEN));
        }
        if let Some(pinch) = &frame.brightness_pinch {
            self.draw_pinch(image, pinch, frame.brightness_applied.then_some(YELLOW));
        }
        if frame.cooling_down {
            self.text(image, padded.xmin, padded.ymin - 30, "WAIT", YELLOW);
        }
    }

    fn draw_bars(&self, image: &mut RgbImage, volume: Level, brightness: Level) {
        for (level, (x0, x1), color) in [
            (volume, VOLUME_BAR_X, BLUE),
            (brightness, BRIGHTNESS_BAR_X, CYAN),
        ] {
            let outline = BoundingBox::new(x0, BAR_TOP as i32, x1, BAR_BOTTOM as i32);
            rect(image, &outline, 3, color);
            let top = level.bar_y.clamp(BAR_TOP, BAR_BOTTOM).round() as i32;
            fill_rect(image, &BoundingBox::new(x0, top, x1, BAR_BOTTOM as i32), color);
            self.text(image, x0 - 10, 430, &format!("{}%", level.percent), color);
        }
    }

    fn draw_mouse(&self, image: &mut RgbImage, frame: &MouseFrame) {
        rect(image, &frame.region, 2, MAGENTA);
        if let Some(tip) = frame.index_tip {
            fill_circle(image, tip, 15, MAGENTA);
            ring(image, tip, 22, 2, WHITE);
        }
        if let Some(pinch) = &frame.click_pinch {
            line(image, pinch.start, pinch.end, 3, MAGENTA);
            let color = if frame.clicked { GREEN } else { MAGENTA };
            fill_circle(image, pinch.midpoint, 15, color);
        }
    }

    /// Placeholder shown in the window while no session is running.
    pub fn idle_frame(&self, width: u32, height: u32, mode: Mode, camera: u32) -> RgbImage {
        let mut image = RgbImage::from_pixel(width.max(1), height.max(1), IDLE_BACKGROUND);
        let lines = [
            "HAND GESTURE CONTROLLER".to_string(),
            format!("MODE: {}   CAMERA: {}", mode.label().to_uppercase(), camera),
            "SPACE: START/STOP   M: MODE".to_string(),
            "0-4: CAMERA   ESC: QUIT".to_string(),
        ];
        let mut y = 60;
        for text in &lines {
            self.text(&mut image, 40, y, text, WHITE);
            y += self.line_height() + 20;
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{simulated_hand, SimulatedPose};

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF0000"), (255, 0, 0));
        assert_eq!(parse_hex("#00FF00"), (0, 255, 0));
        assert_eq!(parse_hex("#0000FF"), (0, 0, 255));
        assert_eq!(parse_hex("#FFFFFF"), (255, 255, 255));
        assert_eq!(parse_hex("invalid"), (255, 0, 0)); // Fallback
    }

    #[test]
    fn test_line_hits_both_ends() {
        let mut img = RgbImage::new(20, 20);
        line(&mut img, (2, 3), (15, 11), 1, WHITE);
        assert_eq!(*img.get_pixel(2, 3), WHITE);
        assert_eq!(*img.get_pixel(15, 11), WHITE);
    }

    #[test]
    fn test_shapes_clip_to_image() {
        let mut img = RgbImage::new(10, 10);
        fill_circle(&mut img, (-5, -5), 8, WHITE);
        rect(&mut img, &BoundingBox::new(-3, -3, 30, 30), 1, WHITE);
        assert_eq!(*img.get_pixel(0, 0), WHITE);
        assert_eq!(*img.get_pixel(9, 9), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_bars_fill_from_bottom() {
        let overlay = Overlay::bitmap(&UiConfig::default());
        let mut img = RgbImage::new(640, 480);
        let half = Level { percent: 50, bar_y: 275.0 };
        overlay.draw_bars(&mut img, half, Level::default());
        assert_eq!(*img.get_pixel(67, 390), BLUE);
        assert_eq!(*img.get_pixel(67, 200), Rgb([0, 0, 0]));
        // empty brightness bar is outlined only
        assert_eq!(*img.get_pixel(117, 300), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(100, 300), CYAN);
    }

    #[test]
    fn test_draw_marks_landmarks() {
        let overlay = Overlay::bitmap(&UiConfig::default());
        let mut img = RgbImage::new(640, 480);
        let hand = simulated_hand(SimulatedPose::Open, (320.0, 240.0));
        let outcome = FrameOutcome {
            mode: ModeFrame::Media(MediaFrame::default()),
            events: Vec::new(),
            errors: Vec::new(),
        };
        overlay.draw(&mut img, std::slice::from_ref(&hand), &outcome, 30.0);
        let tip = hand.point(8);
        assert_eq!(*img.get_pixel(tip.x as u32, tip.y as u32), rgb(&UiConfig::default().landmark_color_hex));
    }

    #[test]
    fn test_idle_frame_size() {
        let overlay = Overlay::bitmap(&UiConfig::default());
        let img = overlay.idle_frame(320, 240, Mode::Mouse, 2);
        assert_eq!(img.dimensions(), (320, 240));
        assert_eq!(*img.get_pixel(5, 5), IDLE_BACKGROUND);
    }
}
