use image::{Rgb, RgbImage};
use rusttype::{point, Font, Scale};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub struct FontRenderer {
    font: Font<'static>,
}

impl FontRenderer {
    /// Looks for `<family>.ttf` in the usual macOS, Linux and Windows font folders.
    pub fn try_load(family: &str) -> Option<Self> {
        let paths = [
            format!("/Library/Fonts/{}.ttf", family),
            format!("/System/Library/Fonts/{}.ttf", family),
            format!("/System/Library/Fonts/Supplemental/{}.ttf", family),
            format!("/usr/share/fonts/truetype/{}.ttf", family),
            format!("/usr/share/fonts/truetype/dejavu/{}.ttf", family),
            format!("/usr/share/fonts/TTF/{}.ttf", family),
            format!("C:\\Windows\\Fonts\\{}.ttf", family),
            format!("{}.ttf", family),
        ];

        for p in paths.iter() {
            if !Path::new(p).exists() {
                continue;
            }
            if let Ok(data) = fs::read(p) {
                if let Some(font) = Font::try_from_vec(data) {
                    info!("Loaded font from {}", p);
                    return Some(Self { font });
                }
            }
        }

        warn!("Could not find font family '{}'. Falling back to bitmap.", family);
        None
    }

    /// Draws `text` with its top-left corner at (`x`, `y`).
    pub fn draw_text(&self, image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>, size_pt: f32) {
        let scale = Scale::uniform(size_pt);
        let v_metrics = self.font.v_metrics(scale);
        let start = point(x as f32, y as f32 + v_metrics.ascent);
        let (width, height) = (image.width() as i32, image.height() as i32);

        for glyph in self.font.layout(text, scale, start) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, v| {
                if v < 0.2 {
                    return;
                }
                let px = bb.min.x + gx as i32;
                let py = bb.min.y + gy as i32;
                if px >= 0 && py >= 0 && px < width && py < height {
                    image.put_pixel(px as u32, py as u32, color);
                }
            });
        }
    }

    pub fn measure_height(&self, size_pt: f32) -> u32 {
        let v_metrics = self.font.v_metrics(Scale::uniform(size_pt));
        (v_metrics.ascent - v_metrics.descent + v_metrics.line_gap).max(0.0) as u32
    }
}
