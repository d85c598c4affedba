use anyhow::{anyhow, Result};
use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::time::Duration;

/// Preview window showing the annotated camera frame.
pub struct WindowOutput {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl WindowOutput {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| anyhow!("Failed to create window: {}", e))?;

        window.limit_update_rate(Some(Duration::from_micros(16600))); // ~60 FPS

        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Keys that went down since the last update.
    pub fn keys_pressed(&self) -> Vec<Key> {
        self.window.get_keys_pressed(KeyRepeat::No)
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// Shows `frame`, resizing the back buffer if the frame size changed.
    pub fn update(&mut self, frame: &RgbImage) -> Result<()> {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        if w != self.width || h != self.height {
            self.width = w;
            self.height = h;
        }
        self.buffer.resize(self.width * self.height, 0);

        for (dst, pixel) in self.buffer.iter_mut().zip(frame.pixels()) {
            *dst = pack_rgb(pixel.0);
        }

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| anyhow!("Window update failed: {}", e))
    }

    /// Pumps window events without a new frame.
    pub fn refresh(&mut self) {
        self.window.update();
    }
}

/// RGB8 to minifb's 0RGB.
fn pack_rgb([r, g, b]: [u8; 3]) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}
