use anyhow::{anyhow, Context, Result};
use colored::*;
use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    Camera,
};
use tracing::{debug, info};

/// Camera indices offered for selection.
pub const CAMERA_INDICES: std::ops::RangeInclusive<u32> = 0..=4;

/// Anything the session can pull frames from.
pub trait FrameSource {
    fn capture(&mut self) -> Result<RgbImage>;
    fn resolution(&self) -> (u32, u32);
    fn name(&self) -> String;
}

pub struct CameraSource {
    camera: Camera,
}

impl CameraSource {
    /// Opens camera `index`, asking for the format closest to `width` x `height` @ `fps`.
    pub fn new(index: u32, width: u32, height: u32, fps: u32) -> Result<Self> {
        let cam_index = CameraIndex::Index(index);
        let wanted = CameraFormat::new_from(width, height, FrameFormat::MJPEG, fps);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));
        let mut camera = Camera::new(cam_index, requested)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("Failed to create camera instance {}", index))?;

        camera
            .open_stream()
            .map_err(|e| anyhow!(e))
            .context("Failed to open camera stream")?;

        println!("{}", format!("Opened camera: {}", camera.info().human_name()).green());
        info!("Camera format: {}", camera.camera_format());

        Ok(Self { camera })
    }
}

impl FrameSource for CameraSource {
    fn capture(&mut self) -> Result<RgbImage> {
        let frame = self.camera.frame().map_err(|e| anyhow!(e)).context("Failed to get frame")?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| anyhow!(e))
            .context("Failed to decode frame")?;
        Ok(decoded)
    }

    fn resolution(&self) -> (u32, u32) {
        let res = self.camera.resolution();
        (res.width(), res.height())
    }

    fn name(&self) -> String {
        self.camera.info().human_name()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        debug!("Releasing camera {}", self.camera.info().human_name());
        let _ = self.camera.stop_stream();
    }
}

/// Prints the cameras the native backend can see.
pub fn list_cameras() -> Result<()> {
    let cameras = nokhwa::query(ApiBackend::Auto).map_err(|e| anyhow!(e))?;
    println!("Available Cameras:");
    println!("{:<5} | {:<30} | {:<10}", "Index", "Name", "Misc");
    println!("{}", "-".repeat(60));
    for cam in cameras {
        println!("{:<5} | {:<30} | {:?}", cam.index(), cam.human_name(), cam.misc());
    }
    Ok(())
}
