//! Synthetic camera for `stub://` device paths.
//!
//! Produces a gradient scene with light sensor noise at the configured
//! resolution, then applies brightness and rotation the same way the V4L2
//! source does. Used for bench runs without camera hardware.

use anyhow::{anyhow, Result};
use image::RgbImage;
use rand::Rng;

use super::normalize::{apply_brightness, rotate};
use super::{CameraSettings, FrameSource};
use crate::frame::Frame;

#[derive(Default)]
pub struct SyntheticCamera {
    settings: Option<CameraSettings>,
    frame_count: u64,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn generate_pixels(&self, width: u32, height: u32) -> RgbImage {
        let mut rng = rand::thread_rng();
        let shift = (self.frame_count % 256) as u32;
        RgbImage::from_fn(width, height, |x, y| {
            let noise: i16 = rng.gen_range(-4..=4);
            let base = ((x + y + shift) % 256) as i16;
            let value = (base + noise).clamp(0, 255) as u8;
            image::Rgb([value, value / 2, 255 - value])
        })
    }
}

impl FrameSource for SyntheticCamera {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn open(&mut self, settings: &CameraSettings) -> Result<()> {
        if settings.width == 0 || settings.height == 0 {
            return Err(anyhow!(
                "invalid resolution {}x{}",
                settings.width,
                settings.height
            ));
        }
        self.settings = Some(settings.clone());
        log::debug!("SyntheticCamera: connected to {}", settings.device);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| anyhow!("synthetic camera not open"))?;
        self.frame_count += 1;

        let mut image = self.generate_pixels(settings.width, settings.height);
        apply_brightness(&mut image, settings.brightness);
        Ok(Frame::new(rotate(image, settings.rotation)))
    }

    fn close(&mut self) {
        self.settings = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Rotation;

    fn stub_settings() -> CameraSettings {
        CameraSettings {
            device: "stub://test".to_string(),
            width: 64,
            height: 36,
            ..Default::default()
        }
    }

    #[test]
    fn synthetic_camera_produces_frames_at_resolution() -> Result<()> {
        let mut camera = SyntheticCamera::new();
        camera.open(&stub_settings())?;
        let frame = camera.capture()?;
        assert_eq!((frame.width(), frame.height()), (64, 36));
        assert_eq!(camera.frames_captured(), 1);
        Ok(())
    }

    #[test]
    fn rotation_is_applied_after_capture() -> Result<()> {
        let mut camera = SyntheticCamera::new();
        camera.open(&CameraSettings {
            rotation: Rotation::Cw270,
            ..stub_settings()
        })?;
        let frame = camera.capture()?;
        assert_eq!((frame.width(), frame.height()), (36, 64));
        Ok(())
    }

    #[test]
    fn capture_after_close_fails() {
        let mut camera = SyntheticCamera::new();
        camera.open(&stub_settings()).unwrap();
        camera.close();
        assert!(camera.capture().is_err());
    }
}
