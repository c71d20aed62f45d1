//! Captured raster frames.
//!
//! - `Frame`: one RGB still captured for a single cycle. Immutable once built.
//! - `resize_nearest`: the cheap, lossy resize used to fit the engine input.
//!
//! A frame is owned by the scheduler for exactly one cycle and dropped at the
//! end of it. Nothing in the agent buffers frames across cycles.

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;
use std::time::{Duration, Instant};

// ----------------------------------------------------------------------------
// Frame: one captured still
// ----------------------------------------------------------------------------

/// One captured RGB still.
///
/// There is no mutable accessor; annotation works on a copy.
pub struct Frame {
    image: RgbImage,

    /// Monotonic capture instant.
    captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Instant::now(),
        }
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("pixel buffer does not fit {}x{}", width, height))?;
        Ok(Self::new(image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Time since capture.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    /// Write the frame as a static image, overwriting any prior file.
    ///
    /// The encoding follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save(path)
            .with_context(|| format!("failed to write frame to {}", path.display()))
    }
}

/// Resize to the engine's input shape using nearest-neighbour sampling.
pub fn resize_nearest(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.width() == width && image.height() == height {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Nearest)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn from_rgb_validates_length() {
        assert!(Frame::from_rgb(2, 2, vec![0u8; 12]).is_ok());
        assert!(Frame::from_rgb(2, 2, vec![0u8; 11]).is_err());
    }

    #[test]
    fn frame_reports_dimensions() {
        let frame = Frame::from_rgb(4, 3, vec![7u8; 36]).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 3);
        assert!(frame.age() < Duration::from_secs(1));
    }

    #[test]
    fn nearest_resize_keeps_exact_pixel_values() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        image.put_pixel(0, 1, Rgb([0, 0, 255]));
        image.put_pixel(1, 1, Rgb([9, 9, 9]));

        let resized = resize_nearest(&image, 4, 4);
        assert_eq!(resized.dimensions(), (4, 4));
        let allowed = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [9, 9, 9]];
        for pixel in resized.pixels() {
            assert!(allowed.contains(&pixel.0), "interpolated pixel {:?}", pixel);
        }
    }

    #[test]
    fn save_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.png");
        Frame::from_rgb(1, 1, vec![1, 2, 3]).unwrap().save(&path).unwrap();
        Frame::from_rgb(2, 1, vec![4u8; 6]).unwrap().save(&path).unwrap();
        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.width(), 2);
    }
}
