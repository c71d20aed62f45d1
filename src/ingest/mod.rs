//! Frame acquisition.
//!
//! This module provides the sources a cycle can capture from:
//! - Synthetic camera (`stub://` device paths, testing and bench runs)
//! - USB/CSI cameras through V4L2 (feature: ingest-v4l2)
//! - PIR motion sensor (motion-only deployments)
//!
//! Every source is driven through a `CameraSession`, a scoped guard that
//! opens the device with the configured settings and releases it on drop.
//! The scheduler holds the session for exactly one cycle, so the device is
//! released before the next acquisition whether the cycle succeeded or not.

pub mod motion;
#[cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]
mod normalize;
pub mod stub;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub use motion::MotionSensorSource;
pub use stub::SyntheticCamera;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Camera;

/// Clockwise sensor rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl TryFrom<u32> for Rotation {
    type Error = anyhow::Error;

    fn try_from(degrees: u32) -> Result<Self> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            other => Err(anyhow!("rotation must be 0, 90, 180 or 270, got {}", other)),
        }
    }
}

/// Capture settings applied each time a source is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraSettings {
    /// Device path (e.g. "/dev/video0" or "stub://front").
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
    /// Brightness in `0..=100`, 50 being neutral.
    pub brightness: u8,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 368,
            rotation: Rotation::None,
            brightness: 50,
        }
    }
}

/// A device that produces one still per request.
pub trait FrameSource {
    /// Source identifier for logs.
    fn name(&self) -> &'static str;

    /// Open the device and apply resolution, rotation and brightness.
    fn open(&mut self, settings: &CameraSettings) -> Result<()>;

    /// Start streaming so exposure can settle before the capture.
    fn start_preview(&mut self) -> Result<()> {
        Ok(())
    }

    /// Capture exactly one frame, synchronously.
    fn capture(&mut self) -> Result<Frame>;

    /// Release capture buffers and preview resources.
    fn stop_preview(&mut self) {}

    /// Release the device. Must be safe to call after a failed `open`.
    fn close(&mut self);
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&mut self, settings: &CameraSettings) -> Result<()> {
        (**self).open(settings)
    }

    fn start_preview(&mut self) -> Result<()> {
        (**self).start_preview()
    }

    fn capture(&mut self) -> Result<Frame> {
        (**self).capture()
    }

    fn stop_preview(&mut self) {
        (**self).stop_preview()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Scoped ownership of an open source.
///
/// Dropping the session stops the preview and closes the device, including
/// on early returns and `?` propagation inside a cycle.
pub struct CameraSession<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
    previewing: bool,
}

impl<'a, S: FrameSource + ?Sized> CameraSession<'a, S> {
    pub fn acquire(source: &'a mut S, settings: &CameraSettings) -> Result<Self> {
        if let Err(err) = source.open(settings) {
            source.close();
            return Err(err);
        }
        log::debug!("{}: opened {}", source.name(), settings.device);
        Ok(Self {
            source,
            previewing: false,
        })
    }

    pub fn start_preview(&mut self) -> Result<()> {
        self.source.start_preview()?;
        self.previewing = true;
        Ok(())
    }

    /// Capture one frame and release the preview buffers.
    pub fn capture(&mut self) -> Result<Frame> {
        let frame = self.source.capture();
        self.stop_preview();
        frame
    }

    fn stop_preview(&mut self) {
        if self.previewing {
            self.source.stop_preview();
            self.previewing = false;
        }
    }
}

impl<S: FrameSource + ?Sized> Drop for CameraSession<'_, S> {
    fn drop(&mut self) {
        self.stop_preview();
        self.source.close();
        log::debug!("{}: released", self.source.name());
    }
}

/// Select a source for the configured device path.
pub fn open_source(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    if settings.device.starts_with("stub://") {
        return Ok(Box::new(SyntheticCamera::new()));
    }
    #[cfg(feature = "ingest-v4l2")]
    {
        Ok(Box::new(V4l2Camera::new()))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        Err(anyhow!(
            "camera {} requires the ingest-v4l2 feature",
            settings.device
        ))
    }
}
