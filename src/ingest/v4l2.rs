//! V4L2 camera source.
//!
//! This module provides `V4l2Camera` for capturing stills from local V4L2
//! devices (USB cameras, the Pi camera through its V4L2 driver).
//!
//! Each `open` negotiates RGB24 at the configured resolution (falling back to
//! YUYV when the driver refuses), sets the brightness control scaled into the
//! device's advertised range, and maps a small buffer stream. Rotation is
//! applied in software after capture. `close` drops the stream and the file
//! handle so the device is free between cycles.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, rotate, PixelFormat};
use super::{CameraSettings, FrameSource};
use crate::frame::Frame;

/// `V4L2_CID_BRIGHTNESS`.
const CID_BRIGHTNESS: u32 = 0x0098_0900;
const BUFFER_COUNT: u32 = 4;

/// V4L2 camera.
#[derive(Default)]
pub struct V4l2Camera {
    state: Option<DeviceState>,
    frame_count: u64,
}

struct DeviceState {
    settings: CameraSettings,
    width: u32,
    height: u32,
    format: PixelFormat,
    stream: StreamState,
}

#[self_referencing]
struct StreamState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn next_buffer(state: &mut DeviceState) -> Result<Vec<u8>> {
        use v4l::io::traits::CaptureStream;

        state
            .stream
            .with_mut(|fields| fields.stream.next().map(|(buf, _meta)| buf.to_vec()))
            .context("capture v4l2 frame")
    }
}

impl FrameSource for V4l2Camera {
    fn name(&self) -> &'static str {
        "v4l2"
    }

    fn open(&mut self, settings: &CameraSettings) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&settings.device)
            .with_context(|| format!("open v4l2 device {}", settings.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = settings.width;
        format.height = settings.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Camera: RGB3 refused on {}: {}, trying YUYV",
                    settings.device,
                    err
                );
                format.fourcc = v4l::FourCC::new(b"YUYV");
                device
                    .set_format(&format)
                    .context("set v4l2 format after RGB3 refusal")?
            }
        };
        let pixel_format = match &format.fourcc.repr {
            b"RGB3" => PixelFormat::Rgb24,
            b"YUYV" => PixelFormat::Yuyv,
            other => {
                return Err(anyhow!(
                    "unsupported v4l2 pixel format {}",
                    String::from_utf8_lossy(other)
                ))
            }
        };

        if let Err(err) = set_brightness(&device, settings.brightness) {
            log::warn!(
                "V4l2Camera: failed to set brightness on {}: {:#}",
                settings.device,
                err
            );
        }

        let stream = StreamStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "V4l2Camera: opened {} ({}x{} {:?})",
            settings.device,
            format.width,
            format.height,
            pixel_format
        );
        self.state = Some(DeviceState {
            settings: settings.clone(),
            width: format.width,
            height: format.height,
            format: pixel_format,
            stream,
        });
        Ok(())
    }

    /// The first dequeue starts streaming; auto-exposure runs from here.
    fn start_preview(&mut self) -> Result<()> {
        let state = self.state.as_mut().context("v4l2 device not open")?;
        Self::next_buffer(state)?;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        let state = self.state.as_mut().context("v4l2 device not open")?;
        // Buffers queued during warm-up hold stale exposure.
        for _ in 1..BUFFER_COUNT {
            Self::next_buffer(state)?;
        }
        let raw = Self::next_buffer(state)?;
        self.frame_count += 1;

        let rgb = normalize_to_rgb(&raw, state.width, state.height, state.format)?;
        let image = RgbImage::from_raw(state.width, state.height, rgb)
            .ok_or_else(|| anyhow!("v4l2 buffer does not fit {}x{}", state.width, state.height))?;
        Ok(Frame::new(rotate(image, state.settings.rotation)))
    }

    fn close(&mut self) {
        if let Some(state) = self.state.take() {
            log::debug!("V4l2Camera: closed {}", state.settings.device);
        }
    }
}

fn set_brightness(device: &v4l::Device, brightness: u8) -> Result<()> {
    let controls = device.query_controls().context("query v4l2 controls")?;
    let description = controls
        .iter()
        .find(|control| control.id == CID_BRIGHTNESS)
        .ok_or_else(|| anyhow!("device has no brightness control"))?;
    let value = scale_brightness(brightness, description.minimum, description.maximum);
    device
        .set_control(v4l::control::Control {
            id: CID_BRIGHTNESS,
            value: v4l::control::Value::Integer(value),
        })
        .context("set v4l2 brightness")
}

/// Map `0..=100` onto the device's `minimum..=maximum`.
fn scale_brightness(brightness: u8, minimum: i64, maximum: i64) -> i64 {
    let span = (maximum - minimum).max(0);
    minimum + span * i64::from(brightness.min(100)) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_scales_into_device_range() {
        assert_eq!(scale_brightness(50, 0, 255), 127);
        assert_eq!(scale_brightness(0, -64, 64), -64);
        assert_eq!(scale_brightness(100, -64, 64), 64);
    }

    #[test]
    fn capture_before_open_fails() {
        let mut camera = V4l2Camera::new();
        assert!(camera.capture().is_err());
    }
}
