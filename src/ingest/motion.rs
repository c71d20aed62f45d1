//! PIR motion sensor source.
//!
//! Motion-only deployments have no camera. The sensor pin stands in for the
//! camera: `capture` blocks until the pin goes from low to high and then
//! yields a 1x1 placeholder frame, which the motion trigger pipeline turns
//! into a single full-frame detection.
//!
//! One motion event fires once however long the PIR holds the pin high. The
//! last sampled level is kept on the source, not the pin handle, because the
//! scheduler reopens the source every cycle.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use super::{CameraSettings, FrameSource};
use crate::frame::Frame;
use crate::gpio::{Direction, SysfsPin};

pub struct MotionSensorSource {
    gpio_root: PathBuf,
    pin_number: u32,
    poll: Duration,
    max_wait: Option<Duration>,
    pin: Option<SysfsPin>,
    // Starts low so motion already in progress at startup fires once.
    last_high: bool,
}

impl MotionSensorSource {
    pub fn new(gpio_root: impl Into<PathBuf>, pin_number: u32, poll: Duration) -> Self {
        Self {
            gpio_root: gpio_root.into(),
            pin_number,
            poll,
            max_wait: None,
            pin: None,
            last_high: false,
        }
    }

    /// Give up on a capture after `limit` without a rising edge.
    pub fn with_max_wait(mut self, limit: Duration) -> Self {
        self.max_wait = Some(limit);
        self
    }
}

impl FrameSource for MotionSensorSource {
    fn name(&self) -> &'static str {
        "pir"
    }

    fn open(&mut self, _settings: &CameraSettings) -> Result<()> {
        let pin = SysfsPin::open(&self.gpio_root, self.pin_number, Direction::In)
            .with_context(|| format!("open motion sensor on gpio {}", self.pin_number))?;
        self.pin = Some(pin);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        let pin = self.pin.as_ref().context("motion sensor not open")?;
        let started = Instant::now();
        loop {
            let high = pin.is_high()?;
            let rising = high && !self.last_high;
            self.last_high = high;
            if rising {
                break;
            }
            if let Some(limit) = self.max_wait {
                if started.elapsed() >= limit {
                    return Err(anyhow!(
                        "no motion on gpio {} within {:?}",
                        pin.number(),
                        limit
                    ));
                }
            }
            thread::sleep(self.poll);
        }
        log::debug!("pir: motion on gpio {}", pin.number());
        Frame::from_rgb(1, 1, vec![0, 0, 0])
    }

    fn close(&mut self) {
        self.pin = None;
    }
}
