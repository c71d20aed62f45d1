//! Minimal sysfs GPIO access.
//!
//! Pins live under `<root>/gpio<N>/` with `direction` and `value` attribute
//! files. The root is configurable so the same code drives a real board at
//! `/sys/class/gpio` and a plain directory in tests.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// Udev needs a moment to make a freshly exported pin writable.
const EXPORT_SETTLE: Duration = Duration::from_millis(100);
const EXPORT_ATTEMPTS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    dir: PathBuf,
}

impl SysfsPin {
    /// Export the pin when needed and set its direction.
    pub fn open<P: AsRef<Path>>(root: P, number: u32, direction: Direction) -> Result<Self> {
        let root = root.as_ref();
        let dir = root.join(format!("gpio{}", number));
        if !dir.exists() {
            fs::write(root.join("export"), number.to_string())
                .with_context(|| format!("export gpio {} under {}", number, root.display()))?;
            wait_for(&dir)?;
        }
        let pin = Self { number, dir };
        pin.write_attr("direction", direction.as_str())?;
        Ok(pin)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn set(&self, high: bool) -> Result<()> {
        self.write_attr("value", if high { "1" } else { "0" })
    }

    pub fn is_high(&self) -> Result<bool> {
        let path = self.dir.join("value");
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read gpio {} value", self.number))?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(anyhow!("gpio {} value was {:?}", self.number, other)),
        }
    }

    fn write_attr(&self, name: &str, value: &str) -> Result<()> {
        fs::write(self.dir.join(name), value)
            .with_context(|| format!("write gpio {} {}={}", self.number, name, value))
    }
}

fn wait_for(dir: &Path) -> Result<()> {
    for _ in 0..EXPORT_ATTEMPTS {
        if dir.exists() {
            return Ok(());
        }
        thread::sleep(EXPORT_SETTLE);
    }
    Err(anyhow!("{} did not appear after export", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_pin_writes_direction_and_value() -> Result<()> {
        let root = tempfile::tempdir()?;
        fs::create_dir(root.path().join("gpio22"))?;

        let pin = SysfsPin::open(root.path(), 22, Direction::Out)?;
        assert_eq!(fs::read_to_string(root.path().join("gpio22/direction"))?, "out");

        pin.set(true)?;
        assert!(pin.is_high()?);
        pin.set(false)?;
        assert!(!pin.is_high()?);
        Ok(())
    }

    #[test]
    fn missing_pin_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        // Writing `export` succeeds on a plain directory but no pin appears.
        let err = SysfsPin::open(root.path(), 5, Direction::In).unwrap_err();
        assert!(err.to_string().contains("did not appear"));
    }
}
