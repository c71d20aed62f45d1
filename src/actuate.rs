//! Alarm actuation.
//!
//! `ActuationController` is the only component with state that outlives a
//! cycle: the engaged flag of its actuator. Each cycle's decision depends
//! only on that cycle's detection count. A positive count engages the
//! actuator, holds it for the dwell, then disengages; the loop is synchronous
//! so no trigger can arrive during the dwell.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use crate::clock::Clock;
use crate::detect::detection_line;
use crate::error::AgentError;
use crate::gpio::{Direction, SysfsPin};

/// Binary output (alarm, indicator LED).
pub trait Actuator {
    fn name(&self) -> &str;

    fn set(&mut self, engaged: bool) -> Result<()>;
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn set(&mut self, engaged: bool) -> Result<()> {
        (**self).set(engaged)
    }
}

/// Actuator on a sysfs GPIO output pin.
pub struct GpioActuator {
    name: String,
    pin: SysfsPin,
}

impl GpioActuator {
    pub fn open<P: AsRef<Path>>(name: &str, gpio_root: P, pin: u32) -> Result<Self> {
        let pin = SysfsPin::open(gpio_root, pin, Direction::Out)?;
        pin.set(false)?;
        Ok(Self {
            name: format!("{}@gpio{}", name, pin.number()),
            pin,
        })
    }
}

impl Actuator for GpioActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&mut self, engaged: bool) -> Result<()> {
        self.pin.set(engaged)
    }
}

/// Several actuators driven in lockstep.
///
/// Every member is driven even when an earlier one fails; the first error is
/// returned.
#[derive(Default)]
pub struct ActuatorGroup {
    members: Vec<Box<dyn Actuator>>,
}

impl ActuatorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, actuator: impl Actuator + 'static) -> Self {
        self.members.push(Box::new(actuator));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Actuator for ActuatorGroup {
    fn name(&self) -> &str {
        "group"
    }

    fn set(&mut self, engaged: bool) -> Result<()> {
        let mut first_err = None;
        for member in &mut self.members {
            if let Err(err) = member.set(engaged) {
                log::warn!("{}: set({}) failed: {:#}", member.name(), engaged, err);
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// In-memory actuator recording every transition.
#[derive(Debug, Default)]
pub struct MemoryActuator {
    engaged: bool,
    history: Vec<bool>,
    fail_engage: bool,
}

impl MemoryActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every engage attempt fail.
    pub fn failing_engage() -> Self {
        Self {
            fail_engage: true,
            ..Self::default()
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Every requested state, in order.
    pub fn history(&self) -> &[bool] {
        &self.history
    }

    pub fn engage_count(&self) -> usize {
        self.history.iter().filter(|&&on| on).count()
    }
}

impl Actuator for MemoryActuator {
    fn name(&self) -> &str {
        "memory"
    }

    fn set(&mut self, engaged: bool) -> Result<()> {
        self.history.push(engaged);
        if engaged && self.fail_engage {
            return Err(anyhow::anyhow!("relay did not respond"));
        }
        self.engaged = engaged;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Controller
// ----------------------------------------------------------------------------

pub struct ActuationController<A, C> {
    actuator: A,
    clock: C,
    dwell: Duration,
    console: bool,
    engaged: bool,
    triggers: u64,
}

impl<A: Actuator, C: Clock> ActuationController<A, C> {
    pub fn new(actuator: A, clock: C, dwell: Duration) -> Self {
        Self {
            actuator,
            clock,
            dwell,
            console: false,
            engaged: false,
            triggers: 0,
        }
    }

    /// Also print the detection line to stdout.
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// React to one cycle's detection count.
    ///
    /// Zero does nothing. A positive count engages the actuator once, holds it
    /// for the dwell and disengages before returning. Disengage is attempted
    /// even when engage failed.
    pub fn on_cycle_result(
        &mut self,
        detection_count: usize,
        inference_time: Duration,
    ) -> crate::error::Result<()> {
        self.on_trigger(detection_count, &detection_line(detection_count, inference_time))
    }

    /// Same as `on_cycle_result`, announcing a trigger with `line`.
    pub fn on_trigger(&mut self, detection_count: usize, line: &str) -> crate::error::Result<()> {
        if detection_count == 0 {
            return Ok(());
        }

        if self.console {
            println!("{}", line);
        }
        log::info!("{}", line);

        self.triggers += 1;
        let engaged = self.set(true);
        if engaged.is_ok() {
            self.clock.sleep(self.dwell);
        }
        let released = self.set(false);
        engaged.and(released).map_err(AgentError::Actuation)
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Number of cycles that triggered the actuator.
    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    fn set(&mut self, engaged: bool) -> Result<()> {
        self.actuator.set(engaged)?;
        self.engaged = engaged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const DWELL: Duration = Duration::from_secs(2);

    #[test]
    fn zero_detections_never_engage() {
        let clock = ManualClock::new();
        let mut controller = ActuationController::new(MemoryActuator::new(), &clock, DWELL);
        controller.on_cycle_result(0, Duration::ZERO).unwrap();
        assert!(controller.actuator().history().is_empty());
        assert_eq!(clock.slept(), Duration::ZERO);
        assert_eq!(controller.triggers(), 0);
    }

    #[test]
    fn detections_engage_once_for_the_dwell() {
        let clock = ManualClock::new();
        let mut controller = ActuationController::new(MemoryActuator::new(), &clock, DWELL);
        controller
            .on_cycle_result(3, Duration::from_millis(120))
            .unwrap();
        assert_eq!(controller.actuator().history(), &[true, false]);
        assert_eq!(controller.actuator().engage_count(), 1);
        assert!(!controller.is_engaged());
        assert!(!controller.actuator().is_engaged());
        assert_eq!(clock.slept(), DWELL);
    }

    #[test]
    fn failed_engage_still_disengages_and_skips_dwell() {
        let clock = ManualClock::new();
        let mut controller =
            ActuationController::new(MemoryActuator::failing_engage(), &clock, DWELL);
        let err = controller.on_cycle_result(1, Duration::ZERO).unwrap_err();
        assert!(matches!(err, AgentError::Actuation(_)));
        assert_eq!(controller.actuator().history(), &[true, false]);
        assert!(!controller.is_engaged());
        assert_eq!(clock.slept(), Duration::ZERO);
    }

    #[test]
    fn trigger_line_does_not_change_actuation() {
        let clock = ManualClock::new();
        let mut controller = ActuationController::new(MemoryActuator::new(), &clock, DWELL);
        controller.on_trigger(0, "Motion Detected").unwrap();
        assert!(controller.actuator().history().is_empty());
        controller.on_trigger(1, "Motion Detected").unwrap();
        assert_eq!(controller.actuator().history(), &[true, false]);
        assert_eq!(clock.slept(), DWELL);
    }

    #[test]
    fn group_drives_every_member() {
        let mut group = ActuatorGroup::new()
            .with(MemoryActuator::failing_engage())
            .with(MemoryActuator::new());
        assert_eq!(group.len(), 2);
        assert!(group.set(true).is_err());
        assert!(group.set(false).is_ok());
    }

    #[test]
    fn gpio_actuator_starts_disengaged() -> Result<()> {
        let root = tempfile::tempdir()?;
        std::fs::create_dir(root.path().join("gpio22"))?;
        let mut alarm = GpioActuator::open("alarm", root.path(), 22)?;
        let value = root.path().join("gpio22/value");
        assert_eq!(std::fs::read_to_string(&value)?, "0");
        alarm.set(true)?;
        assert_eq!(std::fs::read_to_string(&value)?, "1");
        assert_eq!(alarm.name(), "alarm@gpio22");
        Ok(())
    }
}
