//! Polling of the ready/busy line with a tick based timeout.

use embedded_hal::digital::{Error as _, InputPin};

/// Free running tick counter used to bound waits.
///
/// The counter may wrap, elapsed time is computed with wrapping arithmetic.
pub trait TickClock {
    fn now(&mut self) -> u32;
}

impl<T: TickClock + ?Sized> TickClock for &mut T {
    fn now(&mut self) -> u32 {
        T::now(self)
    }
}

/// The ready/busy line stayed low for longer than the timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("Device did not become ready in time")]
pub struct TimedOut;

/// Waits for the device to release its ready/busy line.
///
/// The line is high when the device is ready. A failed pin read is counted as busy.
pub struct ReadyBusyMonitor<RB, CLK> {
    pin: RB,
    clock: CLK,
    timeout_ticks: u32,
}

impl<RB: InputPin, CLK: TickClock> ReadyBusyMonitor<RB, CLK> {
    pub fn new(pin: RB, clock: CLK, timeout_ticks: u32) -> Self {
        ReadyBusyMonitor {
            pin,
            clock,
            timeout_ticks,
        }
    }

    pub fn timeout_ticks(&self) -> u32 {
        self.timeout_ticks
    }

    /// Sample the line once
    pub fn is_ready(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(ready) => ready,
            Err(e) => {
                warn!("Ready/busy pin read failed: {:?}", e.kind());
                false
            }
        }
    }

    /// Busy wait until the line goes high or more than `timeout_ticks` elapsed
    pub fn wait_ready(&mut self) -> Result<(), TimedOut> {
        let start = self.clock.now();
        loop {
            if self.is_ready() {
                return Ok(());
            }
            if self.clock.now().wrapping_sub(start) > self.timeout_ticks {
                warn!("Timed out after {} ticks", self.timeout_ticks);
                return Err(TimedOut);
            }
        }
    }

    pub fn pin_mut(&mut self) -> &mut RB {
        &mut self.pin
    }

    /// Give back the pin and the clock
    pub fn release(self) -> (RB, CLK) {
        (self.pin, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ScriptedPin, StepClock};
    use test_log::test;

    #[test]
    fn test_ready_immediately() {
        let mut monitor = ReadyBusyMonitor::new(ScriptedPin::ready(), StepClock::new(0, 1), 20);
        assert_eq!(monitor.wait_ready(), Ok(()));
        let (pin, clock) = monitor.release();
        assert_eq!(pin.polls(), 1);
        // only the start time was taken
        assert_eq!(clock.reads(), 1);
    }

    #[test]
    fn test_ready_after_some_polls() {
        let mut monitor =
            ReadyBusyMonitor::new(ScriptedPin::ready_after(5), StepClock::new(0, 1), 20);
        assert_eq!(monitor.wait_ready(), Ok(()));
        let (pin, _) = monitor.release();
        assert_eq!(pin.polls(), 6);
    }

    #[test]
    fn test_stuck_busy_times_out() {
        let mut monitor = ReadyBusyMonitor::new(ScriptedPin::stuck_busy(), StepClock::new(0, 1), 20);
        assert_eq!(monitor.wait_ready(), Err(TimedOut));
        let (pin, clock) = monitor.release();
        // 21 ticks must elapse before giving up
        assert_eq!(pin.polls(), 21);
        assert_eq!(clock.reads(), 22);
    }

    #[test]
    fn test_timeout_across_clock_wrap() {
        let mut monitor = ReadyBusyMonitor::new(
            ScriptedPin::stuck_busy(),
            StepClock::new(u32::MAX - 5, 1),
            20,
        );
        assert_eq!(monitor.wait_ready(), Err(TimedOut));
        let (pin, _) = monitor.release();
        assert_eq!(pin.polls(), 21);
    }

    #[test]
    fn test_pin_error_counts_as_busy() {
        let mut monitor = ReadyBusyMonitor::new(ScriptedPin::broken(), StepClock::new(0, 1), 3);
        assert_eq!(monitor.wait_ready(), Err(TimedOut));
    }

    #[test]
    fn test_ready_just_before_timeout() {
        // ready on the poll made at 20 elapsed ticks
        let mut monitor =
            ReadyBusyMonitor::new(ScriptedPin::ready_after(20), StepClock::new(0, 1), 20);
        assert_eq!(monitor.wait_ready(), Ok(()));
    }
}
