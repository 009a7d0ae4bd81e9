//! LED blink patterns
//!
//! Each pattern is a cycle of steps: drive some LEDs high, some low, then
//! hold. A blinker owns its pins outright, so two blinkers can never touch
//! the same LED.

use embassy_time::{Duration, Timer};
use embedded_hal_1::digital::OutputPin;

/// One step of a blink cycle. Bit `n` of a mask selects pin `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkStep {
    pub clear: u8,
    pub set: u8,
    pub hold: Duration,
}

impl BlinkStep {
    pub const fn clear(mask: u8, hold_ms: u64) -> Self {
        Self {
            clear: mask,
            set: 0,
            hold: Duration::from_millis(hold_ms),
        }
    }

    pub const fn set(mask: u8, hold_ms: u64) -> Self {
        Self {
            clear: 0,
            set: mask,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

const LED1: u8 = 1 << 0;
const LED2: u8 = 1 << 1;

/// Red pair: pins `[LED1, LED2]`
pub const RED_PATTERN: [BlinkStep; 4] = [
    BlinkStep::clear(LED2, 200),
    BlinkStep::set(LED1 | LED2, 800),
    BlinkStep::clear(LED1, 200),
    BlinkStep::set(LED1 | LED2, 800),
];

/// Yellow LED: pins `[LED3]`
pub const YELLOW_PATTERN: [BlinkStep; 2] = [BlinkStep::clear(1, 200), BlinkStep::set(1, 300)];

/// Drives `pins` through one step. A failed pin write is logged and the
/// remaining pins are still driven.
pub fn apply<P: OutputPin>(pins: &mut [P], step: &BlinkStep) {
    for (index, pin) in pins.iter_mut().enumerate() {
        let bit = 1u8 << index;
        if step.clear & bit != 0 && pin.set_low().is_err() {
            trace!("LED {} set low failed", index);
        }
        if step.set & bit != 0 && pin.set_high().is_err() {
            trace!("LED {} set high failed", index);
        }
    }
}

/// Runs `pattern` on `pins` forever
pub async fn blink<P: OutputPin, const N: usize>(mut pins: [P; N], pattern: &[BlinkStep]) -> ! {
    loop {
        for step in pattern {
            apply(&mut pins, step);
            Timer::after(step.hold).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_1::digital::{ErrorKind, ErrorType};
    use std::vec::Vec;

    #[derive(Default)]
    struct FakeLed {
        levels: Vec<bool>,
        broken: bool,
    }

    impl FakeLed {
        fn broken() -> Self {
            Self {
                levels: Vec::new(),
                broken: true,
            }
        }

        fn drive(&mut self, level: bool) -> Result<(), ErrorKind> {
            if self.broken {
                return Err(ErrorKind::Other);
            }
            self.levels.push(level);
            Ok(())
        }
    }

    impl ErrorType for FakeLed {
        type Error = ErrorKind;
    }

    impl OutputPin for FakeLed {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.drive(false)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.drive(true)
        }
    }

    #[test]
    fn red_cycle_drives_each_led() {
        let mut pins = [FakeLed::default(), FakeLed::default()];

        for step in &RED_PATTERN {
            apply(&mut pins, step);
        }

        assert_eq!(pins[0].levels, [true, false, true]);
        assert_eq!(pins[1].levels, [false, true, true]);
    }

    #[test]
    fn failed_pin_write_leaves_other_pins_driven() {
        let mut pins = [FakeLed::broken(), FakeLed::default()];

        for step in &RED_PATTERN {
            apply(&mut pins, step);
        }

        assert!(pins[0].levels.is_empty());
        assert_eq!(pins[1].levels, [false, true, true]);
    }

    #[test]
    fn yellow_cycle_toggles() {
        let mut pins = [FakeLed::default()];

        for step in YELLOW_PATTERN.iter().chain(YELLOW_PATTERN.iter()) {
            apply(&mut pins, step);
        }

        assert_eq!(pins[0].levels, [false, true, false, true]);
    }

    #[test]
    fn patterns_last_as_long_as_designed() {
        let total = |pattern: &[BlinkStep]| {
            pattern
                .iter()
                .map(|step| step.hold.as_millis())
                .sum::<u64>()
        };

        assert_eq!(total(&RED_PATTERN), 2000);
        assert_eq!(total(&YELLOW_PATTERN), 500);
    }
}
