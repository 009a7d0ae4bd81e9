//! Hardware collaborators the control loop drives
//!
//! Board code implements these on top of embassy-rp; tests implement them
//! with recording fakes.

use core::fmt;

use embassy_time::Duration;
use embedded_hal_1::digital::InputPin;

/// A tone for the buzzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration: Duration,
}

impl Tone {
    pub const fn new(frequency_hz: u32, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration: Duration::from_millis(duration_ms),
        }
    }
}

/// Audio output
#[allow(async_fn_in_trait)]
pub trait Buzzer {
    /// Starts `tone` and returns immediately
    fn play(&mut self, tone: Tone);

    /// Plays `tone` and returns once it has finished
    async fn play_blocking(&mut self, tone: Tone);
}

/// Logical state of the two push buttons, `true` meaning held down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonState {
    pub button1: bool,
    pub button2: bool,
}

impl ButtonState {
    pub const fn any_held(self) -> bool {
        self.button1 || self.button2
    }
}

/// Push buttons, sampled once per call
pub trait ButtonPad {
    fn sample(&mut self) -> ButtonState;
}

/// Card-detect line
pub trait CardDetect {
    type Error: fmt::Debug;

    fn is_inserted(&mut self) -> Result<bool, Self::Error>;
}

/// Card-detect switch that pulls its pin low while a card is seated
pub struct ActiveLowDetect<P> {
    pin: P,
}

impl<P: InputPin> ActiveLowDetect<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin> CardDetect for ActiveLowDetect<P> {
    type Error = P::Error;

    fn is_inserted(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_low()
    }
}

/// Card geometry reported during bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CardInfo {
    pub block_count: u32,
    pub block_size: u32,
}

impl CardInfo {
    pub const fn capacity_bytes(&self) -> u64 {
        self.block_count as u64 * self.block_size as u64
    }
}

/// Sector size used by [`Storage::read_sector`]
pub const SECTOR_SIZE: usize = 512;

/// Failures from the storage driver. Transient: handled by abandoning the
/// current bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Card did not complete the initialization handshake
    Init,
    /// Card geometry could not be read
    Capacity,
    /// Sector read failed
    Read { sector: u32 },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("card initialization failed"),
            Self::Capacity => f.write_str("card capacity query failed"),
            Self::Read { sector } => write!(f, "reading sector {sector} failed"),
        }
    }
}

/// Storage-card protocol driver
pub trait Storage {
    fn init(&mut self) -> Result<(), StorageError>;

    fn capacity(&mut self) -> Result<CardInfo, StorageError>;

    fn read_sector(&mut self, buf: &mut [u8; SECTOR_SIZE], index: u32) -> Result<(), StorageError>;

    /// Forgets any card state so the next `init` starts from scratch.
    /// Safe to call at any time, any number of times.
    fn release(&mut self);
}

/// Outcome of the diagnostic self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestStatus {
    Passed,
    Failed { failures: u8 },
}

/// Long-running diagnostic routine reporting over the serial line
#[allow(async_fn_in_trait)]
pub trait SelfTest {
    async fn run<W: embedded_io_async::Write>(&mut self, serial: &mut W) -> TestStatus;
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal_1::digital::ErrorType;

    struct FakePin(bool);

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    #[test]
    fn detect_switch_is_active_low() {
        assert_eq!(ActiveLowDetect::new(FakePin(false)).is_inserted(), Ok(true));
        assert_eq!(ActiveLowDetect::new(FakePin(true)).is_inserted(), Ok(false));
    }

    #[test]
    fn capacity_in_bytes() {
        let info = CardInfo {
            block_count: 4_194_304,
            block_size: 512,
        };
        assert_eq!(info.capacity_bytes(), 2_147_483_648);
    }
}
