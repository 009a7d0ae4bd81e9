//! Compile-time device configuration.
//! Values come from build.rs (defaults, `device.toml`, `DEVICE_*` env vars).

include!(concat!(env!("OUT_DIR"), "/config_generated.rs"));

use embassy_time::Duration;

/// Period of the timer event source
pub const TICK_INTERVAL: Duration = Duration::from_millis(TICK_INTERVAL_MS);

/// Card-detect sampling period
pub const CARD_POLL_INTERVAL: Duration = Duration::from_millis(CARD_POLL_INTERVAL_MS);
