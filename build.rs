//! Generates compile-time device configuration and, for firmware builds,
//! places the RP2040 linker script where the linker can find it.

use std::env;
use std::fs;
use std::path::PathBuf;

use config::{Config, Environment, File};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out = PathBuf::from(env::var("OUT_DIR")?);

    println!("cargo:rerun-if-changed=device.toml");
    println!("cargo:rerun-if-changed=memory.x");
    for key in [
        "TICK_INTERVAL_MS",
        "CARD_POLL_INTERVAL_MS",
        "CARD_SETTLE_SAMPLES",
        "SERIAL_BAUDRATE",
    ] {
        println!("cargo:rerun-if-env-changed=DEVICE_{key}");
    }

    // Defaults, then device.toml, then DEVICE_* environment variables
    let settings = Config::builder()
        .set_default("tick_interval_ms", 500)?
        .set_default("card_poll_interval_ms", 10)?
        .set_default("card_settle_samples", 10)?
        .set_default("serial_baudrate", 38_400)?
        .add_source(File::with_name("device").required(false))
        .add_source(Environment::with_prefix("DEVICE"))
        .build()?;

    let tick_interval_ms: u64 = settings.get("tick_interval_ms")?;
    let card_poll_interval_ms: u64 = settings.get("card_poll_interval_ms")?;
    let card_settle_samples: u8 = settings.get("card_settle_samples")?;
    let serial_baudrate: u32 = settings.get("serial_baudrate")?;

    if tick_interval_ms == 0 || card_poll_interval_ms == 0 {
        return Err("tick_interval_ms and card_poll_interval_ms must be non-zero".into());
    }
    if card_settle_samples == 0 {
        return Err("card_settle_samples must be at least 1".into());
    }

    let generated = format!(
        "/// Period of the timer event source, in milliseconds.\n\
         pub const TICK_INTERVAL_MS: u64 = {tick_interval_ms};\n\
         /// Card-detect sampling period, in milliseconds.\n\
         pub const CARD_POLL_INTERVAL_MS: u64 = {card_poll_interval_ms};\n\
         /// Consecutive \"present\" samples needed before an insertion is reported.\n\
         pub const CARD_SETTLE_SAMPLES: u8 = {card_settle_samples};\n\
         /// UART0 baud rate.\n\
         pub const SERIAL_BAUDRATE: u32 = {serial_baudrate};\n"
    );
    fs::write(out.join("config_generated.rs"), generated)?;

    if env::var_os("CARGO_FEATURE_RP2040").is_some() {
        fs::copy("memory.x", out.join("memory.x"))?;
        println!("cargo:rustc-link-search={}", out.display());
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    Ok(())
}
