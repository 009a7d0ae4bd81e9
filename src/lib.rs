//! # Pico Event Bench
//! Event multiplexing and dispatch core for an RP2040 bench board: a
//! periodic timer, card insert and card remove sources feeding one dispatch
//! task, plus the handlers, LED blinkers and self-test it drives.
//!
//! Everything here is hardware independent; the firmware binary wires it to
//! embassy-rp peripherals.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod blink;
pub mod card;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod event;
pub mod hal;
pub mod sdcard;
pub mod selftest;
pub mod timer;
pub mod tone;

pub use controller::{Controller, DeviceEvent};
pub use dispatch::{Dispatcher, EventHandler, EventKind, HandlerTable};
pub use event::{EventId, EventMask, EventRegistry, EventSource, Listener, SetupError};
