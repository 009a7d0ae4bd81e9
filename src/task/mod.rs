//! Task modules
//! Background tasks that run beside the dispatch loop

pub mod blink;
pub mod buzzer;
pub mod card;
pub mod timer;

// Re-export commonly used items
pub use blink::{red_blinker, yellow_blinker};
pub use buzzer::{buzzer_driver, buzzer_handle};
pub use card::card_poller;
pub use timer::tick_timer;
