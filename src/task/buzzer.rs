//! Buzzer driver task
//! Generates tones on the PWM buzzer output. Requests arrive through a
//! [`ToneChannel`], so a new tone cuts short the one playing.

use defmt::{debug, info};
use embassy_futures::select::{Either, select};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Timer;
use fixed_macro::fixed;
use pico_event_bench::hal::Tone;
use pico_event_bench::tone::{ToneChannel, ToneSender};

/// PWM clock divider; keeps audible periods inside the 16-bit counter.
/// Must match the `fixed!` divider set in `buzzer_driver`.
const PWM_DIVIDER: u32 = 64;

/// Requests from the dispatch loop, completions back to it
static TONES: ToneChannel = ToneChannel::new();

/// Handle the dispatch loop uses to play tones
pub type BuzzerHandle = ToneSender<'static, CriticalSectionRawMutex>;

/// The one sender for [`buzzer_driver`]; call once
pub fn buzzer_handle() -> BuzzerHandle {
    TONES.sender()
}

/// Buzzer driver task - plays requested tones, one at a time
#[embassy_executor::task]
pub async fn buzzer_driver(mut pwm: Pwm<'static>) -> ! {
    info!("Buzzer driver task started");

    let mut config = PwmConfig::default();
    config.divider = fixed!(64: U12F4);
    silence(&mut pwm, &mut config);

    loop {
        let mut request = TONES.next_request().await;

        // Keep playing while newer requests preempt the current tone
        loop {
            start_tone(&mut pwm, &mut config, request.tone);
            match select(Timer::after(request.tone.duration), TONES.next_request()).await {
                Either::First(()) => break,
                Either::Second(next) => request = next,
            }
        }

        silence(&mut pwm, &mut config);
        TONES.finished(request.seq);
    }
}

/// Square wave at `tone.frequency_hz`, 50% duty
fn start_tone(pwm: &mut Pwm<'static>, config: &mut PwmConfig, tone: Tone) {
    let top = pwm_top(embassy_rp::clocks::clk_sys_freq(), tone.frequency_hz);
    debug!("Tone {} Hz for {} ms (top {})", tone.frequency_hz, tone.duration.as_millis(), top);
    config.top = top;
    config.compare_a = top / 2;
    config.enable = true;
    pwm.set_config(config);
}

fn silence(pwm: &mut Pwm<'static>, config: &mut PwmConfig) {
    config.compare_a = 0;
    config.enable = false;
    pwm.set_config(config);
}

/// Counter wrap value for `frequency_hz` at the fixed divider
fn pwm_top(clk_sys_hz: u32, frequency_hz: u32) -> u16 {
    let ticks = clk_sys_hz / (PWM_DIVIDER * frequency_hz.max(1));
    ticks.saturating_sub(1).min(u32::from(u16::MAX)) as u16
}
