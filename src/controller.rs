//! Device event handlers
//!
//! The three handlers the dispatch loop runs: the timer tick (button and
//! bench logic), card insertion (chime plus storage bring-up) and card
//! removal (chime plus storage release). Everything here runs on the
//! dispatch task, so a blocking tone or the self-test stalls the loop until
//! it finishes.

use crate::dispatch::{EventHandler, EventKind, HandlerTable};
use crate::event::{EventId, SetupError};
use crate::hal::{
    ButtonPad, Buzzer, CardInfo, SECTOR_SIZE, SelfTest, Storage, StorageError, TestStatus, Tone,
};

/// Written to the serial line while button 2 is held
pub const BUTTON2_MESSAGE: &[u8] = b"Hello World!\r\n";

/// Played after the self-test, whatever its outcome
pub const TONE_SELF_TEST_DONE: Tone = Tone::new(500, 100);
pub const TONE_BUTTON1: Tone = Tone::new(1000, 100);
pub const TONE_BUTTON2: Tone = Tone::new(2000, 100);
pub const TONE_CHIME_LOW: Tone = Tone::new(1000, 100);
pub const TONE_CHIME_HIGH: Tone = Tone::new(2000, 100);
/// Played once a freshly inserted card has been read
pub const TONE_CARD_READY: Tone = Tone::new(440, 200);

/// Event kinds, in dispatch priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceEvent {
    Tick = 0,
    CardInserted = 1,
    CardRemoved = 2,
}

impl DeviceEvent {
    pub const COUNT: usize = 3;
    pub const ALL: [DeviceEvent; DeviceEvent::COUNT] = [
        DeviceEvent::Tick,
        DeviceEvent::CardInserted,
        DeviceEvent::CardRemoved,
    ];

    pub fn table() -> Result<HandlerTable<DeviceEvent, { DeviceEvent::COUNT }>, SetupError> {
        HandlerTable::new(Self::ALL)
    }
}

impl EventKind for DeviceEvent {
    fn id(self) -> EventId {
        EventId::new(self as u8)
    }
}

/// Owns every peripheral the handlers touch
pub struct Controller<B, Z, W, S, T> {
    buttons: B,
    buzzer: Z,
    serial: W,
    storage: S,
    self_test: T,
    sector: [u8; SECTOR_SIZE],
}

impl<B, Z, W, S, T> Controller<B, Z, W, S, T>
where
    B: ButtonPad,
    Z: Buzzer,
    W: embedded_io_async::Write,
    S: Storage,
    T: SelfTest,
{
    pub fn new(buttons: B, buzzer: Z, serial: W, storage: S, self_test: T) -> Self {
        Self {
            buttons,
            buzzer,
            serial,
            storage,
            self_test,
            sector: [0; SECTOR_SIZE],
        }
    }

    /// Timer tick: one button sample decides between the self-test and the
    /// per-button actions
    pub async fn on_tick(&mut self) {
        let state = self.buttons.sample();

        if !state.any_held() {
            info!("Running self-test");
            match self.self_test.run(&mut self.serial).await {
                TestStatus::Passed => info!("Self-test passed"),
                TestStatus::Failed { failures } => warn!("Self-test: {} failures", failures),
            }
            self.buzzer.play(TONE_SELF_TEST_DONE);
            return;
        }

        if state.button1 {
            debug!("Button 1 held");
            self.buzzer.play(TONE_BUTTON1);
        }
        if state.button2 {
            debug!("Button 2 held");
            if self.serial.write_all(BUTTON2_MESSAGE).await.is_err() {
                warn!("Serial write failed");
            }
            self.buzzer.play(TONE_BUTTON2);
        }
    }

    /// Card insertion: arming chime, then bring-up. A failed bring-up leaves
    /// the driver released and stays silent.
    pub async fn on_card_inserted(&mut self) {
        self.buzzer.play_blocking(TONE_CHIME_LOW).await;
        self.buzzer.play_blocking(TONE_CHIME_HIGH).await;

        match self.bring_up() {
            Ok(info) => {
                info!(
                    "Card ready: {} blocks, {} bytes",
                    info.block_count,
                    info.capacity_bytes()
                );
                self.buzzer.play(TONE_CARD_READY);
            }
            Err(e) => {
                warn!("Card bring-up aborted: {:?}", e);
                self.storage.release();
            }
        }
    }

    /// Card removal: reverse chime, then forget the card
    pub async fn on_card_removed(&mut self) {
        self.buzzer.play_blocking(TONE_CHIME_HIGH).await;
        self.buzzer.play_blocking(TONE_CHIME_LOW).await;
        self.storage.release();
    }

    fn bring_up(&mut self) -> Result<CardInfo, StorageError> {
        self.storage.init()?;
        let info = self.storage.capacity()?;
        self.storage.read_sector(&mut self.sector, 0)?;
        Ok(info)
    }

    /// First sector of the most recently brought-up card
    pub fn boot_sector(&self) -> &[u8; SECTOR_SIZE] {
        &self.sector
    }
}

impl<B, Z, W, S, T> EventHandler<DeviceEvent> for Controller<B, Z, W, S, T>
where
    B: ButtonPad,
    Z: Buzzer,
    W: embedded_io_async::Write,
    S: Storage,
    T: SelfTest,
{
    async fn handle(&mut self, event: DeviceEvent) {
        trace!("handling {:?}", event);
        match event {
            DeviceEvent::Tick => self.on_tick().await,
            DeviceEvent::CardInserted => self.on_card_inserted().await,
            DeviceEvent::CardRemoved => self.on_card_removed().await,
        }
    }
}
