//! [`Storage`] over an SPI SD card, using `embedded-sdmmc`
//!
//! The driver toggles chip select itself, so the `SpiDevice` handed in must
//! be built around [`embedded_sdmmc::sdcard::DummyCsPin`] and the real CS pin
//! goes to [`SdStorage::new`].

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::OutputPin;
use embedded_hal_1::spi::SpiDevice;
use embedded_sdmmc::{Block, BlockCount, BlockDevice, BlockIdx, SdCard};

use crate::hal::{CardInfo, SECTOR_SIZE, Storage, StorageError};

pub struct SdStorage<SPI, CS, DELAY>
where
    SPI: SpiDevice<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
{
    card: SdCard<SPI, CS, DELAY>,
    block: [Block; 1],
}

impl<SPI, CS, DELAY> SdStorage<SPI, CS, DELAY>
where
    SPI: SpiDevice<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(spi: SPI, cs: CS, delay: DELAY) -> Self {
        Self {
            card: SdCard::new(spi, cs, delay),
            block: [Block::new()],
        }
    }
}

impl<SPI, CS, DELAY> Storage for SdStorage<SPI, CS, DELAY>
where
    SPI: SpiDevice<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
{
    fn init(&mut self) -> Result<(), StorageError> {
        // The driver initializes lazily on first access; force a fresh
        // handshake so a swapped card is never mistaken for the previous one.
        self.card.mark_card_uninit();
        match self.card.num_blocks() {
            Ok(_) => {
                debug!("SD card initialized");
                Ok(())
            }
            Err(_) => Err(StorageError::Init),
        }
    }

    fn capacity(&mut self) -> Result<CardInfo, StorageError> {
        let BlockCount(block_count) = self
            .card
            .num_blocks()
            .map_err(|_| StorageError::Capacity)?;
        Ok(CardInfo {
            block_count,
            block_size: Block::LEN_U32,
        })
    }

    fn read_sector(&mut self, buf: &mut [u8; SECTOR_SIZE], index: u32) -> Result<(), StorageError> {
        self.card
            .read(&mut self.block, BlockIdx(index), "sector")
            .map_err(|_| StorageError::Read { sector: index })?;
        buf.copy_from_slice(&self.block[0].contents);
        Ok(())
    }

    fn release(&mut self) {
        self.card.mark_card_uninit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_1::spi::{ErrorKind, ErrorType, Operation};
    use embedded_sdmmc::sdcard::DummyCsPin;

    /// SPI device whose every transfer fails, as with no card on the bus
    struct DeadBus;

    impl ErrorType for DeadBus {
        type Error = ErrorKind;
    }

    impl SpiDevice<u8> for DeadBus {
        fn transaction(&mut self, _: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _: u32) {}
    }

    #[test]
    fn dead_bus_fails_every_step() {
        let mut storage = SdStorage::new(DeadBus, DummyCsPin, NoDelay);
        let mut sector = [0u8; SECTOR_SIZE];

        assert_eq!(storage.init(), Err(StorageError::Init));
        assert_eq!(storage.capacity(), Err(StorageError::Capacity));
        assert_eq!(
            storage.read_sector(&mut sector, 0),
            Err(StorageError::Read { sector: 0 })
        );
        storage.release();
        assert_eq!(storage.init(), Err(StorageError::Init));
    }
}
