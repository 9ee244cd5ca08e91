#![no_std]

#[cfg(any(test, feature = "sim"))]
extern crate std;

// Must be first to share macros across crate
mod fmt;

pub mod bus;
pub mod cmd_blocking;
pub mod device;
pub mod error;
pub mod ready;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

use embedded_nand::{AddressLayout, Hamming};

pub use bus::{BusWindows, NandBus, NandIo, SmcNandIo};
pub use cmd_blocking::ParallelNandBlocking;
pub use device::ParallelNandDevice;
pub use error::NandError;
pub use ready::{ReadyBusyMonitor, TickClock, TimedOut};

/// Trait describing the layout and command set of a raw parallel NAND part.
///
/// The command defaults are the ONFI opcodes shared by most parts. A part only
/// has to provide its geometry, address layout and identity.
pub trait ParallelNand {
    // ============= Layout =============

    /// Size of the main area of a page in bytes
    const PAGE_SIZE: u32;
    /// Size of the spare area of a page in bytes
    const SPARE_SIZE: u32;
    /// Number of pages in a block
    const PAGES_PER_BLOCK: u32;
    /// Number of blocks in a LUN
    const BLOCK_COUNT: u32;
    /// Number of LUNs in the package
    const LUN_COUNT: u32 = 1;
    /// Placement of the page, block and LUN fields in the row address
    const LAYOUT: AddressLayout;

    // ============= Identity / status =============

    /// Bytes returned by READ ID at address 00h
    const IDENTITY: DeviceIdentity;
    /// Status reported by a healthy part once a reset completed
    const RESET_STATUS: NandStatus = NandStatus::new(0xE0);

    // ============= ECC =============

    /// ECC code protecting the main area
    const ECC: Hamming = Hamming::SMALL_PAGE;
    /// Offset of the first codeword inside the spare area.
    /// The bytes before it are left to the bad block marker.
    const ECC_SPARE_OFFSET: u32 = 4;

    // ============= Timing =============

    /// Default ready/busy timeout in clock ticks
    const READY_TIMEOUT_TICKS: u32 = 20;

    // ============= Commands =============

    const RESET_COMMAND: u8 = 0xFF;
    const READ_ID_COMMAND: u8 = 0x90;
    /// Address cycle following READ ID that selects the manufacturer ID
    const READ_ID_ADDRESS: u8 = 0x00;
    const READ_STATUS_COMMAND: u8 = 0x70;
    const READ_MODE_COMMAND: u8 = 0x00;
    const READ_CONFIRM_COMMAND: u8 = 0x30;
    const CHANGE_READ_COLUMN_COMMAND: u8 = 0x05;
    const CHANGE_READ_COLUMN_CONFIRM_COMMAND: u8 = 0xE0;
    const PROGRAM_COMMAND: u8 = 0x80;
    const CHANGE_WRITE_COLUMN_COMMAND: u8 = 0x85;
    const PROGRAM_CONFIRM_COMMAND: u8 = 0x10;
    const ERASE_COMMAND: u8 = 0x60;
    const ERASE_CONFIRM_COMMAND: u8 = 0xD0;
}

/// Bytes returned by the READ ID command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceIdentity([u8; DeviceIdentity::LEN]);

impl DeviceIdentity {
    /// Number of ID bytes read after READ ID
    pub const LEN: usize = 8;

    pub const fn new(bytes: [u8; Self::LEN]) -> Self {
        DeviceIdentity(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// JEDEC manufacturer code
    pub fn manufacturer(&self) -> u8 {
        self.0[0]
    }

    pub fn device(&self) -> u8 {
        self.0[1]
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceIdentity {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "DeviceIdentity(manufacturer: {:02X}, device: {:02X}, bytes: {:02X})",
            self.manufacturer(),
            self.device(),
            self.0
        );
    }
}

/// Value of the READ STATUS register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NandStatus(u8);

impl NandStatus {
    /// Last operation failed
    pub const FAIL: u8 = 1 << 0;
    /// Previous cached operation failed
    pub const FAILC: u8 = 1 << 1;
    /// Array operation finished
    pub const ARDY: u8 = 1 << 5;
    /// Ready for a new command
    pub const RDY: u8 = 1 << 6;
    /// Write protect, set when not protected
    pub const WP: u8 = 1 << 7;

    pub const fn new(value: u8) -> Self {
        NandStatus(value)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn failed(&self) -> bool {
        self.0 & Self::FAIL != 0
    }

    pub fn is_ready(&self) -> bool {
        self.0 & Self::RDY != 0
    }

    pub fn array_ready(&self) -> bool {
        self.0 & Self::ARDY != 0
    }

    pub fn write_protected(&self) -> bool {
        self.0 & Self::WP == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_status_bits() {
        let status = NandStatus::new(0xE0);
        assert!(status.is_ready());
        assert!(status.array_ready());
        assert!(!status.write_protected());
        assert!(!status.failed());

        let status = NandStatus::new(0x61);
        assert!(status.failed());
        assert!(status.write_protected());
    }

    #[test]
    fn test_identity_fields() {
        let id = DeviceIdentity::new([0x2C, 0x68, 0x00, 0x27, 0xA9, 0x00, 0x00, 0x00]);
        assert_eq!(id.manufacturer(), 0x2C);
        assert_eq!(id.device(), 0x68);
        assert_eq!(id.as_bytes()[4], 0xA9);
    }
}
