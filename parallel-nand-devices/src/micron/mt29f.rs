use embedded_nand::AddressLayout;
use parallel_nand::{DeviceIdentity, ParallelNand};

/// Concrete type that implements all the flash device features
/// for the asynchronous MT29F parts with 8192 + 448 byte pages.
///
/// `L` is the number of LUNs in the package, `ID` the 8 bytes returned by
/// READ ID, first byte in the most significant position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MT29F<const L: u32, const ID: u64>();

/// 32Gb, a single LUN of 4096 blocks
pub type MT29F32G08ABAAA = MT29F<1, 0x2C68_0027_A900_0000>;

impl<const L: u32, const ID: u64> MT29F<L, ID> {
    /// Creates a new instance of the MT29F flash device.
    pub fn new() -> Self {
        Self()
    }
}

impl<const L: u32, const ID: u64> Default for MT29F<L, ID> {
    fn default() -> Self {
        Self::new()
    }
}

// 128 pages per block, 4096 blocks per LUN
impl<const L: u32, const ID: u64> ParallelNand for MT29F<L, ID> {
    const PAGE_SIZE: u32 = 8192;
    const SPARE_SIZE: u32 = 448;
    const PAGES_PER_BLOCK: u32 = 128;
    const BLOCK_COUNT: u32 = 4096;
    const LUN_COUNT: u32 = L;
    const LAYOUT: AddressLayout = AddressLayout::new(7, 12, (u32::BITS - (L - 1).leading_zeros()) as u8);
    const IDENTITY: DeviceIdentity = DeviceIdentity::new(ID.to_be_bytes());
}

// Implement blocking trait
mod blocking {
    use super::MT29F;
    use parallel_nand::{bus::NandIo, cmd_blocking::ParallelNandBlocking};

    impl<IO: NandIo, const L: u32, const ID: u64> ParallelNandBlocking<IO> for MT29F<L, ID> {}
}
