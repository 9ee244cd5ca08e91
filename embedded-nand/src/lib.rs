#![no_std]

// Must be first to share macros across crate
mod fmt;

mod address;
pub mod ecc;
pub use address::{AddressLayout, BlockIndex, ColumnAddress, LunIndex, NandAddress, PageIndex};
pub use ecc::{EccCodeword, EccMismatch, EccStatus, Hamming};

pub trait NandFlashError: core::fmt::Debug {
    /// Convert a specific NAND flash error into a generic error kind
    fn kind(&self) -> NandFlashErrorKind;
}

/// A trait that NandFlash implementations can use to share an error type.
pub trait ErrorType {
    /// Errors returned by this NAND flash.
    type Error: NandFlashError;
}

/// NAND flash error kinds.
///
/// NAND flash implementations must map their error to those generic error kinds through the
/// [`NandFlashError`] trait.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum NandFlashErrorKind {
    /// The arguments are not properly aligned.
    NotAligned,

    /// The arguments are out of bounds.
    OutOfBounds,

    /// The device did not become ready in time.
    /// The operation may not have completed, but the device recovered.
    Timeout,

    /// Block has failed either during erase, program or ECC check.
    /// Contains the page index of the failed page, or [None] if unknown
    BlockFail(Option<u32>),

    /// Block is failing but operation was successful i.e ECC corrected read.
    /// Contains the page index of the failing page, or [None] if unknown
    BlockFailing(Option<u32>),

    /// The device no longer answers with its identity after a reset.
    DeviceFailed,

    /// Error specific to the implementation.
    Other,
}

/// Page level access to a raw NAND device.
///
/// Pages are addressed per LUN with a [PageIndex]; the column is the byte offset
/// inside the page, the spare area starting at [NandFlash::PAGE_SIZE].
pub trait NandFlash: ErrorType {
    /// Size of the main area of a page in bytes
    const PAGE_SIZE: usize;

    /// Size of the spare area of a page in bytes
    const SPARE_SIZE: usize;

    /// Number of pages in a block
    const PAGES_PER_BLOCK: usize;

    /// Number of blocks in a LUN
    const BLOCK_COUNT: usize;

    /// Number of LUNs in the package
    const LUN_COUNT: usize;

    /// Size of the chunks protected by one ECC codeword
    const ECC_CHUNK_SIZE: usize;

    /// Check that the device answers with its expected identity
    fn is_alive(&mut self) -> bool;

    /// Erase a block. The block will contain all 1s afterwards.
    fn erase_block(&mut self, lun: LunIndex, block: BlockIndex) -> Result<(), Self::Error>;

    /// Program `data` at `column` of a page, together with its ECC codewords.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are not aligned to ECC chunks or out of bounds.
    /// The implementation can use the [`check_ecc_span`] helper function.
    fn program_page(
        &mut self,
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Read `buf.len()` bytes at `column` of a page, checking and correcting them
    /// with the stored ECC codewords.
    fn read_page(
        &mut self,
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        buf: &mut [u8],
    ) -> Result<EccStatus, Self::Error>;

    /// Bring the device back to a known state after a failed operation.
    ///
    /// Returns an error when the device is lost. On success the caller may
    /// retry the failed operation.
    fn recover(&mut self) -> Result<(), Self::Error>;

    /// Total number of pages in a LUN
    fn page_count(&self) -> u32 {
        (Self::PAGES_PER_BLOCK * Self::BLOCK_COUNT) as u32
    }
}

/// Return whether an access of `length` bytes at `column` of `page` is inside the device,
/// spare area included.
pub fn check_address<T: NandFlash>(
    lun: LunIndex,
    page: PageIndex,
    column: ColumnAddress,
    length: usize,
) -> Result<(), NandFlashErrorKind> {
    if lun.as_u8() as usize >= T::LUN_COUNT
        || page.as_u32() as usize >= T::PAGES_PER_BLOCK * T::BLOCK_COUNT
        || column.as_u16() as usize + length > T::PAGE_SIZE + T::SPARE_SIZE
    {
        return Err(NandFlashErrorKind::OutOfBounds);
    }
    Ok(())
}

/// Return whether a block is inside the device.
pub fn check_block<T: NandFlash>(lun: LunIndex, block: BlockIndex) -> Result<(), NandFlashErrorKind> {
    if lun.as_u8() as usize >= T::LUN_COUNT || block.as_u16() as usize >= T::BLOCK_COUNT {
        return Err(NandFlashErrorKind::OutOfBounds);
    }
    Ok(())
}

/// Return whether an ECC protected access is aligned to ECC chunks and inside the main area.
pub fn check_ecc_span<T: NandFlash>(
    lun: LunIndex,
    page: PageIndex,
    column: ColumnAddress,
    length: usize,
) -> Result<(), NandFlashErrorKind> {
    check_address::<T>(lun, page, column, length)?;
    if column.as_u16() as usize + length > T::PAGE_SIZE {
        return Err(NandFlashErrorKind::OutOfBounds);
    }
    if column.as_u16() as usize % T::ECC_CHUNK_SIZE != 0 || length % T::ECC_CHUNK_SIZE != 0 {
        return Err(NandFlashErrorKind::NotAligned);
    }
    Ok(())
}
