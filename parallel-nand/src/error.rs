use core::fmt::Debug;
use embedded_nand::{EccMismatch, NandFlashError, NandFlashErrorKind};

use crate::ready::TimedOut;

/// Error type for the parallel NAND driver.
///
/// It is generic over the bus error type (BE), which allows for different bus implementations.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NandError<BE> {
    /// Error from the bus
    #[error("Bus error: {0:?}")]
    Bus(BE),
    /// The device stayed busy for longer than the timeout.
    /// The device was reset and still answers, the operation may be retried.
    #[error("Device did not become ready in time")]
    Timeout,
    /// The device does not answer with its identity after a reset
    #[error("Device lost, recovery failed")]
    Unrecoverable,
    /// Block erase reported a failure in the status register.
    /// This can happen if the block is protected or has failed.
    #[error("Erase failed")]
    EraseFailed,
    /// Page program reported a failure in the status register.
    /// This can happen if the block is protected or has failed.
    #[error("Program failed")]
    ProgramFailed,
    /// More bits flipped in a chunk than the ECC can correct
    #[error("Uncorrectable ECC error")]
    EccUncorrectable,
    /// Requested bytes out of bounds
    #[error("Requested bytes out of bounds")]
    OutOfBounds,
    /// Requested bytes not aligned to ECC chunks
    #[error("Requested bytes not aligned")]
    NotAligned,
    /// Other error
    #[error("Other error. Should not happen")]
    Other,
}

// Convert from driver error to more generic NandFlashError
impl<BE: Debug> NandFlashError for NandError<BE> {
    fn kind(&self) -> NandFlashErrorKind {
        match self {
            NandError::Bus(_) => NandFlashErrorKind::Other,
            NandError::Timeout => NandFlashErrorKind::Timeout,
            NandError::Unrecoverable => NandFlashErrorKind::DeviceFailed,
            NandError::EraseFailed => NandFlashErrorKind::BlockFail(None),
            NandError::ProgramFailed => NandFlashErrorKind::BlockFail(None),
            NandError::EccUncorrectable => NandFlashErrorKind::BlockFail(None),
            NandError::OutOfBounds => NandFlashErrorKind::OutOfBounds,
            NandError::NotAligned => NandFlashErrorKind::NotAligned,
            NandError::Other => NandFlashErrorKind::Other,
        }
    }
}

// For the bounds / alignment helper functions
impl<BE> From<NandFlashErrorKind> for NandError<BE> {
    fn from(kind: NandFlashErrorKind) -> Self {
        match kind {
            NandFlashErrorKind::NotAligned => NandError::NotAligned,
            NandFlashErrorKind::OutOfBounds => NandError::OutOfBounds,
            NandFlashErrorKind::Timeout => NandError::Timeout,
            NandFlashErrorKind::DeviceFailed => NandError::Unrecoverable,
            _ => NandError::Other,
        }
    }
}

impl<BE> From<TimedOut> for NandError<BE> {
    fn from(_: TimedOut) -> Self {
        NandError::Timeout
    }
}

impl<BE> From<EccMismatch> for NandError<BE> {
    fn from(mismatch: EccMismatch) -> Self {
        match mismatch {
            EccMismatch::Uncorrectable => NandError::EccUncorrectable,
            // Only reachable from a single codeword check, spans report it as a status
            EccMismatch::ParityOnly => NandError::Other,
        }
    }
}
