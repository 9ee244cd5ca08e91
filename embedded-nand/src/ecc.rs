//! Hamming code over fixed size chunks of page data.
//!
//! The layout follows the SmartMedia style code used by raw NAND parts: for a
//! chunk of `2^k` bytes there are `k` line parity pairs (one pair per byte
//! address bit) and 3 column parity pairs (one pair per bit address bit).
//! Within a pair the even bit covers the half of the chunk where the address
//! bit is 0, the odd bit the half where it is 1.
//!
//! | Codeword bits          | Content                                 |
//! | ---------------------- | --------------------------------------- |
//! | `2i`, `2i + 1`         | line parity pair for byte address bit i |
//! | `2k + 2j`, `2k + 2j + 1` | column parity pair for bit address bit j |
//!
//! The stored codeword is inverted, so an erased chunk next to an erased
//! spare area (all `0xFF`) validates.
//!
//! A single flipped data bit flips exactly one bit of every pair, `k + 3` bits
//! in total (12 for 512 byte chunks). A single flipped codeword bit shows up as
//! a syndrome of weight 1. Anything else is uncorrectable.

use crate::{NandFlashError, NandFlashErrorKind};

/// Largest chunk whose codeword still fits the 32 bit packing (2 * 13 + 6 bits)
pub const MAX_CHUNK_SIZE: usize = 8192;

/// Outcome of a successful ECC check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EccStatus {
    /// Stored and computed codewords match
    Ok,
    /// The stored codeword is damaged, data is trustworthy and was not changed
    ParityOnly,
    /// A single bit error in the data was corrected
    Corrected,
}

/// ECC failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EccMismatch {
    /// Syndrome of weight 1, the error is inside the codeword itself
    ParityOnly,
    /// More than one bit flipped, the data must not be used
    Uncorrectable,
}

impl NandFlashError for EccMismatch {
    fn kind(&self) -> NandFlashErrorKind {
        match self {
            EccMismatch::ParityOnly => NandFlashErrorKind::BlockFailing(None),
            EccMismatch::Uncorrectable => NandFlashErrorKind::BlockFail(None),
        }
    }
}

/// Codeword of one chunk in stored (inverted) form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EccCodeword(u32);

impl EccCodeword {
    /// Read a codeword from its stored bytes, low byte first.
    /// Missing bytes read as erased.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut raw = [0xFF; 4];
        let len = bytes.len().min(raw.len());
        raw[..len].copy_from_slice(&bytes[..len]);
        EccCodeword(u32::from_le_bytes(raw))
    }

    /// Write the codeword into `out`, low byte first, as many bytes as fit
    pub fn write_bytes(&self, out: &mut [u8]) {
        let raw = self.0.to_le_bytes();
        let len = out.len().min(raw.len());
        out[..len].copy_from_slice(&raw[..len]);
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Hamming engine for one chunk size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hamming {
    chunk_size: usize,
    address_bits: u32,
}

impl Hamming {
    /// 512 byte chunks with 3 byte codewords
    pub const SMALL_PAGE: Hamming = Hamming::new(512);

    /// Engine for `chunk_size` byte chunks. `chunk_size` must be a power of two
    /// no larger than [MAX_CHUNK_SIZE].
    pub const fn new(chunk_size: usize) -> Self {
        assert!(
            chunk_size.is_power_of_two() && chunk_size <= MAX_CHUNK_SIZE,
            "ECC chunk size must be a power of two up to 8192"
        );
        Hamming {
            chunk_size,
            address_bits: chunk_size.trailing_zeros(),
        }
    }

    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of parity bits in a codeword
    pub const fn parity_bits(&self) -> u32 {
        2 * self.address_bits + 6
    }

    /// Number of bytes a codeword occupies in the spare area
    pub const fn codeword_bytes(&self) -> usize {
        (self.parity_bits() as usize).div_ceil(8)
    }

    /// Syndrome weight of a single flipped data bit
    pub const fn single_bit_weight(&self) -> u32 {
        self.address_bits + 3
    }

    fn used_mask(&self) -> u32 {
        match self.parity_bits() {
            32 => u32::MAX,
            bits => (1 << bits) - 1,
        }
    }

    /// Compute the codeword of a chunk. `chunk.len()` should equal the chunk size.
    pub fn calculate(&self, chunk: &[u8]) -> EccCodeword {
        // xor of the addresses of bytes with odd parity gives the odd line bits
        let mut odd_lines = 0u32;
        let mut total = 0u32;
        // xor of all bytes gives the parity of each bit position
        let mut columns = 0u8;
        for (address, &byte) in chunk.iter().enumerate() {
            columns ^= byte;
            if byte.count_ones() & 1 == 1 {
                odd_lines ^= address as u32;
                total ^= 1;
            }
        }

        let mut raw = 0u32;
        for i in 0..self.address_bits {
            let odd = (odd_lines >> i) & 1;
            raw |= (total ^ odd) << (2 * i);
            raw |= odd << (2 * i + 1);
        }
        let base = 2 * self.address_bits;
        for j in 0..3 {
            let (mut even, mut odd) = (0u32, 0u32);
            for bit in 0..8u32 {
                let value = ((columns >> bit) & 1) as u32;
                if (bit >> j) & 1 == 1 {
                    odd ^= value;
                } else {
                    even ^= value;
                }
            }
            raw |= even << (base + 2 * j);
            raw |= odd << (base + 2 * j + 1);
        }
        EccCodeword(!raw)
    }

    /// Check a chunk against its stored codeword, correcting a single bit error in place.
    pub fn correct(&self, chunk: &mut [u8], stored: EccCodeword) -> Result<EccStatus, EccMismatch> {
        let syndrome = (stored.0 ^ self.calculate(chunk).0) & self.used_mask();
        if syndrome == 0 {
            return Ok(EccStatus::Ok);
        }

        let weight = syndrome.count_ones();
        if weight == 1 {
            return Err(EccMismatch::ParityOnly);
        }
        // every pair must disagree in exactly one bit, otherwise an even number
        // of errors can mimic the single bit weight
        if weight != self.single_bit_weight() || !self.pairs_split(syndrome) {
            return Err(EccMismatch::Uncorrectable);
        }

        let mut byte = 0usize;
        for i in 0..self.address_bits {
            byte |= (((syndrome >> (2 * i + 1)) & 1) as usize) << i;
        }
        let base = 2 * self.address_bits;
        let mut bit = 0u8;
        for j in 0..3 {
            bit |= (((syndrome >> (base + 2 * j + 1)) & 1) as u8) << j;
        }

        match chunk.get_mut(byte) {
            Some(value) => {
                *value ^= 1 << bit;
                debug!("ECC corrected byte {} bit {}", byte, bit);
                Ok(EccStatus::Corrected)
            }
            None => Err(EccMismatch::Uncorrectable),
        }
    }

    fn pairs_split(&self, syndrome: u32) -> bool {
        (0..self.single_bit_weight()).all(|pair| {
            let bits = (syndrome >> (2 * pair)) & 0b11;
            bits == 0b01 || bits == 0b10
        })
    }

    /// Check that `data_len` bytes of data and `ecc_len` bytes of codewords
    /// form whole chunks. Returns the number of chunks.
    pub fn check_span(&self, data_len: usize, ecc_len: usize) -> Result<usize, NandFlashErrorKind> {
        if data_len % self.chunk_size != 0 {
            return Err(NandFlashErrorKind::NotAligned);
        }
        let chunks = data_len / self.chunk_size;
        if ecc_len < chunks * self.codeword_bytes() {
            return Err(NandFlashErrorKind::OutOfBounds);
        }
        Ok(chunks)
    }

    /// Compute the codewords of every chunk of `data` into `ecc`
    pub fn calculate_span(&self, data: &[u8], ecc: &mut [u8]) -> Result<(), NandFlashErrorKind> {
        self.check_span(data.len(), ecc.len())?;
        for (chunk, code) in data
            .chunks_exact(self.chunk_size)
            .zip(ecc.chunks_exact_mut(self.codeword_bytes()))
        {
            self.calculate(chunk).write_bytes(code);
        }
        Ok(())
    }

    /// Check and correct every chunk of `data` against the stored codewords in `ecc`.
    ///
    /// Returns the worst status over all chunks. A damaged codeword leaves its
    /// chunk untouched and reports [EccStatus::ParityOnly]. Chunks before an
    /// uncorrectable one may already have been corrected in place.
    pub fn correct_span(&self, data: &mut [u8], ecc: &[u8]) -> Result<EccStatus, EccMismatch> {
        let chunks = self
            .check_span(data.len(), ecc.len())
            .map_err(|_| EccMismatch::Uncorrectable)?;
        let mut worst = EccStatus::Ok;
        for (index, (chunk, code)) in data
            .chunks_exact_mut(self.chunk_size)
            .zip(ecc.chunks_exact(self.codeword_bytes()))
            .enumerate()
        {
            let status = match self.correct(chunk, EccCodeword::from_bytes(code)) {
                Ok(status) => status,
                Err(EccMismatch::ParityOnly) => {
                    debug!("ECC codeword of chunk {} damaged", index);
                    EccStatus::ParityOnly
                }
                Err(EccMismatch::Uncorrectable) => {
                    warn!("Uncorrectable ECC error in chunk {} of {}", index, chunks);
                    return Err(EccMismatch::Uncorrectable);
                }
            };
            worst = worst.max(status);
        }
        Ok(worst)
    }
}

impl Default for Hamming {
    fn default() -> Self {
        Self::SMALL_PAGE
    }
}
