use core::fmt::Display;

/// Index of a logical unit (die) inside the package
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LunIndex(pub(crate) u8);

impl LunIndex {
    pub const fn new(index: u8) -> Self {
        LunIndex(index)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl Display for LunIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Index of a page inside a LUN (block * pages per block + page in block)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageIndex(pub(crate) u32);

impl PageIndex {
    pub const fn new(index: u32) -> Self {
        PageIndex(index)
    }
    pub fn as_u32(&self) -> u32 {
        self.0
    }
    pub fn as_block_index(&self, pages_per_block: u32) -> BlockIndex {
        BlockIndex((self.0 / pages_per_block) as u16)
    }

    /// Page number inside its block
    pub fn page_in_block(&self, pages_per_block: u32) -> u8 {
        (self.0 % pages_per_block) as u8
    }

    /// Convert from a [BlockIndex]
    pub fn from_block_address(ba: BlockIndex, pages_per_block: u32) -> Self {
        PageIndex(ba.0 as u32 * pages_per_block)
    }
}

impl From<PageIndex> for u32 {
    fn from(pa: PageIndex) -> Self {
        pa.as_u32()
    }
}

impl Display for PageIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Index of a block inside a LUN
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockIndex(pub(crate) u16);

impl BlockIndex {
    pub const fn new(index: u16) -> Self {
        BlockIndex(index)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn as_page_index(&self, pages_per_block: u32) -> PageIndex {
        PageIndex((self.0 as u32) * pages_per_block)
    }
}

impl From<BlockIndex> for u16 {
    fn from(bi: BlockIndex) -> Self {
        bi.as_u16()
    }
}

impl Display for BlockIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Address of a byte within a page, spare area included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnAddress(pub(crate) u16);

impl ColumnAddress {
    pub const fn new(address: u16) -> Self {
        ColumnAddress(address)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Column cycles as sent on the bus, low byte first
    pub fn to_cycles(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl Display for ColumnAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Bit widths used to pack page, block and LUN into the three row cycles.
///
/// | Row bits                          | Field         |
/// | --------------------------------- | ------------- |
/// | `0 .. page_bits`                  | page in block |
/// | `page_bits .. +block_bits`        | block         |
/// | `page_bits + block_bits .. +lun_bits` | LUN       |
///
/// For a part with 128 pages per block and 4096 blocks per LUN this puts bit 0
/// of the block in bit 7 of the first row cycle and the LUN in bit 3 of the
/// third row cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressLayout {
    pub page_bits: u8,
    pub block_bits: u8,
    pub lun_bits: u8,
}

impl AddressLayout {
    /// Number of row address cycles
    pub const ROW_CYCLES: usize = 3;
    /// Number of column address cycles
    pub const COLUMN_CYCLES: usize = 2;

    /// Create a layout. The three fields must fit the 24 row bits.
    pub const fn new(page_bits: u8, block_bits: u8, lun_bits: u8) -> Self {
        assert!(
            page_bits as u32 + block_bits as u32 + lun_bits as u32 <= 24,
            "row address does not fit in three cycles"
        );
        AddressLayout {
            page_bits,
            block_bits,
            lun_bits,
        }
    }

    fn mask(bits: u8) -> u32 {
        (1u32 << bits) - 1
    }

    fn block_shift(&self) -> u32 {
        self.page_bits as u32
    }

    fn lun_shift(&self) -> u32 {
        self.page_bits as u32 + self.block_bits as u32
    }
}

/// Full address of a byte in the array: LUN, block, page in block and column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NandAddress {
    pub lun: LunIndex,
    pub block: BlockIndex,
    pub page: u8,
    pub column: ColumnAddress,
}

impl NandAddress {
    pub fn new(lun: LunIndex, block: BlockIndex, page: u8, column: ColumnAddress) -> Self {
        NandAddress {
            lun,
            block,
            page,
            column,
        }
    }

    /// Address of the first byte of a block, as used by block erase
    pub fn from_block(lun: LunIndex, block: BlockIndex) -> Self {
        Self::new(lun, block, 0, ColumnAddress::new(0))
    }

    /// Split a LUN relative [PageIndex] into block and page in block
    pub fn from_page(
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        pages_per_block: u32,
    ) -> Self {
        Self::new(
            lun,
            page.as_block_index(pages_per_block),
            page.page_in_block(pages_per_block),
            column,
        )
    }

    /// LUN relative page index of this address
    pub fn page_index(&self, pages_per_block: u32) -> PageIndex {
        PageIndex(self.block.0 as u32 * pages_per_block + self.page as u32)
    }

    /// Packed row address. Fields are truncated to their widths.
    pub fn row(&self, layout: AddressLayout) -> u32 {
        let page = self.page as u32 & AddressLayout::mask(layout.page_bits);
        let block = self.block.0 as u32 & AddressLayout::mask(layout.block_bits);
        let lun = self.lun.0 as u32 & AddressLayout::mask(layout.lun_bits);
        page | block << layout.block_shift() | lun << layout.lun_shift()
    }

    /// Row cycles only, low byte first
    pub fn encode_row(&self, layout: AddressLayout) -> [u8; AddressLayout::ROW_CYCLES] {
        let row = self.row(layout);
        [row as u8, (row >> 8) as u8, (row >> 16) as u8]
    }

    /// Column cycles followed by row cycles
    pub fn encode(&self, layout: AddressLayout) -> [u8; 5] {
        let [c1, c2] = self.column.to_cycles();
        let [r1, r2, r3] = self.encode_row(layout);
        [c1, c2, r1, r2, r3]
    }

    /// Inverse of [NandAddress::encode_row]
    pub fn decode_row(cycles: &[u8; AddressLayout::ROW_CYCLES], layout: AddressLayout) -> Self {
        let row = cycles[0] as u32 | (cycles[1] as u32) << 8 | (cycles[2] as u32) << 16;
        NandAddress {
            lun: LunIndex(((row >> layout.lun_shift()) & AddressLayout::mask(layout.lun_bits)) as u8),
            block: BlockIndex(
                ((row >> layout.block_shift()) & AddressLayout::mask(layout.block_bits)) as u16,
            ),
            page: (row & AddressLayout::mask(layout.page_bits)) as u8,
            column: ColumnAddress(0),
        }
    }

    /// Inverse of [NandAddress::encode]
    pub fn decode(cycles: &[u8; 5], layout: AddressLayout) -> Self {
        let mut address = Self::decode_row(&[cycles[2], cycles[3], cycles[4]], layout);
        address.column = ColumnAddress(u16::from_le_bytes([cycles[0], cycles[1]]));
        address
    }
}
