use core::fmt::Debug;

use embedded_nand::{
    check_address, check_block, check_ecc_span, BlockIndex, ColumnAddress, EccStatus, ErrorType,
    LunIndex, NandAddress, NandFlash, PageIndex,
};

use crate::{
    bus::NandIo, cmd_blocking::ParallelNandBlocking, error::NandError, DeviceIdentity, NandStatus,
};

/// Largest codeword area handled in one page access
const MAX_ECC_BYTES: usize = 256;

/// Concrete type that implements all the flash device features.
///
/// This type is generic over the NAND I/O and the part. The command sequences
/// come from [ParallelNandBlocking], configured by the [crate::ParallelNand] trait
/// which also defines the layout of the part.
///
/// Every operation that ends in a timeout or a failure status runs
/// [ParallelNandDevice::error_handler] before returning. The error of the operation is
/// returned if the device recovered, [NandError::Unrecoverable] otherwise.
/// Failed operations are never retried here.
///
/// [ParallelNandDevice] implements the [embedded_nand::NandFlash] trait, which provides
/// an abstraction for NAND flash devices which a flash translation layer (FTL) /
/// bad block management (BBM) / wear levelling algorithm or file system can use.
pub struct ParallelNandDevice<IO, D> {
    pub io: IO,
    pub device: D,
}

// Manually implement Debug to avoid bounds on IO
// D must implement Debug, which should be fine as its just data
impl<IO, D> Debug for ParallelNandDevice<IO, D>
where
    D: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParallelNand")
            .field("device", &self.device)
            .finish()
    }
}

impl<IO, D> ParallelNandDevice<IO, D> {
    /// Create a new [ParallelNandDevice] with the given I/O and part.
    pub fn new(io: IO, device: D) -> Self {
        ParallelNandDevice { io, device }
    }
}

impl<IO: NandIo, D: ParallelNandBlocking<IO>> ParallelNandDevice<IO, D> {
    /// Issue a reset. Does not wait for the device to become ready.
    pub fn reset(&mut self) -> Result<(), NandError<IO::Error>> {
        trace!("Reset");
        self.device.reset_cmd(&mut self.io)
    }

    /// Read the 8 ID bytes of the device
    pub fn identify(&mut self) -> Result<DeviceIdentity, IO::Error> {
        self.device.read_id_cmd(&mut self.io)
    }

    /// Check that the device answers with the identity of the part.
    /// A bus error counts as not alive.
    pub fn is_alive(&mut self) -> bool {
        match self.identify() {
            Ok(id) if id == D::IDENTITY => true,
            Ok(id) => {
                warn!("Unexpected device identity {:?}", id);
                false
            }
            Err(_) => {
                warn!("Bus error while reading the device identity");
                false
            }
        }
    }

    pub fn read_status(&mut self) -> Result<NandStatus, NandError<IO::Error>> {
        self.device.read_status_cmd(&mut self.io)
    }

    /// Erase a block. All bytes of the block read as `0xFF` afterwards.
    pub fn erase_block(
        &mut self,
        lun: LunIndex,
        block: BlockIndex,
    ) -> Result<(), NandError<IO::Error>> {
        trace!("Erase block {} of LUN {}", block.as_u16(), lun.as_u8());
        check_block::<Self>(lun, block)?;
        let address = NandAddress::from_block(lun, block);
        let result = self.device.block_erase(&mut self.io, &address);
        self.check_status(result, NandError::EraseFailed)
    }

    /// Program `data` at `column` of a page together with one ECC codeword per chunk.
    ///
    /// `column` and `data.len()` must be multiples of the ECC chunk size and stay
    /// inside the main area. The codewords go to the spare area.
    pub fn program_page(
        &mut self,
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        data: &[u8],
    ) -> Result<(), NandError<IO::Error>> {
        trace!(
            "Program {} bytes at page {} column {} of LUN {}",
            data.len(),
            page.as_u32(),
            column.as_u16(),
            lun.as_u8()
        );
        check_ecc_span::<Self>(lun, page, column, data.len())?;
        if data.is_empty() {
            return Ok(());
        }
        let (spare_column, ecc_len) = Self::ecc_region(column, data.len())?;
        let mut ecc = [0xFF; MAX_ECC_BYTES];
        let ecc = &mut ecc[..ecc_len];
        D::ECC.calculate_span(data, ecc)?;

        let address = NandAddress::from_page(lun, page, column, D::PAGES_PER_BLOCK);
        let result =
            self.device
                .page_program_with_spare(&mut self.io, &address, data, spare_column, ecc);
        self.check_status(result, NandError::ProgramFailed)
    }

    /// Read `buf.len()` bytes at `column` of a page and check them against the
    /// stored ECC codewords.
    ///
    /// Same alignment rules as [ParallelNandDevice::program_page]. A single bit
    /// error per chunk is corrected in `buf`.
    pub fn read_page(
        &mut self,
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        buf: &mut [u8],
    ) -> Result<EccStatus, NandError<IO::Error>> {
        trace!(
            "Read {} bytes at page {} column {} of LUN {}",
            buf.len(),
            page.as_u32(),
            column.as_u16(),
            lun.as_u8()
        );
        check_ecc_span::<Self>(lun, page, column, buf.len())?;
        if buf.is_empty() {
            return Ok(EccStatus::Ok);
        }
        let (spare_column, ecc_len) = Self::ecc_region(column, buf.len())?;
        let mut ecc = [0xFF; MAX_ECC_BYTES];
        let ecc = &mut ecc[..ecc_len];

        let address = NandAddress::from_page(lun, page, column, D::PAGES_PER_BLOCK);
        match self
            .device
            .page_read_with_spare(&mut self.io, &address, buf, spare_column, ecc)
        {
            Ok(()) => {}
            Err(NandError::Timeout) => return self.recover_from(NandError::Timeout),
            Err(e) => return Err(e),
        }

        let status = D::ECC.correct_span(buf, ecc)?;
        if status != EccStatus::Ok {
            debug!("Page {} read with ECC status {:?}", page.as_u32(), status);
        }
        Ok(status)
    }

    /// Program `data` at any column of a page, spare area included, without ECC
    pub fn program_page_raw(
        &mut self,
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        data: &[u8],
    ) -> Result<(), NandError<IO::Error>> {
        check_address::<Self>(lun, page, column, data.len())?;
        let address = NandAddress::from_page(lun, page, column, D::PAGES_PER_BLOCK);
        let result = self.device.page_program(&mut self.io, &address, data);
        self.check_status(result, NandError::ProgramFailed)
    }

    /// Read `buf.len()` bytes at any column of a page, spare area included, without ECC
    pub fn read_page_raw(
        &mut self,
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        buf: &mut [u8],
    ) -> Result<(), NandError<IO::Error>> {
        check_address::<Self>(lun, page, column, buf.len())?;
        let address = NandAddress::from_page(lun, page, column, D::PAGES_PER_BLOCK);
        match self.device.page_read(&mut self.io, &address, buf) {
            Err(NandError::Timeout) => self.recover_from(NandError::Timeout),
            result => result,
        }
    }

    /// Bring the device back to a known state after a failed operation.
    ///
    /// Resets the device and checks the status once it is ready. If that does not
    /// give the expected reset status the identity decides: a device that still
    /// answers had a transient fault and `Ok` is returned, otherwise
    /// [NandError::Unrecoverable].
    pub fn error_handler(&mut self) -> Result<(), NandError<IO::Error>> {
        warn!("Recovering device");
        if self.reset_and_check() {
            return Ok(());
        }
        if self.is_alive() {
            info!("Device still answers, fault was transient");
            Ok(())
        } else {
            error!("Device lost");
            Err(NandError::Unrecoverable)
        }
    }

    fn reset_and_check(&mut self) -> bool {
        if self.reset().is_err() || self.io.wait_ready().is_err() {
            return false;
        }
        match self.read_status() {
            Ok(status) if status == D::RESET_STATUS => true,
            Ok(status) => {
                warn!("Status {:02X} after reset", status.as_u8());
                false
            }
            Err(_) => false,
        }
    }

    /// Run the error handler, then report `error` if the device recovered
    fn recover_from<T>(&mut self, error: NandError<IO::Error>) -> Result<T, NandError<IO::Error>> {
        self.error_handler()?;
        Err(error)
    }

    /// Turn the outcome of an operation reporting a status into a result
    fn check_status(
        &mut self,
        result: Result<NandStatus, NandError<IO::Error>>,
        failed: NandError<IO::Error>,
    ) -> Result<(), NandError<IO::Error>> {
        match result {
            Ok(status) if !status.failed() => Ok(()),
            Ok(status) => {
                warn!("Operation failed with status {:02X}", status.as_u8());
                self.recover_from(failed)
            }
            Err(NandError::Timeout) => self.recover_from(NandError::Timeout),
            Err(e) => Err(e),
        }
    }

    /// Spare column and length of the codewords protecting `length` bytes at `column`
    fn ecc_region(
        column: ColumnAddress,
        length: usize,
    ) -> Result<(ColumnAddress, usize), NandError<IO::Error>> {
        let chunk_size = D::ECC.chunk_size();
        let codeword = D::ECC.codeword_bytes();
        let start = D::PAGE_SIZE as usize
            + D::ECC_SPARE_OFFSET as usize
            + column.as_u16() as usize / chunk_size * codeword;
        let len = length / chunk_size * codeword;
        if len > MAX_ECC_BYTES || start + len > (D::PAGE_SIZE + D::SPARE_SIZE) as usize {
            return Err(NandError::OutOfBounds);
        }
        Ok((ColumnAddress::new(start as u16), len))
    }
}

impl<IO: NandIo, D: ParallelNandBlocking<IO>> ErrorType for ParallelNandDevice<IO, D> {
    type Error = NandError<IO::Error>;
}

impl<IO: NandIo, D: ParallelNandBlocking<IO>> NandFlash for ParallelNandDevice<IO, D> {
    const PAGE_SIZE: usize = D::PAGE_SIZE as usize;
    const SPARE_SIZE: usize = D::SPARE_SIZE as usize;
    const PAGES_PER_BLOCK: usize = D::PAGES_PER_BLOCK as usize;
    const BLOCK_COUNT: usize = D::BLOCK_COUNT as usize;
    const LUN_COUNT: usize = D::LUN_COUNT as usize;
    const ECC_CHUNK_SIZE: usize = D::ECC.chunk_size();

    fn is_alive(&mut self) -> bool {
        ParallelNandDevice::is_alive(self)
    }

    fn erase_block(&mut self, lun: LunIndex, block: BlockIndex) -> Result<(), Self::Error> {
        ParallelNandDevice::erase_block(self, lun, block)
    }

    fn program_page(
        &mut self,
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        ParallelNandDevice::program_page(self, lun, page, column, data)
    }

    fn read_page(
        &mut self,
        lun: LunIndex,
        page: PageIndex,
        column: ColumnAddress,
        buf: &mut [u8],
    ) -> Result<EccStatus, Self::Error> {
        ParallelNandDevice::read_page(self, lun, page, column, buf)
    }

    fn recover(&mut self) -> Result<(), Self::Error> {
        self.error_handler()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use std::{vec, vec::Vec};

    use embedded_nand::{AddressLayout, NandFlashError, NandFlashErrorKind};
    use test_log::test;

    use super::*;
    use crate::{
        bus::{BusWindows, SmcNandIo},
        sim::{ScriptedPin, SimBusError, SimNand, StepClock},
        ParallelNand,
    };

    /// 2048 + 64 byte pages, 64 pages per block, 2 LUNs of 1024 blocks
    #[derive(Debug)]
    struct TestPart;

    impl ParallelNand for TestPart {
        const PAGE_SIZE: u32 = 2048;
        const SPARE_SIZE: u32 = 64;
        const PAGES_PER_BLOCK: u32 = 64;
        const BLOCK_COUNT: u32 = 1024;
        const LUN_COUNT: u32 = 2;
        const LAYOUT: AddressLayout = AddressLayout::new(6, 10, 1);
        const IDENTITY: DeviceIdentity =
            DeviceIdentity::new([0x2C, 0xDA, 0x90, 0x95, 0x06, 0x00, 0x00, 0x00]);
    }

    impl<IO: NandIo> ParallelNandBlocking<IO> for TestPart {}

    const WINDOWS: BusWindows = BusWindows::smc(0x6000_0000);
    const LUN0: LunIndex = LunIndex::new(0);
    const LUN1: LunIndex = LunIndex::new(1);

    type SimIo<P> = SmcNandIo<SimNand<P>, ScriptedPin, StepClock>;
    type SimDevice = ParallelNandDevice<SimIo<TestPart>, TestPart>;

    fn sim_io<P: ParallelNand>() -> SimIo<P> {
        SmcNandIo::new(
            SimNand::new(WINDOWS),
            WINDOWS,
            ScriptedPin::ready(),
            StepClock::new(0, 1),
            P::READY_TIMEOUT_TICKS,
        )
    }

    fn device() -> SimDevice {
        ParallelNandDevice::new(sim_io(), TestPart)
    }

    fn sim(device: &mut SimDevice) -> &mut SimNand<TestPart> {
        device.io.bus_mut()
    }

    fn pin(device: &mut SimDevice) -> &mut ScriptedPin {
        device.io.ready_monitor().pin_mut()
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect()
    }

    #[test]
    fn test_reset_and_status() {
        let mut device = device();
        device.reset().unwrap();
        assert_eq!(device.read_status().unwrap(), TestPart::RESET_STATUS);
        assert_eq!(sim(&mut device).reset_count(), 1);
    }

    #[test]
    fn test_identify() {
        let mut device = device();
        assert_eq!(device.identify().unwrap(), TestPart::IDENTITY);
        assert!(device.is_alive());
    }

    #[test]
    fn test_not_alive_when_any_id_byte_differs() {
        for index in 0..DeviceIdentity::LEN {
            let mut device = device();
            let mut id = *TestPart::IDENTITY.as_bytes();
            id[index] ^= 0x01;
            sim(&mut device).set_identity(DeviceIdentity::new(id));
            assert!(!device.is_alive(), "byte {} changed", index);
        }
    }

    #[test]
    fn test_identify_bus_error() {
        let mut device = device();
        sim(&mut device).set_bus_fault(true);
        assert_eq!(device.identify(), Err(SimBusError::Fault));
        assert!(!device.is_alive());
    }

    #[test]
    fn test_erased_page_reads_ff() {
        let mut device = device();
        let page = BlockIndex::new(3).as_page_index(TestPart::PAGES_PER_BLOCK);
        device
            .program_page(LUN0, page, ColumnAddress::new(0), &pattern(2048, 1))
            .unwrap();
        device.erase_block(LUN0, BlockIndex::new(3)).unwrap();

        let mut raw = vec![0u8; 2048 + 64];
        device
            .read_page_raw(LUN0, page, ColumnAddress::new(0), &mut raw)
            .unwrap();
        assert!(raw.iter().all(|b| *b == 0xFF));

        let mut buf = vec![0u8; 2048];
        let status = device
            .read_page(LUN0, page, ColumnAddress::new(0), &mut buf)
            .unwrap();
        assert_eq!(status, EccStatus::Ok);
        assert!(buf.iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn test_program_read_round_trip() {
        let mut device = device();
        let page = PageIndex::new(64 * 17 + 5);
        let data = pattern(2048, 7);
        device
            .program_page(LUN1, page, ColumnAddress::new(0), &data)
            .unwrap();

        let mut buf = vec![0u8; 2048];
        let status = device
            .read_page(LUN1, page, ColumnAddress::new(0), &mut buf)
            .unwrap();
        assert_eq!(status, EccStatus::Ok);
        assert_eq!(buf, data);
        // other LUN untouched
        assert!(sim(&mut device).page(LUN0, page).is_none());
    }

    #[test]
    fn test_partial_page_round_trip() {
        let mut device = device();
        let page = PageIndex::new(9);
        let data = pattern(1024, 3);
        device
            .program_page(LUN0, page, ColumnAddress::new(512), &data)
            .unwrap();

        let mut buf = vec![0u8; 1024];
        device
            .read_page(LUN0, page, ColumnAddress::new(512), &mut buf)
            .unwrap();
        assert_eq!(buf, data);

        // codewords of chunks 1 and 2 only
        let stored = sim(&mut device).page(LUN0, page).unwrap();
        assert!(stored[2048..2048 + 4 + 3].iter().all(|b| *b == 0xFF));
        assert!(stored[2048 + 4 + 9..].iter().all(|b| *b == 0xFF));

        // the untouched chunks still validate as erased
        let mut buf = vec![0u8; 2048];
        let status = device
            .read_page(LUN0, page, ColumnAddress::new(0), &mut buf)
            .unwrap();
        assert_eq!(status, EccStatus::Ok);
        assert_eq!(buf[512..1536], data[..]);
    }

    #[test]
    fn test_single_bit_error_corrected() {
        let mut device = device();
        let page = PageIndex::new(1);
        let data = pattern(2048, 11);
        device
            .program_page(LUN0, page, ColumnAddress::new(0), &data)
            .unwrap();
        sim(&mut device).flip_bit(LUN0, page, 700, 5);

        let mut buf = vec![0u8; 2048];
        let status = device
            .read_page(LUN0, page, ColumnAddress::new(0), &mut buf)
            .unwrap();
        assert_eq!(status, EccStatus::Corrected);
        assert_eq!(buf, data);
    }

    #[test]
    fn test_double_bit_error_detected() {
        let mut device = device();
        let page = PageIndex::new(1);
        device
            .program_page(LUN0, page, ColumnAddress::new(0), &pattern(2048, 13))
            .unwrap();
        sim(&mut device).flip_bit(LUN0, page, 600, 1);
        sim(&mut device).flip_bit(LUN0, page, 900, 6);

        let mut buf = vec![0u8; 2048];
        let result = device.read_page(LUN0, page, ColumnAddress::new(0), &mut buf);
        assert!(matches!(result, Err(NandError::EccUncorrectable)));
        assert_eq!(
            result.unwrap_err().kind(),
            NandFlashErrorKind::BlockFail(None)
        );
    }

    #[test]
    fn test_damaged_codeword_reported() {
        let mut device = device();
        let page = PageIndex::new(2);
        let data = pattern(2048, 17);
        device
            .program_page(LUN0, page, ColumnAddress::new(0), &data)
            .unwrap();
        // first byte of the codeword of chunk 3
        sim(&mut device).flip_bit(LUN0, page, 2048 + 4 + 9, 0);

        let mut buf = vec![0u8; 2048];
        let status = device
            .read_page(LUN0, page, ColumnAddress::new(0), &mut buf)
            .unwrap();
        assert_eq!(status, EccStatus::ParityOnly);
        assert_eq!(buf, data);
    }

    #[test]
    fn test_invalid_arguments_rejected_before_bus_traffic() {
        let mut device = device();
        let data = [0u8; 512];
        let mut buf = [0u8; 512];

        let result = device.program_page(LUN0, PageIndex::new(0), ColumnAddress::new(100), &data);
        assert!(matches!(result, Err(NandError::NotAligned)));
        let result = device.program_page(LUN0, PageIndex::new(0), ColumnAddress::new(0), &data[..100]);
        assert!(matches!(result, Err(NandError::NotAligned)));
        let result = device.read_page(LUN0, PageIndex::new(64 * 1024), ColumnAddress::new(0), &mut buf);
        assert!(matches!(result, Err(NandError::OutOfBounds)));
        let result = device.program_page(LunIndex::new(2), PageIndex::new(0), ColumnAddress::new(0), &data);
        assert!(matches!(result, Err(NandError::OutOfBounds)));
        // ECC protected access may not reach into the spare area
        let result = device.read_page(LUN0, PageIndex::new(0), ColumnAddress::new(2048), &mut buf);
        assert!(matches!(result, Err(NandError::OutOfBounds)));
        let result = device.erase_block(LUN0, BlockIndex::new(1024));
        assert!(matches!(result, Err(NandError::OutOfBounds)));
        let result = device.read_page_raw(LUN0, PageIndex::new(0), ColumnAddress::new(2100), &mut buf[..20]);
        assert!(matches!(result, Err(NandError::OutOfBounds)));

        let chip = sim(&mut device);
        assert_eq!(chip.program_count(), 0);
        assert_eq!(chip.erase_count(), 0);
        assert_eq!(pin(&mut device).polls(), 0);
    }

    #[test]
    fn test_raw_spare_access() {
        let mut device = device();
        let page = PageIndex::new(4);
        device
            .program_page_raw(LUN0, page, ColumnAddress::new(2048), &[0x00, 0x12])
            .unwrap();
        let mut spare = [0u8; 4];
        device
            .read_page_raw(LUN0, page, ColumnAddress::new(2048), &mut spare)
            .unwrap();
        assert_eq!(spare, [0x00, 0x12, 0xFF, 0xFF]);
    }

    #[test]
    fn test_erase_failure_recovers() {
        let mut device = device();
        sim(&mut device).fail_next_erase();
        let result = device.erase_block(LUN0, BlockIndex::new(5));
        assert!(matches!(result, Err(NandError::EraseFailed)));
        // error handler reset the device
        assert_eq!(sim(&mut device).reset_count(), 1);
        device.erase_block(LUN0, BlockIndex::new(5)).unwrap();
    }

    #[test]
    fn test_program_failure_recovers() {
        let mut device = device();
        sim(&mut device).fail_next_program();
        let result = device.program_page(LUN0, PageIndex::new(0), ColumnAddress::new(0), &[0u8; 512]);
        assert!(matches!(result, Err(NandError::ProgramFailed)));
        assert_eq!(sim(&mut device).reset_count(), 1);
        assert!(sim(&mut device).page(LUN0, PageIndex::new(0)).is_none());
    }

    #[test]
    fn test_timeout_on_live_device() {
        let mut device = device();
        pin(&mut device).set_stuck_busy(true);
        let result = device.erase_block(LUN0, BlockIndex::new(0));
        assert!(matches!(result, Err(NandError::Timeout)));
        assert_eq!(result.unwrap_err().kind(), NandFlashErrorKind::Timeout);
        assert_eq!(sim(&mut device).reset_count(), 1);
    }

    #[test]
    fn test_timeout_on_dead_device() {
        let mut device = device();
        pin(&mut device).set_stuck_busy(true);
        sim(&mut device).set_dead(true);
        let mut buf = [0u8; 512];
        let result = device.read_page(LUN0, PageIndex::new(0), ColumnAddress::new(0), &mut buf);
        assert!(matches!(result, Err(NandError::Unrecoverable)));
    }

    #[test]
    fn test_error_handler_outcomes() {
        let mut device = device();
        assert!(device.error_handler().is_ok());

        // wrong status after reset but the device still answers
        sim(&mut device).set_reset_status(NandStatus::new(0xC0));
        assert!(device.error_handler().is_ok());

        sim(&mut device).set_dead(true);
        assert!(matches!(
            device.error_handler(),
            Err(NandError::Unrecoverable)
        ));
    }

    #[test]
    fn test_bus_error_is_not_recovered() {
        let mut device = device();
        sim(&mut device).set_bus_fault(true);
        let result = device.erase_block(LUN0, BlockIndex::new(0));
        assert!(matches!(result, Err(NandError::Bus(SimBusError::Fault))));
        sim(&mut device).set_bus_fault(false);
        assert_eq!(sim(&mut device).reset_count(), 0);
    }

    /// Part whose erase goes through a vendor sequencer instead of bus cycles
    #[derive(Debug, Default)]
    struct SequencedPart {
        erases: Cell<u32>,
    }

    impl ParallelNand for SequencedPart {
        const PAGE_SIZE: u32 = TestPart::PAGE_SIZE;
        const SPARE_SIZE: u32 = TestPart::SPARE_SIZE;
        const PAGES_PER_BLOCK: u32 = TestPart::PAGES_PER_BLOCK;
        const BLOCK_COUNT: u32 = TestPart::BLOCK_COUNT;
        const LUN_COUNT: u32 = TestPart::LUN_COUNT;
        const LAYOUT: AddressLayout = TestPart::LAYOUT;
        const IDENTITY: DeviceIdentity = TestPart::IDENTITY;
    }

    impl<IO: NandIo> ParallelNandBlocking<IO> for SequencedPart {
        fn block_erase(
            &self,
            _io: &mut IO,
            _block: &NandAddress,
        ) -> Result<NandStatus, NandError<IO::Error>> {
            self.erases.set(self.erases.get() + 1);
            Ok(NandStatus::new(0xE0))
        }
    }

    #[test]
    fn test_vendor_sequence_override() {
        let mut device = ParallelNandDevice::new(sim_io::<SequencedPart>(), SequencedPart::default());
        device.erase_block(LUN0, BlockIndex::new(2)).unwrap();
        assert_eq!(device.device.erases.get(), 1);
        assert_eq!(device.io.bus().erase_count(), 0);
        // the other sequences still drive the bus
        device
            .program_page(LUN0, PageIndex::new(0), ColumnAddress::new(0), &[0u8; 512])
            .unwrap();
        assert_eq!(device.io.bus().program_count(), 1);
    }

    fn fill_page<F: NandFlash>(flash: &mut F, page: PageIndex, value: u8) -> Result<(), F::Error> {
        let data = vec![value; F::PAGE_SIZE];
        flash.program_page(LunIndex::new(0), page, ColumnAddress::new(0), &data)
    }

    #[test]
    fn test_nand_flash_trait() {
        let mut device = device();
        assert!(NandFlash::is_alive(&mut device));
        assert_eq!(device.page_count(), 64 * 1024);
        assert_eq!(<SimDevice as NandFlash>::ECC_CHUNK_SIZE, 512);
        fill_page(&mut device, PageIndex::new(3), 0x5A).unwrap();

        let mut buf = vec![0u8; 2048];
        let status =
            NandFlash::read_page(&mut device, LUN0, PageIndex::new(3), ColumnAddress::new(0), &mut buf)
                .unwrap();
        assert_eq!(status, EccStatus::Ok);
        assert!(buf.iter().all(|b| *b == 0x5A));
        assert!(NandFlash::recover(&mut device).is_ok());
    }
}
