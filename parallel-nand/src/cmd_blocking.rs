use embedded_nand::{ColumnAddress, NandAddress};
use utils::{address, command, read_data, wait_ready, write_data};

use crate::{bus::NandIo, error::NandError, DeviceIdentity, NandStatus, ParallelNand};

/// Blocking parallel NAND command sequences.
///
/// The single cycle commands map to one bus primitive each. The compound functions
/// (erase, program, read) issue the whole sequence including the wait for ready
/// and return the status register where the part reports one.
///
/// The default implementations drive the bus by hand and follow the ONFI
/// sequences, so they should work for most parts. Look to make changes to the
/// [ParallelNand] trait first. A part with a vendor sequencer overrides the
/// compound functions to delegate to it instead.
pub trait ParallelNandBlocking<IO: NandIo>: ParallelNand {
    // ============= Commands =============

    /// Issue a reset command. Does not wait for the reset to complete.
    fn reset_cmd(&self, io: &mut IO) -> Result<(), NandError<IO::Error>> {
        command(io, Self::RESET_COMMAND)
    }

    /// Read the full 8 byte ID of the device
    fn read_id_cmd(&self, io: &mut IO) -> Result<DeviceIdentity, IO::Error> {
        io.command(Self::READ_ID_COMMAND)?;
        io.address(&[Self::READ_ID_ADDRESS])?;
        let mut id = [0; DeviceIdentity::LEN];
        io.read_data(&mut id)?;
        Ok(DeviceIdentity::new(id))
    }

    /// Read the status register
    fn read_status_cmd(&self, io: &mut IO) -> Result<NandStatus, NandError<IO::Error>> {
        command(io, Self::READ_STATUS_COMMAND)?;
        let mut status = [0];
        read_data(io, &mut status)?;
        Ok(NandStatus::new(status[0]))
    }

    // ============= Compound functions =============

    /// Erase the block containing `address`, wait for completion and return the status
    fn block_erase(
        &self,
        io: &mut IO,
        block: &NandAddress,
    ) -> Result<NandStatus, NandError<IO::Error>> {
        command(io, Self::ERASE_COMMAND)?;
        address(io, &block.encode_row(Self::LAYOUT))?;
        command(io, Self::ERASE_CONFIRM_COMMAND)?;
        wait_ready(io)?;
        self.read_status_cmd(io)
    }

    /// Program `data` from `address`, the rest of the page is left unprogrammed.
    /// Waits for completion and returns the status.
    fn page_program(
        &self,
        io: &mut IO,
        page: &NandAddress,
        data: &[u8],
    ) -> Result<NandStatus, NandError<IO::Error>> {
        command(io, Self::PROGRAM_COMMAND)?;
        address(io, &page.encode(Self::LAYOUT))?;
        write_data(io, data)?;
        command(io, Self::PROGRAM_CONFIRM_COMMAND)?;
        wait_ready(io)?;
        self.read_status_cmd(io)
    }

    /// Program `data` from `address` and `spare` from `spare_column` of the same page
    /// in one program operation. Waits for completion and returns the status.
    fn page_program_with_spare(
        &self,
        io: &mut IO,
        page: &NandAddress,
        data: &[u8],
        spare_column: ColumnAddress,
        spare: &[u8],
    ) -> Result<NandStatus, NandError<IO::Error>> {
        command(io, Self::PROGRAM_COMMAND)?;
        address(io, &page.encode(Self::LAYOUT))?;
        write_data(io, data)?;
        command(io, Self::CHANGE_WRITE_COLUMN_COMMAND)?;
        address(io, &spare_column.to_cycles())?;
        write_data(io, spare)?;
        command(io, Self::PROGRAM_CONFIRM_COMMAND)?;
        wait_ready(io)?;
        self.read_status_cmd(io)
    }

    /// Load the page into the device cache register and read `buf.len()` bytes from `address`
    fn page_read(
        &self,
        io: &mut IO,
        page: &NandAddress,
        buf: &mut [u8],
    ) -> Result<(), NandError<IO::Error>> {
        command(io, Self::READ_MODE_COMMAND)?;
        address(io, &page.encode(Self::LAYOUT))?;
        command(io, Self::READ_CONFIRM_COMMAND)?;
        wait_ready(io)?;
        read_data(io, buf)
    }

    /// Same as [ParallelNandBlocking::page_read], then move to `spare_column`
    /// of the cache register and read `spare`
    fn page_read_with_spare(
        &self,
        io: &mut IO,
        page: &NandAddress,
        buf: &mut [u8],
        spare_column: ColumnAddress,
        spare: &mut [u8],
    ) -> Result<(), NandError<IO::Error>> {
        self.page_read(io, page, buf)?;
        command(io, Self::CHANGE_READ_COLUMN_COMMAND)?;
        address(io, &spare_column.to_cycles())?;
        command(io, Self::CHANGE_READ_COLUMN_CONFIRM_COMMAND)?;
        read_data(io, spare)
    }
}

pub mod utils {
    use crate::{bus::NandIo, error::NandError};

    /// Wrapper around [NandIo::command] that maps errors
    pub fn command<IO: NandIo>(io: &mut IO, command: u8) -> Result<(), NandError<IO::Error>> {
        io.command(command).map_err(NandError::Bus)
    }

    /// Wrapper around [NandIo::address] that maps errors
    pub fn address<IO: NandIo>(io: &mut IO, cycles: &[u8]) -> Result<(), NandError<IO::Error>> {
        io.address(cycles).map_err(NandError::Bus)
    }

    /// Wrapper around [NandIo::write_data] that maps errors
    pub fn write_data<IO: NandIo>(io: &mut IO, data: &[u8]) -> Result<(), NandError<IO::Error>> {
        io.write_data(data).map_err(NandError::Bus)
    }

    /// Wrapper around [NandIo::read_data] that maps errors
    pub fn read_data<IO: NandIo>(io: &mut IO, buf: &mut [u8]) -> Result<(), NandError<IO::Error>> {
        io.read_data(buf).map_err(NandError::Bus)
    }

    /// Wrapper around [NandIo::wait_ready] that maps errors
    pub fn wait_ready<IO: NandIo>(io: &mut IO) -> Result<(), NandError<IO::Error>> {
        Ok(io.wait_ready()?)
    }
}
