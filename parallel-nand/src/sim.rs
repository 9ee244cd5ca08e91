//! Simulated NAND part and test doubles for host side testing.
//!
//! [SimNand] sits behind the [NandBus] and decodes the command, address and data
//! cycles like a real part. Pages live in a sparse map, a page that was never
//! programmed since its last erase reads as all `0xFF`.

use core::marker::PhantomData;
use std::{collections::BTreeMap, vec, vec::Vec};

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};
use embedded_nand::{AddressLayout, LunIndex, NandAddress, PageIndex};

use crate::{
    bus::{BusWindows, NandBus},
    ready::TickClock,
    DeviceIdentity, NandStatus, ParallelNand,
};

/// Status of an idle healthy part
const READY_STATUS: u8 = NandStatus::WP | NandStatus::RDY | NandStatus::ARDY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimBusError {
    /// The address is in none of the NAND windows
    #[error("Access outside the NAND windows: {0:#X}")]
    Unmapped(u32),
    /// Injected bus failure
    #[error("Bus fault")]
    Fault,
}

/// Command waiting for its address cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    ReadId,
    Read,
    ReadColumn,
    Program,
    WriteColumn,
    Erase,
}

impl Pending {
    fn cycles(&self) -> usize {
        match self {
            Pending::ReadId => 1,
            Pending::Read | Pending::Program => {
                AddressLayout::COLUMN_CYCLES + AddressLayout::ROW_CYCLES
            }
            Pending::ReadColumn | Pending::WriteColumn => AddressLayout::COLUMN_CYCLES,
            Pending::Erase => AddressLayout::ROW_CYCLES,
        }
    }
}

/// What a read of the data window returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    None,
    Id(usize),
    Status,
    Cache,
}

/// In memory model of a raw NAND part of type `D`
pub struct SimNand<D> {
    windows: BusWindows,
    identity: DeviceIdentity,
    reset_status: NandStatus,
    status: u8,
    pages: BTreeMap<(u8, u32), Vec<u8>>,
    cache: Vec<u8>,
    column: usize,
    target: Option<NandAddress>,
    pending: Option<Pending>,
    cycles: Vec<u8>,
    output: Output,
    programming: bool,
    fail_next_erase: bool,
    fail_next_program: bool,
    dead: bool,
    bus_fault: bool,
    reset_count: usize,
    erase_count: usize,
    program_count: usize,
    _part: PhantomData<D>,
}

impl<D: ParallelNand> SimNand<D> {
    /// Erased part answering on `windows`
    pub fn new(windows: BusWindows) -> Self {
        SimNand {
            windows,
            identity: D::IDENTITY,
            reset_status: D::RESET_STATUS,
            status: READY_STATUS,
            pages: BTreeMap::new(),
            cache: vec![0xFF; Self::raw_page_size()],
            column: 0,
            target: None,
            pending: None,
            cycles: Vec::new(),
            output: Output::None,
            programming: false,
            fail_next_erase: false,
            fail_next_program: false,
            dead: false,
            bus_fault: false,
            reset_count: 0,
            erase_count: 0,
            program_count: 0,
            _part: PhantomData,
        }
    }

    /// Page plus spare area
    pub fn raw_page_size() -> usize {
        (D::PAGE_SIZE + D::SPARE_SIZE) as usize
    }

    // ============= Inspection =============

    /// Content of a page including its spare area, [None] if erased
    pub fn page(&self, lun: LunIndex, page: PageIndex) -> Option<&[u8]> {
        self.pages
            .get(&(lun.as_u8(), page.as_u32()))
            .map(|p| p.as_slice())
    }

    /// Number of pages holding programmed data
    pub fn programmed_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn reset_count(&self) -> usize {
        self.reset_count
    }

    pub fn erase_count(&self) -> usize {
        self.erase_count
    }

    pub fn program_count(&self) -> usize {
        self.program_count
    }

    // ============= Fault injection =============

    /// Flip one stored bit, as a disturb or retention error would
    pub fn flip_bit(&mut self, lun: LunIndex, page: PageIndex, column: usize, bit: u8) {
        let size = Self::raw_page_size();
        let data = self
            .pages
            .entry((lun.as_u8(), page.as_u32()))
            .or_insert_with(|| vec![0xFF; size]);
        if let Some(byte) = data.get_mut(column) {
            *byte ^= 1 << (bit & 7);
        }
    }

    /// The next erase reports FAIL and leaves the block untouched
    pub fn fail_next_erase(&mut self) {
        self.fail_next_erase = true;
    }

    /// The next program reports FAIL and leaves the page untouched
    pub fn fail_next_program(&mut self) {
        self.fail_next_program = true;
    }

    /// A dead part ignores every cycle and reads as a floating bus
    pub fn set_dead(&mut self, dead: bool) {
        self.dead = dead;
    }

    /// Status reported after a reset
    pub fn set_reset_status(&mut self, status: NandStatus) {
        self.reset_status = status;
    }

    pub fn set_identity(&mut self, identity: DeviceIdentity) {
        self.identity = identity;
    }

    /// Every bus access fails while set
    pub fn set_bus_fault(&mut self, fault: bool) {
        self.bus_fault = fault;
    }

    // ============= Cycle decoding =============

    fn command(&mut self, command: u8) {
        trace!("SimNand command {:02X}", command);
        self.cycles.clear();
        self.pending = None;
        match command {
            c if c == D::RESET_COMMAND => {
                self.reset_count += 1;
                self.target = None;
                self.programming = false;
                self.output = Output::None;
                self.status = self.reset_status.as_u8();
            }
            c if c == D::READ_ID_COMMAND => self.pending = Some(Pending::ReadId),
            c if c == D::READ_STATUS_COMMAND => self.output = Output::Status,
            c if c == D::READ_MODE_COMMAND => {
                self.programming = false;
                self.pending = Some(Pending::Read);
            }
            c if c == D::READ_CONFIRM_COMMAND => self.load_cache(),
            c if c == D::CHANGE_READ_COLUMN_COMMAND => self.pending = Some(Pending::ReadColumn),
            c if c == D::CHANGE_READ_COLUMN_CONFIRM_COMMAND => self.output = Output::Cache,
            c if c == D::PROGRAM_COMMAND => self.pending = Some(Pending::Program),
            c if c == D::CHANGE_WRITE_COLUMN_COMMAND => self.pending = Some(Pending::WriteColumn),
            c if c == D::PROGRAM_CONFIRM_COMMAND => self.commit_program(),
            c if c == D::ERASE_COMMAND => self.pending = Some(Pending::Erase),
            c if c == D::ERASE_CONFIRM_COMMAND => self.erase(),
            _ => warn!("SimNand ignoring unknown command {:02X}", command),
        }
    }

    fn address_cycle(&mut self, cycle: u8) {
        let Some(pending) = self.pending else {
            warn!("SimNand address cycle {:02X} without command", cycle);
            return;
        };
        self.cycles.push(cycle);
        if self.cycles.len() < pending.cycles() {
            return;
        }

        match pending {
            Pending::ReadId => self.output = Output::Id(0),
            Pending::Read => {
                let address = self.full_address();
                self.column = address.column.as_u16() as usize;
                self.target = Some(address);
            }
            Pending::Program => {
                let address = self.full_address();
                self.cache.fill(0xFF);
                self.column = address.column.as_u16() as usize;
                self.target = Some(address);
                self.programming = true;
                self.output = Output::None;
            }
            Pending::ReadColumn | Pending::WriteColumn => {
                self.column = u16::from_le_bytes([self.cycles[0], self.cycles[1]]) as usize;
            }
            Pending::Erase => {
                let row = [self.cycles[0], self.cycles[1], self.cycles[2]];
                self.target = Some(NandAddress::decode_row(&row, D::LAYOUT));
            }
        }
        self.pending = None;
        self.cycles.clear();
    }

    fn full_address(&self) -> NandAddress {
        let mut cycles = [0u8; 5];
        cycles.copy_from_slice(&self.cycles[..5]);
        NandAddress::decode(&cycles, D::LAYOUT)
    }

    fn page_key(address: &NandAddress) -> (u8, u32) {
        (
            address.lun.as_u8(),
            address.page_index(D::PAGES_PER_BLOCK).as_u32(),
        )
    }

    fn load_cache(&mut self) {
        let Some(address) = self.target else {
            warn!("SimNand read confirm without address");
            return;
        };
        match self.pages.get(&Self::page_key(&address)) {
            Some(page) => self.cache.copy_from_slice(page),
            None => self.cache.fill(0xFF),
        }
        self.status = READY_STATUS;
        self.output = Output::Cache;
    }

    fn commit_program(&mut self) {
        let target = self.target.take();
        let Some(address) = target.filter(|_| self.programming) else {
            warn!("SimNand program confirm without program setup");
            return;
        };
        self.programming = false;
        self.program_count += 1;
        if self.fail_next_program {
            self.fail_next_program = false;
            self.status = READY_STATUS | NandStatus::FAIL;
            return;
        }

        let size = Self::raw_page_size();
        let page = self
            .pages
            .entry(Self::page_key(&address))
            .or_insert_with(|| vec![0xFF; size]);
        // programming can only clear bits
        for (stored, new) in page.iter_mut().zip(self.cache.iter()) {
            *stored &= *new;
        }
        self.status = READY_STATUS;
    }

    fn erase(&mut self) {
        let Some(address) = self.target.take() else {
            warn!("SimNand erase confirm without address");
            return;
        };
        self.erase_count += 1;
        if self.fail_next_erase {
            self.fail_next_erase = false;
            self.status = READY_STATUS | NandStatus::FAIL;
            return;
        }

        let lun = address.lun.as_u8();
        let block = address.block.as_u16() as u32;
        self.pages
            .retain(|(l, page), _| !(*l == lun && page / D::PAGES_PER_BLOCK == block));
        self.status = READY_STATUS;
    }

    fn data_in(&mut self, value: u8) {
        if !self.programming {
            warn!("SimNand data write {:02X} outside program", value);
            return;
        }
        if let Some(byte) = self.cache.get_mut(self.column) {
            *byte = value;
        }
        self.column += 1;
    }

    fn data_out(&mut self) -> u8 {
        match self.output {
            Output::Id(index) => {
                self.output = Output::Id(index + 1);
                self.identity.as_bytes().get(index).copied().unwrap_or(0)
            }
            Output::Status => self.status,
            Output::Cache => {
                let value = self.cache.get(self.column).copied().unwrap_or(0xFF);
                self.column += 1;
                value
            }
            Output::None => 0xFF,
        }
    }
}

impl<D: ParallelNand> NandBus for SimNand<D> {
    type Error = SimBusError;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Self::Error> {
        if self.bus_fault {
            return Err(SimBusError::Fault);
        }
        let windows = self.windows;
        if ![windows.command_latch, windows.address_latch, windows.data].contains(&address) {
            return Err(SimBusError::Unmapped(address));
        }
        if self.dead {
            return Ok(());
        }

        if address == windows.command_latch {
            self.command(value);
        } else if address == windows.address_latch {
            self.address_cycle(value);
        } else {
            self.data_in(value);
        }
        Ok(())
    }

    fn read_byte(&mut self, address: u32) -> Result<u8, Self::Error> {
        if self.bus_fault {
            return Err(SimBusError::Fault);
        }
        if address != self.windows.data {
            return Err(SimBusError::Unmapped(address));
        }
        if self.dead {
            return Ok(0xFF);
        }
        Ok(self.data_out())
    }
}

/// Injected pin failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl embedded_hal::digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    ReadyAfter(usize),
    StuckBusy,
    Broken,
}

/// Ready/busy line following a fixed script
#[derive(Debug)]
pub struct ScriptedPin {
    script: Script,
    polls: usize,
}

impl ScriptedPin {
    /// Always ready
    pub fn ready() -> Self {
        Self::ready_after(0)
    }

    /// Busy for the first `polls` samples, ready afterwards
    pub fn ready_after(polls: usize) -> Self {
        ScriptedPin {
            script: Script::ReadyAfter(polls),
            polls: 0,
        }
    }

    /// Never releases the line
    pub fn stuck_busy() -> Self {
        ScriptedPin {
            script: Script::StuckBusy,
            polls: 0,
        }
    }

    /// Every read fails
    pub fn broken() -> Self {
        ScriptedPin {
            script: Script::Broken,
            polls: 0,
        }
    }

    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.script = if stuck {
            Script::StuckBusy
        } else {
            Script::ReadyAfter(0)
        };
    }

    /// Number of samples taken so far
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl ErrorType for ScriptedPin {
    type Error = SimPinError;
}

impl InputPin for ScriptedPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.polls += 1;
        match self.script {
            Script::ReadyAfter(busy) => Ok(self.polls > busy),
            Script::StuckBusy => Ok(false),
            Script::Broken => Err(SimPinError),
        }
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Clock advancing by a fixed step on every read
#[derive(Debug)]
pub struct StepClock {
    now: u32,
    step: u32,
    reads: usize,
}

impl StepClock {
    pub fn new(start: u32, step: u32) -> Self {
        StepClock {
            now: start,
            step,
            reads: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl TickClock for StepClock {
    fn now(&mut self) -> u32 {
        let now = self.now;
        self.now = self.now.wrapping_add(self.step);
        self.reads += 1;
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_nand::{BlockIndex, ColumnAddress};
    use test_log::test;

    struct Tiny;

    impl ParallelNand for Tiny {
        const PAGE_SIZE: u32 = 16;
        const SPARE_SIZE: u32 = 4;
        const PAGES_PER_BLOCK: u32 = 4;
        const BLOCK_COUNT: u32 = 8;
        const LAYOUT: AddressLayout = AddressLayout::new(2, 3, 0);
        const IDENTITY: DeviceIdentity = DeviceIdentity::new([1, 2, 3, 4, 5, 6, 7, 8]);
    }

    const WINDOWS: BusWindows = BusWindows::smc(0x6000_0000);

    fn command(sim: &mut SimNand<Tiny>, command: u8) {
        sim.write_byte(WINDOWS.command_latch, command).unwrap();
    }

    fn address(sim: &mut SimNand<Tiny>, cycles: &[u8]) {
        for cycle in cycles {
            sim.write_byte(WINDOWS.address_latch, *cycle).unwrap();
        }
    }

    #[test]
    fn test_read_id() {
        let mut sim = SimNand::<Tiny>::new(WINDOWS);
        command(&mut sim, 0x90);
        address(&mut sim, &[0x00]);
        let id: Vec<u8> = (0..8).map(|_| sim.read_byte(WINDOWS.data).unwrap()).collect();
        assert_eq!(id, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_program_only_clears_bits() {
        let mut sim = SimNand::<Tiny>::new(WINDOWS);
        let target = NandAddress::new(LunIndex::new(0), BlockIndex::new(1), 2, ColumnAddress::new(0));
        assert_eq!(sim.programmed_pages(), 0);
        for value in [0xF0, 0x3C] {
            command(&mut sim, 0x80);
            address(&mut sim, &target.encode(Tiny::LAYOUT));
            sim.write_byte(WINDOWS.data, value).unwrap();
            command(&mut sim, 0x10);
        }
        let page = sim.page(LunIndex::new(0), PageIndex::new(6)).unwrap();
        assert_eq!(page[0], 0x30);
        assert!(page[1..].iter().all(|b| *b == 0xFF));
        assert_eq!(sim.program_count(), 2);
        // both programs landed on the same page
        assert_eq!(sim.programmed_pages(), 1);
    }

    #[test]
    fn test_erase_only_touches_its_block() {
        let mut sim = SimNand::<Tiny>::new(WINDOWS);
        sim.flip_bit(LunIndex::new(0), PageIndex::new(3), 0, 0);
        sim.flip_bit(LunIndex::new(0), PageIndex::new(4), 0, 0);
        command(&mut sim, 0x60);
        address(
            &mut sim,
            &NandAddress::from_block(LunIndex::new(0), BlockIndex::new(1)).encode_row(Tiny::LAYOUT),
        );
        command(&mut sim, 0xD0);
        assert!(sim.page(LunIndex::new(0), PageIndex::new(3)).is_some());
        assert!(sim.page(LunIndex::new(0), PageIndex::new(4)).is_none());
        assert_eq!(sim.erase_count(), 1);
    }

    #[test]
    fn test_unmapped_access() {
        let mut sim = SimNand::<Tiny>::new(WINDOWS);
        assert_eq!(
            sim.write_byte(0x6000_0001, 0),
            Err(SimBusError::Unmapped(0x6000_0001))
        );
        assert_eq!(
            sim.read_byte(WINDOWS.command_latch),
            Err(SimBusError::Unmapped(WINDOWS.command_latch))
        );
    }

    #[test]
    fn test_dead_part_reads_floating() {
        let mut sim = SimNand::<Tiny>::new(WINDOWS);
        sim.set_dead(true);
        command(&mut sim, 0x90);
        address(&mut sim, &[0x00]);
        assert_eq!(sim.read_byte(WINDOWS.data), Ok(0xFF));
    }
}
