//! Byte level access to the NAND through a memory mapped bus.
//!
//! A static memory controller drives the command latch enable (CLE) and address
//! latch enable (ALE) lines from address bits, so a command, an address cycle
//! and a data byte are all plain byte writes to different windows of the bus.

use core::fmt::Debug;

use embedded_hal::digital::InputPin;

use crate::ready::{ReadyBusyMonitor, TickClock, TimedOut};

/// Byte wide bus the device is attached to.
///
/// Implemented with volatile accesses on hardware and by [crate::sim::SimNand] in tests.
pub trait NandBus {
    type Error: Debug;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Self::Error>;

    fn read_byte(&mut self, address: u32) -> Result<u8, Self::Error>;
}

impl<T: NandBus + ?Sized> NandBus for &mut T {
    type Error = T::Error;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Self::Error> {
        T::write_byte(self, address, value)
    }

    fn read_byte(&mut self, address: u32) -> Result<u8, Self::Error> {
        T::read_byte(self, address)
    }
}

/// Bus addresses of the data, address latch and command latch windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusWindows {
    pub data: u32,
    pub address_latch: u32,
    pub command_latch: u32,
}

impl BusWindows {
    /// Bus address bit driving ALE
    pub const ALE_OFFSET: u32 = 0x20_0000;
    /// Bus address bit driving CLE
    pub const CLE_OFFSET: u32 = 0x40_0000;

    /// Windows of a chip select of the static memory controller at `base`
    pub const fn smc(base: u32) -> Self {
        BusWindows {
            data: base,
            address_latch: base | Self::ALE_OFFSET,
            command_latch: base | Self::CLE_OFFSET,
        }
    }
}

/// Primitive NAND cycles.
///
/// [crate::ParallelNandBlocking] builds every command sequence out of these.
pub trait NandIo {
    type Error: Debug;

    /// Latch a command byte
    fn command(&mut self, command: u8) -> Result<(), Self::Error>;

    /// Latch address cycles, first cycle first
    fn address(&mut self, cycles: &[u8]) -> Result<(), Self::Error>;

    fn write_data(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    fn read_data(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Block until the device reports ready
    fn wait_ready(&mut self) -> Result<(), TimedOut>;
}

impl<T: NandIo + ?Sized> NandIo for &mut T {
    type Error = T::Error;

    fn command(&mut self, command: u8) -> Result<(), Self::Error> {
        T::command(self, command)
    }

    fn address(&mut self, cycles: &[u8]) -> Result<(), Self::Error> {
        T::address(self, cycles)
    }

    fn write_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write_data(self, data)
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read_data(self, buf)
    }

    fn wait_ready(&mut self) -> Result<(), TimedOut> {
        T::wait_ready(self)
    }
}

/// [NandIo] over a memory mapped [NandBus] and a ready/busy line
pub struct SmcNandIo<BUS, RB, CLK> {
    bus: BUS,
    windows: BusWindows,
    ready: ReadyBusyMonitor<RB, CLK>,
}

// Manually implement Debug to avoid bounds on the bus and pin
impl<BUS, RB, CLK> Debug for SmcNandIo<BUS, RB, CLK> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SmcNandIo")
            .field("windows", &self.windows)
            .finish()
    }
}

impl<BUS: NandBus, RB: InputPin, CLK: TickClock> SmcNandIo<BUS, RB, CLK> {
    pub fn new(bus: BUS, windows: BusWindows, ready_pin: RB, clock: CLK, timeout_ticks: u32) -> Self {
        SmcNandIo {
            bus,
            windows,
            ready: ReadyBusyMonitor::new(ready_pin, clock, timeout_ticks),
        }
    }

    pub fn windows(&self) -> BusWindows {
        self.windows
    }

    pub fn bus(&self) -> &BUS {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }

    pub fn ready_monitor(&mut self) -> &mut ReadyBusyMonitor<RB, CLK> {
        &mut self.ready
    }

    /// Give back the bus, the ready/busy pin and the clock
    pub fn release(self) -> (BUS, RB, CLK) {
        let (pin, clock) = self.ready.release();
        (self.bus, pin, clock)
    }
}

impl<BUS: NandBus, RB: InputPin, CLK: TickClock> NandIo for SmcNandIo<BUS, RB, CLK> {
    type Error = BUS::Error;

    fn command(&mut self, command: u8) -> Result<(), Self::Error> {
        self.bus.write_byte(self.windows.command_latch, command)
    }

    fn address(&mut self, cycles: &[u8]) -> Result<(), Self::Error> {
        for cycle in cycles {
            self.bus.write_byte(self.windows.address_latch, *cycle)?;
        }
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        for byte in data {
            self.bus.write_byte(self.windows.data, *byte)?;
        }
        Ok(())
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        for byte in buf.iter_mut() {
            *byte = self.bus.read_byte(self.windows.data)?;
        }
        Ok(())
    }

    fn wait_ready(&mut self) -> Result<(), TimedOut> {
        self.ready.wait_ready()
    }
}
