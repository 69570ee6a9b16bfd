//! Register access seam between the gesture engine and the bus.

use std::{thread, time::Duration};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bus error on register 0x{reg:02X}: {msg}")]
pub struct BusError {
    pub reg: u8,
    pub msg: String,
}

impl BusError {
    pub fn new(reg: u8, msg: impl Into<String>) -> Self {
        Self {
            reg,
            msg: msg.into(),
        }
    }
}

/// At most one transaction is in flight at a time; `&mut self` enforces it.
pub trait RegisterPort {
    fn read_register(&mut self, addr: u8) -> Result<u8, BusError>;

    /// Fill `buf` starting at `addr`, returning how many bytes the device sent.
    fn read_block(&mut self, addr: u8, buf: &mut [u8]) -> Result<usize, BusError>;

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), BusError>;
}

pub trait Delay {
    fn delay_ms(&mut self, ms: u64);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}
