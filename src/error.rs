use thiserror::Error;

use crate::port::BusError;

#[derive(Debug, Error)]
pub enum GestureError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("short FIFO read: requested {requested} bytes, got {got}")]
    ShortRead { requested: usize, got: usize },

    #[error("gesture buffer overflow (capacity {capacity} records)")]
    BufferOverflow { capacity: usize },

    #[error("unknown device id 0x{0:02X}")]
    UnknownDevice(u8),

    #[error("gesture session timed out after {0} ms")]
    Timeout(u64),

    #[error("gesture session cancelled")]
    Cancelled,
}
