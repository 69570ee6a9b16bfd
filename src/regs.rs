//! APDS-9960 register map (gesture engine subset).

pub const ENABLE: u8 = 0x80;
pub const ID: u8 = 0x92;
pub const GCONF4: u8 = 0xAB;
pub const GFLVL: u8 = 0xAE;
pub const GSTATUS: u8 = 0xAF;
pub const GFIFO_U: u8 = 0xFC;

// ENABLE bits
pub const ENABLE_PON: u8 = 0x01;
pub const ENABLE_PEN: u8 = 0x04;
pub const ENABLE_WEN: u8 = 0x08;
pub const ENABLE_GEN: u8 = 0x40;

/// Power and gesture engine must both be on before a session may start.
pub const GESTURE_MODE_MASK: u8 = ENABLE_PON | ENABLE_GEN;

// GCONF4 bits
pub const GCONF4_GMODE: u8 = 0x01;

// GSTATUS bits
pub const GSTATUS_GVALID: u8 = 0x01;

pub const DEVICE_IDS: [u8; 3] = [0xAB, 0x9C, 0xA8];

/// One FIFO record is U, D, L, R.
pub const FIFO_RECORD_LEN: usize = 4;
pub const FIFO_CAPACITY: usize = 32;
