//! Gesture engine for APDS-9960 class proximity/gesture sensors.

pub mod buffer;
pub mod config;
pub mod error;
pub mod gestures;
pub mod port;
pub mod regs;
pub mod replay;
pub mod session;
