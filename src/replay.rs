//! Scripted gesture sensor that serves recorded FIFO batches.

use anyhow::{Result, anyhow};
use log::debug;
use serde::Deserialize;
use std::{collections::VecDeque, fs, path::Path};

use crate::port::{BusError, RegisterPort};
use crate::regs;

fn default_device_id() -> u8 {
    regs::DEVICE_IDS[0]
}

fn default_enable() -> u8 {
    regs::ENABLE_PON | regs::ENABLE_PEN | regs::ENABLE_WEN | regs::ENABLE_GEN
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trace {
    #[serde(default = "default_device_id")]
    pub device_id: u8,
    #[serde(default = "default_enable")]
    pub enable: u8,
    /// Keep GVALID set after the last batch, like a wedged sensor.
    #[serde(default)]
    pub stuck: bool,
    /// One entry per FIFO fill; each record is `[up, down, left, right]`.
    #[serde(default)]
    pub batches: Vec<Vec<[u8; 4]>>,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        serde_json::from_str(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    FailRegister(u8),
    ShortRead,
}

#[derive(Debug)]
pub struct ReplayDevice {
    regs: [u8; 256],
    pending: VecDeque<Vec<[u8; 4]>>,
    stuck: bool,
    fault: Option<Fault>,
    writes: Vec<(u8, u8)>,
}

impl ReplayDevice {
    pub fn new(trace: Trace) -> Self {
        let mut bank = [0u8; 256];
        bank[usize::from(regs::ID)] = trace.device_id;
        bank[usize::from(regs::ENABLE)] = trace.enable;
        if trace.enable & regs::ENABLE_GEN != 0 {
            bank[usize::from(regs::GCONF4)] = regs::GCONF4_GMODE;
        }
        Self {
            regs: bank,
            pending: trace.batches.into(),
            stuck: trace.stuck,
            fault: None,
            writes: Vec::new(),
        }
    }

    pub fn writes(&self) -> &[(u8, u8)] {
        &self.writes
    }

    pub fn remaining_batches(&self) -> usize {
        self.pending.len()
    }

    /// Every access to `reg` fails from now on.
    pub fn fail_register(&mut self, reg: u8) {
        self.fault = Some(Fault::FailRegister(reg));
    }

    /// FIFO reads return one byte less than requested.
    pub fn short_reads(&mut self) {
        self.fault = Some(Fault::ShortRead);
    }

    fn check_fault(&self, reg: u8) -> Result<(), BusError> {
        match self.fault {
            Some(Fault::FailRegister(r)) if r == reg => Err(BusError::new(reg, "injected NACK")),
            _ => Ok(()),
        }
    }

    fn gesture_valid(&self) -> bool {
        self.stuck || !self.pending.is_empty()
    }
}

impl RegisterPort for ReplayDevice {
    fn read_register(&mut self, addr: u8) -> Result<u8, BusError> {
        self.check_fault(addr)?;
        let v = match addr {
            regs::GSTATUS => {
                if self.gesture_valid() {
                    regs::GSTATUS_GVALID
                } else {
                    0
                }
            }
            regs::GFLVL => {
                // an empty fill is consumed by reading its level
                if self.pending.front().is_some_and(|b| b.is_empty()) {
                    self.pending.pop_front();
                    0
                } else {
                    self.pending.front().map_or(0, |b| b.len().min(255) as u8)
                }
            }
            other => self.regs[usize::from(other)],
        };
        Ok(v)
    }

    fn read_block(&mut self, addr: u8, buf: &mut [u8]) -> Result<usize, BusError> {
        self.check_fault(addr)?;
        if addr != regs::GFIFO_U {
            let start = usize::from(addr);
            let n = buf.len().min(self.regs.len() - start);
            buf[..n].copy_from_slice(&self.regs[start..start + n]);
            return Ok(n);
        }

        let Some(batch) = self.pending.pop_front() else {
            return Ok(0);
        };
        let bytes: Vec<u8> = batch.iter().flatten().copied().collect();
        let mut n = bytes.len().min(buf.len());
        if self.fault == Some(Fault::ShortRead) {
            n = n.saturating_sub(1);
        }
        buf[..n].copy_from_slice(&bytes[..n]);
        debug!("replay: served {} FIFO records", n / regs::FIFO_RECORD_LEN);
        Ok(n)
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), BusError> {
        self.check_fault(addr)?;
        self.regs[usize::from(addr)] = value;
        self.writes.push((addr, value));
        Ok(())
    }
}
