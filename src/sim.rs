// Register-map model of the sensor for tests. Every transfer is logged, and
// individual transfers can be made to come up short or fail outright.

use crate::registers::Register;
use crate::transport::Transport;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimError;

impl core::fmt::Display for SimError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad("simulated bus error")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Register write, register address included.
    Write(Vec<u8>),
    /// Register address written ahead of a read.
    Select(Vec<u8>),
    /// Read of the given length.
    Read(usize),
}

#[derive(Debug, Default)]
pub struct SimulatedSensor {
    registers: BTreeMap<Register, u8>,
    pointer: Register,
    transfers: Vec<Transfer>,
    short_at: Option<usize>,
    fail_at: Option<usize>,
    short_register: Option<Register>,
    address: Option<u8>,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensor answering oscillator reads the way a freshly booted part does.
    pub fn with_oscillator(fast_osc_frequency: u16, osc_calibrate_val: u16) -> Self {
        let mut sim = Self::new();
        sim.set_u16(0x0006, fast_osc_frequency);
        sim.set_u16(0x00de, osc_calibrate_val);
        sim
    }

    pub fn set_u8(&mut self, register: Register, value: u8) {
        self.registers.insert(register, value);
    }

    pub fn set_u16(&mut self, register: Register, value: u16) {
        let bytes = value.to_be_bytes();
        self.set_u8(register, bytes[0]);
        self.set_u8(register + 1, bytes[1]);
    }

    pub fn u8_at(&self, register: Register) -> u8 {
        self.registers.get(&register).copied().unwrap_or(0)
    }

    pub fn u16_at(&self, register: Register) -> u16 {
        u16::from_be_bytes([self.u8_at(register), self.u8_at(register + 1)])
    }

    pub fn u32_at(&self, register: Register) -> u32 {
        u32::from_be_bytes([
            self.u8_at(register),
            self.u8_at(register + 1),
            self.u8_at(register + 2),
            self.u8_at(register + 3),
        ])
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn clear_transfers(&mut self) {
        self.transfers.clear();
    }

    /// Register writes in order, as (register, data) pairs.
    pub fn writes(&self) -> Vec<(Register, Vec<u8>)> {
        self.transfers
            .iter()
            .filter_map(|transfer| match transfer {
                Transfer::Write(bytes) => Some((
                    u16::from_be_bytes([bytes[0], bytes[1]]),
                    bytes[2..].to_vec(),
                )),
                _ => None,
            })
            .collect()
    }

    /// The transfer with this index (counting from the last clear) moves one
    /// byte less than requested.
    pub fn shorten_transfer(&mut self, index: usize) {
        self.short_at = Some(index);
    }

    /// The transfer with this index reports a bus error.
    pub fn fail_transfer(&mut self, index: usize) {
        self.fail_at = Some(index);
    }

    /// Every write to `register` moves one byte less than requested.
    pub fn shorten_writes_to(&mut self, register: Register) {
        self.short_register = Some(register);
    }

    /// Bus address used by the most recent transfer.
    pub fn last_address(&self) -> Option<u8> {
        self.address
    }

    pub fn heal(&mut self) {
        self.short_at = None;
        self.fail_at = None;
        self.short_register = None;
    }

    fn begin(&mut self, address: u8, transfer: Transfer) -> Result<usize, SimError> {
        let index = self.transfers.len();
        self.transfers.push(transfer);
        self.address = Some(address);

        if self.fail_at == Some(index) {
            return Err(SimError);
        }

        Ok(index)
    }
}

impl Transport for SimulatedSensor {
    type Error = SimError;

    fn write(&mut self, address: u8, bytes: &[u8], nostop: bool) -> Result<usize, SimError> {
        let transfer = if nostop {
            Transfer::Select(bytes.to_vec())
        } else {
            Transfer::Write(bytes.to_vec())
        };
        let index = self.begin(address, transfer)?;

        let register = u16::from_be_bytes([bytes[0], bytes[1]]);
        let short = self.short_at == Some(index)
            || (!nostop && self.short_register == Some(register));
        let accepted = if short { bytes.len() - 1 } else { bytes.len() };

        if nostop {
            self.pointer = register;
        } else {
            for (offset, value) in bytes[2..accepted.max(2)].iter().enumerate() {
                self.set_u8(register + offset as u16, *value);
            }
        }

        Ok(accepted)
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<usize, SimError> {
        let index = self.begin(address, Transfer::Read(buffer.len()))?;

        for (offset, byte) in buffer.iter_mut().enumerate() {
            *byte = self.u8_at(self.pointer + offset as u16);
        }

        if self.short_at == Some(index) {
            Ok(buffer.len() - 1)
        } else {
            Ok(buffer.len())
        }
    }
}
