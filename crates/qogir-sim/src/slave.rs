//! I2C slave models and the line-level bus decoder that drives them.
//!
//! The decoder turns SCL/SDA edges into byte-level callbacks so slave
//! models stay simple state machines. It only changes its SDA pull on
//! falling clock edges, which keeps it from fabricating start or stop
//! conditions on the shared bus.

use std::cell::RefCell;
use std::rc::Rc;

use qogir_dc::encoder::SII9134_ADDR;
use qogir_i2c::ddc::{DDC_ADDR, DDC_SEGMENT_ADDR};

/// Byte-level view of an I2C slave.
pub trait I2cTarget {
    /// Claim (ACK) an address byte. Called once per start or repeated
    /// start, for every attached target until one claims.
    fn address(&mut self, addr: u8, read: bool) -> bool;
    /// Master-to-slave data byte; return `false` to NAK it.
    fn write(&mut self, byte: u8) -> bool;
    /// Slave-to-master data byte.
    fn read(&mut self) -> u8;
    /// Stop condition seen on the bus.
    fn stop(&mut self);
}

#[derive(Clone, Copy)]
enum Phase {
    Idle,
    /// Shifting in the address byte after a (repeated) start.
    Address { byte: u8, nbits: u8 },
    /// Ninth clock of the address byte; `read` picks the data direction.
    AddressAck { read: bool },
    /// Shifting in a data byte.
    Recv { byte: u8, nbits: u8 },
    /// Ninth clock of a received byte.
    RecvAck { ack: bool },
    /// Shifting a byte out; `presented` bits are already on the wire.
    Send { byte: u8, presented: u8 },
    /// Ninth clock of a sent byte; the master ACKs to keep reading.
    SendAckClock,
    SendAckSeen { more: bool },
}

pub(crate) struct BusDecoder {
    targets: Vec<Rc<RefCell<dyn I2cTarget>>>,
    claimed: Option<usize>,
    phase: Phase,
    pull_sda: bool,
    scl: bool,
    sda: bool,
}

impl BusDecoder {
    pub(crate) fn new() -> Self {
        Self {
            targets: Vec::new(),
            claimed: None,
            phase: Phase::Idle,
            pull_sda: false,
            scl: true,
            sda: true,
        }
    }

    pub(crate) fn attach(&mut self, target: Rc<RefCell<dyn I2cTarget>>) {
        self.targets.push(target);
    }

    pub(crate) fn pulls_sda(&self) -> bool {
        self.pull_sda
    }

    /// Whether the decoder has already seen these line levels.
    pub(crate) fn at(&self, scl: bool, sda: bool) -> bool {
        self.scl == scl && self.sda == sda
    }

    pub(crate) fn step(&mut self, scl: bool, sda: bool) {
        let prev_scl = self.scl;
        let prev_sda = self.sda;
        self.scl = scl;
        self.sda = sda;

        // SDA moving while SCL stays high: start or stop.
        if prev_scl && scl && prev_sda != sda {
            self.claimed = None;
            self.pull_sda = false;
            if prev_sda {
                self.phase = Phase::Address { byte: 0, nbits: 0 };
            } else {
                self.phase = Phase::Idle;
                for target in &self.targets {
                    target.borrow_mut().stop();
                }
            }
            return;
        }

        if !prev_scl && scl {
            self.on_rise(sda);
        } else if prev_scl && !scl {
            self.on_fall();
        }
    }

    fn claimed_target(&self) -> Option<Rc<RefCell<dyn I2cTarget>>> {
        self.claimed.map(|i| self.targets[i].clone())
    }

    fn present_bit(&mut self, byte: u8, presented: u8) -> Phase {
        self.pull_sda = (byte >> (7 - presented)) & 1 == 0;
        Phase::Send {
            byte,
            presented: presented + 1,
        }
    }

    fn on_rise(&mut self, sda: bool) {
        match self.phase {
            Phase::Address { byte, nbits } if nbits < 8 => {
                self.phase = Phase::Address {
                    byte: (byte << 1) | u8::from(sda),
                    nbits: nbits + 1,
                };
            }
            Phase::Recv { byte, nbits } if nbits < 8 => {
                self.phase = Phase::Recv {
                    byte: (byte << 1) | u8::from(sda),
                    nbits: nbits + 1,
                };
            }
            Phase::SendAckClock => {
                self.phase = Phase::SendAckSeen { more: !sda };
            }
            _ => {}
        }
    }

    fn on_fall(&mut self) {
        match self.phase {
            Phase::Address { byte, nbits: 8 } => {
                let addr = byte >> 1;
                let read = byte & 1 != 0;
                self.claimed = self
                    .targets
                    .iter()
                    .position(|t| t.borrow_mut().address(addr, read));
                if self.claimed.is_some() {
                    self.pull_sda = true;
                    self.phase = Phase::AddressAck { read };
                } else {
                    self.phase = Phase::Idle;
                }
            }
            Phase::AddressAck { read } => {
                self.pull_sda = false;
                self.phase = match (read, self.claimed_target()) {
                    (true, Some(target)) => {
                        let byte = target.borrow_mut().read();
                        self.present_bit(byte, 0)
                    }
                    (false, Some(_)) => Phase::Recv { byte: 0, nbits: 0 },
                    (_, None) => Phase::Idle,
                };
            }
            Phase::Recv { byte, nbits: 8 } => {
                let ack = match self.claimed_target() {
                    Some(target) => target.borrow_mut().write(byte),
                    None => false,
                };
                self.pull_sda = ack;
                self.phase = Phase::RecvAck { ack };
            }
            Phase::RecvAck { ack } => {
                self.pull_sda = false;
                self.phase = if ack {
                    Phase::Recv { byte: 0, nbits: 0 }
                } else {
                    Phase::Idle
                };
            }
            Phase::Send { byte, presented } => {
                if presented < 8 {
                    self.phase = self.present_bit(byte, presented);
                } else {
                    self.pull_sda = false;
                    self.phase = Phase::SendAckClock;
                }
            }
            Phase::SendAckSeen { more } => {
                self.phase = match (more, self.claimed_target()) {
                    (true, Some(target)) => {
                        let byte = target.borrow_mut().read();
                        self.present_bit(byte, 0)
                    }
                    _ => {
                        self.pull_sda = false;
                        Phase::Idle
                    }
                };
            }
            _ => {}
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum EepromPort {
    Segment,
    Memory,
}

/// E-DDC EDID EEPROM: word pointer at 0x50, volatile segment pointer at
/// 0x30 that resets on every stop condition.
pub struct DdcEeprom {
    mem: Vec<u8>,
    segment: u8,
    offset: u8,
    port: Option<EepromPort>,
}

impl DdcEeprom {
    /// Serves `mem` as consecutive 256-byte segments; reads past the end
    /// come back as 0xff like an unprogrammed EEPROM.
    pub fn new(mem: Vec<u8>) -> Self {
        Self {
            mem,
            segment: 0,
            offset: 0,
            port: None,
        }
    }

    /// An EEPROM holding the built-in 1080p EDID as its base block.
    pub fn with_fallback_edid() -> Self {
        Self::new(qogir_edid::FALLBACK_EDID.to_vec())
    }

    pub fn memory(&self) -> &[u8] {
        &self.mem
    }
}

impl I2cTarget for DdcEeprom {
    fn address(&mut self, addr: u8, read: bool) -> bool {
        match addr {
            DDC_SEGMENT_ADDR if !read => {
                self.port = Some(EepromPort::Segment);
                true
            }
            DDC_ADDR => {
                self.port = Some(EepromPort::Memory);
                true
            }
            _ => false,
        }
    }

    fn write(&mut self, byte: u8) -> bool {
        match self.port {
            Some(EepromPort::Segment) => self.segment = byte,
            Some(EepromPort::Memory) => self.offset = byte,
            None => {}
        }
        true
    }

    fn read(&mut self) -> u8 {
        let index = usize::from(self.segment) * 256 + usize::from(self.offset);
        self.offset = self.offset.wrapping_add(1);
        self.mem.get(index).copied().unwrap_or(0xff)
    }

    fn stop(&mut self) {
        // The segment pointer is volatile; the word pointer is not.
        self.segment = 0;
        self.port = None;
    }
}

/// Register-file model of the SiI9134 transmitter: pointer-then-data
/// writes, auto-incrementing reads, identity preloaded.
pub struct Sii9134Model {
    regs: [u8; 256],
    pointer: u8,
    expect_pointer: bool,
}

impl Default for Sii9134Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Sii9134Model {
    pub fn new() -> Self {
        let mut regs = [0u8; 256];
        regs[0x02] = 0x34;
        regs[0x03] = 0xb9;
        Self {
            regs,
            pointer: 0,
            expect_pointer: false,
        }
    }

    pub fn reg(&self, index: u8) -> u8 {
        self.regs[usize::from(index)]
    }
}

impl I2cTarget for Sii9134Model {
    fn address(&mut self, addr: u8, read: bool) -> bool {
        if addr != SII9134_ADDR {
            return false;
        }
        if !read {
            self.expect_pointer = true;
        }
        true
    }

    fn write(&mut self, byte: u8) -> bool {
        if self.expect_pointer {
            self.pointer = byte;
            self.expect_pointer = false;
        } else {
            self.regs[usize::from(self.pointer)] = byte;
            self.pointer = self.pointer.wrapping_add(1);
        }
        true
    }

    fn read(&mut self) -> u8 {
        let byte = self.regs[usize::from(self.pointer)];
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }

    fn stop(&mut self) {
        self.expect_pointer = false;
    }
}
