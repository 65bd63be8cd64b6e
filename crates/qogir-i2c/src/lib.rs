//! Bit-banged two-wire (I2C) master engine.
//!
//! The Qogir display controller has no I2C peripheral; the DDC bus to the
//! monitor hangs off two GPIO lines. This crate implements the classic
//! open-drain bit-banging algorithm over a four-primitive [`LineOps`] trait:
//! a line is either driven low or released to float high through the bus
//! pull-ups, and the engine honors slaves that hold SCL low (clock
//! stretching) by polling the line with a bounded wait.
//!
//! The engine is hardware-independent. The display driver supplies
//! [`LineOps`] over its GPIO registers; tests supply scripted or simulated
//! lines.

#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use thiserror::Error;

mod engine;
pub mod ddc;

pub use engine::BitbangMaster;

/// Address NAKs are retried this many times before the transfer fails with
/// [`I2cError::DeviceNotFound`].
pub const DEFAULT_ADDRESS_RETRIES: u32 = 3;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum I2cError {
    /// A slave stretched the clock past the configured timeout, or the line
    /// is stuck low.
    #[error("bus timeout waiting for SCL to rise")]
    BusTimeout,
    /// A slave acknowledged its address but NAKed a data byte.
    #[error("slave NAKed a data byte")]
    NoAck,
    /// No slave acknowledged the address after all retries.
    #[error("no device acknowledged the address")]
    DeviceNotFound,
}

/// Open-drain line primitives for one two-wire bus.
///
/// `set_*(true)` must release the line (input/float, pulled high externally),
/// never drive it high; `set_*(false)` drives it low. The getters sample the
/// actual wire level, which differs from the last set value while a slave
/// pulls the line.
pub trait LineOps {
    fn set_scl(&mut self, high: bool);
    fn set_sda(&mut self, high: bool);
    fn get_scl(&mut self) -> bool;
    fn get_sda(&mut self) -> bool;
}

impl<T: LineOps + ?Sized> LineOps for &mut T {
    fn set_scl(&mut self, high: bool) {
        (**self).set_scl(high)
    }

    fn set_sda(&mut self, high: bool) {
        (**self).set_sda(high)
    }

    fn get_scl(&mut self) -> bool {
        (**self).get_scl()
    }

    fn get_sda(&mut self) -> bool {
        (**self).get_sda()
    }
}

/// Microsecond delay source for bit timing.
pub trait Delay {
    fn delay_us(&mut self, us: u32);
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// [`Delay`] backed by the host monotonic clock.
///
/// Spins rather than sleeping: at microsecond scale the scheduler would
/// oversleep by orders of magnitude and collapse the bus clock rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDelay;

impl Delay for HostDelay {
    fn delay_us(&mut self, us: u32) {
        let deadline = Instant::now() + Duration::from_micros(u64::from(us));
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Bit timing for the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitbangTiming {
    /// Half-period of SCL in microseconds; 20 gives a 25 kHz clock, well
    /// inside the 100 kHz standard-mode ceiling.
    pub udelay_us: u32,
    /// Upper bound on a single clock-stretch wait.
    pub timeout_us: u32,
}

impl Default for BitbangTiming {
    fn default() -> Self {
        Self {
            udelay_us: 20,
            timeout_us: 2200,
        }
    }
}

/// One message of a combined transfer. Consecutive messages are separated by
/// a repeated start, so a slave's internal state (like an EEPROM address
/// pointer) survives between them.
pub enum I2cMsg<'a> {
    /// Master-to-slave write of `bytes`.
    Write { addr: u8, bytes: &'a [u8] },
    /// Slave-to-master read filling all of `buf`.
    Read { addr: u8, buf: &'a mut [u8] },
}

impl I2cMsg<'_> {
    /// The 7-bit slave address this message targets.
    pub fn addr(&self) -> u8 {
        match self {
            I2cMsg::Write { addr, .. } | I2cMsg::Read { addr, .. } => *addr,
        }
    }
}
