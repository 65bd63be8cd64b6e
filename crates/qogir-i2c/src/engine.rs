//! The bit-banging state machine.
//!
//! Timing follows the conventional open-drain algorithm: data transitions
//! half a bit after the clock falls, the clock is released for a full bit
//! per sample, and every clock release waits for the wire to actually rise
//! so a stretching slave is honored.

use crate::{
    BitbangTiming, Delay, I2cError, I2cMsg, LineOps, DEFAULT_ADDRESS_RETRIES,
};

/// Granularity of the clock-stretch poll loop.
const SCL_POLL_STEP_US: u32 = 10;

/// Two-wire master over a pair of open-drain lines.
pub struct BitbangMaster<L, D> {
    lines: L,
    delay: D,
    timing: BitbangTiming,
    retries: u32,
}

impl<L: LineOps, D: Delay> BitbangMaster<L, D> {
    pub fn new(lines: L, delay: D, timing: BitbangTiming) -> Self {
        Self {
            lines,
            delay,
            timing,
            retries: DEFAULT_ADDRESS_RETRIES,
        }
    }

    /// Overrides the address-NAK retry count.
    pub fn set_retries(&mut self, retries: u32) {
        self.retries = retries;
    }

    /// Consumes the master and hands the line primitives back.
    pub fn into_lines(self) -> L {
        self.lines
    }

    fn half_bit(&self) -> u32 {
        (self.timing.udelay_us + 1) / 2
    }

    fn sda_low(&mut self) {
        self.lines.set_sda(false);
        self.delay.delay_us(self.half_bit());
    }

    fn sda_release(&mut self) {
        self.lines.set_sda(true);
        self.delay.delay_us(self.half_bit());
    }

    fn scl_low(&mut self) {
        self.lines.set_scl(false);
        self.delay.delay_us(self.timing.udelay_us / 2);
    }

    /// Releases SCL and waits for the wire to actually rise.
    ///
    /// A slave may hold the line low while it catches up (clock stretching);
    /// the wait is bounded by the configured timeout.
    fn scl_high(&mut self) -> Result<(), I2cError> {
        self.lines.set_scl(true);

        let mut waited_us = 0u32;
        while !self.lines.get_scl() {
            if waited_us >= self.timing.timeout_us {
                // Sample once more: the stretch may have ended between the
                // last poll and the timeout check.
                if self.lines.get_scl() {
                    break;
                }
                tracing::debug!(
                    timeout_us = self.timing.timeout_us,
                    "SCL stuck low past the stretch timeout"
                );
                return Err(I2cError::BusTimeout);
            }
            self.delay.delay_us(SCL_POLL_STEP_US);
            waited_us += SCL_POLL_STEP_US;
        }

        self.delay.delay_us(self.timing.udelay_us);
        Ok(())
    }

    /// Start condition. Both lines must be released on entry; leaves SCL low.
    fn start(&mut self) {
        self.lines.set_sda(false);
        self.delay.delay_us(self.timing.udelay_us);
        self.scl_low();
    }

    /// Repeated start from the SCL-low state between bytes.
    fn repeated_start(&mut self) {
        self.sda_release();
        // Best effort like the stop path: a stretch timeout here surfaces on
        // the next byte instead.
        let _ = self.scl_high();
        self.lines.set_sda(false);
        self.delay.delay_us(self.timing.udelay_us);
        self.scl_low();
    }

    /// Stop condition; releases both lines.
    fn stop(&mut self) {
        self.sda_low();
        let _ = self.scl_high();
        self.lines.set_sda(true);
        self.delay.delay_us(self.timing.udelay_us);
    }

    /// Shifts one byte out MSB-first and samples the slave's ACK on the
    /// ninth clock. `Ok(true)` means the byte was acknowledged.
    fn write_byte(&mut self, byte: u8) -> Result<bool, I2cError> {
        for bit in (0..8).rev() {
            self.lines.set_sda(byte & (1 << bit) != 0);
            self.delay.delay_us(self.half_bit());
            self.scl_high()?;
            self.scl_low();
        }

        // Release SDA so the slave can drive the ACK bit.
        self.sda_release();
        self.scl_high()?;
        let acked = !self.lines.get_sda();
        self.scl_low();
        Ok(acked)
    }

    /// Clocks one byte in MSB-first. The ACK/NAK that follows is the
    /// master's and is sent separately via [`Self::send_ack`].
    fn read_byte(&mut self) -> Result<u8, I2cError> {
        self.sda_release();

        let mut byte = 0u8;
        for bit in 0..8 {
            self.scl_high()?;
            byte <<= 1;
            if self.lines.get_sda() {
                byte |= 1;
            }
            self.lines.set_scl(false);
            // Short final low period; the ACK routine supplies the rest of
            // the bit before the ninth clock.
            self.delay.delay_us(if bit == 7 {
                self.timing.udelay_us / 2
            } else {
                self.timing.udelay_us
            });
        }
        Ok(byte)
    }

    /// Drives the master's ACK (true) or NAK (false) for a byte just read.
    fn send_ack(&mut self, ack: bool) -> Result<(), I2cError> {
        if ack {
            self.lines.set_sda(false);
        }
        self.delay.delay_us(self.half_bit());
        self.scl_high()?;
        self.scl_low();
        Ok(())
    }

    /// Sends the address byte, retrying NAKs with a stop/start cycle.
    fn try_address(&mut self, addr_byte: u8) -> Result<(), I2cError> {
        let mut attempt = 0;
        loop {
            if self.write_byte(addr_byte)? {
                if attempt > 0 {
                    tracing::debug!(addr_byte, attempt, "address acknowledged after retries");
                }
                return Ok(());
            }
            if attempt == self.retries {
                return Err(I2cError::DeviceNotFound);
            }
            attempt += 1;
            self.stop();
            self.delay.delay_us(self.timing.udelay_us);
            self.start();
        }
    }

    /// Runs a combined transfer: one start, a repeated start between
    /// messages, and one stop. The stop also runs on error paths so the
    /// bus is left released.
    pub fn transfer(&mut self, msgs: &mut [I2cMsg<'_>]) -> Result<(), I2cError> {
        self.start();
        let result = self.transfer_started(msgs);
        self.stop();
        result
    }

    fn transfer_started(&mut self, msgs: &mut [I2cMsg<'_>]) -> Result<(), I2cError> {
        for (i, msg) in msgs.iter_mut().enumerate() {
            if i > 0 {
                self.repeated_start();
            }
            match msg {
                I2cMsg::Write { addr, bytes } => {
                    self.try_address(address_byte(*addr, false))?;
                    for &byte in bytes.iter() {
                        if !self.write_byte(byte)? {
                            return Err(I2cError::NoAck);
                        }
                    }
                }
                I2cMsg::Read { addr, buf } => {
                    self.try_address(address_byte(*addr, true))?;
                    let last = buf.len().saturating_sub(1);
                    for (j, slot) in buf.iter_mut().enumerate() {
                        *slot = self.read_byte()?;
                        // ACK every byte except the final one; the NAK tells
                        // the slave to stop driving.
                        self.send_ack(j != last)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// First byte on the wire: 7-bit address plus the read/write flag.
fn address_byte(addr: u8, read: bool) -> u8 {
    (addr << 1) | u8::from(read)
}
