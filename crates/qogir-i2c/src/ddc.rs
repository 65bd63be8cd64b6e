//! DDC (Display Data Channel) EDID block reads.
//!
//! An EDID EEPROM answers at a fixed address with a one-byte word offset.
//! Monitors with more than two 128-byte blocks implement E-DDC: a volatile
//! segment pointer at its own address selects a 256-byte window and resets
//! on every stop condition, which is why the pointer write, the offset write
//! and the data read must travel in a single combined transfer.

use crate::{BitbangMaster, Delay, I2cError, I2cMsg, LineOps};

/// EDID EEPROM slave address.
pub const DDC_ADDR: u8 = 0x50;
/// E-DDC segment pointer slave address.
pub const DDC_SEGMENT_ADDR: u8 = 0x30;
/// Bytes per EDID block.
pub const EDID_BLOCK_LEN: usize = 128;

/// Bit-banged buses pick up spurious NAKs and timeouts under load; retrying
/// the whole block a few times rides those out.
const BLOCK_READ_ATTEMPTS: u32 = 5;

impl<L: LineOps, D: Delay> BitbangMaster<L, D> {
    /// Reads one 128-byte EDID block.
    ///
    /// Blocks 0 and 1 live in segment 0 and need no pointer write; higher
    /// blocks select their segment first. Transient failures are retried up
    /// to [`BLOCK_READ_ATTEMPTS`] times, but an address NAK means no monitor
    /// is connected and aborts immediately.
    pub fn read_edid_block(&mut self, block: u8) -> Result<[u8; EDID_BLOCK_LEN], I2cError> {
        let segment = block >> 1;
        let offset = (block & 1) * EDID_BLOCK_LEN as u8;

        let mut out = [0u8; EDID_BLOCK_LEN];
        let mut last = I2cError::DeviceNotFound;
        for attempt in 1..=BLOCK_READ_ATTEMPTS {
            let result = if segment != 0 {
                self.transfer(&mut [
                    I2cMsg::Write {
                        addr: DDC_SEGMENT_ADDR,
                        bytes: &[segment],
                    },
                    I2cMsg::Write {
                        addr: DDC_ADDR,
                        bytes: &[offset],
                    },
                    I2cMsg::Read {
                        addr: DDC_ADDR,
                        buf: &mut out,
                    },
                ])
            } else {
                self.transfer(&mut [
                    I2cMsg::Write {
                        addr: DDC_ADDR,
                        bytes: &[offset],
                    },
                    I2cMsg::Read {
                        addr: DDC_ADDR,
                        buf: &mut out,
                    },
                ])
            };

            match result {
                Ok(()) => return Ok(out),
                Err(I2cError::DeviceNotFound) => return Err(I2cError::DeviceNotFound),
                Err(err) => {
                    tracing::debug!(block, attempt, %err, "EDID block read failed");
                    last = err;
                }
            }
        }
        Err(last)
    }
}
