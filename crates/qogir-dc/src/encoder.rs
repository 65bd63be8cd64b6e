//! SiI9134 HDMI transmitter, reached over the same bit-banged bus as DDC.
//!
//! The part is write-configured like the display engine: the driver never
//! composes a register from a read-back, it writes full words.

use qogir_i2c::{BitbangMaster, Delay, I2cError, I2cMsg, LineOps};

/// Transmitter slave address (TX0 strap).
pub const SII9134_ADDR: u8 = 0x39;

const REG_DEV_IDL: u8 = 0x02;
const REG_DEV_IDH: u8 = 0x03;
const REG_SYS_CTRL: u8 = 0x08;

const SYS_CTRL_POWER_ON: u8 = 0x01;

/// Identity word the probe expects, `[REG_DEV_IDH, REG_DEV_IDL]`.
const DEV_ID: u16 = 0xb934;

pub fn write_reg<L: LineOps, D: Delay>(
    bus: &mut BitbangMaster<L, D>,
    reg: u8,
    value: u8,
) -> Result<(), I2cError> {
    bus.transfer(&mut [I2cMsg::Write {
        addr: SII9134_ADDR,
        bytes: &[reg, value],
    }])
}

pub fn read_reg<L: LineOps, D: Delay>(
    bus: &mut BitbangMaster<L, D>,
    reg: u8,
) -> Result<u8, I2cError> {
    let mut buf = [0u8; 1];
    bus.transfer(&mut [
        I2cMsg::Write {
            addr: SII9134_ADDR,
            bytes: &[reg],
        },
        I2cMsg::Read {
            addr: SII9134_ADDR,
            buf: &mut buf,
        },
    ])?;
    Ok(buf[0])
}

/// Confirms the transmitter answers with the expected identity.
pub fn probe<L: LineOps, D: Delay>(bus: &mut BitbangMaster<L, D>) -> Result<(), I2cError> {
    let idl = read_reg(bus, REG_DEV_IDL)?;
    let idh = read_reg(bus, REG_DEV_IDH)?;
    let id = u16::from_le_bytes([idl, idh]);
    if id != DEV_ID {
        tracing::debug!(id, expected = DEV_ID, "transmitter identity mismatch");
        return Err(I2cError::DeviceNotFound);
    }
    Ok(())
}

/// Raises or drops the power-down control. A full-word write; the rest of
/// the system control register stays at its reset defaults.
pub fn set_power<L: LineOps, D: Delay>(
    bus: &mut BitbangMaster<L, D>,
    on: bool,
) -> Result<(), I2cError> {
    let word = if on { SYS_CTRL_POWER_ON } else { 0 };
    tracing::debug!(on, "transmitter power");
    write_reg(bus, REG_SYS_CTRL, word)
}
