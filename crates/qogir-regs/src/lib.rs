//! Register access layer for the GXMicro Qogir display controller.
//!
//! The device exposes one MMIO window covering three register groups (PMU
//! reset/clock unit, GPIO controller, display engine). Everything above this
//! crate programs registers through the [`RegisterBus`] trait so the same
//! driver core runs against mapped hardware ([`MmioWindow`]) or a software
//! model of the register file.
//!
//! A hardware quirk shapes the whole API: display-engine registers are only
//! reliably readable after a full frame has scanned out. The driver therefore
//! never reads back what it programmed in the `DC_*` range; [`map`] provides
//! the packing helpers needed to compose every register word from scratch.

pub mod map;
mod mmio;

pub use mmio::MmioWindow;

/// 32-bit register access over the device MMIO window.
///
/// Offsets are byte offsets from the start of the window, always 4-byte
/// aligned. Access is infallible by contract: once the device is probed the
/// window stays mapped for the lifetime of the bus value.
pub trait RegisterBus {
    fn read32(&mut self, offset: u32) -> u32;
    fn write32(&mut self, offset: u32, value: u32);
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read32(&mut self, offset: u32) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        (**self).write32(offset, value)
    }
}
