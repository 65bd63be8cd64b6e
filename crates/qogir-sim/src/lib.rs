//! Software model of the Qogir register file for driver tests.
//!
//! [`SimDevice`] implements `RegisterBus` over the PMU, GPIO and display
//! controller ranges, logs every write in order, and wires the port C DDC
//! pins to byte-level I2C slave models through an open-drain bus decoder.
//! Display-controller reads return a poison word until a frame completes,
//! which is how the tests prove the driver never reads that range.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use qogir_i2c::Delay;
use qogir_regs::{map, RegisterBus};

pub mod slave;
mod vram;

pub use slave::{DdcEeprom, I2cTarget, Sii9134Model};
pub use vram::TestVram;

/// Value a mid-frame display-controller read comes back with.
pub const DC_POISON: u32 = 0xdead_beef;

/// Length of the modeled display-controller register range.
const DC_WINDOW: u32 = 0x2000;

/// One logged register store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    pub offset: u32,
    pub value: u32,
}

/// No-op delay for tests that only care about protocol order.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDelay;

impl Delay for NullDelay {
    fn delay_us(&mut self, _us: u32) {}
}

/// Accumulates requested delay time, for bounding timeout behavior.
#[derive(Debug, Default)]
pub struct CountingDelay {
    pub total_us: u64,
}

impl Delay for CountingDelay {
    fn delay_us(&mut self, us: u32) {
        self.total_us += u64::from(us);
    }
}

pub struct SimDevice {
    regs: BTreeMap<u32, u32>,
    writes: Vec<RegWrite>,
    frame_complete: bool,
    dc_reads: u32,
    jam_scl: bool,
    stretch_reads: u32,
    bus: slave::BusDecoder,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDevice {
    pub fn new() -> Self {
        Self {
            regs: BTreeMap::new(),
            writes: Vec::new(),
            frame_complete: false,
            dc_reads: 0,
            jam_scl: false,
            stretch_reads: 0,
            bus: slave::BusDecoder::new(),
        }
    }

    /// Puts a slave model on the DDC bus. The returned handle stays shared
    /// with the bus; only borrow it between driver operations.
    pub fn attach_i2c<T: I2cTarget + 'static>(&mut self, target: T) -> Rc<RefCell<T>> {
        let handle = Rc::new(RefCell::new(target));
        self.bus.attach(handle.clone());
        handle
    }

    /// Holds SCL low from the slave side until released; the master's
    /// stretch timeout is the only way out.
    pub fn jam_scl(&mut self, jammed: bool) {
        self.jam_scl = jammed;
    }

    /// Reports SCL low for the next `reads` level samples, emulating a
    /// slave that stretches the clock and then lets go.
    pub fn stretch_clock(&mut self, reads: u32) {
        self.stretch_reads = reads;
    }

    /// Marks the current frame complete, making the DC range readable.
    pub fn complete_frame(&mut self) {
        self.frame_complete = true;
    }

    /// Number of display-controller-range reads observed so far. A correct
    /// driver keeps this at zero.
    pub fn dc_reads(&self) -> u32 {
        self.dc_reads
    }

    pub fn writes(&self) -> &[RegWrite] {
        &self.writes
    }

    /// Values written to one register, in order.
    pub fn writes_to(&self, offset: u32) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|w| w.offset == offset)
            .map(|w| w.value)
            .collect()
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Raw register peek, bypassing the read-back quirk.
    pub fn reg(&self, offset: u32) -> u32 {
        self.regs
            .get(&offset)
            .copied()
            .unwrap_or_else(|| Self::reset_value(offset))
    }

    /// Reset state: RCU words come up all-ones (nothing held in reset,
    /// every clock running), everything else zero.
    fn reset_value(offset: u32) -> u32 {
        match offset {
            map::PMU_RCU_CPU_RSTR | map::PMU_RCU_AHB_RSTR | map::PMU_RCU_AHB_ENR => !0,
            _ => 0,
        }
    }

    fn is_dc(offset: u32) -> bool {
        (map::DC_BASE..map::DC_BASE + DC_WINDOW).contains(&offset)
    }

    /// Master-side line level from the GPIO state: an output pin drives its
    /// data bit, an input pin releases the wire to the pull-up.
    fn master_line(&self, pin: u32) -> bool {
        let ddr = self.reg(map::GPIO_PORTC_DDR);
        if ddr & (1 << pin) != 0 {
            self.reg(map::GPIO_PORTC_DR) & (1 << pin) != 0
        } else {
            true
        }
    }

    fn line_levels(&self) -> (bool, bool) {
        let scl = self.master_line(map::DDC_SCL_PIN) && !self.jam_scl;
        let sda = self.master_line(map::DDC_SDA_PIN) && !self.bus.pulls_sda();
        (scl, sda)
    }

    /// Feeds line changes to the bus decoder until the wired-AND state
    /// settles; a pull engaged on one edge can move SDA in the same step.
    fn settle_bus(&mut self) {
        for _ in 0..4 {
            let (scl, sda) = self.line_levels();
            if self.bus.at(scl, sda) {
                break;
            }
            self.bus.step(scl, sda);
        }
    }

    fn ext_portc(&mut self) -> u32 {
        let (mut scl, sda) = self.line_levels();
        if self.stretch_reads > 0 {
            self.stretch_reads -= 1;
            scl = false;
        }
        let mut word = 0;
        if scl {
            word |= 1 << map::DDC_SCL_PIN;
        }
        if sda {
            word |= 1 << map::DDC_SDA_PIN;
        }
        word
    }
}

impl RegisterBus for SimDevice {
    fn read32(&mut self, offset: u32) -> u32 {
        if Self::is_dc(offset) {
            self.dc_reads += 1;
            if !self.frame_complete {
                return DC_POISON;
            }
            return self.reg(offset);
        }
        if offset == map::GPIO_EXT_PORTC {
            return self.ext_portc();
        }
        self.reg(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        self.writes.push(RegWrite { offset, value });
        self.regs.insert(offset, value);
        if Self::is_dc(offset) {
            // A new store starts a new frame; reads poison again until the
            // frame completes.
            self.frame_complete = false;
        }
        if offset == map::GPIO_PORTC_DR || offset == map::GPIO_PORTC_DDR {
            self.settle_bus();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rcu_registers_reset_to_all_ones() {
        let mut sim = SimDevice::new();
        assert_eq!(sim.read32(map::PMU_RCU_AHB_RSTR), !0);
        assert_eq!(sim.read32(map::PMU_RCU_AHB_ENR), !0);
        assert_eq!(sim.read32(map::PMU_RCU_CPU_RSTR), !0);
    }

    #[test]
    fn dc_reads_are_poisoned_until_the_frame_completes() {
        let mut sim = SimDevice::new();
        sim.write32(map::DC_CTRL, 0x104);

        assert_eq!(sim.read32(map::DC_CTRL), DC_POISON);
        assert_eq!(sim.dc_reads(), 1);

        sim.complete_frame();
        assert_eq!(sim.read32(map::DC_CTRL), 0x104);
        assert_eq!(sim.dc_reads(), 2);

        // Any further DC store reopens the frame.
        sim.write32(map::DC_STRIDE, 7680);
        assert_eq!(sim.read32(map::DC_STRIDE), DC_POISON);
    }

    #[test]
    fn released_pins_read_high_and_driven_pins_read_their_level() {
        let mut sim = SimDevice::new();
        let scl = 1 << map::DDC_SCL_PIN;
        let sda = 1 << map::DDC_SDA_PIN;

        // All pins inputs out of reset: both lines idle high.
        assert_eq!(sim.read32(map::GPIO_EXT_PORTC) & (scl | sda), scl | sda);

        // Drive SCL low: clear the data bit, then enable the driver.
        sim.write32(map::GPIO_PORTC_DR, 0);
        sim.write32(map::GPIO_PORTC_DDR, scl);
        assert_eq!(sim.read32(map::GPIO_EXT_PORTC) & (scl | sda), sda);

        // Release it again.
        sim.write32(map::GPIO_PORTC_DDR, 0);
        assert_eq!(sim.read32(map::GPIO_EXT_PORTC) & (scl | sda), scl | sda);
    }

    #[test]
    fn stretch_reads_report_scl_low_then_release() {
        let mut sim = SimDevice::new();
        let scl = 1 << map::DDC_SCL_PIN;

        sim.stretch_clock(2);
        assert_eq!(sim.read32(map::GPIO_EXT_PORTC) & scl, 0);
        assert_eq!(sim.read32(map::GPIO_EXT_PORTC) & scl, 0);
        assert_eq!(sim.read32(map::GPIO_EXT_PORTC) & scl, scl);
    }

    #[test]
    fn write_log_keeps_program_order() {
        let mut sim = SimDevice::new();
        sim.write32(map::DC_HDISPLAY, 0x0898_0780);
        sim.write32(map::DC_VDISPLAY, 0x0465_0438);

        assert_eq!(
            sim.writes(),
            &[
                RegWrite {
                    offset: map::DC_HDISPLAY,
                    value: 0x0898_0780
                },
                RegWrite {
                    offset: map::DC_VDISPLAY,
                    value: 0x0465_0438
                },
            ]
        );
        assert_eq!(sim.writes_to(map::DC_HDISPLAY), vec![0x0898_0780]);
    }
}
