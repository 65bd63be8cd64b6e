//! Open-drain DDC lines over two port C pins.
//!
//! The GPIO block is push-pull, so "release" means flipping the pin to an
//! input and letting the board pull-up raise the wire; the pin is never
//! driven high. Driving low clears the data bit before turning the driver
//! on so the line can't glitch high.

use qogir_i2c::LineOps;
use qogir_regs::{map, RegisterBus};

/// [`LineOps`] for the monitor's DDC bus, borrowed from the register window.
pub struct DdcLines<'a, B> {
    bus: &'a mut B,
}

impl<'a, B: RegisterBus> DdcLines<'a, B> {
    pub fn new(bus: &'a mut B) -> Self {
        Self { bus }
    }

    fn set_line(&mut self, pin: u32, release: bool) {
        if release {
            let ddr = self.bus.read32(map::GPIO_PORTC_DDR);
            self.bus.write32(map::GPIO_PORTC_DDR, ddr & !(1 << pin));
        } else {
            let dr = self.bus.read32(map::GPIO_PORTC_DR);
            self.bus.write32(map::GPIO_PORTC_DR, dr & !(1 << pin));
            let ddr = self.bus.read32(map::GPIO_PORTC_DDR);
            self.bus.write32(map::GPIO_PORTC_DDR, ddr | (1 << pin));
        }
    }

    fn get_line(&mut self, pin: u32) -> bool {
        // Make sure the pin is an input; EXT_PORTC samples the wire itself.
        let ddr = self.bus.read32(map::GPIO_PORTC_DDR);
        self.bus.write32(map::GPIO_PORTC_DDR, ddr & !(1 << pin));
        self.bus.read32(map::GPIO_EXT_PORTC) & (1 << pin) != 0
    }
}

impl<B: RegisterBus> LineOps for DdcLines<'_, B> {
    fn set_scl(&mut self, high: bool) {
        self.set_line(map::DDC_SCL_PIN, high);
    }

    fn set_sda(&mut self, high: bool) {
        self.set_line(map::DDC_SDA_PIN, high);
    }

    fn get_scl(&mut self) -> bool {
        self.get_line(map::DDC_SCL_PIN)
    }

    fn get_sda(&mut self) -> bool {
        self.get_line(map::DDC_SDA_PIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct GpioBus {
        regs: BTreeMap<u32, u32>,
        writes: Vec<(u32, u32)>,
    }

    impl RegisterBus for GpioBus {
        fn read32(&mut self, offset: u32) -> u32 {
            self.regs.get(&offset).copied().unwrap_or(0)
        }

        fn write32(&mut self, offset: u32, value: u32) {
            self.regs.insert(offset, value);
            self.writes.push((offset, value));
        }
    }

    const SCL: u32 = 1 << map::DDC_SCL_PIN;
    const SDA: u32 = 1 << map::DDC_SDA_PIN;

    #[test]
    fn releasing_flips_the_pin_to_input_only() {
        let mut bus = GpioBus::default();
        bus.regs.insert(map::GPIO_PORTC_DDR, SCL | SDA | 0x7);

        DdcLines::new(&mut bus).set_scl(true);

        assert_eq!(bus.writes, vec![(map::GPIO_PORTC_DDR, SDA | 0x7)]);
    }

    #[test]
    fn driving_low_clears_data_before_enabling_the_driver() {
        let mut bus = GpioBus::default();
        bus.regs.insert(map::GPIO_PORTC_DR, SDA | 0x3);

        DdcLines::new(&mut bus).set_sda(false);

        assert_eq!(
            bus.writes,
            vec![(map::GPIO_PORTC_DR, 0x3), (map::GPIO_PORTC_DDR, SDA)]
        );
    }

    #[test]
    fn reads_switch_the_pin_to_input_and_sample_the_wire() {
        let mut bus = GpioBus::default();
        bus.regs.insert(map::GPIO_PORTC_DDR, SDA);
        bus.regs.insert(map::GPIO_EXT_PORTC, SDA);

        let mut lines = DdcLines::new(&mut bus);
        assert!(lines.get_sda());
        assert!(!lines.get_scl());

        // Both reads turned their pin into an input.
        assert_eq!(bus.regs[&map::GPIO_PORTC_DDR], 0);
    }

    #[test]
    fn lines_use_their_assigned_pins() {
        let mut bus = GpioBus::default();

        let mut lines = DdcLines::new(&mut bus);
        lines.set_scl(false);
        lines.set_sda(false);

        assert_eq!(bus.regs[&map::GPIO_PORTC_DDR], SCL | SDA);
        assert_eq!(bus.regs.get(&map::GPIO_PORTC_DR), Some(&0));
    }
}
