//! Reset/power sequencing through the PMU's reset-and-clock unit.
//!
//! The RCU exposes one shared, active-low reset word per register and a
//! matching clock-enable word for the AHB peripherals. Every step below is
//! a full read-modify-write so unrelated domains keep their state.

use qogir_regs::{map, RegisterBus};

/// Power domains reachable through the RCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Cpu,
    Ddr,
    Display,
    NetworkMac,
}

/// Which reset sequence the display domain needs.
///
/// Newer board revisions hang if the display clock is gated during the
/// reset pulse, so they get the reset-register-only variant; the first
/// revision wants the full gate-and-pulse cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayResetQuirk {
    #[default]
    ResetOnly,
    FullCycle,
}

/// Pulses a domain through its reset sequence.
pub fn reset_domain<B: RegisterBus>(bus: &mut B, domain: Domain, quirk: DisplayResetQuirk) {
    tracing::debug!(?domain, "resetting power domain");
    match domain {
        Domain::Cpu => {
            // No clock-enable register exists for the CPU cores.
            let word = bus.read32(map::PMU_RCU_CPU_RSTR);
            bus.write32(map::PMU_RCU_CPU_RSTR, word & !map::CPU0_SW);
            let word = bus.read32(map::PMU_RCU_CPU_RSTR);
            bus.write32(map::PMU_RCU_CPU_RSTR, word | map::CPU0_SW);
        }
        Domain::Ddr => ahb_full_cycle(bus, map::RCU_DDR),
        Domain::NetworkMac => ahb_full_cycle(bus, map::RCU_GMAC),
        Domain::Display => match quirk {
            DisplayResetQuirk::ResetOnly => {
                let word = bus.read32(map::PMU_RCU_AHB_RSTR);
                bus.write32(map::PMU_RCU_AHB_RSTR, word & !map::RCU_DC);
                let word = bus.read32(map::PMU_RCU_AHB_RSTR);
                bus.write32(map::PMU_RCU_AHB_RSTR, word | map::RCU_DC);
            }
            DisplayResetQuirk::FullCycle => ahb_full_cycle(bus, map::RCU_DC),
        },
    }
}

/// Assert reset, gate the clock, release reset, ungate. Exactly this order;
/// the DDR controller latches garbage if the clock returns first.
fn ahb_full_cycle<B: RegisterBus>(bus: &mut B, bit: u32) {
    let word = bus.read32(map::PMU_RCU_AHB_RSTR);
    bus.write32(map::PMU_RCU_AHB_RSTR, word & !bit);
    let word = bus.read32(map::PMU_RCU_AHB_ENR);
    bus.write32(map::PMU_RCU_AHB_ENR, word & !bit);
    let word = bus.read32(map::PMU_RCU_AHB_RSTR);
    bus.write32(map::PMU_RCU_AHB_RSTR, word | bit);
    let word = bus.read32(map::PMU_RCU_AHB_ENR);
    bus.write32(map::PMU_RCU_AHB_ENR, word | bit);
}
