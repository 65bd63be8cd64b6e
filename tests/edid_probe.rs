//! EDID acquisition over the simulated DDC wire: GPIO bit-banging on one
//! side, a byte-level EEPROM model on the other.

use pretty_assertions::assert_eq;
use qogir_dc::{DcConfig, DcDevice, DcError, EdidSource};
use qogir_edid::{fill_checksum, EDID_BLOCK_SIZE, FALLBACK_EDID};
use qogir_i2c::I2cError;
use qogir_sim::{CountingDelay, DdcEeprom, NullDelay, SimDevice};

fn device(sim: &mut SimDevice) -> DcDevice<&mut SimDevice, NullDelay> {
    DcDevice::with_delay(sim, NullDelay, DcConfig::default())
}

#[test]
fn monitor_edid_round_trips_over_the_wire() {
    let mut sim = SimDevice::new();
    sim.attach_i2c(DdcEeprom::with_fallback_edid());
    let mut dc = device(&mut sim);

    let block = dc.read_edid(0).unwrap().unwrap();
    assert_eq!(block, FALLBACK_EDID);

    drop(dc);
    assert_eq!(sim.dc_reads(), 0);
}

#[test]
fn probed_modes_match_the_monitor() {
    let mut sim = SimDevice::new();
    sim.attach_i2c(DdcEeprom::with_fallback_edid());
    let mut dc = device(&mut sim);

    let modes = dc.get_modes();
    assert_eq!(modes.len(), 1);
    let mode = modes[0];
    assert_eq!((mode.hdisplay, mode.vdisplay), (1920, 1080));
    assert_eq!((mode.htotal, mode.vtotal), (2200, 1125));
    assert_eq!(mode.refresh_hz(), 60);
    assert!(dc.mode_valid(&mode));
}

#[test]
fn extension_blocks_come_from_the_right_segment() {
    // Three blocks: patched base, a CEA extension, and a second extension
    // that lives in E-DDC segment 1.
    let mut base = FALLBACK_EDID;
    base[126] = 2;
    fill_checksum(&mut base);

    let mut cea = [0u8; EDID_BLOCK_SIZE];
    cea[0] = 0x02;
    cea[1] = 0x03;
    cea[2] = 0x04;
    fill_checksum(&mut cea);

    let mut far = [0u8; EDID_BLOCK_SIZE];
    for (i, b) in far.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(3);
    }
    fill_checksum(&mut far);

    let mut mem = Vec::with_capacity(3 * EDID_BLOCK_SIZE);
    mem.extend_from_slice(&base);
    mem.extend_from_slice(&cea);
    mem.extend_from_slice(&far);

    let mut sim = SimDevice::new();
    sim.attach_i2c(DdcEeprom::new(mem));
    let mut dc = device(&mut sim);

    // The EEPROM's segment pointer resets at every stop; these only pass if
    // segment select, offset write and data read share one transaction.
    assert_eq!(dc.read_edid(0).unwrap().unwrap(), base);
    assert_eq!(dc.read_edid(1).unwrap().unwrap(), cea);
    assert_eq!(dc.read_edid(2).unwrap().unwrap(), far);
}

#[test]
fn unplugged_monitor_reports_no_modes() {
    let mut sim = SimDevice::new();
    let mut dc = device(&mut sim);

    assert_eq!(
        dc.read_edid(0),
        Err(DcError::I2c(I2cError::DeviceNotFound))
    );
    assert!(dc.get_modes().is_empty());
}

#[test]
fn builtin_edid_needs_no_wire() {
    let mut sim = SimDevice::new();
    let config = DcConfig {
        edid_source: EdidSource::BuiltIn,
        ..DcConfig::default()
    };
    let mut dc = DcDevice::with_delay(&mut sim, NullDelay, config);

    assert_eq!(dc.read_edid(0).unwrap().unwrap(), FALLBACK_EDID);
    assert_eq!(dc.read_edid(1).unwrap(), None);
    assert_eq!(dc.get_modes().len(), 1);

    drop(dc);
    assert!(sim.writes().is_empty(), "no bus traffic for the built-in block");
}

#[test]
fn stuck_clock_times_out_with_bounded_waiting() {
    let mut sim = SimDevice::new();
    sim.attach_i2c(DdcEeprom::with_fallback_edid());
    sim.jam_scl(true);

    let mut delay = CountingDelay::default();
    {
        let mut dc = DcDevice::with_delay(&mut sim, &mut delay, DcConfig::default());
        assert_eq!(dc.read_edid(0), Err(DcError::I2c(I2cError::BusTimeout)));
    }
    // Five block attempts, each giving up after one stretch timeout on the
    // data path and one on the closing stop.
    assert!(delay.total_us < 30_000, "waited {} us", delay.total_us);

    // Releasing the line is enough; the next start resynchronizes the bus.
    sim.jam_scl(false);
    let mut dc = device(&mut sim);
    assert_eq!(dc.read_edid(0).unwrap().unwrap(), FALLBACK_EDID);
}

#[test]
fn clock_stretching_is_waited_out() {
    let mut sim = SimDevice::new();
    sim.attach_i2c(DdcEeprom::with_fallback_edid());
    sim.stretch_clock(50);

    let mut dc = device(&mut sim);
    assert_eq!(dc.read_edid(0).unwrap().unwrap(), FALLBACK_EDID);
}
