//! Full bringup against the register-level device model: reset sequencing,
//! mode programming, and the no-readback rule end to end.

use pretty_assertions::assert_eq;
use qogir_dc::{DcConfig, DcDevice, DisplayResetQuirk, Mode, ModeFlags, PixelFormat, Surface};
use qogir_dc::{ConfigError, VramManager};
use qogir_regs::{map, RegisterBus};
use qogir_sim::{NullDelay, SimDevice, TestVram, DC_POISON};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn mode_1080p() -> Mode {
    Mode {
        clock_khz: 148_500,
        hdisplay: 1920,
        hsync_start: 2008,
        hsync_end: 2052,
        htotal: 2200,
        vdisplay: 1080,
        vsync_start: 1084,
        vsync_end: 1089,
        vtotal: 1125,
        flags: ModeFlags::empty(),
    }
}

fn full_screen_surface(vram: &mut TestVram) -> Surface {
    let stride = 1920 * 4;
    let buffer = vram.alloc(stride * 1080, 4096).unwrap();
    Surface {
        buffer,
        format: PixelFormat::Argb8888,
        width: 1920,
        height: 1080,
        stride_bytes: stride as u32,
    }
}

#[test]
fn bringup_resets_ddr_then_display_and_programs_the_mode() {
    init_logging();
    let mut sim = SimDevice::new();
    let mut vram = TestVram::new();
    let mut dc = DcDevice::with_delay(&mut sim, NullDelay, DcConfig::default());

    dc.initialize().unwrap();

    // DDR gets the full gate-and-pulse cycle, the display engine only the
    // reset pulse; the clock-enable word is never touched for the display.
    assert_eq!(
        dc.bus_mut().writes_to(map::PMU_RCU_AHB_RSTR),
        vec![!map::RCU_DDR, !0, !map::RCU_DC, !0]
    );
    assert_eq!(
        dc.bus_mut().writes_to(map::PMU_RCU_AHB_ENR),
        vec![!map::RCU_DDR, !0]
    );

    dc.bus_mut().clear_writes();
    let surface = full_screen_surface(&mut vram);
    dc.set_mode(&mut vram, &mode_1080p(), surface).unwrap();

    let writes: Vec<(u32, u32)> = dc
        .bus_mut()
        .writes()
        .iter()
        .map(|w| (w.offset, w.value))
        .collect();
    assert_eq!(
        writes,
        vec![
            (map::DC_CTRL, map::DC_RGB888),
            (map::DC_STRIDE, 7680),
            (map::DC_ORIGIN, 0),
            (map::DC_PANEL_CONF, 0x8000_0301),
            (map::DC_HDISPLAY, 0x0898_0780),
            (map::DC_HSYNC, 0x4804_07d8),
            (map::DC_VDISPLAY, 0x0465_0438),
            (map::DC_VSYNC, 0x4441_043c),
            (map::DC_ADDR0, map::FB_CUR_BASE),
        ]
    );
    assert_eq!(vram.pin_count(surface.buffer), 1);

    drop(dc);
    // Nothing in the bringup read a display-engine register.
    assert_eq!(sim.dc_reads(), 0);
}

#[test]
fn full_cycle_quirk_gates_the_display_clock_too() {
    let mut sim = SimDevice::new();
    let config = DcConfig {
        display_reset: DisplayResetQuirk::FullCycle,
        ..DcConfig::default()
    };
    let mut dc = DcDevice::with_delay(&mut sim, NullDelay, config);

    dc.initialize().unwrap();

    assert_eq!(
        dc.bus_mut().writes_to(map::PMU_RCU_AHB_ENR),
        vec![!map::RCU_DDR, !0, !map::RCU_DC, !0]
    );
}

#[test]
fn power_needs_a_surface_and_toggles_one_control_bit() {
    init_logging();
    let mut sim = SimDevice::new();
    let mut vram = TestVram::new();
    let mut dc = DcDevice::with_delay(&mut sim, NullDelay, DcConfig::default());
    dc.initialize().unwrap();

    assert_eq!(dc.set_power(true), Err(ConfigError::NotBound));

    let surface = full_screen_surface(&mut vram);
    dc.set_mode(&mut vram, &mode_1080p(), surface).unwrap();
    dc.set_power(true).unwrap();
    dc.set_power(true).unwrap();
    dc.set_power(false).unwrap();

    assert_eq!(
        dc.bus_mut().writes_to(map::DC_CTRL),
        vec![
            map::DC_RGB888,
            map::DC_ENABLE | map::DC_RGB888,
            map::DC_ENABLE | map::DC_RGB888,
            map::DC_RGB888,
        ]
    );
}

#[test]
fn programmed_timing_reads_back_only_after_the_frame_completes() {
    let mut sim = SimDevice::new();
    let mut vram = TestVram::new();
    {
        let mut dc = DcDevice::with_delay(&mut sim, NullDelay, DcConfig::default());
        dc.initialize().unwrap();
        let surface = full_screen_surface(&mut vram);
        dc.set_mode(&mut vram, &mode_1080p(), surface).unwrap();
    }
    assert_eq!(sim.dc_reads(), 0, "the driver must never read this range");

    // A raw read mid-frame sees the poison word, not the programmed value.
    assert_eq!(sim.read32(map::DC_HDISPLAY), DC_POISON);
    sim.complete_frame();
    assert_eq!(sim.read32(map::DC_HDISPLAY), 0x0898_0780);
}

#[test]
fn teardown_stops_scanout_before_releasing_the_buffer() {
    let mut sim = SimDevice::new();
    let mut vram = TestVram::new();
    let mut dc = DcDevice::with_delay(&mut sim, NullDelay, DcConfig::default());
    dc.initialize().unwrap();

    let surface = full_screen_surface(&mut vram);
    dc.set_mode(&mut vram, &mode_1080p(), surface).unwrap();
    dc.set_power(true).unwrap();

    dc.disable(&mut vram);

    assert_eq!(vram.pin_count(surface.buffer), 0);
    assert_eq!(dc.current_mode(), None);
    let ctrl = dc.bus_mut().writes_to(map::DC_CTRL);
    assert_eq!(ctrl.last(), Some(&map::DC_RGB888), "enable bits cleared");
}
