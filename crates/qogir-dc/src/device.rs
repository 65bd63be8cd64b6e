//! The device context and its operations.

use qogir_edid::EDID_BLOCK_SIZE;
use qogir_i2c::{BitbangMaster, BitbangTiming, Delay, HostDelay};
use qogir_regs::{map, RegisterBus};

use crate::encoder;
use crate::error::{ConfigError, DcError, HardwareError};
use crate::gpio::DdcLines;
use crate::mode::{Mode, ModeFlags, Surface};
use crate::pmu::{self, DisplayResetQuirk, Domain};
use crate::vram::{BufferId, VramError, VramManager};

/// Where the connector's EDID comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdidSource {
    /// Live DDC read over the GPIO bus.
    #[default]
    Ddc,
    /// The built-in 1080p block; for boards wired without a DDC bus.
    BuiltIn,
}

/// Board-level configuration fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct DcConfig {
    pub display_reset: DisplayResetQuirk,
    pub edid_source: EdidSource,
    pub timing: BitbangTiming,
    /// Whether an SiI9134 transmitter sits behind the panel interface.
    pub encoder_present: bool,
}

impl Default for DcConfig {
    fn default() -> Self {
        Self {
            display_reset: DisplayResetQuirk::default(),
            edid_source: EdidSource::default(),
            timing: BitbangTiming::default(),
            encoder_present: false,
        }
    }
}

/// One display controller instance.
///
/// All operations take `&mut self`; the caller serializes modesetting the
/// same way a host framework holds its commit lock. The `dctrl` shadow is
/// the only source of truth for `DC_CTRL`: the hardware register file is
/// not readable mid-frame, so nothing here ever reads a `DC_*` register.
pub struct DcDevice<B, D = HostDelay> {
    bus: B,
    delay: D,
    config: DcConfig,
    dctrl: u32,
    mode: Option<Mode>,
    surface: Option<Surface>,
    cursor: Option<BufferId>,
}

impl<B: RegisterBus> DcDevice<B> {
    pub fn new(bus: B, config: DcConfig) -> Self {
        Self::with_delay(bus, HostDelay, config)
    }
}

impl<B: RegisterBus, D: Delay> DcDevice<B, D> {
    pub fn with_delay(bus: B, delay: D, config: DcConfig) -> Self {
        Self {
            bus,
            delay,
            config,
            dctrl: 0,
            mode: None,
            surface: None,
            cursor: None,
        }
    }

    /// Escape hatch to the raw register window.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn current_mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn current_surface(&self) -> Option<Surface> {
        self.surface
    }

    /// Brings the device out of reset. Must run before any other register
    /// traffic; the engine ignores writes while its domain is in reset.
    pub fn initialize(&mut self) -> Result<(), DcError> {
        pmu::reset_domain(&mut self.bus, Domain::Ddr, self.config.display_reset);
        pmu::reset_domain(&mut self.bus, Domain::Display, self.config.display_reset);

        if self.config.encoder_present {
            let mut ddc = self.ddc_master();
            encoder::probe(&mut ddc)?;
            encoder::set_power(&mut ddc, true)?;
        }
        Ok(())
    }

    /// Turns scanout on or off. Powering on needs a programmed mode and a
    /// bound surface: a base address alone leaves the timing registers
    /// unprogrammed. The write is idempotent, so repeated calls are
    /// harmless.
    pub fn set_power(&mut self, on: bool) -> Result<(), ConfigError> {
        if on && (self.mode.is_none() || self.surface.is_none()) {
            return Err(ConfigError::NotBound);
        }
        if on {
            self.dctrl |= map::DC_ENABLE;
        } else {
            self.dctrl &= !map::DC_ENABLE;
        }
        self.bus.write32(map::DC_CTRL, self.dctrl);
        tracing::debug!(on, dctrl = self.dctrl, "display power");
        Ok(())
    }

    /// Tear-down: power off, then release the scanout buffer. In that
    /// order; the engine must stop fetching before the pin goes away.
    pub fn disable(&mut self, vram: &mut dyn VramManager) {
        self.dctrl &= !map::DC_ENABLE;
        self.bus.write32(map::DC_CTRL, self.dctrl);
        if let Some(surface) = self.surface.take() {
            vram.unpin(surface.buffer);
        }
        self.mode = None;
        tracing::debug!("display disabled");
    }
}

// Timing and scanout pipeline.

impl<B: RegisterBus, D: Delay> DcDevice<B, D> {
    /// Programs a full mode: control word, stride, panel strap, H/V timing,
    /// then the scanout base.
    ///
    /// The timing writes are idempotent and take effect with the next
    /// frame; the only fallible step is the base-address swap at the end,
    /// so on error the previous surface is still pinned and scanning.
    pub fn set_mode(
        &mut self,
        vram: &mut dyn VramManager,
        mode: &Mode,
        surface: Surface,
    ) -> Result<(), HardwareError> {
        if !surface.format.scanout_supported() {
            return Err(HardwareError::UnsupportedFormat(surface.format));
        }

        self.dctrl = (self.dctrl & !map::DC_FB_FORMAT) | surface.format.dc_format_bits();
        self.bus.write32(map::DC_CTRL, self.dctrl);
        self.bus.write32(map::DC_STRIDE, surface.stride_bytes);
        self.bus.write32(map::DC_ORIGIN, 0);
        self.bus.write32(map::DC_PANEL_CONF, map::PANEL_CONF);

        self.bus
            .write32(map::DC_HDISPLAY, map::hv_display(mode.hdisplay, mode.htotal));
        self.bus.write32(
            map::DC_HSYNC,
            map::hv_sync(
                mode.hsync_start,
                mode.hsync_end,
                mode.flags.contains(ModeFlags::NHSYNC),
            ),
        );
        self.bus
            .write32(map::DC_VDISPLAY, map::hv_display(mode.vdisplay, mode.vtotal));
        self.bus.write32(
            map::DC_VSYNC,
            map::hv_sync(
                mode.vsync_start,
                mode.vsync_end,
                mode.flags.contains(ModeFlags::NVSYNC),
            ),
        );
        tracing::debug!(
            hdisplay = mode.hdisplay,
            vdisplay = mode.vdisplay,
            refresh = mode.refresh_hz(),
            format = ?surface.format,
            "mode programmed"
        );

        self.set_base_address(vram, surface)?;
        self.mode = Some(*mode);
        Ok(())
    }

    /// Points scanout at a new surface without touching the timing.
    ///
    /// Pin the new buffer, resolve its address, write `DC_ADDR0`, and only
    /// then drop the old pin: the engine never fetches from an unpinned
    /// buffer, and counted pins make swapping a buffer for itself safe.
    pub fn set_base_address(
        &mut self,
        vram: &mut dyn VramManager,
        surface: Surface,
    ) -> Result<(), HardwareError> {
        vram.pin(surface.buffer).map_err(HardwareError::PinFailed)?;
        let addr = match vram.device_address(surface.buffer) {
            Ok(addr) => addr,
            Err(err) => {
                vram.unpin(surface.buffer);
                return Err(HardwareError::AddressResolutionFailed(err));
            }
        };

        self.bus.write32(map::DC_ADDR0, addr);
        if let Some(previous) = self.surface.take() {
            vram.unpin(previous.buffer);
        }
        self.surface = Some(surface);
        tracing::debug!(buffer = surface.buffer.0, addr, "scanout base swapped");
        Ok(())
    }
}

// Hardware cursor plane.

impl<B: RegisterBus, D: Delay> DcDevice<B, D> {
    /// Allocates and pins the cursor's page and points the engine at it.
    /// The buffer persists until [`Self::cursor_detach`].
    pub fn cursor_attach(&mut self, vram: &mut dyn VramManager) -> Result<(), DcError> {
        if self.cursor.is_some() {
            return Err(ConfigError::AlreadyAttached.into());
        }

        let buffer = vram
            .alloc(map::CURSOR_BYTES, map::CURSOR_BYTES)
            .map_err(HardwareError::PinFailed)?;
        if let Err(err) = vram.pin(buffer) {
            vram.free(buffer);
            return Err(HardwareError::PinFailed(err).into());
        }
        let addr = match vram.device_address(buffer) {
            Ok(addr) => addr,
            Err(err) => {
                vram.unpin(buffer);
                vram.free(buffer);
                return Err(HardwareError::AddressResolutionFailed(err).into());
            }
        };

        self.bus.write32(map::DC_CURSOR_ADDR, addr);
        self.cursor = Some(buffer);
        tracing::debug!(buffer = buffer.0, addr, "cursor buffer attached");
        Ok(())
    }

    /// Copies a full 32x32 ARGB image into the cursor buffer.
    pub fn cursor_update_image(
        &mut self,
        vram: &mut dyn VramManager,
        image: &[u8; map::CURSOR_BYTES],
    ) -> Result<(), DcError> {
        let buffer = self.cursor.ok_or(ConfigError::NotAttached)?;
        let mapping = vram.map_mut(buffer).map_err(HardwareError::MapFailed)?;
        // `map_mut` yields the full allocation; a shorter slice is a
        // collaborator fault.
        let dest = mapping
            .get_mut(..map::CURSOR_BYTES)
            .ok_or(HardwareError::MapFailed(VramError::InvalidHandle))?;
        dest.copy_from_slice(image);
        Ok(())
    }

    /// Positions the cursor so its hot spot lands on `(x, y)`.
    ///
    /// Moving before any image upload shows whatever the buffer holds;
    /// that matches the hardware and is allowed. The control word carries
    /// the hot spot and the format code together on every write, since the
    /// hardware only latches the hot-spot fields while the format enable
    /// is present in the same word.
    pub fn cursor_move(&mut self, x: i32, y: i32, hot_x: i32, hot_y: i32) -> Result<(), ConfigError> {
        if self.cursor.is_none() {
            return Err(ConfigError::NotAttached);
        }
        self.bus
            .write32(map::DC_CURSOR_LOCATION, map::cursor_location(x, hot_x, y, hot_y));
        self.bus
            .write32(map::DC_CURSOR_CTRL, map::cursor_control(hot_x, hot_y));
        Ok(())
    }

    /// Hides the cursor. Safe in every state, attached or not.
    pub fn cursor_disable(&mut self) {
        self.bus.write32(map::DC_CURSOR_CTRL, map::CUR_DISABLE);
    }

    /// Hides the cursor and releases its buffer.
    pub fn cursor_detach(&mut self, vram: &mut dyn VramManager) -> Result<(), ConfigError> {
        let buffer = self.cursor.take().ok_or(ConfigError::NotAttached)?;
        self.cursor_disable();
        vram.unpin(buffer);
        vram.free(buffer);
        tracing::debug!(buffer = buffer.0, "cursor buffer detached");
        Ok(())
    }
}

// Connector: EDID acquisition and mode filtering.

impl<B: RegisterBus, D: Delay> DcDevice<B, D> {
    fn ddc_master(&mut self) -> BitbangMaster<DdcLines<'_, B>, &mut D> {
        BitbangMaster::new(
            DdcLines::new(&mut self.bus),
            &mut self.delay,
            self.config.timing,
        )
    }

    /// Fetches and validates one EDID block from the configured source.
    ///
    /// `Ok(None)` means the source has no such block (the built-in EDID
    /// carries no extensions); bus and validation failures are errors.
    pub fn read_edid(&mut self, block: u8) -> Result<Option<[u8; EDID_BLOCK_SIZE]>, DcError> {
        let bytes = match self.config.edid_source {
            EdidSource::Ddc => self.ddc_master().read_edid_block(block)?,
            EdidSource::BuiltIn => {
                if block != 0 {
                    return Ok(None);
                }
                qogir_edid::FALLBACK_EDID
            }
        };
        qogir_edid::validate_block(&bytes, block)?;
        Ok(Some(bytes))
    }

    /// Detailed timings of the monitor's base EDID block, preferred first.
    ///
    /// A failed or invalid probe is not fatal: the monitor may simply be
    /// unplugged, so this logs and reports no modes.
    pub fn get_modes(&mut self) -> Vec<Mode> {
        let base = match self.read_edid(0) {
            Ok(Some(block)) => block,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(%err, "EDID probe failed; reporting no modes");
                return Vec::new();
            }
        };

        let mut modes = Vec::new();
        for timing in qogir_edid::parse_detailed_timings(&base) {
            if timing.interlaced {
                // The engine has no interlaced scanout.
                tracing::debug!(
                    h = timing.h_active,
                    v = timing.v_active,
                    "skipping interlaced timing"
                );
                continue;
            }
            modes.push(Mode::from_detailed_timing(&timing));
        }
        modes
    }

    /// Whether the engine can scan this mode out: at least the cursor tile,
    /// at most the panel limit.
    pub fn mode_valid(&self, mode: &Mode) -> bool {
        let (w, h) = (u32::from(mode.hdisplay), u32::from(mode.vdisplay));
        w >= map::CURSOR_WIDTH
            && h >= map::CURSOR_HEIGHT
            && w <= map::DISPLAY_WIDTH
            && h <= map::DISPLAY_HEIGHT
    }
}
