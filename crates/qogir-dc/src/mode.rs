//! Display modes, pixel formats and scanout surfaces.

use bitflags::bitflags;
use qogir_edid::DetailedTiming;
use qogir_regs::map;

bitflags! {
    /// Sync polarity flags; an absent flag means the positive polarity.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ModeFlags: u32 {
        const NHSYNC = 1 << 0;
        const NVSYNC = 1 << 1;
    }
}

/// A full display timing, in pixels/lines from the start of the active area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub clock_khz: u32,
    pub hdisplay: u16,
    pub hsync_start: u16,
    pub hsync_end: u16,
    pub htotal: u16,
    pub vdisplay: u16,
    pub vsync_start: u16,
    pub vsync_end: u16,
    pub vtotal: u16,
    pub flags: ModeFlags,
}

impl Mode {
    /// Vertical refresh rounded to the nearest hertz.
    pub fn refresh_hz(&self) -> u32 {
        let total = u64::from(self.htotal) * u64::from(self.vtotal);
        if total == 0 {
            return 0;
        }
        let clock_hz = u64::from(self.clock_khz) * 1000;
        ((clock_hz + total / 2) / total) as u32
    }

    /// Converts an EDID detailed timing descriptor.
    ///
    /// The derived sums saturate; parser-produced descriptors sit far below
    /// the `u16` limit, but the descriptor fields are public.
    pub fn from_detailed_timing(t: &DetailedTiming) -> Self {
        let mut flags = ModeFlags::empty();
        if !t.hsync_positive {
            flags |= ModeFlags::NHSYNC;
        }
        if !t.vsync_positive {
            flags |= ModeFlags::NVSYNC;
        }
        let hsync_start = t.h_active.saturating_add(t.h_sync_offset);
        let vsync_start = t.v_active.saturating_add(t.v_sync_offset);
        Self {
            clock_khz: t.pixel_clock_khz,
            hdisplay: t.h_active,
            hsync_start,
            hsync_end: hsync_start.saturating_add(t.h_sync_width),
            htotal: t.h_active.saturating_add(t.h_blank),
            vdisplay: t.v_active,
            vsync_start,
            vsync_end: vsync_start.saturating_add(t.v_sync_width),
            vtotal: t.v_active.saturating_add(t.v_blank),
            flags,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Argb8888,
    Xrgb8888,
    Rgb565,
    Rgb555,
    Rgb444,
}

impl PixelFormat {
    /// Hardware format code for the `DC_CTRL` format field. The engine has
    /// a single 32-bit code; the alpha channel is ignored on scanout.
    pub fn dc_format_bits(self) -> u32 {
        match self {
            PixelFormat::Argb8888 | PixelFormat::Xrgb8888 => map::DC_RGB888,
            PixelFormat::Rgb565 => map::DC_RGB565,
            PixelFormat::Rgb555 => map::DC_RGB555,
            PixelFormat::Rgb444 => map::DC_RGB444,
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Argb8888 | PixelFormat::Xrgb8888 => 4,
            PixelFormat::Rgb565 | PixelFormat::Rgb555 | PixelFormat::Rgb444 => 2,
        }
    }

    /// Whether the scanout path advertises this format. The 15- and 12-bit
    /// codes exist in the register field but are not exposed.
    pub fn scanout_supported(self) -> bool {
        matches!(
            self,
            PixelFormat::Argb8888 | PixelFormat::Xrgb8888 | PixelFormat::Rgb565
        )
    }
}

/// A host-built scanout configuration over a [`BufferId`].
///
/// [`BufferId`]: crate::BufferId
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub buffer: crate::BufferId,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub stride_bytes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn refresh_rounds_to_the_nearest_hertz() {
        assert_eq!(mode_1080p().refresh_hz(), 60);

        // 148.5 MHz over a slightly longer frame lands just under 60.
        let mut slow = mode_1080p();
        slow.vtotal = 1200;
        assert_eq!(slow.refresh_hz(), 56);
    }

    #[test]
    fn detailed_timing_conversion_rebuilds_sync_positions() {
        let t = DetailedTiming {
            pixel_clock_khz: 148_500,
            h_active: 1920,
            h_blank: 280,
            h_sync_offset: 88,
            h_sync_width: 44,
            v_active: 1080,
            v_blank: 45,
            v_sync_offset: 4,
            v_sync_width: 5,
            interlaced: false,
            hsync_positive: true,
            vsync_positive: false,
        };

        let mode = Mode::from_detailed_timing(&t);
        let mut expected = mode_1080p();
        expected.flags = ModeFlags::NVSYNC;
        assert_eq!(mode, expected);
    }

    #[test]
    fn oversized_descriptor_fields_saturate() {
        // Hand-built descriptor beyond anything the parser emits; the
        // derived positions clamp instead of wrapping.
        let t = DetailedTiming {
            pixel_clock_khz: 148_500,
            h_active: 65_000,
            h_blank: 2_000,
            h_sync_offset: 1_000,
            h_sync_width: 1_000,
            v_active: 65_000,
            v_blank: 2_000,
            v_sync_offset: 1_000,
            v_sync_width: 1_000,
            interlaced: false,
            hsync_positive: true,
            vsync_positive: true,
        };

        let mode = Mode::from_detailed_timing(&t);
        assert_eq!(mode.hsync_start, u16::MAX);
        assert_eq!(mode.hsync_end, u16::MAX);
        assert_eq!(mode.htotal, u16::MAX);
        assert_eq!(mode.vsync_end, u16::MAX);
        assert_eq!(mode.vtotal, u16::MAX);
    }

    #[test]
    fn formats_map_to_their_hardware_codes() {
        assert_eq!(PixelFormat::Argb8888.dc_format_bits(), map::DC_RGB888);
        assert_eq!(PixelFormat::Xrgb8888.dc_format_bits(), map::DC_RGB888);
        assert_eq!(PixelFormat::Rgb565.dc_format_bits(), map::DC_RGB565);

        assert!(PixelFormat::Rgb565.scanout_supported());
        assert!(!PixelFormat::Rgb555.scanout_supported());
        assert!(!PixelFormat::Rgb444.scanout_supported());
    }
}
