//! Qogir register map and field-packing helpers.
//!
//! Offsets are byte offsets into the device MMIO window. The display engine
//! (`DC_*`) registers cannot be read back mid-frame, so every word written
//! there is composed in full by the helpers in this module; there are no
//! read-modify-write encodings for that range. PMU and GPIO registers are
//! shared words and *are* updated by read-modify-write.

/// Start of device memory on the SoC bus. Framebuffer and cursor addresses
/// programmed into the controller are offsets from this base.
pub const FB_CUR_BASE: u32 = 0x8000_0000;

/// Bus address of a device-memory offset, for diagnostics.
pub const fn fb_cur_offset(offset: u32) -> u64 {
    FB_CUR_BASE as u64 + offset as u64
}

// PMU (reset and clock unit).

pub const PMU_BASE: u32 = 0x006b_0000;

/// CPU core soft-reset control.
pub const PMU_RCU_CPU_RSTR: u32 = PMU_BASE + 0x34;
/// AHB peripheral reset control, one bit per domain, active low.
pub const PMU_RCU_AHB_RSTR: u32 = PMU_BASE + 0x38;
/// AHB peripheral clock enable, same bit assignment as the reset register.
pub const PMU_RCU_AHB_ENR: u32 = PMU_BASE + 0x3c;

/// CPU core 0 soft-reset bit in `PMU_RCU_CPU_RSTR`.
pub const CPU0_SW: u32 = 1 << 0;

/// Ethernet MAC domain bit in the AHB reset/enable pair.
pub const RCU_GMAC: u32 = 1 << 4;
/// Display controller domain bit in the AHB reset/enable pair.
pub const RCU_DC: u32 = 1 << 2;
/// DDR controller domain bit in the AHB reset/enable pair.
pub const RCU_DDR: u32 = 1 << 0;

// GPIO controller. Ports A-D carry data/direction/control registers at a
// 0x0c stride; the EXT_PORT* registers read back the actual pin levels.

pub const GPIOA_BASE: u32 = 0x0064_0000;

pub const GPIO_PORTA_DR: u32 = GPIOA_BASE + 0x00;
pub const GPIO_PORTA_DDR: u32 = GPIOA_BASE + 0x04;
pub const GPIO_PORTA_CTRL: u32 = GPIOA_BASE + 0x08;
pub const GPIO_PORTB_DR: u32 = GPIOA_BASE + 0x0c;
pub const GPIO_PORTB_DDR: u32 = GPIOA_BASE + 0x10;
pub const GPIO_PORTB_CTRL: u32 = GPIOA_BASE + 0x14;
pub const GPIO_PORTC_DR: u32 = GPIOA_BASE + 0x18;
pub const GPIO_PORTC_DDR: u32 = GPIOA_BASE + 0x1c;
pub const GPIO_PORTC_CTRL: u32 = GPIOA_BASE + 0x20;
pub const GPIO_PORTD_DR: u32 = GPIOA_BASE + 0x24;
pub const GPIO_PORTD_DDR: u32 = GPIOA_BASE + 0x28;
pub const GPIO_PORTD_CTRL: u32 = GPIOA_BASE + 0x2c;
pub const GPIO_EXT_PORTA: u32 = GPIOA_BASE + 0x50;
pub const GPIO_EXT_PORTB: u32 = GPIOA_BASE + 0x54;
pub const GPIO_EXT_PORTC: u32 = GPIOA_BASE + 0x58;
pub const GPIO_EXT_PORTD: u32 = GPIOA_BASE + 0x5c;

/// DDC clock line: GPIO94, bit 30 of port C.
pub const DDC_SCL_PIN: u32 = 30;
/// DDC data line: GPIO95, bit 31 of port C.
pub const DDC_SDA_PIN: u32 = 31;

// Display controller. Registers in this range are only readable after a
// complete frame; the driver composes full words and never reads them.

pub const DC_BASE: u32 = 0x01d4_0000;

/// Maximum scanout width in pixels.
pub const DISPLAY_WIDTH: u32 = 1920;
/// Maximum scanout height in lines.
pub const DISPLAY_HEIGHT: u32 = 1080;
/// Hardware cursor width in pixels.
pub const CURSOR_WIDTH: u32 = 32;
/// Hardware cursor height in lines.
pub const CURSOR_HEIGHT: u32 = 32;
/// Cursor image size: 32 x 32 ARGB8888, exactly one page.
pub const CURSOR_BYTES: usize = 4096;

/// Framebuffer control word; the driver keeps a software shadow of it.
pub const DC_CTRL: u32 = DC_BASE + 0x1240;
/// Primary scanout base address (device-memory offset).
pub const DC_ADDR0: u32 = DC_BASE + 0x1260;
/// Secondary scanout base address; present but unprogrammed.
pub const DC_ADDR1: u32 = DC_BASE + 0x1580;
/// Scanout line pitch in bytes.
pub const DC_STRIDE: u32 = DC_BASE + 0x1280;
/// Pixel offset of the first displayed pixel within a line.
pub const DC_ORIGIN: u32 = DC_BASE + 0x12a0;
/// Panel interface strap word.
pub const DC_PANEL_CONF: u32 = DC_BASE + 0x13c0;
/// Panel power-sequencing timing; left at hardware defaults.
pub const DC_PANEL_TIMING: u32 = DC_BASE + 0x13e0;
/// Horizontal active-end/total, packed by [`hv_display`].
pub const DC_HDISPLAY: u32 = DC_BASE + 0x1400;
/// Horizontal sync pulse, packed by [`hv_sync`].
pub const DC_HSYNC: u32 = DC_BASE + 0x1420;
/// Vertical active-end/total, packed by [`hv_display`].
pub const DC_VDISPLAY: u32 = DC_BASE + 0x1480;
/// Vertical sync pulse, packed by [`hv_sync`].
pub const DC_VSYNC: u32 = DC_BASE + 0x14a0;

/// Cursor control word, packed by [`cursor_control`].
pub const DC_CURSOR_CTRL: u32 = DC_BASE + 0x1520;
/// Cursor image base address (device-memory offset).
pub const DC_CURSOR_ADDR: u32 = DC_BASE + 0x1530;
/// Cursor position, packed by [`cursor_location`].
pub const DC_CURSOR_LOCATION: u32 = DC_BASE + 0x1540;
/// Cursor background color for the 2bpp monochrome format (unused in ARGB).
pub const DC_CURSOR_BACKGROUND: u32 = DC_BASE + 0x1550;
/// Cursor foreground color for the 2bpp monochrome format (unused in ARGB).
pub const DC_CURSOR_FOREGROUND: u32 = DC_BASE + 0x1560;

/// Interrupt status. Documented for completeness; the driver runs polled.
pub const DC_INT: u32 = DC_BASE + 0x1600;
/// Interrupt enable. Documented for completeness; the driver runs polled.
pub const DC_INT_ENABLE: u32 = DC_BASE + 0x1610;

// DC_CTRL fields.

/// Held set while the controller runs; the official programming sequence
/// raises it together with [`DC_CTRL_OUTPUT_ENABLE`].
pub const DC_CTRL_RESET: u32 = 1 << 20;
/// Gamma lookup enable. The table registers are untested on this silicon and
/// the driver leaves the bit clear.
pub const DC_CTRL_GAMMA_ENABLE: u32 = 1 << 12;
/// Routes scanout to the second panel interface.
pub const DC_CTRL_SWITCH_PANEL: u32 = 1 << 9;
/// Scanout output enable.
pub const DC_CTRL_OUTPUT_ENABLE: u32 = 1 << 8;

/// Mask of the 3-bit framebuffer format field in `DC_CTRL`.
pub const DC_FB_FORMAT: u32 = 0b111;
pub const DC_RGB888: u32 = 0b100;
pub const DC_RGB565: u32 = 0b011;
pub const DC_RGB555: u32 = 0b010;
pub const DC_RGB444: u32 = 0b001;

/// The enable pair written on power transitions.
pub const DC_ENABLE: u32 = DC_CTRL_RESET | DC_CTRL_OUTPUT_ENABLE;

// Panel configuration fields.

/// Hardware-driven panel power sequencing.
pub const PANEL_HWSEQ: u32 = 1 << 31;
pub const PANEL_CLOCK_POLARITY: u32 = 1 << 9;
pub const PANEL_CLOCK: u32 = 1 << 8;
pub const PANEL_DATA_POLARITY: u32 = 1 << 5;
pub const PANEL_DE_POLARITY: u32 = 1 << 1;
pub const PANEL_DE: u32 = 1 << 0;

/// The fixed strap word programmed by every mode set.
pub const PANEL_CONF: u32 =
    PANEL_HWSEQ | PANEL_CLOCK_POLARITY | PANEL_CLOCK | PANEL_DE;

// HVDISPLAY / HVSYNC fields.

/// Sync pulse polarity: clear = positive, set = negative.
pub const HVSYNC_NEGATIVE: u32 = 1 << 31;
/// Sync pulse generation enable; always set by [`hv_sync`].
pub const HVSYNC_PULSE_ENABLE: u32 = 1 << 30;

/// `DC_HDISPLAY`/`DC_VDISPLAY` word: active end in pixels/lines (bits 11:0)
/// and total including blanking (bits 27:16), both 12-bit fields.
pub const fn hv_display(end: u16, total: u16) -> u32 {
    ((total as u32 & 0xfff) << 16) | (end as u32 & 0xfff)
}

/// `DC_HSYNC`/`DC_VSYNC` word: pulse start (bits 11:0), pulse end
/// (bits 27:16), pulse enable, and polarity.
pub const fn hv_sync(start: u16, end: u16, negative: bool) -> u32 {
    let word = HVSYNC_PULSE_ENABLE | ((end as u32 & 0xfff) << 16) | (start as u32 & 0xfff);
    if negative {
        word | HVSYNC_NEGATIVE
    } else {
        word
    }
}

// Cursor fields.

/// Cursor composited into framebuffer 1 instead of framebuffer 0.
pub const CURSOR_DISPLAY_FB1: u32 = 1 << 4;
/// 32-bit ARGB cursor format code in the 2-bit format field.
pub const CUR_ARGB8888: u32 = 1 << 1;
/// Control word that turns the cursor off.
pub const CUR_DISABLE: u32 = 0;

/// Cursor control word: 5-bit hot-spot coordinates (x in bits 20:16, y in
/// bits 12:8) plus the ARGB8888 format code.
///
/// The hardware only latches the hot-spot fields while the cursor is enabled,
/// so the format-enable code travels in the same word and the register is
/// never composed from a read-back.
pub const fn cursor_control(hot_x: i32, hot_y: i32) -> u32 {
    ((hot_x as u32 & 0x1f) << 16) | ((hot_y as u32 & 0x1f) << 8) | CUR_ARGB8888
}

/// Cursor location word: 11-bit x (bits 10:0) and y (bits 26:16).
///
/// The engine displays the image at the programmed location minus the
/// hot-spot, so the hot-spot is added back here and the user-visible anchor
/// lands where the caller asked.
pub const fn cursor_location(x: i32, hot_x: i32, y: i32, hot_y: i32) -> u32 {
    ((y.wrapping_add(hot_y) as u32 & 0x7ff) << 16) | (x.wrapping_add(hot_x) as u32 & 0x7ff)
}
