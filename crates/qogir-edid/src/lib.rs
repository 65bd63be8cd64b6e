//! EDID block validation and detailed-timing extraction.
//!
//! Only the parts of EDID 1.4 the display controller needs: block
//! validation, the extension count, and the four detailed timing
//! descriptors of the base block. Everything else (standard timings,
//! color data, CEA extensions) is ignored.

#![forbid(unsafe_code)]

/// Bytes per EDID block.
pub const EDID_BLOCK_SIZE: usize = 128;

/// Fixed eight-byte preamble of a base block.
pub const EDID_HEADER: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];

const DTD_OFFSET: usize = 54;
const DTD_LEN: usize = 18;
const DTD_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EdidError {
    #[error("EDID base block header mismatch")]
    BadHeader,
    #[error("EDID block checksum remainder {sum:#04x}")]
    BadChecksum { sum: u8 },
}

/// Checks a block's integrity.
///
/// Every block must sum to zero modulo 256; only the base block (index 0)
/// additionally carries the fixed header.
pub fn validate_block(block: &[u8; EDID_BLOCK_SIZE], index: u8) -> Result<(), EdidError> {
    if index == 0 && block[..8] != EDID_HEADER {
        return Err(EdidError::BadHeader);
    }
    let sum = block.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        return Err(EdidError::BadChecksum { sum });
    }
    Ok(())
}

/// Number of extension blocks the base block advertises.
pub fn extension_count(base: &[u8; EDID_BLOCK_SIZE]) -> u8 {
    base[126]
}

/// Rewrites the final byte so the block sums to zero.
pub fn fill_checksum(block: &mut [u8; EDID_BLOCK_SIZE]) {
    let sum = block[..EDID_BLOCK_SIZE - 1]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    block[EDID_BLOCK_SIZE - 1] = 0u8.wrapping_sub(sum);
}

/// One decoded detailed timing descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailedTiming {
    pub pixel_clock_khz: u32,
    pub h_active: u16,
    pub h_blank: u16,
    pub h_sync_offset: u16,
    pub h_sync_width: u16,
    pub v_active: u16,
    pub v_blank: u16,
    pub v_sync_offset: u16,
    pub v_sync_width: u16,
    pub interlaced: bool,
    pub hsync_positive: bool,
    pub vsync_positive: bool,
}

impl DetailedTiming {
    pub fn h_total(&self) -> u32 {
        u32::from(self.h_active) + u32::from(self.h_blank)
    }

    pub fn v_total(&self) -> u32 {
        u32::from(self.v_active) + u32::from(self.v_blank)
    }

    /// Vertical refresh rounded to the nearest hertz.
    pub fn refresh_hz(&self) -> u32 {
        let total = self.h_total() as u64 * self.v_total() as u64;
        if total == 0 {
            return 0;
        }
        let clock_hz = u64::from(self.pixel_clock_khz) * 1000;
        ((clock_hz + total / 2) / total) as u32
    }
}

/// Decodes the base block's timing descriptors in preference order.
///
/// Slots whose pixel clock field is zero are display descriptors (name,
/// range limits, ...) rather than timings and are skipped.
pub fn parse_detailed_timings(block: &[u8; EDID_BLOCK_SIZE]) -> Vec<DetailedTiming> {
    let mut timings = Vec::new();
    for slot in 0..DTD_COUNT {
        let start = DTD_OFFSET + slot * DTD_LEN;
        if let Some(timing) = parse_dtd(&block[start..start + DTD_LEN]) {
            timings.push(timing);
        }
    }
    timings
}

fn parse_dtd(b: &[u8]) -> Option<DetailedTiming> {
    let pixel_clock_10khz = u16::from_le_bytes([b[0], b[1]]);
    if pixel_clock_10khz == 0 {
        return None;
    }
    Some(DetailedTiming {
        pixel_clock_khz: u32::from(pixel_clock_10khz) * 10,
        h_active: u16::from(b[2]) | (u16::from(b[4] & 0xf0) << 4),
        h_blank: u16::from(b[3]) | (u16::from(b[4] & 0x0f) << 8),
        v_active: u16::from(b[5]) | (u16::from(b[7] & 0xf0) << 4),
        v_blank: u16::from(b[6]) | (u16::from(b[7] & 0x0f) << 8),
        h_sync_offset: u16::from(b[8]) | (u16::from(b[11] & 0xc0) << 2),
        h_sync_width: u16::from(b[9]) | (u16::from(b[11] & 0x30) << 4),
        v_sync_offset: u16::from(b[10] >> 4) | (u16::from(b[11] & 0x0c) << 2),
        v_sync_width: u16::from(b[10] & 0x0f) | (u16::from(b[11] & 0x03) << 4),
        interlaced: b[17] & 0x80 != 0,
        hsync_positive: b[17] & 0x02 != 0,
        vsync_positive: b[17] & 0x04 != 0,
    })
}

/// Built-in EDID served when DDC yields nothing usable: a generic
/// 1920x1080@60 panel with the canonical 148.5 MHz CEA timing as its
/// preferred (and only) detailed mode.
pub const FALLBACK_EDID: [u8; EDID_BLOCK_SIZE] = [
    0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00, // header
    0x1f, 0x0d, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, // "GXM", product 1, serial 0
    0x00, 0x1e, 0x01, 0x04, 0xa1, 0x3c, 0x22, 0x78, // 2020, EDID 1.4, digital 8bpc
    0x06, 0xee, 0x91, 0xa3, 0x54, 0x4c, 0x99, 0x26, // features + sRGB chromaticity
    0x0f, 0x50, 0x54, 0x00, 0x00, 0x00, 0x01, 0x01, // no established timings
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, // standard timings unused
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x3a, // DTD1: 1920x1080@60
    0x80, 0x18, 0x71, 0x38, 0x2d, 0x40, 0x58, 0x2c, //
    0x45, 0x00, 0x56, 0x50, 0x21, 0x00, 0x00, 0x1e, //
    0x00, 0x00, 0x00, 0xfc, 0x00, 0x51, 0x6f, 0x67, // name: "Qogir DC"
    0x69, 0x72, 0x20, 0x44, 0x43, 0x0a, 0x20, 0x20, //
    0x20, 0x20, 0x00, 0x00, 0x00, 0xfd, 0x00, 0x32, // range limits: 50-76 Hz,
    0x4c, 0x1e, 0x53, 0x0f, 0x00, 0x0a, 0x20, 0x20, // 30-83 kHz, 150 MHz
    0x20, 0x20, 0x20, 0x20, 0x00, 0x00, 0x00, 0x10, // dummy descriptor
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x59, // no extensions, checksum
];
