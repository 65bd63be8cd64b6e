//! In-memory stand-in for the host video-memory allocator.

use std::collections::BTreeMap;

use qogir_dc::{BufferId, VramError, VramManager};
use qogir_regs::map;

struct TestBuf {
    addr: u32,
    data: Vec<u8>,
    pins: u32,
}

/// Bump allocator over the device aperture with counted pins and one-shot
/// failure injection. `device_address` really does demand a live pin, so a
/// driver that resolves before pinning fails here too.
#[derive(Default)]
pub struct TestVram {
    bufs: BTreeMap<u64, TestBuf>,
    next_id: u64,
    next_addr: u32,
    fail_alloc: bool,
    fail_pin: bool,
    fail_address: bool,
}

impl TestVram {
    pub fn new() -> Self {
        Self {
            next_addr: map::FB_CUR_BASE,
            ..Self::default()
        }
    }

    /// The next `alloc` reports the aperture as full.
    pub fn fail_next_alloc(&mut self) {
        self.fail_alloc = true;
    }

    /// The next `pin` fails as if residency could not be granted.
    pub fn fail_next_pin(&mut self) {
        self.fail_pin = true;
    }

    /// The next `device_address` fails as if the pin had been lost.
    pub fn fail_next_address(&mut self) {
        self.fail_address = true;
    }

    pub fn buffer_count(&self) -> usize {
        self.bufs.len()
    }

    pub fn pin_count(&self, buffer: BufferId) -> u32 {
        self.bufs.get(&buffer.0).map_or(0, |b| b.pins)
    }

    pub fn contents(&self, buffer: BufferId) -> &[u8] {
        self.bufs.get(&buffer.0).map_or(&[], |b| b.data.as_slice())
    }

    /// Address a buffer would resolve to, without the pin requirement.
    pub fn address_of(&self, buffer: BufferId) -> u32 {
        self.bufs.get(&buffer.0).map_or(0, |b| b.addr)
    }
}

impl VramManager for TestVram {
    fn alloc(&mut self, len: usize, align: usize) -> Result<BufferId, VramError> {
        if std::mem::take(&mut self.fail_alloc) {
            return Err(VramError::OutOfMemory);
        }
        let align = align.max(1) as u32;
        let addr = self.next_addr.div_ceil(align) * align;
        self.next_addr = addr + len as u32;

        let id = self.next_id;
        self.next_id += 1;
        self.bufs.insert(
            id,
            TestBuf {
                addr,
                data: vec![0; len],
                pins: 0,
            },
        );
        Ok(BufferId(id))
    }

    fn free(&mut self, buffer: BufferId) {
        self.bufs.remove(&buffer.0);
    }

    fn pin(&mut self, buffer: BufferId) -> Result<(), VramError> {
        if std::mem::take(&mut self.fail_pin) {
            return Err(VramError::OutOfMemory);
        }
        let buf = self.bufs.get_mut(&buffer.0).ok_or(VramError::InvalidHandle)?;
        buf.pins += 1;
        Ok(())
    }

    fn unpin(&mut self, buffer: BufferId) {
        if let Some(buf) = self.bufs.get_mut(&buffer.0) {
            buf.pins = buf.pins.saturating_sub(1);
        }
    }

    fn device_address(&mut self, buffer: BufferId) -> Result<u32, VramError> {
        if std::mem::take(&mut self.fail_address) {
            return Err(VramError::NotPinned);
        }
        let buf = self.bufs.get(&buffer.0).ok_or(VramError::InvalidHandle)?;
        if buf.pins == 0 {
            return Err(VramError::NotPinned);
        }
        Ok(buf.addr)
    }

    fn map_mut(&mut self, buffer: BufferId) -> Result<&mut [u8], VramError> {
        let buf = self.bufs.get_mut(&buffer.0).ok_or(VramError::InvalidHandle)?;
        Ok(&mut buf.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_aligned_and_disjoint() {
        let mut vram = TestVram::new();
        let a = vram.alloc(100, 64).unwrap();
        let b = vram.alloc(100, 64).unwrap();

        assert_eq!(vram.address_of(a) % 64, 0);
        assert_eq!(vram.address_of(b) % 64, 0);
        assert!(vram.address_of(b) >= vram.address_of(a) + 100);
    }

    #[test]
    fn pins_are_counted_not_boolean() {
        let mut vram = TestVram::new();
        let id = vram.alloc(16, 16).unwrap();
        vram.pin(id).unwrap();
        vram.pin(id).unwrap();
        vram.unpin(id);

        assert_eq!(vram.pin_count(id), 1);
        assert!(vram.device_address(id).is_ok());
    }

    #[test]
    fn device_address_requires_a_live_pin() {
        let mut vram = TestVram::new();
        let id = vram.alloc(16, 16).unwrap();

        assert_eq!(vram.device_address(id), Err(VramError::NotPinned));
        assert_eq!(
            vram.device_address(BufferId(99)),
            Err(VramError::InvalidHandle)
        );
    }

    #[test]
    fn injected_failures_fire_exactly_once() {
        let mut vram = TestVram::new();
        vram.fail_next_alloc();
        assert_eq!(vram.alloc(16, 16), Err(VramError::OutOfMemory));
        let id = vram.alloc(16, 16).unwrap();

        vram.fail_next_address();
        vram.pin(id).unwrap();
        assert_eq!(vram.device_address(id), Err(VramError::NotPinned));
        assert!(vram.device_address(id).is_ok());
    }

    #[test]
    fn map_mut_exposes_the_full_allocation() {
        let mut vram = TestVram::new();
        let id = vram.alloc(map::CURSOR_BYTES, map::CURSOR_BYTES).unwrap();

        let view = vram.map_mut(id).unwrap();
        assert_eq!(view.len(), map::CURSOR_BYTES);
        view[0] = 0xab;
        view[map::CURSOR_BYTES - 1] = 0xcd;

        assert_eq!(vram.contents(id)[0], 0xab);
        assert_eq!(vram.contents(id)[map::CURSOR_BYTES - 1], 0xcd);
    }
}
