use crate::RegisterBus;

/// [`RegisterBus`] over a mapped device MMIO window.
///
/// All accesses are 32-bit volatile reads/writes at 4-byte-aligned offsets.
pub struct MmioWindow {
    base: *mut u32,
    len_bytes: usize,
}

// The window is the exclusive owner of its mapping (see `new`), so moving it
// to another thread moves the only handle.
unsafe impl Send for MmioWindow {}

impl MmioWindow {
    /// Wraps a mapped register window.
    ///
    /// # Safety
    ///
    /// `base` must point to a live device mapping of at least `len_bytes`
    /// bytes that remains valid for the lifetime of the returned window, and
    /// no other code may access that region while the window exists.
    pub unsafe fn new(base: *mut u32, len_bytes: usize) -> Self {
        Self { base, len_bytes }
    }

    /// Size of the window in bytes.
    pub fn len_bytes(&self) -> usize {
        self.len_bytes
    }

    fn reg_ptr(&self, offset: u32) -> *mut u32 {
        let offset = offset as usize;
        debug_assert!(offset % 4 == 0, "unaligned register offset {offset:#x}");
        debug_assert!(
            offset + 4 <= self.len_bytes,
            "register offset {offset:#x} outside {len:#x}-byte window",
            len = self.len_bytes,
        );
        // In-bounds per the `new` contract plus the assertions above.
        unsafe { self.base.cast::<u8>().add(offset).cast::<u32>() }
    }
}

impl RegisterBus for MmioWindow {
    fn read32(&mut self, offset: u32) -> u32 {
        // Volatile: device registers change underneath us and reads can have
        // side effects.
        unsafe { self.reg_ptr(offset).read_volatile() }
    }

    fn write32(&mut self, offset: u32, value: u32) {
        unsafe { self.reg_ptr(offset).write_volatile(value) }
    }
}
