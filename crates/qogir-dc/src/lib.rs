//! GXMicro Qogir display controller driver core.
//!
//! [`DcDevice`] programs the SoC's display engine over a [`RegisterBus`]:
//! reset sequencing, mode setting, framebuffer scanout, the hardware cursor
//! plane, and monitor identification over a bit-banged DDC bus on two GPIO
//! pins. The display engine's registers cannot be read back mid-frame, so
//! the device keeps a software shadow of the control word and every store
//! composes the full register value.
//!
//! Buffer allocation and pinning stay with the host behind [`VramManager`];
//! the device only ever sees opaque handles and resolved device addresses.
//!
//! [`RegisterBus`]: qogir_regs::RegisterBus

#![forbid(unsafe_code)]

mod device;
mod error;
mod gpio;
mod mode;
mod vram;

pub mod encoder;
pub mod pmu;

pub use device::{DcConfig, DcDevice, EdidSource};
pub use error::{ConfigError, DcError, HardwareError};
pub use gpio::DdcLines;
pub use mode::{Mode, ModeFlags, PixelFormat, Surface};
pub use pmu::{DisplayResetQuirk, Domain};
pub use vram::{BufferId, VramError, VramManager};
