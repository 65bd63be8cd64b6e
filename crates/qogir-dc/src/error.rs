use thiserror::Error;

use crate::{PixelFormat, VramError};

/// Register-programming failures. The register primitives themselves never
/// fail; everything here originates from the VRAM collaborator or from an
/// unprogrammable request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    #[error("pixel format {0:?} is not scanout-capable")]
    UnsupportedFormat(PixelFormat),
    #[error("pinning the buffer failed")]
    PinFailed(#[source] VramError),
    #[error("resolving the buffer's device address failed")]
    AddressResolutionFailed(#[source] VramError),
    #[error("mapping the cursor buffer failed")]
    MapFailed(#[source] VramError),
}

/// Operations issued in a state that cannot accept them.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a cursor buffer is already attached")]
    AlreadyAttached,
    #[error("no cursor buffer attached")]
    NotAttached,
    #[error("no scanout mode and surface bound")]
    NotBound,
}

/// Umbrella error for the fallible device entry points.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DcError {
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    I2c(#[from] qogir_i2c::I2cError),
    #[error(transparent)]
    Edid(#[from] qogir_edid::EdidError),
}
