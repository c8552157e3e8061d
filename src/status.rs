use modular_bitfield::prelude::*;

/// Chip status register.
///
/// Bit 0 and bits 4..=6 read as zero on the MB85RS. The WEL flag is
/// hardware owned: set by WREN, cleared by WRDI, and stripped from any
/// value passed to `FramDevice::write_status`.
#[bitfield]
#[derive(Default, Debug, Clone, Copy)]
pub struct Status {
    #[skip]
    __: B1,
    pub write_enable_latch: bool,
    pub block_protect: B2,
    #[skip]
    __: B3,
    pub write_protect_enable: bool,
}
