#![no_std]

//! Platform agnostic driver for the Fujitsu MB85RS family of SPI
//! ferroelectric memory (FRAM) chips, built on the `embedded-hal` traits.
//!
//! FRAM is byte addressable and has no pages or erase sectors, so the
//! whole array is exposed as one linear range of [`Address`]es. Writes
//! are gated by the chip's write-enable latch (WEL); every mutating
//! operation on [`FramDevice`] brackets itself with WREN/WRDI, so the
//! latch is false whenever control is outside this crate.

mod device;
mod status;

pub use device::*;
pub use status::*;

/// Byte offset into the chip's linear memory array.
pub type Address = u16;

/// Capacities in bytes of the 16-bit-addressed family members.
pub mod capacity {
    pub const MB85RS16: u32 = 2 * 1024;
    pub const MB85RS64: u32 = 8 * 1024;
    pub const MB85RS128: u32 = 16 * 1024;
    pub const MB85RS256: u32 = 32 * 1024;
    pub const MB85RS512: u32 = 64 * 1024;
}
