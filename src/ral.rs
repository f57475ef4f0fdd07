//! A RAL-like module to support DMA, DMAMUX and ADC register access
//!
//! Vendor register headers describe channel registers as flat lists of
//! `CCR1`, `CNDTR1`, `CCR2`... Here, channel and stream registers are
//! clusters, so a DMA unit is an array of channel register blocks. The
//! field modules follow the RAL layout (`REG::FIELD::{offset, mask, RW}`) so
//! that the `ral-registers` macros work on every block.

#![allow(
    non_snake_case, // Compatibility with RAL
    non_upper_case_globals, // RAL field constants
    dead_code, // Not every register is programmed
)]

/// Define RAL field modules for one register.
///
/// `NAME @ offset : width` produces `NAME::{offset, mask}`, plus the empty
/// `R` and `W` modules the macros import. Enumerated values land in `RW`.
macro_rules! fields {
    ($($field:ident @ $offset:literal : $width:literal $({ $($value:ident = $raw:literal),* $(,)? })?;)*) => {
        $(
            pub mod $field {
                pub const offset: u32 = $offset;
                pub const mask: u32 = ((1 << $width) - 1) << $offset;
                pub mod R {}
                pub mod W {}
                pub mod RW {
                    $($(pub const $value: u32 = $raw;)*)?
                }
            }
        )*
    };
}

pub mod adc;
pub mod dma;
pub mod dmamux;
pub mod edma;

pub use ral_registers::{modify_reg, read_reg, write_reg};

//
// Helper types for static memory
//
// Similar to the RAL's `Instance` type, but more copy.
//

pub(crate) struct Static<T>(pub(crate) *const T);
impl<T> core::ops::Deref for Static<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        // Safety: pointer points to static memory (peripheral memory)
        unsafe { &*self.0 }
    }
}
impl<T> Clone for Static<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Static<T> {}

impl<T> Static<T> {
    /// # Safety
    ///
    /// `address` must point at a register block of type `T` that lives for
    /// the rest of the program.
    pub(crate) const unsafe fn new(address: *const ()) -> Self {
        Static(address.cast())
    }
}

// Safety: register blocks are memory-mapped I/O. Every access is volatile,
// and every read-modify-write that can race with an interrupt happens inside
// a critical section.
unsafe impl<T> Send for Static<T> {}
unsafe impl<T> Sync for Static<T> {}
