//! DMA and ADC errors

use crate::interrupt::Status;

use core::{
    fmt::{self, Debug, Display},
    ops::BitOr,
};

/// A DMA error
///
/// Most variants describe allocation failures, which
/// [`Dma::allocate`](crate::Dma::allocate) treats as fatal. Use
/// [`Dma::try_allocate`](crate::Dma::try_allocate) to see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The stream stopped on an error, with these flags latched
    Transfer(Status),
    /// The registry has no stream with this identifier
    NoSuchStream(usize),
    /// The registry has no unit with this one-based number
    NoSuchUnit(usize),
    /// Another driver owns this stream
    Allocated(usize),
    /// Every candidate stream is taken
    Exhausted,
    /// Picking any stream needs a DMAMUX, and the unit has none
    NoMultiplexer,
    /// Interrupt priorities run from 0 to 3
    InvalidPriority(u8),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transfer(status) => write!(f, "DMA transfer failed: {status:?}"),
            Error::NoSuchStream(id) => write!(f, "DMA stream {id} does not exist"),
            Error::NoSuchUnit(unit) => write!(f, "DMA{unit} does not exist"),
            Error::Allocated(id) => write!(f, "DMA stream {id} already allocated"),
            Error::Exhausted => write!(f, "no free DMA stream"),
            Error::NoMultiplexer => write!(f, "DMA unit has no request multiplexer"),
            Error::InvalidPriority(prio) => write!(f, "DMA priority {prio} out of range"),
        }
    }
}

/// Errors reported to an ADC conversion group
///
/// More than one condition may be set at once. The wrapper implements both
/// `Debug` and `Display`.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct AdcError {
    bits: u8,
}

impl AdcError {
    /// The DMA stream stopped on a transfer or mode error
    pub const DMA_FAILURE: Self = AdcError { bits: 1 << 0 };
    /// A conversion finished before the DMA read the previous one
    pub const OVERFLOW: Self = AdcError { bits: 1 << 1 };
    /// A sample crossed the analog watchdog thresholds
    pub const WATCHDOG: Self = AdcError { bits: 1 << 2 };

    pub(crate) const fn empty() -> Self {
        AdcError { bits: 0 }
    }
    /// Returns the raw error bits
    pub const fn raw(self) -> u8 {
        self.bits
    }
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }
    /// Returns `true` if every condition in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }
}

impl BitOr for AdcError {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        AdcError {
            bits: self.bits | rhs.bits,
        }
    }
}

impl Debug for AdcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADC_ERR({:#04X})", self.bits)
    }
}

impl Display for AdcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ADC_ERR: DMA {dma} OVF {ovf} AWD {awd}",
            dma = self.contains(Self::DMA_FAILURE) as u8,
            ovf = self.contains(Self::OVERFLOW) as u8,
            awd = self.contains(Self::WATCHDOG) as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::format;

    #[test]
    fn adc_error_formats() {
        let err = AdcError::OVERFLOW | AdcError::WATCHDOG;
        assert_eq!(format!("{err:?}"), "ADC_ERR(0x06)");
        assert_eq!(format!("{err}"), "ADC_ERR: DMA 0 OVF 1 AWD 1");
        assert!(err.contains(AdcError::WATCHDOG));
        assert!(!err.contains(AdcError::DMA_FAILURE));
    }

    #[test]
    fn allocation_error_messages() {
        assert_eq!(
            format!("{}", Error::Allocated(3)),
            "DMA stream 3 already allocated"
        );
        assert_eq!(format!("{}", Error::NoSuchUnit(2)), "DMA2 does not exist");
    }
}
