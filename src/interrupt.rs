//! DMA interrupt classification
//!
//! Both controllers latch their own flag layouts. The dispatcher converts
//! them into a [`Status`] before calling a stream's [`StreamHandler`], so
//! handlers don't care which controller serves them.

use core::{
    fmt::{self, Debug},
    ops::{BitAnd, BitOr},
};

use crate::ral::{dma, edma};

/// Flags latched by one stream
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Status(u32);

impl Status {
    /// The remaining count reached zero
    pub const TRANSFER_COMPLETE: Self = Status(1 << 0);
    /// The remaining count reached half the transfer size
    pub const HALF_TRANSFER: Self = Status(1 << 1);
    /// A bus error stopped the stream
    pub const TRANSFER_ERROR: Self = Status(1 << 2);
    /// EDMA direct mode error
    pub const DIRECT_MODE_ERROR: Self = Status(1 << 3);
    /// EDMA FIFO error
    pub const FIFO_ERROR: Self = Status(1 << 4);

    /// No flags
    pub const fn empty() -> Self {
        Status(0)
    }

    /// Returns the normalized bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if no flags are set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every flag in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if the stream stopped on an error
    ///
    /// FIFO errors are not fatal to a transfer, and don't count.
    pub const fn is_error(self) -> bool {
        self.0 & (Self::TRANSFER_ERROR.0 | Self::DIRECT_MODE_ERROR.0) != 0
    }

    /// Reduce the flags to the single event they report
    ///
    /// An error hides any completion latched with it. Completion hides a
    /// half transfer.
    pub const fn event(self) -> Option<Event> {
        if self.is_error() {
            Some(Event::Error)
        } else if self.contains(Self::TRANSFER_COMPLETE) {
            Some(Event::Complete)
        } else if self.contains(Self::HALF_TRANSFER) {
            Some(Event::HalfComplete)
        } else {
            None
        }
    }

    pub(crate) const fn from_dma(raw: u32) -> Self {
        let mut bits = 0;
        if raw & dma::RegisterBlock::TCIF != 0 {
            bits |= Self::TRANSFER_COMPLETE.0;
        }
        if raw & dma::RegisterBlock::HTIF != 0 {
            bits |= Self::HALF_TRANSFER.0;
        }
        if raw & dma::RegisterBlock::TEIF != 0 {
            bits |= Self::TRANSFER_ERROR.0;
        }
        Status(bits)
    }

    pub(crate) const fn from_edma(raw: u32) -> Self {
        let mut bits = 0;
        if raw & edma::RegisterBlock::TCIF != 0 {
            bits |= Self::TRANSFER_COMPLETE.0;
        }
        if raw & edma::RegisterBlock::HTIF != 0 {
            bits |= Self::HALF_TRANSFER.0;
        }
        if raw & edma::RegisterBlock::TEIF != 0 {
            bits |= Self::TRANSFER_ERROR.0;
        }
        if raw & edma::RegisterBlock::DMEIF != 0 {
            bits |= Self::DIRECT_MODE_ERROR.0;
        }
        if raw & edma::RegisterBlock::FEIF != 0 {
            bits |= Self::FIFO_ERROR.0;
        }
        Status(bits)
    }
}

impl BitOr for Status {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Status(self.0 | rhs.0)
    }
}

impl BitAnd for Status {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Status(self.0 & rhs.0)
    }
}

impl Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Status, &str); 5] = [
            (Status::TRANSFER_COMPLETE, "TC"),
            (Status::HALF_TRANSFER, "HT"),
            (Status::TRANSFER_ERROR, "TE"),
            (Status::DIRECT_MODE_ERROR, "DME"),
            (Status::FIFO_ERROR, "FE"),
        ];
        write!(f, "Status(")?;
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

/// The event behind a stream interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Error,
    Complete,
    HalfComplete,
}

/// Receives interrupts for one allocated stream
///
/// The dispatcher calls the handler from the stream's interrupt, after it
/// clears the latched flags. Handlers must not block.
pub trait StreamHandler: Sync {
    fn on_dma_interrupt(&self, status: Status);
}

impl<F> StreamHandler for F
where
    F: Fn(Status) + Sync,
{
    fn on_dma_interrupt(&self, status: Status) {
        (self)(status)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::format;

    #[test]
    fn error_wins_over_completion() {
        let status = Status::TRANSFER_COMPLETE | Status::HALF_TRANSFER | Status::TRANSFER_ERROR;
        assert_eq!(status.event(), Some(Event::Error));
        assert_eq!(Status::DIRECT_MODE_ERROR.event(), Some(Event::Error));
    }

    #[test]
    fn completion_wins_over_half() {
        let status = Status::TRANSFER_COMPLETE | Status::HALF_TRANSFER;
        assert_eq!(status.event(), Some(Event::Complete));
        assert_eq!(Status::HALF_TRANSFER.event(), Some(Event::HalfComplete));
    }

    #[test]
    fn fifo_errors_are_not_events() {
        assert!(!Status::FIFO_ERROR.is_error());
        assert_eq!(Status::FIFO_ERROR.event(), None);
        assert_eq!(Status::empty().event(), None);
    }

    #[test]
    fn dma_flags() {
        // GIF | TCIF | TEIF
        let status = Status::from_dma(0b1011);
        assert_eq!(status, Status::TRANSFER_COMPLETE | Status::TRANSFER_ERROR);
    }

    #[test]
    fn edma_flags() {
        assert_eq!(Status::from_edma(0x20), Status::TRANSFER_COMPLETE);
        assert_eq!(Status::from_edma(0x10), Status::HALF_TRANSFER);
        assert_eq!(
            Status::from_edma(0x0D),
            Status::TRANSFER_ERROR | Status::DIRECT_MODE_ERROR | Status::FIFO_ERROR
        );
    }

    #[test]
    fn debug_lists_flags() {
        let status = Status::TRANSFER_COMPLETE | Status::FIFO_ERROR;
        assert_eq!(format!("{status:?}"), "Status(TC | FE)");
        assert_eq!(format!("{:?}", Status::empty()), "Status()");
    }
}
