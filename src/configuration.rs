//! Transfer configurations
//!
//! A [`Configuration`] describes a transfer without naming register bits.
//! Each controller kind packs it into its own mode word.

use crate::{element::Width, ral, registry::Kind};

/// Which way data moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Read the peripheral address, write the memory address
    PeripheralToMemory,
    /// Read the memory address, write the peripheral address
    MemoryToPeripheral,
    /// Read the peripheral address, write the memory address, without
    /// waiting for requests
    MemoryToMemory,
}

/// Stream arbitration priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Priority {
    Low = 0,
    Medium = 1,
    High = 2,
    VeryHigh = 3,
}

/// A transfer description
///
/// Start from [`Configuration::new`], then adjust the public fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub direction: Direction,
    /// Reload the count and addresses when the count reaches zero
    pub circular: bool,
    pub peripheral_width: Width,
    pub memory_width: Width,
    pub peripheral_increment: bool,
    pub memory_increment: bool,
    pub transfer_complete_interrupt: bool,
    pub half_transfer_interrupt: bool,
    pub transfer_error_interrupt: bool,
    /// EDMA only, ignored by the basic controller
    pub direct_mode_error_interrupt: bool,
    pub priority: Priority,
    /// Request line for units without a DMAMUX
    ///
    /// Basic controllers with a CSELR take four bits. EDMA streams take
    /// three.
    pub channel_select: u8,
}

impl Configuration {
    /// Byte-wide, non-incrementing, interrupt-free transfer
    pub const fn new(direction: Direction) -> Self {
        Configuration {
            direction,
            circular: false,
            peripheral_width: Width::Byte,
            memory_width: Width::Byte,
            peripheral_increment: false,
            memory_increment: false,
            transfer_complete_interrupt: false,
            half_transfer_interrupt: false,
            transfer_error_interrupt: false,
            direct_mode_error_interrupt: false,
            priority: Priority::Low,
            channel_select: 0,
        }
    }

    /// Pack into a mode word for `kind`
    pub const fn mode(&self, kind: Kind) -> u32 {
        match kind {
            Kind::Dma => self.dma_mode(),
            Kind::Edma => self.edma_mode(),
        }
    }

    const fn dma_mode(&self) -> u32 {
        use ral::dma::CCR;
        let (dir, m2m) = match self.direction {
            Direction::PeripheralToMemory => (CCR::DIR::RW::PeripheralToMemory, 0),
            Direction::MemoryToPeripheral => (CCR::DIR::RW::MemoryToPeripheral, 0),
            Direction::MemoryToMemory => (CCR::DIR::RW::PeripheralToMemory, 1),
        };
        dir << CCR::DIR::offset
            | m2m << CCR::MEM2MEM::offset
            | flag(self.circular) << CCR::CIRC::offset
            | flag(self.peripheral_increment) << CCR::PINC::offset
            | flag(self.memory_increment) << CCR::MINC::offset
            | self.peripheral_width.raw() << CCR::PSIZE::offset
            | self.memory_width.raw() << CCR::MSIZE::offset
            | (self.priority as u32) << CCR::PL::offset
            | flag(self.transfer_complete_interrupt) << CCR::TCIE::offset
            | flag(self.half_transfer_interrupt) << CCR::HTIE::offset
            | flag(self.transfer_error_interrupt) << CCR::TEIE::offset
            | ((self.channel_select as u32) << CCR::CHSEL::offset) & CCR::CHSEL::mask
    }

    const fn edma_mode(&self) -> u32 {
        use ral::edma::CR;
        let dir = match self.direction {
            Direction::PeripheralToMemory => CR::DIR::RW::PeripheralToMemory,
            Direction::MemoryToPeripheral => CR::DIR::RW::MemoryToPeripheral,
            Direction::MemoryToMemory => CR::DIR::RW::MemoryToMemory,
        };
        dir << CR::DIR::offset
            | flag(self.circular) << CR::CIRC::offset
            | flag(self.peripheral_increment) << CR::PINC::offset
            | flag(self.memory_increment) << CR::MINC::offset
            | self.peripheral_width.raw() << CR::PSIZE::offset
            | self.memory_width.raw() << CR::MSIZE::offset
            | (self.priority as u32) << CR::PL::offset
            | flag(self.transfer_complete_interrupt) << CR::TCIE::offset
            | flag(self.half_transfer_interrupt) << CR::HTIE::offset
            | flag(self.transfer_error_interrupt) << CR::TEIE::offset
            | flag(self.direct_mode_error_interrupt) << CR::DMEIE::offset
            | ((self.channel_select as u32) << CR::CHSEL::offset) & CR::CHSEL::mask
    }
}

const fn flag(set: bool) -> u32 {
    set as u32
}

/// Mode bits that must clear together when a stream stops
pub(crate) const fn disable_mask(kind: Kind) -> u32 {
    match kind {
        Kind::Dma => {
            use ral::dma::CCR;
            CCR::EN::mask | CCR::TCIE::mask | CCR::HTIE::mask | CCR::TEIE::mask
        }
        Kind::Edma => {
            use ral::edma::CR;
            CR::EN::mask | CR::TCIE::mask | CR::HTIE::mask | CR::TEIE::mask | CR::DMEIE::mask
        }
    }
}

/// The enable bit of a mode word
pub(crate) const fn enable_mask(kind: Kind) -> u32 {
    match kind {
        Kind::Dma => ral::dma::CCR::EN::mask,
        Kind::Edma => ral::edma::CR::EN::mask,
    }
}
