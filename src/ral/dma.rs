//! Basic DMA controller
//!
//! One status and one clear register serve every channel. Each channel owns
//! a 4-bit group of flags at bit `4 * channel`.

use ral_registers::RWRegister;

#[repr(C)]
pub struct RegisterBlock {
    /// Interrupt status (`STS`)
    pub ISR: RWRegister<u32>,
    /// Interrupt flag clear (`CLR`)
    pub IFCR: RWRegister<u32>,
    /// Channel registers
    pub CH: [ChannelRegisterBlock; 8],
    /// Channel request selection, only on CSELR variants
    pub CSELR: RWRegister<u32>,
}

impl RegisterBlock {
    /// Global interrupt flag
    pub const GIF: u32 = 1 << 0;
    /// Transfer complete flag
    pub const TCIF: u32 = 1 << 1;
    /// Half transfer flag
    pub const HTIF: u32 = 1 << 2;
    /// Transfer error flag
    pub const TEIF: u32 = 1 << 3;
    /// The flags reported to a stream's handler
    pub const ISR_MASK: u32 = Self::TCIF | Self::HTIF | Self::TEIF;
}

#[repr(C)]
pub struct ChannelRegisterBlock {
    /// Channel configuration (`CTRL`)
    pub CCR: RWRegister<u32>,
    /// Remaining data count (`DTCNT`)
    pub CNDTR: RWRegister<u32>,
    /// Peripheral address (`PADDR`)
    pub CPAR: RWRegister<u32>,
    /// Memory address (`MADDR`)
    pub CMAR: RWRegister<u32>,
    _reserved: u32,
}

pub mod CCR {
    fields! {
        EN @ 0 : 1;
        TCIE @ 1 : 1;
        HTIE @ 2 : 1;
        TEIE @ 3 : 1;
        DIR @ 4 : 1 { PeripheralToMemory = 0, MemoryToPeripheral = 1 };
        CIRC @ 5 : 1;
        PINC @ 6 : 1;
        MINC @ 7 : 1;
        PSIZE @ 8 : 2 { Bits8 = 0, Bits16 = 1, Bits32 = 2 };
        MSIZE @ 10 : 2 { Bits8 = 0, Bits16 = 1, Bits32 = 2 };
        PL @ 12 : 2;
        MEM2MEM @ 14 : 1;
        CHSEL @ 16 : 4;
    }
}

pub mod CNDTR {
    fields! {
        NDT @ 0 : 16;
    }
}
