//! Enhanced DMA controller
//!
//! Streams 1-4 report through the first status and clear registers, streams
//! 5-8 through the second. Each stream owns a 6-bit group of flags at bit
//! 0, 6, 16 or 22.

use ral_registers::RWRegister;

#[repr(C)]
pub struct RegisterBlock {
    /// Low and high interrupt status (`STS1`, `STS2`)
    pub ISR: [RWRegister<u32>; 2],
    /// Low and high interrupt flag clear (`CLR1`, `CLR2`)
    pub IFCR: [RWRegister<u32>; 2],
    /// Stream registers
    pub ST: [StreamRegisterBlock; 8],
}

impl RegisterBlock {
    /// FIFO error flag
    pub const FEIF: u32 = 1 << 0;
    /// Direct mode error flag
    pub const DMEIF: u32 = 1 << 2;
    /// Transfer error flag
    pub const TEIF: u32 = 1 << 3;
    /// Half transfer flag
    pub const HTIF: u32 = 1 << 4;
    /// Transfer complete flag
    pub const TCIF: u32 = 1 << 5;
    /// The flags reported to a stream's handler
    pub const ISR_MASK: u32 = Self::FEIF | Self::DMEIF | Self::TEIF | Self::HTIF | Self::TCIF;
}

#[repr(C)]
pub struct StreamRegisterBlock {
    /// Stream configuration
    pub CR: RWRegister<u32>,
    /// Remaining data count
    pub NDTR: RWRegister<u32>,
    /// Peripheral address
    pub PAR: RWRegister<u32>,
    /// Memory 0 address
    pub M0AR: RWRegister<u32>,
    /// Memory 1 address, double buffer mode only
    pub M1AR: RWRegister<u32>,
    /// FIFO control
    pub FCR: RWRegister<u32>,
}

pub mod CR {
    fields! {
        EN @ 0 : 1;
        DMEIE @ 1 : 1;
        TEIE @ 2 : 1;
        HTIE @ 3 : 1;
        TCIE @ 4 : 1;
        PFCTRL @ 5 : 1;
        DIR @ 6 : 2 { PeripheralToMemory = 0, MemoryToPeripheral = 1, MemoryToMemory = 2 };
        CIRC @ 8 : 1;
        PINC @ 9 : 1;
        MINC @ 10 : 1;
        PSIZE @ 11 : 2 { Bits8 = 0, Bits16 = 1, Bits32 = 2 };
        MSIZE @ 13 : 2 { Bits8 = 0, Bits16 = 1, Bits32 = 2 };
        PINCOS @ 15 : 1;
        PL @ 16 : 2;
        DBM @ 18 : 1;
        CT @ 19 : 1;
        PBURST @ 21 : 2;
        MBURST @ 23 : 2;
        CHSEL @ 25 : 3;
    }
}

pub mod NDTR {
    fields! {
        NDT @ 0 : 16;
    }
}

pub mod FCR {
    fields! {
        FTH @ 0 : 2;
        DMDIS @ 2 : 1;
        FS @ 3 : 3;
        FEIE @ 7 : 1;
    }
}
