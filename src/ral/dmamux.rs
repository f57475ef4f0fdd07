//! DMA request multiplexer
//!
//! Each DMA unit with a multiplexer carries one of these blocks, 0x100 past
//! the unit's base address. The table select bit routes requests through the
//! `MUXC` registers instead of the fixed wiring.

use ral_registers::RWRegister;

/// Request selection registers per multiplexer
pub const CHANNELS: usize = 7;

#[repr(C)]
pub struct RegisterBlock {
    /// Multiplexer table select
    pub MUXSEL: RWRegister<u32>,
    /// Per-channel request selection
    pub CHANNEL: [ChannelRegisterBlock; CHANNELS],
    /// Request generators
    pub MUXG: [RWRegister<u32>; 4],
    /// Synchronization overrun status
    pub MUXSYNCSTS: RWRegister<u32>,
    /// Synchronization overrun clear
    pub MUXSYNCCLR: RWRegister<u32>,
    /// Generator overrun status
    pub MUXGSTS: RWRegister<u32>,
    /// Generator overrun clear
    pub MUXGCLR: RWRegister<u32>,
}

#[repr(C)]
pub struct ChannelRegisterBlock {
    pub MUXC: RWRegister<u32>,
}

pub mod MUXSEL {
    fields! {
        TBLSEL @ 0 : 1;
    }
}

pub mod MUXC {
    fields! {
        REQSEL @ 0 : 7;
        SYNCOVIE @ 8 : 1;
        EVTGEN @ 9 : 1;
        SYNCEN @ 16 : 1;
        SYNCPOL @ 17 : 2;
        REQCNT @ 19 : 5;
        SYNCSEL @ 24 : 5;
    }
}
