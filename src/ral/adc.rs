//! Analog to digital converter

use ral_registers::RWRegister;

#[repr(C)]
pub struct RegisterBlock {
    pub STS: RWRegister<u32>,
    pub CTRL1: RWRegister<u32>,
    pub CTRL2: RWRegister<u32>,
    pub SPT1: RWRegister<u32>,
    pub SPT2: RWRegister<u32>,
    pub PCDTO1: RWRegister<u32>,
    pub PCDTO2: RWRegister<u32>,
    pub PCDTO3: RWRegister<u32>,
    pub PCDTO4: RWRegister<u32>,
    pub VMHB: RWRegister<u32>,
    pub VMLB: RWRegister<u32>,
    pub OSQ1: RWRegister<u32>,
    pub OSQ2: RWRegister<u32>,
    pub OSQ3: RWRegister<u32>,
    pub PSQ: RWRegister<u32>,
    pub PDT1: RWRegister<u32>,
    pub PDT2: RWRegister<u32>,
    pub PDT3: RWRegister<u32>,
    pub PDT4: RWRegister<u32>,
    /// Ordinary data, read by the DMA
    pub ODT: RWRegister<u32>,
}

/// Registers shared by all ADC instances
#[repr(C)]
pub struct CommonRegisterBlock {
    pub CSTS: RWRegister<u32>,
    pub CCTRL: RWRegister<u32>,
    pub CODT: RWRegister<u32>,
}

pub mod STS {
    fields! {
        VMOR @ 0 : 1;
        OCCE @ 1 : 1;
        PCCE @ 2 : 1;
        PCCS @ 3 : 1;
        OCCS @ 4 : 1;
        OCCO @ 5 : 1;
        RDY @ 6 : 1;
    }
}

pub mod CTRL1 {
    fields! {
        VMCSEL @ 0 : 5;
        CCEIE @ 5 : 1;
        VMORIE @ 6 : 1;
        PCCEIE @ 7 : 1;
        SQEN @ 8 : 1;
        VMSGEN @ 9 : 1;
        PCAUTOEN @ 10 : 1;
        OCPEN @ 11 : 1;
        PCPEN @ 12 : 1;
        OCPCNT @ 13 : 3;
        PCVMEN @ 22 : 1;
        OCVMEN @ 23 : 1;
        CRSEL @ 24 : 2;
        OCCOIE @ 26 : 1;
    }
}

pub mod CTRL2 {
    fields! {
        ADCEN @ 0 : 1;
        RPEN @ 1 : 1;
        ADCAL @ 2 : 1;
        ADCALINIT @ 3 : 1;
        ADABRT @ 4 : 1;
        OCDMAEN @ 8 : 1;
        OCDRCEN @ 9 : 1;
        EOCSFEN @ 10 : 1;
        DTALIGN @ 11 : 1;
        PCTESEL_L @ 16 : 4;
        PCETE @ 20 : 2;
        PCSWTRG @ 22 : 1;
        PCTESEL_H @ 23 : 1;
        OCTESEL_L @ 24 : 4;
        OCETE @ 28 : 2;
        OCSWTRG @ 30 : 1;
        OCTESEL_H @ 31 : 1;
    }
}

pub mod OSQ1 {
    fields! {
        OSN13 @ 0 : 5;
        OSN14 @ 5 : 5;
        OSN15 @ 10 : 5;
        OSN16 @ 15 : 5;
        OCLEN @ 20 : 4;
    }
}

pub mod CCTRL {
    fields! {
        MSSEL @ 0 : 5;
        ASISEL @ 8 : 4;
        ADCDIV @ 16 : 4;
        VBATEN @ 22 : 1;
        ITSRVEN @ 23 : 1;
    }
}

pub mod ODT {
    fields! {
        ODT @ 0 : 16;
    }
}
