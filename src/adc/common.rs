//! Registers and the vector shared by every ADC

use core::cell::Cell;

use critical_section::Mutex;

use super::AdcDriver;
use crate::{
    platform::{Interrupts, Vector},
    ral::{self, adc, Static},
};

/// The common ADC block
///
/// One `AdcCommon` serves every [`AdcDriver`] on the device. It owns the
/// clock prescaler, the internal channel switches, and the status vector
/// that all instances share.
pub struct AdcCommon<'a> {
    registers: Static<adc::CommonRegisterBlock>,
    interrupts: &'a dyn Interrupts,
    vector: Vector,
    priority: u8,
    prescaler: u8,
    vector_enabled: Mutex<Cell<bool>>,
}

impl<'a> AdcCommon<'a> {
    /// Create the common block
    ///
    /// `prescaler` is the raw `CCTRL.ADCDIV` value. It's applied each time an
    /// ADC starts. `vector` is unmasked at `priority` when the first ADC
    /// starts, and it stays unmasked.
    ///
    /// # Safety
    ///
    /// `registers` must point at the ADC common register block.
    pub const unsafe fn new(
        registers: *const (),
        interrupts: &'a dyn Interrupts,
        vector: Vector,
        priority: u8,
        prescaler: u8,
    ) -> Self {
        AdcCommon {
            registers: Static::new(registers),
            interrupts,
            vector,
            priority,
            prescaler,
            vector_enabled: Mutex::new(Cell::new(false)),
        }
    }

    /// Returns the shared status vector
    pub fn vector(&self) -> Vector {
        self.vector
    }

    /// Program the prescaler, keeping only the internal channel switches
    pub(crate) fn apply_prescaler(&self) {
        let keep = adc::CCTRL::ITSRVEN::mask | adc::CCTRL::VBATEN::mask;
        critical_section::with(|_| {
            ral::modify_reg!(crate::ral::adc, self.registers, CCTRL, |cctrl| {
                (cctrl & keep) | u32::from(self.prescaler) << adc::CCTRL::ADCDIV::offset
            });
        });
    }

    /// Unmask the shared vector, once
    pub(crate) fn enable_vector(&self) {
        let first = critical_section::with(|cs| self.vector_enabled.borrow(cs).replace(true));
        if !first {
            log::debug!("ADC vector {} on", self.vector.0);
            self.interrupts.enable_vector(self.vector, self.priority);
        }
    }

    /// Connect the temperature sensor and the internal reference
    pub fn enable_tsvref(&self) {
        critical_section::with(|_| {
            ral::modify_reg!(crate::ral::adc, self.registers, CCTRL, ITSRVEN: 1);
        });
    }

    pub fn disable_tsvref(&self) {
        critical_section::with(|_| {
            ral::modify_reg!(crate::ral::adc, self.registers, CCTRL, ITSRVEN: 0);
        });
    }

    /// Connect the battery voltage divider
    ///
    /// Call after an ADC has started. Starting keeps the switch, but the
    /// register only takes writes while an ADC is clocked.
    pub fn enable_vbat(&self) {
        critical_section::with(|_| {
            ral::modify_reg!(crate::ral::adc, self.registers, CCTRL, VBATEN: 1);
        });
    }

    pub fn disable_vbat(&self) {
        critical_section::with(|_| {
            ral::modify_reg!(crate::ral::adc, self.registers, CCTRL, VBATEN: 0);
        });
    }

    /// Serve the shared status vector
    ///
    /// Reads and clears each driver's status register, then serves it, in
    /// slice order. Pass every started driver.
    pub fn on_interrupt(&self, drivers: &[&AdcDriver<'_>]) {
        for driver in drivers {
            let sts = driver.take_status();
            driver.on_status(sts);
        }
    }
}
