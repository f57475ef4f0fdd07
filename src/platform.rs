//! Services the drivers borrow from the board and the kernel
//!
//! The DMA and ADC drivers gate peripheral clocks and register interrupt
//! vectors, but they don't own the clock controller or the interrupt
//! controller. Your board support code implements [`Clocks`], and usually
//! picks [`Nvic`] for [`Interrupts`].

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;

/// A peripheral with a gated bus clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peripheral {
    Dma1,
    Dma2,
    Edma,
    Adc1,
    Adc2,
    Adc3,
}

/// Peripheral clock gating and reset
///
/// Implementations must be callable from interrupt context. None of these
/// calls may block.
pub trait Clocks: Sync {
    /// Turn on the bus clock for `peripheral`
    fn enable(&self, peripheral: Peripheral);
    /// Turn off the bus clock for `peripheral`
    fn disable(&self, peripheral: Peripheral);
    /// Pulse the reset line for `peripheral`
    fn reset(&self, peripheral: Peripheral);
}

/// Interrupt vector registration
///
/// Implementations must be callable from interrupt context.
pub trait Interrupts: Sync {
    /// Set the vector's priority, then unmask it
    fn enable_vector(&self, vector: Vector, priority: u8);
    /// Mask the vector
    fn disable_vector(&self, vector: Vector);
}

/// An interrupt vector number, as listed in the vector table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vector(pub u16);

// Safety: vector numbers come from the device's vector table, and they're
// all below the NVIC's limit.
unsafe impl InterruptNumber for Vector {
    fn number(self) -> u16 {
        self.0
    }
}

/// The Cortex-M nested vectored interrupt controller
///
/// `priority_bits` is the number of priority bits implemented by the device.
/// Priorities given to [`enable_vector`](Interrupts::enable_vector) are
/// shifted into the implemented bits.
pub struct Nvic {
    priority_bits: u8,
}

impl Nvic {
    /// Create an NVIC handle for a device with `priority_bits` of priority
    ///
    /// # Panics
    ///
    /// Panics if `priority_bits` is zero, or greater than 8.
    pub const fn new(priority_bits: u8) -> Self {
        assert!(
            priority_bits > 0 && priority_bits <= 8,
            "NVIC priority bits out of range"
        );
        Nvic { priority_bits }
    }
}

impl Interrupts for Nvic {
    fn enable_vector(&self, vector: Vector, priority: u8) {
        let shift = 8 - self.priority_bits;
        // Safety: priority changes and unmasking happen once, when the first
        // owner of a vector comes up. Handlers for these vectors are part
        // of the drivers, and they tolerate spurious entries.
        unsafe {
            let mut peripherals = cortex_m::Peripherals::steal();
            peripherals.NVIC.set_priority(vector, priority << shift);
            NVIC::unpend(vector);
            NVIC::unmask(vector);
        }
    }

    fn disable_vector(&self, vector: Vector) {
        NVIC::mask(vector);
        NVIC::unpend(vector);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Collaborators that record every call.

    extern crate std;
    use super::{Clocks, Interrupts, Peripheral, Vector};
    use std::{sync::Mutex, vec::Vec};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Call {
        Enable(Peripheral),
        Disable(Peripheral),
        Reset(Peripheral),
        EnableVector(Vector, u8),
        DisableVector(Vector),
    }

    #[derive(Default)]
    pub struct Platform {
        calls: Mutex<Vec<Call>>,
    }

    impl Platform {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, call: Call) -> usize {
            self.calls().iter().filter(|c| **c == call).count()
        }

        fn push(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Clocks for Platform {
        fn enable(&self, peripheral: Peripheral) {
            self.push(Call::Enable(peripheral));
        }
        fn disable(&self, peripheral: Peripheral) {
            self.push(Call::Disable(peripheral));
        }
        fn reset(&self, peripheral: Peripheral) {
            self.push(Call::Reset(peripheral));
        }
    }

    impl Interrupts for Platform {
        fn enable_vector(&self, vector: Vector, priority: u8) {
            self.push(Call::EnableVector(vector, priority));
        }
        fn disable_vector(&self, vector: Vector) {
            self.push(Call::DisableVector(vector));
        }
    }
}
