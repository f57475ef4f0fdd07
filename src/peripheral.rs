//! DMA support for hardware peripherals.
//!
//! If a driver is compatible with this API, it implements some or all of
//! the traits in this module. A HAL can then wire any allocated stream to
//! the peripheral with [`configure_source`] or [`configure_destination`].

use crate::{
    configuration::{Configuration, Direction},
    element::Element,
    request::Request,
    stream::Stream,
};

/// A peripheral that can be the source of DMA data
///
/// By 'source,' we mean that it provides data for a DMA transfer.
/// A source would be a hardware device writing data into memory,
/// like an ADC or a UART receiver.
///
/// # Safety
///
/// `Source` should only be implemented on peripherals that are
/// DMA capable. The address must be the peripheral's data register.
pub unsafe trait Source<E: Element> {
    /// The request line that paces reads
    fn source_request(&self) -> Request;
    /// Returns a pointer to the register from which the DMA stream
    /// reads data
    ///
    /// This memory is assumed to be static. Repeated calls should always
    /// return the same address.
    fn source_address(&self) -> *const E;
}

/// A peripheral that can be the destination for DMA data
///
/// By 'destination,' we mean that it receives data from a DMA transfer,
/// like a UART transmitter.
///
/// # Safety
///
/// `Destination` should only be implemented on peripherals that are
/// DMA capable. The address must be the peripheral's data register.
pub unsafe trait Destination<E: Element> {
    /// The request line that paces writes
    fn destination_request(&self) -> Request;
    /// Returns a pointer to the register into which the DMA stream
    /// writes data
    fn destination_address(&self) -> *const E;
}

/// Bind `stream` to the source's request, and read from its data register
pub fn configure_source<E: Element, S: Source<E>>(stream: &Stream<'_>, source: &S) {
    stream.bind(source.source_request());
    stream.set_peripheral_address(source.source_address());
}

/// Bind `stream` to the destination's request, and write to its data register
pub fn configure_destination<E: Element, D: Destination<E>>(stream: &Stream<'_>, destination: &D) {
    stream.bind(destination.destination_request());
    stream.set_peripheral_address(destination.destination_address());
}

/// A peripheral-to-memory transfer of `E`, filling a linear buffer
pub const fn receive<E: Element>() -> Configuration {
    Configuration {
        peripheral_width: E::WIDTH,
        memory_width: E::WIDTH,
        memory_increment: true,
        ..Configuration::new(Direction::PeripheralToMemory)
    }
}

/// A memory-to-peripheral transfer of `E`, draining a linear buffer
pub const fn transmit<E: Element>() -> Configuration {
    Configuration {
        peripheral_width: E::WIDTH,
        memory_width: E::WIDTH,
        memory_increment: true,
        ..Configuration::new(Direction::MemoryToPeripheral)
    }
}
