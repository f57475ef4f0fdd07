//! DMA streams
//!
//! A [`Stream`] is the proof that you own one physical channel. Get one from
//! [`Dma::allocate`](crate::Dma::allocate), program it, and give it back with
//! [`Dma::release`](crate::Dma::release).
//!
//! Program the addresses, the transfer size and the mode while the stream is
//! disabled, then [`enable`](Stream::enable) it.

use crate::{
    configuration::{self, Configuration},
    interrupt::Status,
    mux::Multiplexer,
    ral::{self, dma, edma},
    registry::{Controller, Kind, StreamDescriptor, Unit},
    request::Request,
};

/// The most elements in one transfer
pub const MAX_TRANSFER: usize = 0xFFFF;

/// An allocated DMA stream
///
/// A `Stream` is not `Clone`. While you hold it, no other driver can
/// allocate its channel.
pub struct Stream<'a> {
    descriptor: &'a StreamDescriptor,
    controller: Controller,
    multiplexer: Multiplexer,
}

impl<'a> Stream<'a> {
    pub(crate) fn new(descriptor: &'a StreamDescriptor, unit: &Unit) -> Self {
        Stream {
            descriptor,
            controller: unit.controller,
            multiplexer: unit.multiplexer,
        }
    }

    /// Returns the stream identifier
    pub fn id(&self) -> usize {
        self.descriptor.id()
    }

    /// Returns the registry entry behind this stream
    pub fn descriptor(&self) -> &'a StreamDescriptor {
        self.descriptor
    }

    /// Returns the controller flavor
    pub fn kind(&self) -> Kind {
        self.controller.kind()
    }

    fn channel(&self) -> usize {
        self.descriptor.channel()
    }

    /// Set the peripheral address
    ///
    /// For memory-to-memory transfers, this is the source.
    pub fn set_peripheral_address<T>(&self, address: *const T) {
        let address = address as u32;
        match self.controller {
            Controller::Dma(dma) => {
                let ch = &dma.CH[self.channel()];
                ral::write_reg!(crate::ral::dma, ch, CPAR, address);
            }
            Controller::Edma(edma) => {
                let st = &edma.ST[self.channel()];
                ral::write_reg!(crate::ral::edma, st, PAR, address);
            }
        }
    }

    /// Set the memory address
    ///
    /// For memory-to-memory transfers, this is the destination.
    pub fn set_memory_address<T>(&self, address: *const T) {
        let address = address as u32;
        match self.controller {
            Controller::Dma(dma) => {
                let ch = &dma.CH[self.channel()];
                ral::write_reg!(crate::ral::dma, ch, CMAR, address);
            }
            Controller::Edma(edma) => {
                let st = &edma.ST[self.channel()];
                ral::write_reg!(crate::ral::edma, st, M0AR, address);
            }
        }
    }

    /// Set the number of elements to move
    ///
    /// # Panics
    ///
    /// Panics if `elements` exceeds [`MAX_TRANSFER`]. Split larger transfers
    /// yourself.
    pub fn set_transfer_size(&self, elements: usize) {
        assert!(
            elements <= MAX_TRANSFER,
            "DMA transfer of {elements} elements exceeds the hardware limit"
        );
        let elements = elements as u32;
        match self.controller {
            Controller::Dma(dma) => {
                let ch = &dma.CH[self.channel()];
                ral::write_reg!(crate::ral::dma, ch, CNDTR, NDT: elements);
            }
            Controller::Edma(edma) => {
                let st = &edma.ST[self.channel()];
                ral::write_reg!(crate::ral::edma, st, NDTR, NDT: elements);
            }
        }
    }

    /// Returns the number of elements left to move
    pub fn transfer_size(&self) -> usize {
        match self.controller {
            Controller::Dma(dma) => {
                let ch = &dma.CH[self.channel()];
                ral::read_reg!(crate::ral::dma, ch, CNDTR, NDT) as usize
            }
            Controller::Edma(edma) => {
                let st = &edma.ST[self.channel()];
                ral::read_reg!(crate::ral::edma, st, NDTR, NDT) as usize
            }
        }
    }

    /// Returns the raw mode word
    pub fn mode(&self) -> u32 {
        match self.controller {
            Controller::Dma(dma) => ral::read_reg!(crate::ral::dma, &dma.CH[self.channel()], CCR),
            Controller::Edma(edma) => ral::read_reg!(crate::ral::edma, &edma.ST[self.channel()], CR),
        }
    }

    /// Write a raw mode word
    ///
    /// On units with a channel selection register, bits 16 to 19 also select
    /// the channel's request line.
    pub fn set_mode(&self, mode: u32) {
        match self.controller {
            Controller::Dma(dma) => {
                self.multiplexer.select(&dma, self.descriptor.shift(), mode);
                let ch = &dma.CH[self.channel()];
                ral::write_reg!(crate::ral::dma, ch, CCR, mode);
            }
            Controller::Edma(edma) => {
                let st = &edma.ST[self.channel()];
                ral::write_reg!(crate::ral::edma, st, CR, mode);
            }
        }
    }

    /// Write the mode described by `configuration`
    pub fn set_configuration(&self, configuration: &Configuration) {
        self.set_mode(configuration.mode(self.kind()));
    }

    /// Route a request source to this stream
    ///
    /// Does nothing on units without a DMAMUX. Their wiring is fixed, and the
    /// request line travels in [`Configuration::channel_select`].
    pub fn bind(&self, request: Request) {
        self.multiplexer.bind(self.channel(), request);
    }

    /// Enable the stream
    ///
    /// # Safety
    ///
    /// The addresses, size and mode must describe a valid transfer. The
    /// memory must stay valid until the transfer completes, or until you
    /// disable the stream.
    pub unsafe fn enable(&self) {
        let mask = configuration::enable_mask(self.kind());
        critical_section::with(|_| self.modify_mode(|mode| mode | mask));
    }

    /// Disable the stream, mask its interrupts, and clear its flags
    ///
    /// The interrupt enables go down with the enable bit, so a transfer that
    /// finishes during the call can't raise a late interrupt. Disabling a
    /// disabled stream changes nothing.
    pub fn disable(&self) {
        let mask = configuration::disable_mask(self.kind());
        critical_section::with(|_| {
            self.modify_mode(|mode| mode & !mask);
            self.clear_interrupt();
        });
    }

    fn modify_mode(&self, f: impl FnOnce(u32) -> u32) {
        match self.controller {
            Controller::Dma(dma) => {
                let ch = &dma.CH[self.channel()];
                ral::modify_reg!(crate::ral::dma, ch, CCR, f);
            }
            Controller::Edma(edma) => {
                let st = &edma.ST[self.channel()];
                ral::modify_reg!(crate::ral::edma, st, CR, f);
            }
        }
    }

    /// Returns `true` if the stream is enabled
    pub fn is_enabled(&self) -> bool {
        self.mode() & configuration::enable_mask(self.kind()) != 0
    }

    /// Clear every flag latched by this stream
    pub fn clear_interrupt(&self) {
        match self.controller {
            Controller::Dma(_) => self.clear_flags(dma::RegisterBlock::ISR_MASK),
            Controller::Edma(_) => self.clear_flags(edma::RegisterBlock::ISR_MASK),
        }
    }

    /// Returns the flags latched by this stream
    pub fn status(&self) -> Status {
        self.decode(self.latched())
    }

    pub(crate) fn decode(&self, raw: u32) -> Status {
        match self.controller {
            Controller::Dma(_) => Status::from_dma(raw),
            Controller::Edma(_) => Status::from_edma(raw),
        }
    }

    /// Returns the flags this stream may interrupt on
    pub(crate) fn enabled_interrupts(&self) -> Status {
        match self.controller {
            // Enable bits sit at the same positions as their flags.
            Controller::Dma(_) => Status::from_dma(self.mode() & dma::RegisterBlock::ISR_MASK),
            Controller::Edma(edma) => {
                let st = &edma.ST[self.channel()];
                let (dmeie, teie, htie, tcie) =
                    ral::read_reg!(crate::ral::edma, st, CR, DMEIE, TEIE, HTIE, TCIE);
                let feie = ral::read_reg!(crate::ral::edma, st, FCR, FEIE);
                let raw = dmeie * edma::RegisterBlock::DMEIF
                    | teie * edma::RegisterBlock::TEIF
                    | htie * edma::RegisterBlock::HTIF
                    | tcie * edma::RegisterBlock::TCIF
                    | feie * edma::RegisterBlock::FEIF;
                Status::from_edma(raw)
            }
        }
    }

    /// The stream's raw flag group, shifted down to bit zero
    pub(crate) fn latched(&self) -> u32 {
        let shift = self.descriptor.shift();
        match self.controller {
            Controller::Dma(dma) => (dma.ISR.read() >> shift) & dma::RegisterBlock::ISR_MASK,
            Controller::Edma(edma) => {
                (edma.ISR[self.descriptor.status()].read() >> shift) & edma::RegisterBlock::ISR_MASK
            }
        }
    }

    /// Clear the raw flags in `raw`, given relative to bit zero
    pub(crate) fn clear_flags(&self, raw: u32) {
        let shift = self.descriptor.shift();
        match self.controller {
            Controller::Dma(dma) => dma.IFCR.write(raw << shift),
            Controller::Edma(edma) => edma.IFCR[self.descriptor.status()].write(raw << shift),
        }
    }

    /// Reset the stream for a new owner
    pub(crate) fn reset(&self) {
        self.disable();
        self.set_mode(0);
    }

    /// Spin until the remaining count reaches zero, then disable the stream
    ///
    /// Only for short memory-to-memory copies. Nothing bounds the wait.
    pub fn wait_completion(&self) {
        while self.transfer_size() > 0 {
            core::hint::spin_loop();
        }
        self.disable();
    }
}

impl core::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id())
            .field("unit", &self.descriptor.unit())
            .field("channel", &self.channel())
            .finish()
    }
}
