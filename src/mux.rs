//! Request multiplexing
//!
//! A unit routes peripheral requests to its channels one of three ways:
//!
//! - through fixed wiring, where a channel only hears the peripherals the
//!   silicon connects to it.
//! - through a DMAMUX block, where any channel can take any [`Request`].
//! - through a channel selection register (CSELR), which picks one of a few
//!   wired requests per channel. The selector travels in the mode word.

use crate::{
    ral::{self, dma, dmamux, Static},
    request::Request,
};

/// Multiplexing strategy of a DMA unit
#[derive(Clone, Copy)]
pub(crate) enum Multiplexer {
    None,
    Dmamux(Static<dmamux::RegisterBlock>),
    Cselr,
}

impl Multiplexer {
    /// Route `request` to `channel`
    ///
    /// Units without a DMAMUX are wired in silicon, so there's nothing to
    /// program.
    pub(crate) fn bind(self, channel: usize, request: Request) {
        if let Multiplexer::Dmamux(mux) = self {
            ral::modify_reg!(crate::ral::dmamux, mux, MUXSEL, TBLSEL: 1);
            let muxc = &mux.CHANNEL[channel];
            ral::write_reg!(crate::ral::dmamux, muxc, MUXC, REQSEL: request.raw());
        }
    }

    /// Disconnect `channel` from its request
    pub(crate) fn unbind(self, channel: usize) {
        if let Multiplexer::Dmamux(mux) = self {
            let muxc = &mux.CHANNEL[channel];
            ral::write_reg!(crate::ral::dmamux, muxc, MUXC, 0);
        }
    }

    /// Copy the selector nibble of a basic DMA mode word into CSELR
    pub(crate) fn select(self, registers: &dma::RegisterBlock, shift: u32, mode: u32) {
        if let Multiplexer::Cselr = self {
            // CSELR is shared by every channel on the unit.
            critical_section::with(|_| {
                ral::modify_reg!(crate::ral::dma, registers, CSELR, |cselr| {
                    (cselr & !(0xF << shift)) | ((mode >> 16) & 0xF) << shift
                });
            });
        }
    }

    /// Returns `true` if any channel may serve any request
    pub(crate) const fn is_flexible(self) -> bool {
        matches!(self, Multiplexer::Dmamux(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ral::fake;

    #[test]
    fn dmamux_programs_channel_and_table() {
        let mux = fake::block::<dmamux::RegisterBlock>();
        let strategy = Multiplexer::Dmamux(mux);
        strategy.bind(3, Request::Adc1);
        assert_eq!(mux.MUXSEL.read(), 1);
        assert_eq!(mux.CHANNEL[3].MUXC.read(), 5);
        assert_eq!(mux.CHANNEL[2].MUXC.read(), 0);

        strategy.bind(3, Request::Usart2Tx);
        assert_eq!(mux.CHANNEL[3].MUXC.read(), 27);

        strategy.unbind(3);
        assert_eq!(mux.CHANNEL[3].MUXC.read(), 0);
    }

    #[test]
    fn cselr_replaces_one_nibble() {
        let dma = fake::block::<dma::RegisterBlock>();
        dma.CSELR.write(0x0000_0F0F);
        Multiplexer::Cselr.select(&dma, 4, 0x0003_0000 | 0xA1);
        assert_eq!(dma.CSELR.read(), 0x0000_0F3F);
    }

    #[test]
    fn fixed_wiring_touches_nothing() {
        let dma = fake::block::<dma::RegisterBlock>();
        Multiplexer::None.select(&dma, 4, 0x0003_0000);
        Multiplexer::None.bind(0, Request::Adc1);
        assert_eq!(dma.CSELR.read(), 0);
        assert!(!Multiplexer::Cselr.is_flexible());
    }
}
