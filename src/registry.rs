//! The stream registry
//!
//! A [`Registry`] is a read-only table of every physical DMA stream on a
//! device. You describe each DMA [`Unit`] once, then [`Registry::new`]
//! numbers the streams, works out their status register positions, and
//! groups the streams that share an interrupt vector. Everything happens in
//! a `const` context, so the table can live in a `static`.
//!
//! ```no_run
//! use at32_lld::registry::{at32f43x, Registry};
//!
//! // Safety: the AT32F43x description matches the device.
//! static REGISTRY: Registry = unsafe { at32f43x::registry() };
//! ```

use crate::{
    mux::Multiplexer,
    platform::{Peripheral, Vector},
    ral::{dma, dmamux, edma, Static},
};

/// The most DMA units in one registry
pub const MAX_UNITS: usize = 2;
/// The most channels in one DMA unit
pub const MAX_CHANNELS: usize = 8;
/// The most streams in one registry
pub const MAX_STREAMS: usize = MAX_UNITS * MAX_CHANNELS;

/// The flavor of DMA controller behind a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// One status register, four flags per channel
    Dma,
    /// Two status registers, six flags per stream
    Edma,
}

#[derive(Clone, Copy)]
pub(crate) enum Controller {
    Dma(Static<dma::RegisterBlock>),
    Edma(Static<edma::RegisterBlock>),
}

impl Controller {
    pub(crate) const fn kind(self) -> Kind {
        match self {
            Controller::Dma(_) => Kind::Dma,
            Controller::Edma(_) => Kind::Edma,
        }
    }
}

/// EDMA flag groups start at these bits, in both status registers
const EDMA_SHIFTS: [u8; 4] = [0, 6, 16, 22];

/// A DMA unit description
///
/// Construct a unit with [`dma`](Unit::dma) or [`edma`](Unit::edma), then
/// optionally attach its request multiplexer.
#[derive(Clone, Copy)]
pub struct Unit {
    pub(crate) controller: Controller,
    pub(crate) multiplexer: Multiplexer,
    pub(crate) clock: Peripheral,
    pub(crate) channels: u8,
    pub(crate) vectors: [Vector; MAX_CHANNELS],
}

impl Unit {
    /// Describe a basic DMA controller
    ///
    /// `vectors` lists the interrupt vector of each channel, starting with
    /// channel 1. Its length is the number of channels.
    ///
    /// # Safety
    ///
    /// `registers` must point at the controller's register block. The
    /// vectors must be the channels' vectors.
    ///
    /// # Panics
    ///
    /// Panics if there are no vectors, or more than [`MAX_CHANNELS`].
    pub const unsafe fn dma(registers: *const (), clock: Peripheral, vectors: &[u16]) -> Self {
        Self::describe(Controller::Dma(Static::new(registers)), clock, vectors)
    }

    /// Describe an enhanced DMA controller
    ///
    /// # Safety
    ///
    /// See [`dma`](Unit::dma).
    ///
    /// # Panics
    ///
    /// See [`dma`](Unit::dma).
    pub const unsafe fn edma(registers: *const (), clock: Peripheral, vectors: &[u16]) -> Self {
        Self::describe(Controller::Edma(Static::new(registers)), clock, vectors)
    }

    const fn describe(controller: Controller, clock: Peripheral, vectors: &[u16]) -> Self {
        assert!(
            !vectors.is_empty() && vectors.len() <= MAX_CHANNELS,
            "DMA unit channel count out of range"
        );
        let mut table = [Vector(0); MAX_CHANNELS];
        let mut idx = 0;
        while idx < vectors.len() {
            table[idx] = Vector(vectors[idx]);
            idx += 1;
        }
        Unit {
            controller,
            multiplexer: Multiplexer::None,
            clock,
            channels: vectors.len() as u8,
            vectors: table,
        }
    }

    /// Attach a DMAMUX request multiplexer
    ///
    /// # Safety
    ///
    /// `registers` must point at the multiplexer that serves this unit.
    ///
    /// # Panics
    ///
    /// Panics if the unit has more channels than the multiplexer.
    pub const unsafe fn with_dmamux(mut self, registers: *const ()) -> Self {
        assert!(
            self.channels as usize <= dmamux::CHANNELS,
            "DMA unit has more channels than its multiplexer"
        );
        self.multiplexer = Multiplexer::Dmamux(Static::new(registers));
        self
    }

    /// Route requests through the channel selection register
    ///
    /// # Panics
    ///
    /// Panics if the unit is an EDMA controller, which has no selection
    /// register.
    pub const fn with_cselr(mut self) -> Self {
        assert!(
            matches!(self.controller, Controller::Dma(_)),
            "CSELR requires a basic DMA controller"
        );
        self.multiplexer = Multiplexer::Cselr;
        self
    }

    /// Returns the controller flavor
    pub const fn kind(&self) -> Kind {
        self.controller.kind()
    }

    /// Returns the number of channels
    pub const fn channels(&self) -> usize {
        self.channels as usize
    }

    /// Returns `true` if any channel can serve any request
    pub const fn has_dmamux(&self) -> bool {
        self.multiplexer.is_flexible()
    }
}

/// One physical DMA stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDescriptor {
    index: u8,
    unit: u8,
    channel: u8,
    /// Bit offset of the flag group, and of the CSELR nibble
    shift: u8,
    /// EDMA status register holding the flag group
    status: u8,
    /// Streams that share this stream's vector, this one included
    cmask: u32,
    vector: Vector,
}

impl StreamDescriptor {
    const EMPTY: Self = StreamDescriptor {
        index: 0,
        unit: 0,
        channel: 0,
        shift: 0,
        status: 0,
        cmask: 0,
        vector: Vector(0),
    };

    /// The stream identifier
    pub const fn id(&self) -> usize {
        self.index as usize
    }
    /// The zero-based unit index
    pub const fn unit(&self) -> usize {
        self.unit as usize
    }
    /// The zero-based channel within the unit
    pub const fn channel(&self) -> usize {
        self.channel as usize
    }
    /// The stream's interrupt vector
    pub const fn vector(&self) -> Vector {
        self.vector
    }
    /// The mask of stream identifiers sharing this stream's vector
    pub const fn shared(&self) -> u32 {
        self.cmask
    }
    pub(crate) const fn shift(&self) -> u32 {
        self.shift as u32
    }
    pub(crate) const fn status(&self) -> usize {
        self.status as usize
    }
}

/// The stream table for one device
pub struct Registry {
    units: [Option<Unit>; MAX_UNITS],
    streams: [StreamDescriptor; MAX_STREAMS],
    len: usize,
}

impl Registry {
    /// Build the stream table for `units`
    ///
    /// Streams are numbered in unit order, then channel order, from zero.
    ///
    /// # Panics
    ///
    /// Panics if there are no units, or more than [`MAX_UNITS`].
    pub const fn new(units: &[Unit]) -> Self {
        assert!(
            !units.is_empty() && units.len() <= MAX_UNITS,
            "DMA unit count out of range"
        );
        let mut table = [None; MAX_UNITS];
        let mut streams = [StreamDescriptor::EMPTY; MAX_STREAMS];
        let mut len = 0;

        let mut u = 0;
        while u < units.len() {
            let unit = units[u];
            table[u] = Some(unit);
            let mut ch = 0;
            while ch < unit.channels as usize {
                let (status, shift) = match unit.controller {
                    Controller::Dma(_) => (0, 4 * ch as u8),
                    Controller::Edma(_) => ((ch / 4) as u8, EDMA_SHIFTS[ch % 4]),
                };
                streams[len] = StreamDescriptor {
                    index: len as u8,
                    unit: u as u8,
                    channel: ch as u8,
                    shift,
                    status,
                    cmask: 0,
                    vector: unit.vectors[ch],
                };
                len += 1;
                ch += 1;
            }
            u += 1;
        }

        let mut i = 0;
        while i < len {
            let mut cmask = 0;
            let mut j = 0;
            while j < len {
                if streams[j].vector.0 == streams[i].vector.0 {
                    cmask |= 1 << j;
                }
                j += 1;
            }
            streams[i].cmask = cmask;
            i += 1;
        }

        Registry {
            units: table,
            streams,
            len,
        }
    }

    /// Returns all streams, ordered by identifier
    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams[..self.len]
    }

    /// Returns the number of streams
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no streams
    ///
    /// A constructed registry always has at least one stream.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Look up the stream with identifier `id`
    pub fn stream(&self, id: usize) -> Option<&StreamDescriptor> {
        self.streams().get(id)
    }

    /// Look up the unit at zero-based `index`
    pub fn unit(&self, index: usize) -> Option<&Unit> {
        self.units.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn unit_of(&self, stream: &StreamDescriptor) -> &Unit {
        match &self.units[stream.unit()] {
            Some(unit) => unit,
            None => unreachable!(),
        }
    }

    /// Returns the identifier of `channel` on `unit`
    ///
    /// Both are numbered from one, as the reference manual numbers them.
    ///
    /// # Panics
    ///
    /// Panics if the pair doesn't name a stream.
    pub fn stream_id(&self, unit: usize, channel: usize) -> usize {
        assert!(
            unit >= 1
                && channel >= 1
                && self.unit(unit - 1).is_some_and(|u| channel <= u.channels()),
            "DMA{unit} channel {channel} does not exist"
        );
        let first = self.unit(0).map_or(0, Unit::channels);
        stream_id(unit, channel, first)
    }

    /// Returns the identifier mask of `channel` on `unit`
    ///
    /// # Panics
    ///
    /// See [`stream_id`](Self::stream_id).
    pub fn stream_mask(&self, unit: usize, channel: usize) -> u32 {
        1 << self.stream_id(unit, channel)
    }

    /// The mask of every stream identifier on zero-based `unit`
    pub(crate) fn unit_mask(&self, unit: usize) -> u32 {
        self.streams()
            .iter()
            .filter(|s| s.unit() == unit)
            .fold(0, |mask, s| mask | 1 << s.id())
    }
}

/// Compute a stream identifier from one-based unit and channel numbers
///
/// `first_unit_channels` is the channel count of the first unit.
pub const fn stream_id(unit: usize, channel: usize, first_unit_channels: usize) -> usize {
    (unit - 1) * first_unit_channels + (channel - 1)
}

/// Extract a stream's request line from a stream/request association word
///
/// `map` holds one request per nibble, one nibble per channel. Devices
/// without a multiplexer use this to find the channel selector for a
/// peripheral's stream.
pub const fn channel_selection(id: usize, map: u32, first_unit_channels: usize) -> u32 {
    (map >> ((id % first_unit_channels) * 4)) & 0xF
}

/// AT32F43x device description
///
/// Two basic DMA units with seven channels each. Each unit carries its own
/// DMAMUX block.
pub mod at32f43x {
    use super::{Registry, Unit};
    use crate::platform::Peripheral;

    /// DMA1 register block
    pub const DMA1: *const () = 0x4002_6400 as *const ();
    /// DMA1 multiplexer
    pub const DMA1_MUX: *const () = 0x4002_6500 as *const ();
    /// DMA2 register block
    pub const DMA2: *const () = 0x4002_6600 as *const ();
    /// DMA2 multiplexer
    pub const DMA2_MUX: *const () = 0x4002_6700 as *const ();

    /// DMA1 channel vectors
    pub const DMA1_VECTORS: [u16; 7] = [56, 57, 58, 59, 60, 68, 69];
    /// DMA2 channel vectors
    pub const DMA2_VECTORS: [u16; 7] = [108, 109, 110, 111, 112, 113, 114];

    /// ADC1 register block
    pub const ADC1: *const () = 0x4001_2000 as *const ();
    /// ADC2 register block
    pub const ADC2: *const () = 0x4001_2100 as *const ();
    /// ADC3 register block
    pub const ADC3: *const () = 0x4001_2200 as *const ();
    /// Registers shared by all ADCs
    pub const ADC_COMMON: *const () = 0x4001_2300 as *const ();
    /// The vector shared by all ADCs
    pub const ADC_VECTOR: u16 = 18;

    /// NVIC priority bits
    pub const PRIORITY_BITS: u8 = 4;

    /// The DMA units
    ///
    /// # Safety
    ///
    /// Only valid on an AT32F43x.
    pub const unsafe fn units() -> [Unit; 2] {
        [
            Unit::dma(DMA1, Peripheral::Dma1, &DMA1_VECTORS).with_dmamux(DMA1_MUX),
            Unit::dma(DMA2, Peripheral::Dma2, &DMA2_VECTORS).with_dmamux(DMA2_MUX),
        ]
    }

    /// The stream registry
    ///
    /// # Safety
    ///
    /// Only valid on an AT32F43x.
    pub const unsafe fn registry() -> Registry {
        Registry::new(&units())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ral::fake;

    fn two_units() -> Registry {
        let dma1 = fake::address(fake::block::<dma::RegisterBlock>());
        let dma2 = fake::address(fake::block::<dma::RegisterBlock>());
        // Safety: blocks are in RAM.
        unsafe {
            Registry::new(&[
                Unit::dma(dma1, Peripheral::Dma1, &[10, 11, 12, 12, 12]),
                Unit::dma(dma2, Peripheral::Dma2, &[20, 21, 21]),
            ])
        }
    }

    #[test]
    fn streams_numbered_in_unit_order() {
        let registry = two_units();
        assert_eq!(registry.len(), 8);
        for (id, stream) in registry.streams().iter().enumerate() {
            assert_eq!(stream.id(), id);
        }
        assert_eq!(registry.stream(4).map(|s| (s.unit(), s.channel())), Some((0, 4)));
        assert_eq!(registry.stream(5).map(|s| (s.unit(), s.channel())), Some((1, 0)));
        assert!(registry.stream(8).is_none());
    }

    #[test]
    fn shared_vectors_share_masks() {
        let registry = two_units();
        let mask = |id| registry.stream(id).map(StreamDescriptor::shared);
        assert_eq!(mask(0), Some(0b1));
        assert_eq!(mask(2), Some(0b11100));
        assert_eq!(mask(3), Some(0b11100));
        assert_eq!(mask(5), Some(0b100000));
        assert_eq!(mask(6), Some(0b11000000));
    }

    #[test]
    fn dma_shift_is_four_per_channel() {
        let registry = two_units();
        let shifts: [u32; 5] = core::array::from_fn(|id| registry.streams()[id].shift());
        assert_eq!(shifts, [0, 4, 8, 12, 16]);
        assert_eq!(registry.streams()[5].shift(), 0);
    }

    #[test]
    fn edma_flag_groups() {
        let edma = fake::address(fake::block::<edma::RegisterBlock>());
        // Safety: block is in RAM.
        let registry =
            unsafe { Registry::new(&[Unit::edma(edma, Peripheral::Edma, &[1, 2, 3, 4, 5, 6, 7, 8])]) };
        let groups: [(usize, u32); 8] = core::array::from_fn(|id| {
            let stream = &registry.streams()[id];
            (stream.status(), stream.shift())
        });
        assert_eq!(
            groups,
            [(0, 0), (0, 6), (0, 16), (0, 22), (1, 0), (1, 6), (1, 16), (1, 22)]
        );
    }

    #[test]
    fn stream_ids_from_unit_and_channel() {
        let registry = two_units();
        assert_eq!(registry.stream_id(1, 1), 0);
        assert_eq!(registry.stream_id(1, 5), 4);
        assert_eq!(registry.stream_id(2, 1), 5);
        assert_eq!(registry.stream_mask(2, 3), 1 << 7);
        assert_eq!(registry.unit_mask(1), 0b1110_0000);
    }

    #[test]
    #[should_panic]
    fn stream_id_rejects_missing_channel() {
        two_units().stream_id(2, 4);
    }

    #[test]
    fn channel_selection_nibbles() {
        let map = 0x0765_4321;
        assert_eq!(channel_selection(0, map, 7), 1);
        assert_eq!(channel_selection(6, map, 7), 7);
        // Second unit wraps onto the same nibbles.
        assert_eq!(channel_selection(8, map, 7), 2);
    }

    #[test]
    fn at32f43x_table() {
        // Safety: the table is only inspected.
        let registry = unsafe { at32f43x::registry() };
        assert_eq!(registry.len(), 14);
        assert_eq!(registry.stream(5).map(|s| s.vector()), Some(Vector(68)));
        assert_eq!(registry.stream(13).map(|s| s.vector()), Some(Vector(114)));
        assert!(registry.streams().iter().all(|s| s.shared() == 1 << s.id()));
        assert!(registry.unit(1).is_some_and(Unit::has_dmamux));
        assert_eq!(registry.unit(0).map(Unit::kind), Some(Kind::Dma));
    }
}
