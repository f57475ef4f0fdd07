//! The stream allocator
//!
//! [`Dma`] hands out [`Stream`]s from a [`Registry`], at most one owner per
//! stream. It also gates the DMA clocks and the stream vectors, and routes
//! every stream interrupt to the handler registered with the stream.
//!
//! ```no_run
//! use at32_lld::{
//!     platform::{Clocks, Nvic, Peripheral},
//!     registry::{at32f43x, Registry},
//!     Dma, Selector, Status,
//! };
//!
//! struct Crm;
//! impl Clocks for Crm {
//!     fn enable(&self, _: Peripheral) { /* ... */ }
//!     fn disable(&self, _: Peripheral) { /* ... */ }
//!     fn reset(&self, _: Peripheral) { /* ... */ }
//! }
//!
//! // Safety: the AT32F43x description matches the device.
//! static REGISTRY: Registry = unsafe { at32f43x::registry() };
//! static NVIC: Nvic = Nvic::new(at32f43x::PRIORITY_BITS);
//! static DMA: Dma = Dma::new(&REGISTRY, &Crm, &NVIC);
//!
//! fn on_transfer(status: Status) { /* ... */ }
//! static HANDLER: fn(Status) = on_transfer;
//!
//! let stream = DMA.allocate(Selector::Id(0), 2, Some(&HANDLER));
//!
//! // #[interrupt]
//! fn DMA1_CHANNEL1() {
//!     DMA.on_interrupt(0);
//! }
//! ```

use core::cell::Cell;

use critical_section::Mutex;

use crate::{
    error::Error,
    interrupt::StreamHandler,
    platform::{Clocks, Interrupts, Vector},
    registry::{Registry, StreamDescriptor, Unit, MAX_STREAMS, MAX_UNITS},
    stream::Stream,
};

/// The highest interrupt priority a stream accepts
pub const MAX_PRIORITY: u8 = 3;

/// Which stream to allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// This exact stream
    Id(usize),
    /// The first free stream on any unit with a DMAMUX
    Any,
    /// The first free stream on this one-based unit, which needs a DMAMUX
    AnyOn(usize),
}

type HandlerSlot<'a> = Mutex<Cell<Option<&'a dyn StreamHandler>>>;

/// The DMA stream allocator
///
/// Place a `Dma` in a static, next to its [`Registry`]. Every interrupt
/// handler of every stream vector calls [`on_interrupt`](Dma::on_interrupt)
/// or [`on_vector`](Dma::on_vector).
pub struct Dma<'a> {
    registry: &'a Registry,
    clocks: &'a dyn Clocks,
    interrupts: &'a dyn Interrupts,
    /// Streams with an owner
    allocated: Mutex<Cell<u32>>,
    /// Streams with a handler, and so with a live vector
    isr: Mutex<Cell<u32>>,
    handlers: [HandlerSlot<'a>; MAX_STREAMS],
}

impl<'a> Dma<'a> {
    const NO_HANDLER: HandlerSlot<'a> = Mutex::new(Cell::new(None));

    /// Create an allocator over `registry`
    ///
    /// No stream is allocated. No clock or vector is touched until the first
    /// allocation.
    pub const fn new(
        registry: &'a Registry,
        clocks: &'a dyn Clocks,
        interrupts: &'a dyn Interrupts,
    ) -> Self {
        Dma {
            registry,
            clocks,
            interrupts,
            allocated: Mutex::new(Cell::new(0)),
            isr: Mutex::new(Cell::new(0)),
            handlers: [Self::NO_HANDLER; MAX_STREAMS],
        }
    }

    /// Returns the registry behind this allocator
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Allocate a stream
    ///
    /// The stream comes back disabled, with a zero mode word and no latched
    /// flags. If `handler` is set, the stream's vector is unmasked at
    /// `priority`, and the handler sees every interrupt until you
    /// [`release`](Dma::release) the stream.
    ///
    /// Safe to call from thread or interrupt context.
    ///
    /// # Panics
    ///
    /// Panics when [`try_allocate`](Dma::try_allocate) fails. Stream
    /// ownership is planned when the firmware is written, so a failure is a
    /// configuration bug.
    pub fn allocate(
        &self,
        selector: Selector,
        priority: u8,
        handler: Option<&'a dyn StreamHandler>,
    ) -> Stream<'a> {
        match self.try_allocate(selector, priority, handler) {
            Ok(stream) => stream,
            Err(err) => panic!("DMA allocation failed: {err}"),
        }
    }

    /// Allocate a stream, or report why you can't
    ///
    /// See [`allocate`](Dma::allocate).
    pub fn try_allocate(
        &self,
        selector: Selector,
        priority: u8,
        handler: Option<&'a dyn StreamHandler>,
    ) -> crate::Result<Stream<'a>> {
        if priority > MAX_PRIORITY {
            return Err(Error::InvalidPriority(priority));
        }
        critical_section::with(|cs| {
            let allocated = self.allocated.borrow(cs);
            let descriptor = self.select(selector, allocated.get())?;
            let unit = self.registry.unit_of(descriptor);
            let bit = 1 << descriptor.id();

            if allocated.get() & self.registry.unit_mask(descriptor.unit()) == 0 {
                log::debug!("DMA{} clock on", descriptor.unit() + 1);
                self.clocks.enable(unit.clock);
            }
            allocated.set(allocated.get() | bit);

            let stream = Stream::new(descriptor, unit);
            stream.reset();

            self.handlers[descriptor.id()].borrow(cs).set(handler);
            if handler.is_some() {
                let isr = self.isr.borrow(cs);
                if isr.get() & descriptor.shared() == 0 {
                    self.interrupts.enable_vector(descriptor.vector(), priority);
                }
                isr.set(isr.get() | bit);
            }

            log::debug!("DMA stream {} allocated", descriptor.id());
            Ok(stream)
        })
    }

    fn select(&self, selector: Selector, allocated: u32) -> Result<&'a StreamDescriptor, Error> {
        let candidates = match selector {
            Selector::Id(id) => {
                let descriptor = self.registry.stream(id).ok_or(Error::NoSuchStream(id))?;
                return if allocated & 1 << id != 0 {
                    Err(Error::Allocated(id))
                } else {
                    Ok(descriptor)
                };
            }
            Selector::Any => {
                let mask = (0..MAX_UNITS)
                    .filter(|&idx| self.registry.unit(idx).is_some_and(Unit::has_dmamux))
                    .fold(0, |mask, idx| mask | self.registry.unit_mask(idx));
                if mask == 0 {
                    return Err(Error::NoMultiplexer);
                }
                mask
            }
            Selector::AnyOn(number) => {
                let unit = number
                    .checked_sub(1)
                    .and_then(|idx| self.registry.unit(idx))
                    .ok_or(Error::NoSuchUnit(number))?;
                if !unit.has_dmamux() {
                    return Err(Error::NoMultiplexer);
                }
                self.registry.unit_mask(number - 1)
            }
        };
        let free = candidates & !allocated;
        if free == 0 {
            return Err(Error::Exhausted);
        }
        self.registry
            .stream(free.trailing_zeros() as usize)
            .ok_or(Error::Exhausted)
    }

    /// Release a stream
    ///
    /// Disable the stream before you release it. Once `release` returns, the
    /// stream's handler is gone, so a late flag can't reach its owner. The
    /// vector is masked when no stream sharing it keeps a handler, and the
    /// unit's clock stops when the unit has no streams left.
    ///
    /// # Panics
    ///
    /// Panics if the stream is still enabled.
    pub fn release(&self, stream: Stream<'a>) {
        assert!(!stream.is_enabled(), "DMA stream still enabled");
        let descriptor = stream.descriptor();
        let unit = self.registry.unit_of(descriptor);
        unit.multiplexer.unbind(descriptor.channel());
        let bit = 1 << descriptor.id();

        critical_section::with(|cs| {
            let isr = self.isr.borrow(cs);
            if isr.get() & bit != 0 {
                isr.set(isr.get() & !bit);
                if isr.get() & descriptor.shared() == 0 {
                    self.interrupts.disable_vector(descriptor.vector());
                }
            }

            let allocated = self.allocated.borrow(cs);
            allocated.set(allocated.get() & !bit);
            self.handlers[descriptor.id()].borrow(cs).set(None);

            if allocated.get() & self.registry.unit_mask(descriptor.unit()) == 0 {
                log::debug!("DMA{} clock off", descriptor.unit() + 1);
                self.clocks.disable(unit.clock);
            }
        });
        log::debug!("DMA stream {} released", descriptor.id());
    }

    /// Returns `true` if stream `id` has an owner
    pub fn is_allocated(&self, id: usize) -> bool {
        id < MAX_STREAMS && self.allocated_mask() & 1 << id != 0
    }

    /// Returns the mask of allocated stream identifiers
    pub fn allocated_mask(&self) -> u32 {
        critical_section::with(|cs| self.allocated.borrow(cs).get())
    }

    /// Serve stream `id`
    ///
    /// Reads the stream's flags. If any flag has its interrupt enabled, the
    /// flags are cleared and passed to the stream's handler. A stream
    /// without a handler drops its flags.
    ///
    /// Call this from the stream's interrupt handler. Unknown identifiers
    /// are ignored.
    pub fn on_interrupt(&self, id: usize) {
        let Some(descriptor) = self.registry.stream(id) else {
            return;
        };
        let stream = Stream::new(descriptor, self.registry.unit_of(descriptor));
        let raw = stream.latched();
        let status = stream.decode(raw);
        if (status & stream.enabled_interrupts()).is_empty() {
            return;
        }
        stream.clear_flags(raw);

        let handler = critical_section::with(|cs| self.handlers[id].borrow(cs).get());
        match handler {
            Some(handler) => {
                log::trace!("DMA stream {id}: {status:?}");
                handler.on_dma_interrupt(status);
            }
            None => log::trace!("DMA stream {id}: dropped {status:?}"),
        }
    }

    /// Serve every stream that signals through `vector`
    ///
    /// Streams are served in identifier order.
    pub fn on_vector(&self, vector: Vector) {
        self.registry
            .streams()
            .iter()
            .filter(|stream| stream.vector() == vector)
            .for_each(|stream| self.on_interrupt(stream.id()));
    }
}

// Safety: the registers behind the registry are only touched through the
// streams' owners, and inside critical sections here.
unsafe impl Sync for Dma<'_> {}
