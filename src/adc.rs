//! ADC acquisition over DMA
//!
//! An [`AdcDriver`] runs a [`ConversionGroup`] and lets a DMA stream move
//! each result into a sample buffer. One-shot groups fill the buffer once.
//! Circular groups refill it until you stop them, and report each half as it
//! fills.
//!
//! The driver moves through these states:
//!
//! - `Stop`: no clock, no stream.
//! - `Ready`: clocked, stream allocated, analog block on but idle.
//! - `Active`: converting.
//! - `Complete`: inside the end callback, after the whole buffer filled.
//! - `Error`: inside the error callback.
//!
//! Callbacks run in interrupt context. They may call
//! [`stop_conversion`](AdcDriver::stop_conversion).
//!
//! ```no_run
//! use at32_lld::{
//!     adc::{AdcCommon, AdcConfig, AdcDriver, ConversionGroup, Instance},
//!     platform::{Clocks, Nvic, Peripheral, Vector},
//!     registry::{at32f43x, Registry},
//!     Dma, Selector,
//! };
//!
//! # struct Crm;
//! # impl Clocks for Crm {
//! #     fn enable(&self, _: Peripheral) {}
//! #     fn disable(&self, _: Peripheral) {}
//! #     fn reset(&self, _: Peripheral) {}
//! # }
//! // Safety: the AT32F43x description matches the device.
//! static REGISTRY: Registry = unsafe { at32f43x::registry() };
//! static NVIC: Nvic = Nvic::new(at32f43x::PRIORITY_BITS);
//! static DMA: Dma = Dma::new(&REGISTRY, &Crm, &NVIC);
//! static COMMON: AdcCommon = unsafe {
//!     AdcCommon::new(at32f43x::ADC_COMMON, &NVIC, Vector(at32f43x::ADC_VECTOR), 3, 1)
//! };
//! static ADC1: AdcDriver = unsafe {
//!     AdcDriver::new(
//!         Instance::Adc1,
//!         at32f43x::ADC1,
//!         &DMA,
//!         &COMMON,
//!         &Crm,
//!         AdcConfig::new(Selector::Id(0)),
//!     )
//! };
//!
//! fn on_samples(adc: &AdcDriver) {
//!     adc.with_completed_half(|half| { /* ... */ });
//! }
//!
//! static SCAN: ConversionGroup = ConversionGroup {
//!     circular: true,
//!     end_cb: Some(on_samples),
//!     ctrl2: 1 << 30,
//!     ..ConversionGroup::new(1)
//! };
//!
//! static mut SAMPLES: [u16; 16] = [0; 16];
//!
//! ADC1.start();
//! // Safety: the only reference to the buffer.
//! ADC1.start_conversion(&SCAN, unsafe { &mut *core::ptr::addr_of_mut!(SAMPLES) }, 16);
//!
//! // #[interrupt]
//! fn ADC1_2_3() {
//!     COMMON.on_interrupt(&[&ADC1]);
//! }
//! ```

mod common;
mod group;

pub use common::AdcCommon;
pub use group::{ConversionGroup, EndCallback, ErrorCallback};

use core::{
    cell::RefCell,
    future::Future,
    marker::PhantomData,
    ops::Range,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use critical_section::Mutex;

use crate::{
    configuration::{Configuration, Priority},
    dma::{Dma, Selector},
    error::AdcError,
    interrupt::{Status, StreamHandler},
    peripheral::{self, Source},
    platform::{Clocks, Peripheral},
    ral::{self, adc, Static},
    request::Request,
    stream::{Stream, MAX_TRANSFER},
};

/// An ADC on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instance {
    Adc1,
    Adc2,
    Adc3,
}

impl Instance {
    /// Returns the one-based instance number
    pub const fn number(self) -> u8 {
        match self {
            Instance::Adc1 => 1,
            Instance::Adc2 => 2,
            Instance::Adc3 => 3,
        }
    }

    /// Returns the clock gate of this ADC
    pub const fn peripheral(self) -> Peripheral {
        match self {
            Instance::Adc1 => Peripheral::Adc1,
            Instance::Adc2 => Peripheral::Adc2,
            Instance::Adc3 => Peripheral::Adc3,
        }
    }

    /// Returns the DMA request of this ADC
    pub const fn request(self) -> Request {
        match self {
            Instance::Adc1 => Request::Adc1,
            Instance::Adc2 => Request::Adc2,
            Instance::Adc3 => Request::Adc3,
        }
    }
}

/// DMA settings for one ADC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcConfig {
    /// The stream to allocate on start
    pub stream: Selector,
    /// Interrupt priority of the stream, up to [`MAX_PRIORITY`](crate::MAX_PRIORITY)
    pub irq_priority: u8,
    /// Arbitration priority of the stream
    pub dma_priority: Priority,
    /// Request line on units without a DMAMUX
    pub channel_select: u8,
}

impl AdcConfig {
    /// Use `stream`, at interrupt priority 2 and high arbitration priority
    pub const fn new(stream: Selector) -> Self {
        AdcConfig {
            stream,
            irq_priority: 2,
            dma_priority: Priority::High,
            channel_select: 0,
        }
    }
}

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stop,
    Ready,
    Active,
    Complete,
    Error,
}

/// The sample buffer, on loan to the DMA
struct Samples<'a> {
    ptr: *mut u16,
    len: usize,
    _buffer: PhantomData<&'a mut [u16]>,
}

// Safety: the buffer is only touched inside the driver's critical sections,
// or after the DMA stream is disabled.
unsafe impl Send for Samples<'_> {}

impl<'a> Samples<'a> {
    fn new(buffer: &'a mut [u16]) -> Self {
        Samples {
            ptr: buffer.as_mut_ptr(),
            len: buffer.len(),
            _buffer: PhantomData,
        }
    }

    /// # Safety
    ///
    /// The DMA must no longer write the buffer.
    unsafe fn into_slice(self) -> &'a mut [u16] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

struct Inner<'a> {
    state: State,
    stream: Option<Stream<'a>>,
    group: Option<&'a ConversionGroup>,
    samples: Option<Samples<'a>>,
    depth: usize,
    /// The samples the running end callback may read
    filled: Option<Range<usize>>,
    /// A DMA error that arrived without a group
    last_error: Option<AdcError>,
    /// How the last conversion ended, for [`Convert`]
    outcome: Option<Result<(), AdcError>>,
    waker: Option<Waker>,
}

impl Inner<'_> {
    const fn new() -> Self {
        Inner {
            state: State::Stop,
            stream: None,
            group: None,
            samples: None,
            depth: 0,
            filled: None,
            last_error: None,
            outcome: None,
            waker: None,
        }
    }
}

/// An ADC driver
///
/// Place each driver in a static. Its DMA stream is allocated by
/// [`start`](AdcDriver::start) and returned by [`stop`](AdcDriver::stop).
pub struct AdcDriver<'a> {
    instance: Instance,
    registers: Static<adc::RegisterBlock>,
    dma: &'a Dma<'a>,
    common: &'a AdcCommon<'a>,
    clocks: &'a dyn Clocks,
    config: AdcConfig,
    inner: Mutex<RefCell<Inner<'a>>>,
}

impl<'a> AdcDriver<'a> {
    /// Create a stopped driver
    ///
    /// # Safety
    ///
    /// `registers` must point at the register block of `instance`.
    pub const unsafe fn new(
        instance: Instance,
        registers: *const (),
        dma: &'a Dma<'a>,
        common: &'a AdcCommon<'a>,
        clocks: &'a dyn Clocks,
        config: AdcConfig,
    ) -> Self {
        AdcDriver {
            instance,
            registers: Static::new(registers),
            dma,
            common,
            clocks,
            config,
            inner: Mutex::new(RefCell::new(Inner::new())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner<'a>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn state(&self) -> State {
        self.with(|inner| inner.state)
    }

    /// Returns the running conversion group
    pub fn group(&self) -> Option<&'a ConversionGroup> {
        self.with(|inner| inner.group)
    }

    /// Returns the identifier of the driver's DMA stream, once started
    ///
    /// Route that stream's interrupt to [`Dma::on_interrupt`].
    pub fn stream_id(&self) -> Option<usize> {
        self.with(|inner| inner.stream.as_ref().map(Stream::id))
    }

    /// Power up the ADC
    ///
    /// Allocates the DMA stream, clocks the ADC, and turns on the analog
    /// block. The shared status vector is unmasked the first time any ADC
    /// starts. Does nothing if the driver already started.
    ///
    /// # Panics
    ///
    /// Panics if the stream can't be allocated.
    pub fn start(&'a self) {
        if self.state() != State::Stop {
            return;
        }
        let stream = self
            .dma
            .allocate(self.config.stream, self.config.irq_priority, Some(self));

        let peripheral = self.instance.peripheral();
        self.clocks.reset(peripheral);
        self.clocks.enable(peripheral);
        peripheral::configure_source(&stream, self);

        // The common block takes writes only while an ADC is clocked.
        self.common.apply_prescaler();
        ral::write_reg!(crate::ral::adc, self.registers, CTRL1, 0);
        ral::write_reg!(crate::ral::adc, self.registers, CTRL2, 0);
        ral::write_reg!(crate::ral::adc, self.registers, CTRL2, ADCEN: 1);
        self.common.enable_vector();

        log::debug!(
            "ADC{} started on DMA stream {}",
            self.instance.number(),
            stream.id()
        );
        self.with(|inner| {
            inner.stream = Some(stream);
            inner.state = State::Ready;
        });
    }

    /// Power down the ADC
    ///
    /// Releases the DMA stream, turns off the analog block, and gates the
    /// clock. Does nothing if the driver is stopped. A sample buffer that
    /// you haven't taken stays with the driver.
    ///
    /// # Panics
    ///
    /// Panics if a conversion is running.
    pub fn stop(&self) {
        match self.state() {
            State::Stop => return,
            State::Ready => {}
            state => panic!("ADC{} stop while {state:?}", self.instance.number()),
        }
        let stream = self.with(|inner| {
            inner.state = State::Stop;
            inner.stream.take()
        });
        if let Some(stream) = stream {
            self.dma.release(stream);
        }
        ral::write_reg!(crate::ral::adc, self.registers, CTRL1, 0);
        ral::write_reg!(crate::ral::adc, self.registers, CTRL2, 0);
        self.clocks.disable(self.instance.peripheral());
        log::debug!("ADC{} stopped", self.instance.number());
    }

    /// The stream mode, less the per-group bits
    const fn dma_configuration(&self) -> Configuration {
        Configuration {
            priority: self.config.dma_priority,
            channel_select: self.config.channel_select,
            transfer_complete_interrupt: true,
            transfer_error_interrupt: true,
            direct_mode_error_interrupt: true,
            ..peripheral::receive::<u16>()
        }
    }

    /// Start converting `group` into `samples`
    ///
    /// The buffer holds `depth` rounds of the group's sequence. Circular
    /// groups with a `depth` above one also call the end callback when the
    /// first half fills. Get the buffer back with
    /// [`stop_conversion`](Self::stop_conversion) or
    /// [`take_samples`](Self::take_samples).
    ///
    /// # Panics
    ///
    /// Panics if the driver isn't ready, if the group has no channels or too
    /// many, if `depth` is zero, or if `samples` can't hold `depth` rounds.
    pub fn start_conversion(
        &self,
        group: &'a ConversionGroup,
        samples: &'a mut [u16],
        depth: usize,
    ) {
        let channels = group.num_channels;
        assert!(
            (1..=ConversionGroup::MAX_CHANNELS).contains(&channels),
            "ADC group needs 1 to 16 channels"
        );
        assert!(depth > 0, "ADC sample depth is zero");
        let count = group.samples(depth);
        assert!(count <= MAX_TRANSFER, "ADC sample count exceeds DMA limit");
        assert!(samples.len() >= count, "ADC sample buffer too small");
        let state = self.state();
        assert!(
            state == State::Ready,
            "ADC{} not ready: {state:?}",
            self.instance.number()
        );

        let samples = Samples::new(samples);
        self.with(|inner| {
            if let Some(stream) = &inner.stream {
                let mut configuration = self.dma_configuration();
                configuration.circular = group.circular;
                configuration.half_transfer_interrupt = group.streams_halves(depth);
                stream.set_memory_address(samples.ptr.cast_const());
                stream.set_transfer_size(count);
                stream.set_configuration(&configuration);
                // Safety: the buffer holds the transfer, and it's on loan
                // until the stream is disabled.
                unsafe { stream.enable() };
            }
            self.program(group);

            inner.group = Some(group);
            inner.samples = Some(samples);
            inner.depth = depth;
            inner.outcome = None;
            inner.state = State::Active;
        });
        log::trace!("ADC{} converting {count} samples", self.instance.number());
    }

    fn program(&self, group: &ConversionGroup) {
        let regs = self.registers;
        ral::write_reg!(crate::ral::adc, regs, STS, 0);
        ral::write_reg!(crate::ral::adc, regs, SPT1, group.spt1);
        ral::write_reg!(crate::ral::adc, regs, SPT2, group.spt2);
        ral::write_reg!(crate::ral::adc, regs, VMHB, group.vmhb);
        ral::write_reg!(crate::ral::adc, regs, VMLB, group.vmlb);
        let length = u32::from(group.num_channels - 1) << adc::OSQ1::OCLEN::offset;
        ral::write_reg!(crate::ral::adc, regs, OSQ1, group.osq1 | length);
        ral::write_reg!(crate::ral::adc, regs, OSQ2, group.osq2);
        ral::write_reg!(crate::ral::adc, regs, OSQ3, group.osq3);

        ral::write_reg!(crate::ral::adc, regs, CTRL1, group.ctrl1 | adc::CTRL1::OCCOIE::mask);
        let ctrl2 = group.ctrl2
            | adc::CTRL2::OCDMAEN::mask
            | adc::CTRL2::OCDRCEN::mask
            | adc::CTRL2::ADCEN::mask;
        if ctrl2 & adc::CTRL2::OCSWTRG::mask != 0 {
            // The software trigger starts on a rising edge.
            let ctrl2 = ctrl2 | adc::CTRL2::RPEN::mask;
            ral::write_reg!(crate::ral::adc, regs, CTRL2, ctrl2 & !adc::CTRL2::OCSWTRG::mask);
            ral::write_reg!(crate::ral::adc, regs, CTRL2, ctrl2);
        } else {
            ral::write_reg!(crate::ral::adc, regs, CTRL2, ctrl2);
        }
    }

    /// Stop the stream and the ordinary conversions
    ///
    /// Preempted conversion bits in `CTRL2` survive.
    fn halt(&self, stream: Option<&Stream<'a>>) {
        if let Some(stream) = stream {
            stream.disable();
        }
        ral::write_reg!(crate::ral::adc, self.registers, CTRL1, 0);
        ral::modify_reg!(
            crate::ral::adc,
            self.registers,
            CTRL2,
            OCSWTRG: 0,
            RPEN: 0,
            OCDMAEN: 0,
            OCDRCEN: 0
        );
    }

    /// Stop the running conversion, and return the sample buffer
    ///
    /// From `Ready`, only returns the buffer. Safe to call from the end and
    /// error callbacks.
    ///
    /// # Panics
    ///
    /// Panics if the driver is stopped.
    pub fn stop_conversion(&self) -> Option<&'a mut [u16]> {
        let state = self.state();
        assert!(
            state != State::Stop,
            "ADC{} stopped",
            self.instance.number()
        );
        let (samples, waker) = self.with(|inner| {
            let waker = self.abort(inner);
            // Safety: the stream is disabled.
            let samples = inner.samples.take().map(|samples| unsafe { samples.into_slice() });
            (samples, waker)
        });
        if let Some(waker) = waker {
            waker.wake();
        }
        samples
    }

    /// Halt a conversion that hasn't reached `Ready`, keeping the buffer
    fn abort(&self, inner: &mut Inner<'a>) -> Option<Waker> {
        if inner.state == State::Ready {
            return None;
        }
        self.halt(inner.stream.as_ref());
        inner.state = State::Ready;
        inner.group = None;
        if inner.outcome.is_none() {
            inner.outcome = Some(Err(AdcError::empty()));
        }
        inner.waker.take()
    }

    /// Take back the sample buffer while no conversion runs
    pub fn take_samples(&self) -> Option<&'a mut [u16]> {
        self.with(|inner| match inner.state {
            // Safety: the stream is disabled in both states.
            State::Stop | State::Ready => inner
                .samples
                .take()
                .map(|samples| unsafe { samples.into_slice() }),
            _ => None,
        })
    }

    /// Returns `true` inside the end callback when the whole buffer, or its
    /// second half, just filled
    pub fn is_buffer_complete(&self) -> bool {
        self.state() == State::Complete
    }

    /// Lend the samples that just filled to `f`
    ///
    /// Only works inside the end callback, where it lends the first half,
    /// the second half, or the whole buffer. Returns `None` elsewhere.
    pub fn with_completed_half<R>(&self, f: impl FnOnce(&[u16]) -> R) -> Option<R> {
        let (ptr, filled) = self.with(|inner| {
            let samples = inner.samples.as_ref()?;
            Some((samples.ptr.cast_const(), inner.filled.clone()?))
        })?;
        // Safety: the range is inside the buffer, and the DMA is writing the
        // other half, if anything.
        let half = unsafe { core::slice::from_raw_parts(ptr.add(filled.start), filled.len()) };
        Some(f(half))
    }

    /// Returns the DMA error that arrived without a conversion, if any
    pub fn last_error(&self) -> Option<AdcError> {
        self.with(|inner| inner.last_error)
    }

    /// Take and clear the DMA error that arrived without a conversion
    pub fn take_error(&self) -> Option<AdcError> {
        self.with(|inner| inner.last_error.take())
    }

    /// Run a one-shot `group` to completion
    ///
    /// The conversion starts on the first poll. The future resolves to
    /// `Ok(())` when the buffer is full, or to the error that stopped it.
    /// It resolves to an empty error if someone else stops the conversion.
    /// Take the buffer back with [`take_samples`](Self::take_samples).
    /// Dropping the future early stops the conversion. The sample buffer
    /// stays with the driver; take it back with [`take_samples`](Self::take_samples).
    ///
    /// # Panics
    ///
    /// Panics if `group` is circular. The first poll panics under the
    /// conditions of [`start_conversion`](Self::start_conversion).
    pub fn convert(
        &'a self,
        group: &'a ConversionGroup,
        samples: &'a mut [u16],
        depth: usize,
    ) -> Convert<'a> {
        assert!(!group.circular, "ADC convert needs a one-shot group");
        Convert {
            adc: self,
            pending: Some((group, samples, depth)),
            finished: false,
        }
    }

    /// The DMA moved the whole buffer
    fn on_full(&self) {
        let started = self.with(|inner| {
            let group = inner.group?;
            let total = group.samples(inner.depth);
            let waker = if group.circular {
                inner.filled = Some(if group.streams_halves(inner.depth) {
                    group.half(inner.depth)..total
                } else {
                    0..total
                });
                None
            } else {
                self.halt(inner.stream.as_ref());
                inner.filled = Some(0..total);
                inner.outcome = Some(Ok(()));
                inner.waker.take()
            };
            inner.state = State::Complete;
            Some((group, waker))
        });
        let Some((group, waker)) = started else {
            log::trace!("ADC{} late transfer complete", self.instance.number());
            return;
        };

        if let Some(end_cb) = group.end_cb {
            end_cb(self);
        }

        self.with(|inner| {
            inner.filled = None;
            if inner.state == State::Complete {
                if group.circular {
                    inner.state = State::Active;
                } else {
                    inner.state = State::Ready;
                    inner.group = None;
                }
            }
        });
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// The DMA moved the first half of the buffer
    fn on_half(&self) {
        let group = self.with(|inner| {
            let group = inner.group?;
            inner.filled = Some(0..group.half(inner.depth));
            Some(group)
        });
        let Some(group) = group else {
            return;
        };
        if let Some(end_cb) = group.end_cb {
            end_cb(self);
        }
        self.with(|inner| inner.filled = None);
    }

    /// Stop the conversion on `error`, and tell the group
    fn on_error(&self, error: AdcError) {
        let reported = self.with(|inner| {
            let Some(group) = inner.group else {
                inner.last_error = Some(inner.last_error.unwrap_or_default() | error);
                return None;
            };
            self.halt(inner.stream.as_ref());
            inner.outcome = Some(Err(error));
            inner.state = State::Error;
            Some((group, inner.waker.take()))
        });
        let Some((group, waker)) = reported else {
            log::warn!("ADC{} dropped {error}", self.instance.number());
            return;
        };
        log::trace!("ADC{} {error}", self.instance.number());

        if let Some(error_cb) = group.error_cb {
            error_cb(self, error);
        }

        self.with(|inner| {
            if inner.state == State::Error {
                inner.state = State::Ready;
                inner.group = None;
            }
        });
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Read and clear the status register
    pub(crate) fn take_status(&self) -> u32 {
        let sts = ral::read_reg!(crate::ral::adc, self.registers, STS);
        ral::write_reg!(crate::ral::adc, self.registers, STS, 0);
        sts
    }

    /// Serve the status flags in `sts`
    pub(crate) fn on_status(&self, sts: u32) {
        let error = self.with(|inner| {
            inner.group?;
            let mut error = AdcError::empty();
            // An overflow can latch after the conversion ended.
            if sts & adc::STS::OCCO::mask != 0 && inner.state == State::Active {
                error = error | AdcError::OVERFLOW;
            }
            if sts & adc::STS::VMOR::mask != 0 {
                error = error | AdcError::WATCHDOG;
            }
            (!error.is_empty()).then_some(error)
        });
        if let Some(error) = error {
            self.on_error(error);
        }
    }
}

impl StreamHandler for AdcDriver<'_> {
    fn on_dma_interrupt(&self, status: Status) {
        if status.is_error() {
            self.on_error(AdcError::DMA_FAILURE);
        } else if status.contains(Status::TRANSFER_COMPLETE) {
            self.on_full();
        } else if status.contains(Status::HALF_TRANSFER) {
            self.on_half();
        }
    }
}

// Safety: ODT is the ordinary data register. Its low half holds the result.
unsafe impl Source<u16> for AdcDriver<'_> {
    fn source_request(&self) -> Request {
        self.instance.request()
    }
    fn source_address(&self) -> *const u16 {
        (&self.registers.ODT as *const ral_registers::RWRegister<u32>).cast()
    }
}

/// A one-shot conversion
///
/// See [`AdcDriver::convert`].
pub struct Convert<'a> {
    adc: &'a AdcDriver<'a>,
    pending: Option<(&'a ConversionGroup, &'a mut [u16], usize)>,
    finished: bool,
}

impl Future for Convert<'_> {
    type Output = Result<(), AdcError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some((group, samples, depth)) = self.pending.take() {
            self.adc.start_conversion(group, samples, depth);
        }
        let outcome = self.adc.with(|inner| {
            let outcome = inner.outcome.take();
            if outcome.is_none() {
                inner.waker = Some(cx.waker().clone());
            }
            outcome
        });
        match outcome {
            Some(outcome) => {
                self.finished = true;
                Poll::Ready(outcome)
            }
            None => Poll::Pending,
        }
    }
}

impl Drop for Convert<'_> {
    fn drop(&mut self) {
        if self.pending.is_some() || self.finished {
            return;
        }
        // An unread outcome means the conversion already ended. The buffer
        // stays with the driver for take_samples.
        let waker = self.adc.with(|inner| {
            inner.waker = None;
            if inner.outcome.take().is_some() || inner.state == State::Stop {
                return None;
            }
            let waker = self.adc.abort(inner);
            inner.outcome = None;
            waker
        });
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::{
            fake::{Call, Platform},
            Vector,
        },
        ral::{dma, fake},
        stream::tests::{dma_fixture, Fixture},
    };
    use core::pin::pin;

    extern crate std;
    use std::{boxed::Box, cell::RefCell, thread_local, vec::Vec};

    /// Stream 1 of the fixture, vector 31
    const STREAM: usize = 1;
    const FLAG_SHIFT: u32 = 4;

    struct Bench {
        fixture: Fixture,
        adc: Static<adc::RegisterBlock>,
        common: Static<adc::CommonRegisterBlock>,
        adc_common: &'static AdcCommon<'static>,
        platform: &'static Platform,
        dma: &'static Dma<'static>,
        driver: &'static AdcDriver<'static>,
    }

    fn leak<T>(value: T) -> &'static T {
        Box::leak(Box::new(value))
    }

    fn buffer(len: usize) -> &'static mut [u16] {
        Box::leak((0..len as u16).collect::<Vec<_>>().into_boxed_slice())
    }

    fn bench() -> Bench {
        let fixture = dma_fixture();
        let platform: &'static Platform = leak(Platform::default());
        let dma = leak(Dma::new(fixture.registry, platform, platform));
        let common = fake::block::<adc::CommonRegisterBlock>();
        let adc = fake::block::<adc::RegisterBlock>();
        // Safety: blocks are in RAM.
        let adc_common =
            leak(unsafe { AdcCommon::new(fake::address(common), platform, Vector(18), 3, 1) });
        let driver = leak(unsafe {
            AdcDriver::new(
                Instance::Adc1,
                fake::address(adc),
                dma,
                adc_common,
                platform,
                AdcConfig::new(Selector::Id(STREAM)),
            )
        });
        Bench {
            fixture,
            adc,
            common,
            adc_common,
            platform,
            dma,
            driver,
        }
    }

    impl Bench {
        /// Latch DMA flags on the driver's stream, then serve it
        fn raise(&self, flags: u32) {
            self.fixture.dma.ISR.write(flags << FLAG_SHIFT);
            self.dma.on_interrupt(STREAM);
        }

        /// Latch ADC status flags, then serve the shared vector
        fn status(&self, sts: u32) {
            self.adc.STS.write(sts);
            self.adc_common.on_interrupt(&[self.driver]);
        }

        fn ccr(&self) -> u32 {
            self.fixture.dma.CH[STREAM].CCR.read()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Seen {
        End { complete: bool, first: u16, len: usize },
        Error { error: AdcError, state: State },
    }

    thread_local! {
        static SEEN: RefCell<Vec<Seen>> = RefCell::new(Vec::new());
    }

    fn seen() -> Vec<Seen> {
        SEEN.with(|seen| seen.borrow().clone())
    }

    fn record_end(adc: &AdcDriver<'_>) {
        let (first, len) = adc
            .with_completed_half(|half| (half[0], half.len()))
            .unwrap();
        let complete = adc.is_buffer_complete();
        SEEN.with(|seen| seen.borrow_mut().push(Seen::End { complete, first, len }));
    }

    fn record_error(adc: &AdcDriver<'_>, error: AdcError) {
        let state = adc.state();
        SEEN.with(|seen| seen.borrow_mut().push(Seen::Error { error, state }));
    }

    const ONE_SHOT: ConversionGroup = ConversionGroup {
        end_cb: Some(record_end),
        error_cb: Some(record_error),
        ..ConversionGroup::new(1)
    };

    const CIRCULAR: ConversionGroup = ConversionGroup {
        circular: true,
        ..ONE_SHOT
    };

    const TCIF: u32 = dma::RegisterBlock::TCIF;
    const HTIF: u32 = dma::RegisterBlock::HTIF;
    const TEIF: u32 = dma::RegisterBlock::TEIF;
    const OCCO: u32 = adc::STS::OCCO::mask;
    const VMOR: u32 = adc::STS::VMOR::mask;

    #[test]
    fn start_powers_up() {
        let bench = bench();
        bench.driver.start();
        assert_eq!(bench.driver.state(), State::Ready);
        assert_eq!(bench.driver.stream_id(), Some(STREAM));
        assert_eq!(
            bench.platform.calls(),
            [
                Call::Enable(Peripheral::Dma1),
                Call::EnableVector(Vector(31), 2),
                Call::Reset(Peripheral::Adc1),
                Call::Enable(Peripheral::Adc1),
                Call::EnableVector(Vector(18), 3),
            ]
        );
        assert_eq!(bench.fixture.mux.CHANNEL[STREAM].MUXC.read(), 5);
        assert_eq!(
            bench.fixture.dma.CH[STREAM].CPAR.read(),
            bench.driver.source_address() as u32
        );
        assert_eq!(bench.common.CCTRL.read(), 1 << 16);
        assert_eq!(bench.adc.CTRL1.read(), 0);
        assert_eq!(bench.adc.CTRL2.read(), 1);

        bench.driver.start();
        assert_eq!(bench.platform.count(Call::Enable(Peripheral::Adc1)), 1);
    }

    #[test]
    fn shared_vector_enabled_once() {
        let bench = bench();
        // Safety: block is in RAM.
        let second = leak(unsafe {
            AdcDriver::new(
                Instance::Adc2,
                fake::address(fake::block::<adc::RegisterBlock>()),
                bench.dma,
                bench.adc_common,
                bench.platform,
                AdcConfig::new(Selector::Id(2)),
            )
        });
        bench.driver.start();
        second.start();
        assert_eq!(bench.platform.count(Call::EnableVector(Vector(18), 3)), 1);
        assert_eq!(bench.fixture.mux.CHANNEL[2].MUXC.read(), 36);
    }

    #[test]
    fn stop_powers_down() {
        let bench = bench();
        bench.driver.start();
        bench.driver.stop();
        assert_eq!(bench.driver.state(), State::Stop);
        assert!(!bench.dma.is_allocated(STREAM));
        assert_eq!(bench.adc.CTRL2.read(), 0);
        assert_eq!(bench.platform.count(Call::Disable(Peripheral::Adc1)), 1);
        assert_eq!(bench.platform.count(Call::DisableVector(Vector(31))), 1);
        assert_eq!(bench.platform.count(Call::DisableVector(Vector(18))), 0);

        bench.driver.stop();
        assert_eq!(bench.platform.count(Call::Disable(Peripheral::Adc1)), 1);
    }

    #[test]
    #[should_panic(expected = "stop while Active")]
    fn stop_needs_idle_driver() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(&ONE_SHOT, buffer(4), 4);
        bench.driver.stop();
    }

    #[test]
    fn half_transfer_needs_depth() {
        const CIRC: u32 = 1 << 5;
        const HTIE: u32 = 1 << 2;
        let bench = bench();
        bench.driver.start();

        bench.driver.start_conversion(&CIRCULAR, buffer(1), 1);
        assert_eq!(bench.ccr() & (CIRC | HTIE), CIRC);
        bench.driver.stop_conversion();

        bench.driver.start_conversion(&CIRCULAR, buffer(2), 2);
        assert_eq!(bench.ccr() & (CIRC | HTIE), CIRC | HTIE);
        bench.driver.stop_conversion();

        bench.driver.start_conversion(&ONE_SHOT, buffer(8), 8);
        assert_eq!(bench.ccr() & (CIRC | HTIE), 0);
    }

    #[test]
    fn conversion_programs_stream() {
        let bench = bench();
        bench.driver.start();
        let samples = buffer(12);
        let address = samples.as_ptr() as u32;
        let group = ConversionGroup::new(3);
        bench.driver.start_conversion(leak(group), samples, 4);

        let ch = &bench.fixture.dma.CH[STREAM];
        assert_eq!(ch.CMAR.read(), address);
        assert_eq!(ch.CNDTR.read(), 12);
        // PL high | MSIZE16 | PSIZE16 | MINC | TEIE | TCIE | EN
        assert_eq!(ch.CCR.read(), 0x2000 | 0x0580 | 0x08 | 0x02 | 0x01);
    }

    #[test]
    fn conversion_programs_adc() {
        let bench = bench();
        bench.driver.start();
        let group = leak(ConversionGroup {
            ctrl1: 1 << 8,
            ctrl2: 1 << 30 | 1 << 11,
            spt1: 0x11,
            spt2: 0x22,
            vmhb: 0xFFF,
            vmlb: 0x10,
            osq1: 0x1F,
            osq2: 0x2F,
            osq3: 0x3F,
            ..ConversionGroup::new(4)
        });
        bench.adc.STS.write(0x7F);
        bench.driver.start_conversion(group, buffer(4), 1);

        let adc = &bench.adc;
        assert_eq!(adc.STS.read(), 0);
        assert_eq!(adc.SPT1.read(), 0x11);
        assert_eq!(adc.SPT2.read(), 0x22);
        assert_eq!(adc.VMHB.read(), 0xFFF);
        assert_eq!(adc.VMLB.read(), 0x10);
        assert_eq!(adc.OSQ1.read(), 0x1F | 3 << 20);
        assert_eq!(adc.OSQ2.read(), 0x2F);
        assert_eq!(adc.OSQ3.read(), 0x3F);
        assert_eq!(adc.CTRL1.read(), 1 << 8 | 1 << 26);
        // Software trigger, repeat, DMA, DMA repeat, enable
        assert_eq!(
            adc.CTRL2.read(),
            1 << 30 | 1 << 11 | 1 << 9 | 1 << 8 | 1 << 1 | 1
        );
    }

    #[test]
    fn hardware_trigger_leaves_repeat_off() {
        let bench = bench();
        bench.driver.start();
        let group = leak(ConversionGroup {
            ctrl2: 0b01 << 28,
            ..ConversionGroup::new(1)
        });
        bench.driver.start_conversion(group, buffer(1), 1);
        assert_eq!(bench.adc.CTRL2.read(), 0b01 << 28 | 1 << 9 | 1 << 8 | 1);
    }

    #[test]
    fn stop_conversion_keeps_preempted_bits() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(&CIRCULAR, buffer(4), 4);
        let preempted = 1 << 22 | 0b11 << 20;
        bench.adc.CTRL2.write(bench.adc.CTRL2.read() | preempted | 1 << 30);

        let samples = bench.driver.stop_conversion().unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(bench.adc.CTRL1.read(), 0);
        assert_eq!(bench.adc.CTRL2.read() & (1 << 30), 0);
        assert_eq!(bench.adc.CTRL2.read() & preempted, preempted);
        // Repeat, DMA and DMA repeat go, the converter stays on.
        assert_eq!(bench.adc.CTRL2.read() & (1 << 9 | 1 << 8 | 1 << 1 | 1), 1);
        assert_eq!(bench.ccr() & 1, 0);
        assert_eq!(bench.driver.state(), State::Ready);
        assert!(bench.driver.group().is_none());
    }

    #[test]
    fn one_shot_completes_once() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(&ONE_SHOT, buffer(8), 8);

        bench.raise(TCIF);
        assert_eq!(
            seen(),
            [Seen::End {
                complete: true,
                first: 0,
                len: 8
            }]
        );
        assert_eq!(bench.driver.state(), State::Ready);
        assert_eq!(bench.ccr() & 1, 0);

        assert_eq!(bench.driver.stop_conversion().map(|s| s.len()), Some(8));
        assert!(bench.driver.group().is_none());

        // Late flags find no group, and no enabled interrupt.
        bench.raise(TCIF);
        assert_eq!(seen().len(), 1);
    }

    #[test]
    fn circular_reports_halves_in_order() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(&CIRCULAR, buffer(16), 16);

        bench.raise(HTIF);
        bench.raise(TCIF);
        assert_eq!(
            seen(),
            [
                Seen::End {
                    complete: false,
                    first: 0,
                    len: 8
                },
                Seen::End {
                    complete: true,
                    first: 8,
                    len: 8
                },
            ]
        );
        assert_eq!(bench.driver.state(), State::Active);
        assert_eq!(bench.ccr() & 1, 1);
        assert!(bench.driver.with_completed_half(|_| ()).is_none());
    }

    #[test]
    fn end_callback_may_stop() {
        fn stop_now(adc: &AdcDriver<'_>) {
            assert!(adc.stop_conversion().is_some());
        }
        let bench = bench();
        bench.driver.start();
        let group = leak(ConversionGroup {
            circular: true,
            end_cb: Some(stop_now),
            ..ConversionGroup::new(2)
        });
        bench.driver.start_conversion(group, buffer(8), 4);

        bench.raise(TCIF);
        assert_eq!(bench.driver.state(), State::Ready);
        assert!(bench.driver.group().is_none());
        assert_eq!(bench.ccr() & 1, 0);
    }

    #[test]
    fn overflow_reported_while_active() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(&CIRCULAR, buffer(4), 4);

        bench.status(OCCO);
        assert_eq!(bench.adc.STS.read(), 0);
        assert_eq!(
            seen(),
            [Seen::Error {
                error: AdcError::OVERFLOW,
                state: State::Error
            }]
        );
        assert_eq!(bench.driver.state(), State::Ready);
        assert!(bench.driver.group().is_none());
        assert_eq!(bench.ccr() & 1, 0);
    }

    #[test]
    fn overflow_suppressed_once_conversion_ends() {
        fn late_overflow(adc: &AdcDriver<'_>) {
            adc.on_status(OCCO);
            record_end(adc);
        }
        let bench = bench();
        bench.driver.start();
        let group = leak(ConversionGroup {
            end_cb: Some(late_overflow),
            ..ONE_SHOT
        });
        bench.driver.start_conversion(group, buffer(2), 2);
        bench.raise(TCIF);
        assert_eq!(
            seen(),
            [Seen::End {
                complete: true,
                first: 0,
                len: 2
            }]
        );

        bench.status(OCCO | VMOR);
        assert_eq!(seen().len(), 1);
    }

    #[test]
    fn status_errors_combine() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(&CIRCULAR, buffer(4), 4);
        bench.status(OCCO | VMOR);
        assert_eq!(
            seen(),
            [Seen::Error {
                error: AdcError::OVERFLOW | AdcError::WATCHDOG,
                state: State::Error
            }]
        );
    }

    #[test]
    fn dma_error_stops_conversion() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(&CIRCULAR, buffer(4), 4);
        bench.raise(TEIF | TCIF);
        assert_eq!(
            seen(),
            [Seen::Error {
                error: AdcError::DMA_FAILURE,
                state: State::Error
            }]
        );
        assert_eq!(bench.driver.state(), State::Ready);
        assert_eq!(bench.driver.last_error(), None);
        assert_eq!(bench.driver.take_samples().map(|s| s.len()), Some(4));
    }

    #[test]
    fn dma_error_without_group_is_kept() {
        let bench = bench();
        bench.driver.start();
        bench.driver.on_dma_interrupt(Status::TRANSFER_ERROR);
        assert!(seen().is_empty());
        assert_eq!(bench.driver.last_error(), Some(AdcError::DMA_FAILURE));
        assert_eq!(bench.driver.take_error(), Some(AdcError::DMA_FAILURE));
        assert_eq!(bench.driver.take_error(), None);
    }

    #[test]
    fn samples_stay_on_loan_while_converting() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(&CIRCULAR, buffer(4), 4);
        assert!(bench.driver.take_samples().is_none());
        bench.driver.stop_conversion();
        assert!(bench.driver.take_samples().is_none());
    }

    #[test]
    #[should_panic(expected = "buffer too small")]
    fn buffer_must_hold_every_round() {
        let bench = bench();
        bench.driver.start();
        bench.driver.start_conversion(leak(ConversionGroup::new(2)), buffer(7), 4);
    }

    #[test]
    fn convert_resolves_on_completion() {
        let bench = bench();
        bench.driver.start();
        let mut convert = pin!(bench.driver.convert(leak(ConversionGroup::new(1)), buffer(4), 4));
        assert!(crate::poll_no_wake(convert.as_mut()).is_pending());
        assert_eq!(bench.driver.state(), State::Active);

        bench.raise(TCIF);
        assert_eq!(crate::poll_no_wake(convert.as_mut()), Poll::Ready(Ok(())));
        assert_eq!(bench.driver.take_samples().map(|s| s.len()), Some(4));
    }

    #[test]
    fn convert_resolves_on_error() {
        let bench = bench();
        bench.driver.start();
        let mut convert = pin!(bench.driver.convert(leak(ConversionGroup::new(1)), buffer(4), 4));
        assert!(crate::poll_no_wake(convert.as_mut()).is_pending());

        bench.raise(TEIF);
        assert_eq!(
            crate::poll_no_wake(convert.as_mut()),
            Poll::Ready(Err(AdcError::DMA_FAILURE))
        );
    }

    #[test]
    fn dropping_convert_stops_conversion() {
        let bench = bench();
        bench.driver.start();
        {
            let mut convert =
                pin!(bench.driver.convert(leak(ConversionGroup::new(1)), buffer(4), 4));
            assert!(crate::poll_no_wake(convert.as_mut()).is_pending());
        }
        assert_eq!(bench.driver.state(), State::Ready);
        assert_eq!(bench.ccr() & 1, 0);
        assert_eq!(bench.driver.take_samples().map(|s| s.len()), Some(4));
    }

    #[test]
    fn dropping_finished_convert_keeps_samples() {
        let bench = bench();
        bench.driver.start();
        {
            let mut convert =
                pin!(bench.driver.convert(leak(ConversionGroup::new(1)), buffer(4), 4));
            assert!(crate::poll_no_wake(convert.as_mut()).is_pending());
            bench.raise(TCIF);
        }
        assert_eq!(bench.driver.state(), State::Ready);
        assert_eq!(bench.driver.take_samples().map(|s| s.len()), Some(4));
    }

    #[test]
    fn dropping_convert_after_stop() {
        let bench = bench();
        bench.driver.start();
        {
            let mut convert =
                pin!(bench.driver.convert(leak(ConversionGroup::new(1)), buffer(4), 4));
            assert!(crate::poll_no_wake(convert.as_mut()).is_pending());
            bench.raise(TCIF);
            bench.driver.stop();
        }
        assert_eq!(bench.driver.state(), State::Stop);
        assert_eq!(bench.driver.take_samples().map(|s| s.len()), Some(4));
    }
}
