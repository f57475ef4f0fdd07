//! DMA stream allocation and ADC drivers for AT32 processors
//!
//! `at32-lld` provides
//!
//! - a [`Registry`](registry::Registry) describing the DMA units, channels
//!   and vectors of a device, with an [`at32f43x`](registry::at32f43x)
//!   description
//! - a stream allocator, [`Dma`], that hands out [`Stream`]s, routes request
//!   lines through the DMAMUX, and dispatches stream interrupts
//! - a transfer programmer on [`Stream`], with typed [`Configuration`]s
//! - a DMA-powered [`memcpy`](memcpy::memcpy) future
//! - an ADC driver, [`AdcDriver`](adc::AdcDriver), that streams conversions
//!   into a sample buffer
//!
//! The drivers don't touch the clock or interrupt controllers directly. Supply
//! them through the traits in [`platform`].
//!
//! # Portability
//!
//! Basic DMA units come with or without a DMAMUX. Units without one either
//! have fixed request wiring, or a channel selection register. Describe your
//! device's units in a [`Registry`](registry::Registry). Enhanced DMA (EDMA)
//! streams are supported too.
//!
//! ### License
//!
//! Licensed under either of
//!
//! - [Apache License, Version 2.0](http://www.apache.org/licenses/LICENSE-2.0) ([LICENSE-APACHE](./LICENSE-APACHE))
//! - [MIT License](http://opensource.org/licenses/MIT) ([LICENSE-MIT](./LICENSE-MIT))
//!
//! at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted
//! for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
//! dual licensed as above, without any additional terms or conditions.

#![no_std]

pub mod adc;
pub mod configuration;
mod dma;
mod element;
mod error;
mod interrupt;
pub mod memcpy;
mod mux;
pub mod peripheral;
pub mod platform;
mod ral;
pub mod registry;
pub mod request;
pub mod stream;

pub use configuration::{Configuration, Direction, Priority};
pub use dma::{Dma, Selector, MAX_PRIORITY};
pub use element::{Element, Width};
pub use error::{AdcError, Error};
pub use interrupt::{Event, Status, StreamHandler};
pub use request::Request;
pub use stream::Stream;

/// A DMA result
pub type Result<T> = core::result::Result<T, Error>;

use core::{future::Future, pin::Pin, task::Poll};

/// Poll a future with a dummy waker.
///
/// Use `poll_no_wake` when you want to drive a future to completion, but you
/// don't care about the future waking an executor. It may be used to start
/// a DMA copy or an ADC conversion that will later be awaited with [`block`].
///
/// Do not use `poll_no_wake` if you want an executor to be woken when the
/// transfer completes.
pub fn poll_no_wake<F>(future: Pin<&mut F>) -> Poll<F::Output>
where
    F: Future,
{
    use core::task::{Context, RawWaker, RawWakerVTable, Waker};
    const VTABLE: RawWakerVTable = RawWakerVTable::new(|_| RAW_WAKER, |_| {}, |_| {}, |_| {});

    const RAW_WAKER: RawWaker = RawWaker::new(core::ptr::null(), &VTABLE);
    // Safety: raw waker meets documented requirements.
    let waker = unsafe { Waker::from_raw(RAW_WAKER) };
    let mut context = Context::from_waker(&waker);
    future.poll(&mut context)
}

/// Block until the future returns a result.
///
/// `block` invokes [`poll_no_wake`] in a loop until the future
/// returns a result. Consider using `block` after starting a transfer
/// with `poll_no_wake`, and after doing other work.
pub fn block<F>(mut future: Pin<&mut F>) -> F::Output
where
    F: Future,
{
    loop {
        match poll_no_wake(future.as_mut()) {
            Poll::Ready(result) => return result,
            Poll::Pending => {}
        }
    }
}
