//! DMA-powered memcpy
//!
//! Memory-to-memory transfers don't wait for requests, so they need no
//! interrupt. The [`Memcpy`] future polls the remaining count.

use crate::{
    configuration::{self, Configuration, Direction},
    element::Element,
    error::Error,
    stream::Stream,
};

use core::{
    future::Future,
    marker::PhantomData,
    pin::Pin,
    task::{Context, Poll},
};

/// Start a memory-to-memory copy of `elements` elements
///
/// `mode` adds to the incrementing memory-to-memory mode, for example to
/// raise the priority or enable interrupts. The stream is enabled on
/// return. Wait with [`Stream::wait_completion`], or poll
/// [`Stream::transfer_size`].
///
/// # Safety
///
/// Both regions must hold `elements` elements, and stay valid until the copy
/// completes.
///
/// # Panics
///
/// Panics if `elements` exceeds [`MAX_TRANSFER`](crate::stream::MAX_TRANSFER).
pub unsafe fn start_memcpy<E: Element>(
    stream: &Stream<'_>,
    mode: u32,
    source: *const E,
    destination: *mut E,
    elements: usize,
) {
    let kind = stream.kind();
    let copy = Configuration {
        peripheral_width: E::WIDTH,
        memory_width: E::WIDTH,
        peripheral_increment: true,
        memory_increment: true,
        ..Configuration::new(Direction::MemoryToMemory)
    };
    stream.set_peripheral_address(source);
    stream.set_memory_address(destination);
    stream.set_transfer_size(elements);
    stream.set_mode(mode | copy.mode(kind) | configuration::enable_mask(kind));
}

/// A memcpy operation
///
/// The future yields when the copy is complete. Dropping it early stops
/// the copy.
pub struct Memcpy<'a, E> {
    stream: &'a Stream<'a>,
    source: *const E,
    destination: *mut E,
    elements: usize,
    started: bool,
    done: bool,
    _buffers: PhantomData<&'a mut [E]>,
}

/// Perform a DMA-powered `memcpy` between the `source` and `destination` buffers
///
/// Copies the minimum number of elements between the two buffers. The
/// copy starts on the first poll.
///
/// # Panics
///
/// The first poll panics if the copy exceeds
/// [`MAX_TRANSFER`](crate::stream::MAX_TRANSFER) elements.
pub fn memcpy<'a, E: Element>(
    source: &'a [E],
    destination: &'a mut [E],
    stream: &'a mut Stream<'_>,
) -> Memcpy<'a, E> {
    Memcpy {
        stream,
        source: source.as_ptr(),
        destination: destination.as_mut_ptr(),
        elements: source.len().min(destination.len()),
        started: false,
        done: false,
        _buffers: PhantomData,
    }
}

impl<E: Element> Future for Memcpy<'_, E> {
    type Output = Result<(), Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.done {
            return Poll::Ready(Ok(()));
        }
        if !self.started {
            self.stream.disable();
            // Safety: the buffers are borrowed for the life of the future.
            unsafe {
                start_memcpy(
                    self.stream,
                    0,
                    self.source,
                    self.destination,
                    self.elements,
                )
            };
            self.started = true;
        }

        let status = self.stream.status();
        if status.is_error() {
            self.stream.disable();
            self.done = true;
            Poll::Ready(Err(Error::Transfer(status)))
        } else if self.stream.transfer_size() == 0 {
            self.stream.disable();
            self.done = true;
            Poll::Ready(Ok(()))
        } else {
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

impl<E> Drop for Memcpy<'_, E> {
    fn drop(&mut self) {
        if self.started && !self.done {
            self.stream.disable();
        }
    }
}
