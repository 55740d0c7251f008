//! Interrupt-driven limit-switch event queue.
//!
//! GPIO edge ISRs produce [`GpioEvent`]s; exactly one consumer task drains
//! them.  Nothing else is shared between interrupt context and the tasks.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ GPIO4 ISR   │────▶│ InputEventQueue  │────▶│ Limit-switch     │
//! │ GPIO5 ISR   │────▶│ (lock-free SPSC) │     │ task (consumer)  │
//! └─────────────┘     └──────────────────┘     └──────────────────┘
//! ```
//!
//! The queue is bounded: under an interrupt storm (switch bounce) the newest
//! event is dropped and counted rather than growing without limit.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::pins::PinId;

/// Slots in the firmware's limit-switch queue.
pub const INPUT_EVENT_CAPACITY: usize = 10;

/// One captured edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioEvent {
    pub pin: PinId,
    /// Microseconds since boot when the ISR ran.
    pub timestamp_us: u64,
}

impl GpioEvent {
    const EMPTY: Self = Self {
        pin: -1,
        timestamp_us: 0,
    };

    pub const fn new(pin: PinId, timestamp_us: u64) -> Self {
        Self { pin, timestamp_us }
    }
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// ISRs write (produce), the consumer task reads.  Head and tail run over
// 0..2N so that "full" (distance N) and "empty" (distance 0) differ without
// sacrificing a slot.  Each side claims its end with a non-waiting atomic
// swap; a second producer or consumer arriving concurrently backs off
// instead of touching the slots.

/// Limit-switch edges: GPIO ISRs → limit-switch task.
pub static INPUT_EVENTS: InputEventQueue = InputEventQueue::new();

/// Bounded FIFO from interrupt context to a single consumer task.
pub struct InputEventQueue<const N: usize = INPUT_EVENT_CAPACITY> {
    slots: [UnsafeCell<GpioEvent>; N],
    head: AtomicUsize,
    tail: AtomicUsize,
    dropped: AtomicU32,
    producing: AtomicBool,
    consuming: AtomicBool,
}

// SAFETY: a slot is written only by the side holding `producing` while it is
// outside the live window (tail..head), and read only by the side holding
// `consuming` while it is inside.  The Release store of `head` after a write
// and its Acquire load before a read order the slot access; likewise for
// `tail` in the other direction.
unsafe impl<const N: usize> Sync for InputEventQueue<N> {}

impl<const N: usize> Default for InputEventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> InputEventQueue<N> {
    pub const fn new() -> Self {
        const { assert!(N > 0, "queue capacity must be non-zero") };
        Self {
            slots: [const { UnsafeCell::new(GpioEvent::EMPTY) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            dropped: AtomicU32::new(0),
            producing: AtomicBool::new(false),
            consuming: AtomicBool::new(false),
        }
    }

    /// Enqueue an event.  Never blocks, never allocates; ISR safe.
    /// Returns `false` if the event was dropped (queue full or contended).
    pub fn push(&self, event: GpioEvent) -> bool {
        if self.producing.swap(true, Ordering::Acquire) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        let accepted = if Self::distance(head, tail) == N {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        } else {
            // SAFETY: slot `head % N` is outside the live window and we hold
            // the producer claim.
            unsafe {
                *self.slots[head % N].get() = event;
            }
            self.head.store(Self::advance(head), Ordering::Release);
            true
        };

        self.producing.store(false, Ordering::Release);
        accepted
    }

    /// Dequeue the oldest event, if any.  Non-blocking.
    pub fn try_pop(&self) -> Option<GpioEvent> {
        if self.consuming.swap(true, Ordering::Acquire) {
            return None;
        }

        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        let event = if tail == head {
            None
        } else {
            // SAFETY: slot `tail % N` is inside the live window, published by
            // the producer's Release store of `head`, and we hold the
            // consumer claim.
            let event = unsafe { *self.slots[tail % N].get() };
            self.tail.store(Self::advance(tail), Ordering::Release);
            Some(event)
        };

        self.consuming.store(false, Ordering::Release);
        event
    }

    /// Block the consumer task until an event arrives, sleeping
    /// `poll_interval` between checks so interrupt context never has to
    /// wake anyone.
    pub fn pop(&self, poll_interval: Duration) -> GpioEvent {
        loop {
            if let Some(event) = self.try_pop() {
                return event;
            }
            std::thread::sleep(poll_interval);
        }
    }

    /// Like [`pop`](Self::pop) but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration, poll_interval: Duration) -> Option<GpioEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.try_pop() {
                return Some(event);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            std::thread::sleep(poll_interval.min(deadline - now));
        }
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(GpioEvent)) {
        while let Some(event) = self.try_pop() {
            handler(event);
        }
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        Self::distance(head, tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Events rejected since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    // ── Internal ──────────────────────────────────────────────

    const fn advance(index: usize) -> usize {
        (index + 1) % (2 * N)
    }

    const fn distance(head: usize, tail: usize) -> usize {
        (head + 2 * N - tail) % (2 * N)
    }
}
