//! A bounded, wait-free multi-producer multi-consumer ring buffer.
//!
//! The Dmitry Vyukov sequence-counter algorithm, grounded in
//! `include/logging/processors/async_wait_free_queue.h` (original_source).
//! Producers CAS the tail against a slot's sequence counter; consumers CAS
//! the head the same way. Cache-line padding around the head, tail, and
//! each slot prevents false sharing between producer and consumer cores.

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<Option<T>>,
}

/// A bounded MPMC ring buffer of power-of-two capacity.
///
/// # Safety
/// Every slot access is mediated by its sequence counter: a producer only
/// writes a slot it has exclusively claimed (sequence == tail), and a
/// consumer only reads a slot a producer has published (sequence == head +
/// 1). No two threads ever touch the same slot's `UnsafeCell` concurrently.
pub struct RingBuffer<T> {
    buffer: Box<[Slot<T>]>,
    mask: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a ring of the given capacity. Returns `None` unless capacity
    /// is a nonzero power of two.
    pub fn new(capacity: usize) -> Option<RingBuffer<T>> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return None;
        }
        let buffer: Box<[Slot<T>]> = (0..capacity)
            .map(|i| Slot { sequence: AtomicUsize::new(i), value: UnsafeCell::new(None) })
            .collect();
        Some(RingBuffer {
            buffer,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Attempts to enqueue `value` without blocking. Returns `Err(value)`
    /// if the ring is currently full.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut pos = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;

            if diff == 0 {
                match self.tail.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe { *slot.value.get() = Some(value) };
                        slot.sequence.store(pos + 1, Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return Err(value);
            } else {
                pos = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempts to dequeue a value without blocking. Returns `None` if the
    /// ring is currently empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut pos = self.head.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - (pos as isize + 1);

            if diff == 0 {
                match self.head.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*slot.value.get()).take() };
                        slot.sequence.store(pos.wrapping_add(self.mask + 1), Ordering::Release);
                        return value;
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.head.load(Ordering::Relaxed);
            }
        }
    }
}
