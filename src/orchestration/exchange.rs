// Copyright (c) 2024 Mike Tsao

use crate::types::prelude::*;
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Mutex, MutexGuard, PoisonError,
};
use strum_macros::Display;

/// Where a slot is in its cycle. Each transition is made by exactly one side:
/// the producer publishes `Filling -> ReadyForConsumer`, and the consumer
/// makes the other two.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Owned by the producer.
    Filling = 0,
    /// Published and waiting for the consumer.
    ReadyForConsumer = 1,
    /// Owned by the consumer.
    Draining = 2,
}
impl SlotState {
    /// Convert from raw u8 value.
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SlotState::ReadyForConsumer,
            2 => SlotState::Draining,
            _ => SlotState::Filling,
        }
    }
}

/// The two buffers of a slot, always the same length.
#[derive(Debug)]
pub struct SlotBuffers {
    /// Mono samples written by the producer.
    pub audio: Vec<AudioSample>,
    /// Pulse words written by the consumer.
    pub encoded: Vec<u32>,
}

#[derive(Debug)]
struct Slot {
    state: AtomicU8,
    buffers: Mutex<SlotBuffers>,
}
impl Slot {
    fn new(buffer_len: usize) -> Self {
        Self {
            state: AtomicU8::new(SlotState::Filling as u8),
            buffers: Mutex::new(SlotBuffers {
                audio: vec![0; buffer_len],
                encoded: vec![0; buffer_len],
            }),
        }
    }

    // The state protocol means the lock is never contended. A panic on the
    // other side poisons it, and the session reports that panic separately.
    fn lock(&self) -> MutexGuard<'_, SlotBuffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Which slot one side visits next. Each side walks the slots in strict
/// alternation, so buffers come out in the order they went in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCursor(usize);
impl SlotCursor {
    #[allow(missing_docs)]
    pub fn index(&self) -> usize {
        self.0
    }

    fn advance(&mut self) {
        self.0 = (self.0 + 1) % BufferExchange::SLOT_COUNT;
    }
}

/// A two-slot handoff between one producer and one consumer. At most two
/// buffers are ever published, and a slot is never written by one side while
/// the other reads it.
#[derive(Debug)]
pub struct BufferExchange {
    slots: [Slot; Self::SLOT_COUNT],
    buffer_len: usize,
}
impl BufferExchange {
    /// Slots in the exchange.
    pub const SLOT_COUNT: usize = 2;

    /// Both slots start out `Filling`, with zeroed buffers of `buffer_len`
    /// samples.
    pub fn new(buffer_len: usize) -> Self {
        Self {
            slots: [Slot::new(buffer_len), Slot::new(buffer_len)],
            buffer_len,
        }
    }

    #[allow(missing_docs)]
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// The current state of `slot`.
    pub fn state(&self, slot: usize) -> SlotState {
        SlotState::from_u8(self.slots[slot % Self::SLOT_COUNT].state.load(Ordering::Acquire))
    }

    /// How many slots are published and not yet picked up.
    pub fn ready_count(&self) -> usize {
        (0..Self::SLOT_COUNT)
            .filter(|&i| self.state(i) == SlotState::ReadyForConsumer)
            .count()
    }

    /// Producer side. If the cursor's slot is `Filling`, hands its audio
    /// buffer to `fill`, publishes it, and advances the cursor. Returns `None`
    /// without calling `fill` if the slot is still waiting to be drained.
    pub fn try_fill<R>(
        &self,
        cursor: &mut SlotCursor,
        fill: impl FnOnce(&mut [AudioSample]) -> R,
    ) -> Option<R> {
        let slot = &self.slots[cursor.index()];
        if SlotState::from_u8(slot.state.load(Ordering::Acquire)) != SlotState::Filling {
            return None;
        }
        let result = {
            let mut buffers = slot.lock();
            fill(&mut buffers.audio)
        };
        slot.state
            .store(SlotState::ReadyForConsumer as u8, Ordering::Release);
        cursor.advance();
        Some(result)
    }

    /// Consumer side. If the cursor's slot is published, marks it
    /// `Draining`, hands both of its buffers to `drain`, returns it to
    /// `Filling`, and advances the cursor. Returns `None` without calling
    /// `drain` if nothing is published there yet.
    pub fn try_drain<R>(
        &self,
        cursor: &mut SlotCursor,
        drain: impl FnOnce(&[AudioSample], &mut [u32]) -> R,
    ) -> Option<R> {
        let slot = &self.slots[cursor.index()];
        if slot
            .state
            .compare_exchange(
                SlotState::ReadyForConsumer as u8,
                SlotState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return None;
        }
        let result = {
            let mut guard = slot.lock();
            let SlotBuffers { audio, encoded } = &mut *guard;
            drain(audio, encoded)
        };
        slot.state.store(SlotState::Filling as u8, Ordering::Release);
        cursor.advance();
        Some(result)
    }
}
