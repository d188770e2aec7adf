// Copyright (c) 2024 Mike Tsao

//! Running a transmission: the two-slot buffer exchange between the reading
//! and encoding contexts, how those contexts wait, and the session that ties
//! them to an output queue.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{ReplayQueue, SessionReport, StopHandle, TerminationReason, Transmitter};
}

pub use {
    exchange::{BufferExchange, SlotBuffers, SlotCursor, SlotState},
    queue::ReplayQueue,
    session::{SessionReport, StopHandle, TerminationReason, Transmitter},
    wait::PollWaiter,
};

mod exchange;
mod queue;
mod session;
mod wait;
