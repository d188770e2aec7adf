// Copyright (c) 2024 Mike Tsao

//! Services that run alongside an amwave session on their own threads and
//! communicate by crossbeam channels.

#![deny(missing_docs)]

/// The most commonly used imports.
pub mod prelude {
    pub use super::{ReplayHardwareService, ReplayServiceEvent, ReplayServiceInput};
}

pub use replay::{ReplayHardwareService, ReplayServiceEvent, ReplayServiceInput};

mod replay;
