// Copyright (c) 2024 Mike Tsao

//! Where audio comes from.

/// The most commonly used imports.
pub mod prelude {
    pub use super::MemorySource;
    #[cfg(feature = "hound")]
    pub use super::WavSource;
}

pub use memory::MemorySource;
#[cfg(feature = "hound")]
pub use wav::WavSource;

mod memory;
#[cfg(feature = "hound")]
mod wav;
