// Copyright (c) 2024 Mike Tsao

//! System utilities.

/// Commonly used imports.
pub mod prelude {
    pub use super::settings::{
        Configuration, ConfigurationBuilder, FilterMode, SignalMode, StallPolicy,
    };
}

pub use settings::{Configuration, ConfigurationBuilder, FilterMode, SignalMode, StallPolicy};

mod settings;
