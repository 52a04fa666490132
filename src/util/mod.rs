// Copyright (c) 2024 The tactus authors

//! Various helpers.

/// The most commonly used imports.
pub mod prelude {
    pub use super::Rng;
}

pub use rng::Rng;

mod rng;
