// Copyright (c) 2024 The tactus authors

//! Interchange output for external renderers.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{to_musicxml, ExportError};
}

pub use musicxml::{to_musicxml, ExportError};

mod musicxml;
