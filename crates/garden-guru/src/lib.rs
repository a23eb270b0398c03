//! Garden Guru: identify a plant from a photo, then chat about its care.
//!
//! The crate wires the Gemini provider into the orchestration core and
//! includes a terminal front-end. Use it as a library to embed the same
//! workbench in another host.

#![deny(missing_docs)]

mod config;

pub use config::{API_KEY_VAR, BASE_URL_VAR, Config, ConfigError, MODEL_VAR};

/// Re-exports of [`garden_guru_core`] crate.
pub mod core {
    pub use garden_guru_core::*;
}
