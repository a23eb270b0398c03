//! An abstraction layer for generative models that understand images.
//!
//! This crate establishes the protocol the orchestration layer speaks
//! with a model provider: what a request looks like (a system
//! instruction plus multi-part messages), how a response streams back,
//! and how failures are classified.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
