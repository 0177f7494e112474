#![forbid(unsafe_code)]
#![warn(missing_docs)]

//!
//! Wrapper types for credentials and signing secrets which keep them out of `Debug` output.
//!

#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR" ), "/", "README.md"))]

mod strategy;
pub use strategy::{Strategy, WithType, WithoutType};

mod abs;
pub use abs::{ExposeInterface, ExposeOptionInterface, PeekInterface};

mod secret;
pub use secret::Secret;

#[cfg(feature = "serde")]
mod serde;
#[cfg(feature = "serde")]
pub use crate::serde::SerializableSecret;

/// This module should be included with asterisk.
///
/// `use masking::prelude::*;`
pub mod prelude {
    pub use super::{ExposeInterface, ExposeOptionInterface, PeekInterface};
}

pub mod maskable;
pub use maskable::{Mask, Maskable};
