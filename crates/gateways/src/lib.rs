//! Payment provider adapters
#![warn(missing_debug_implementations)]

pub mod constants;
pub mod gateways;
pub(crate) mod utils;

pub use gateways::{Airwallex, Alikassa, Blockonomics, Firekassa, Mulenpay};
