//! Payment gateway interface
#![warn(missing_debug_implementations)]

pub mod api;
pub mod api_client;
/// Configuration of the gateway endpoints
pub mod configs;
/// Constants used by the adapters
pub mod consts;
pub mod errors;
pub mod types;
pub mod webhooks;

pub use api::{Gateway, GatewayCommon};
pub use api_client::GatewayCallContext;
