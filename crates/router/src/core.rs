pub mod errors;
pub mod gateway_registry;
pub mod payments;
pub mod reconciliation;
pub mod redirect;
pub mod webhooks;
