pub mod internal_listeners;
pub mod webhook_delivery;

pub use self::{
    internal_listeners::{InternalWebhookListener, InternalWebhookWorkflow, ListenerRegistry},
    webhook_delivery::OutgoingWebhookDeliveryWorkflow,
};
