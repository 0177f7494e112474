pub mod incoming;
pub mod outgoing;
pub mod types;
pub mod utils;

pub use self::{
    incoming::receive_incoming_webhook,
    outgoing::{
        emit, list_dead_deliveries, list_dead_messages, republish_stale_messages,
        retry_dead_delivery, retry_dead_message,
    },
};
