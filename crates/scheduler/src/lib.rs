pub mod configs;
pub mod consumer;
pub mod db;
pub mod errors;
pub mod settings;
pub mod utils;

pub use self::{
    consumer::{start_consumer, workflows::QueueWorkflow, SchedulerAppState},
    db::queue::{InMemoryQueue, MessageQueue, QueueMessage, QueueMessageNew},
};
