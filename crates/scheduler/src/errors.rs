pub use common_utils::errors::CustomResult;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueueError {
    #[error("Message {0} is not in flight, it was committed or its visibility timed out")]
    MessageNotInFlight(String),
    #[error("Failed to publish the message")]
    PublishFailed,
    #[error("Failed to read messages from the queue")]
    ConsumeFailed,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProcessTrackerError {
    #[error("Failed to serialize object")]
    SerializationFailed,
    #[error("Failed to deserialize object")]
    DeserializationFailed,
    #[error("Failed to fetch messages from the queue")]
    QueueFetchFailed,
    #[error("Failed to commit the message")]
    CommitFailed,
    #[error("Failed to re-publish the message")]
    RepublishFailed,
    #[error("Storage operation failed")]
    EStorageError,
    #[error("Resource referenced by the message does not exist")]
    ResourceNotFound,
    #[error("Failed while executing {flow}")]
    FlowExecutionError { flow: &'static str },
    #[error("The workflow is not implemented")]
    NotImplemented,
}
