pub mod app;
pub mod health;
pub mod redirect;
pub mod webhooks;

pub use self::app::{AppState, Collaborators, Gateway, Health};
