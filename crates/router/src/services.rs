pub mod api;
pub mod collaborators;

pub use self::api::{server_wrap, ApplicationResponse};
