mod defaults;
pub mod settings;
mod validations;

pub use settings::Settings;
