pub mod errors;
pub mod mock_db;

pub use mock_db::MockDb;
