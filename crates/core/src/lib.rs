pub mod error;
pub mod models;
pub mod query;
pub mod types;
