pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod import;
pub mod rate_limit;
pub mod routes;
pub mod state;
