pub mod accounts;
pub mod history;
pub mod media;
