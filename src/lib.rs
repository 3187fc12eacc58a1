pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod process;
pub mod schema;
pub mod server;
pub mod source;
