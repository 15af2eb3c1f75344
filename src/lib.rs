pub mod commands;
pub mod config;
pub mod errors;
pub mod http;
pub mod portal;
pub mod query;
pub mod runtime;
pub mod session;
