//! Kindle Gateway: forwards e-book attachments to Kindle delivery addresses.

pub mod config;
pub mod converter;
pub mod error;
pub mod mail;
pub mod pipeline;
pub mod scratch;
pub mod server;
pub mod store;
