#![forbid(unsafe_code)]

pub mod config;
pub mod discord;
pub mod errors;
pub mod http;
pub mod images;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod plane;
pub mod reqlog;
pub mod signature;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
