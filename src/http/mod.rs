//! Inbound HTTP surface.

pub mod server;

pub use server::{router, serve};
