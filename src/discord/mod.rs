//! Outbound delivery of notifications to a chat webhook.

pub mod client;

use std::future::Future;
use std::pin::Pin;

use crate::models::notification::ChatMessage;
use crate::Result;

pub use client::DiscordWebhook;

/// Hands a finished message to the chat platform.
///
/// Implementations make exactly one delivery attempt; retry policy is
/// the caller's concern.
pub trait Forwarder: Send + Sync {
    /// Deliver `message`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forward` on transport failure or a non-2xx reply.
    fn forward<'a>(
        &'a self,
        message: &'a ChatMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
