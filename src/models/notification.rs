//! Chat notification document, serialized as a Discord embed.

use serde::{Deserialize, Serialize};

/// Embed colors used by the notification builder.
pub mod hue {
    /// Default for created and updated issues.
    pub const INFORMATIONAL: u32 = 0x0034_98db;
    /// New comments.
    pub const COMMENT: u32 = 0x008e_da8e;
    /// Deletions.
    pub const ALERT: u32 = 0x00ff_4444;
    /// Transitions into a completed state.
    pub const SUCCESS: u32 = 0x008e_da8e;
    /// Transitions into an in-progress state.
    pub const WARNING: u32 = 0x00ff_d700;
}

/// Maximum embed title length accepted by Discord.
pub const TITLE_LIMIT: usize = 256;
/// Maximum embed description length accepted by Discord.
pub const DESCRIPTION_LIMIT: usize = 4096;
/// Maximum embed field value length accepted by Discord.
pub const FIELD_VALUE_LIMIT: usize = 1024;

/// A named value rendered inside the embed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedField {
    /// Field label.
    pub name: String,
    /// Field content.
    pub value: String,
    /// Render side by side with neighbouring inline fields.
    pub inline: bool,
}

impl EmbedField {
    /// Build an inline field, truncating the value to the platform limit.
    #[must_use]
    pub fn inline(name: impl Into<String>, value: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            value: truncate(value.as_ref(), FIELD_VALUE_LIMIT),
            inline: true,
        }
    }
}

/// Author block shown above the embed title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedAuthor {
    /// Actor display name.
    pub name: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// The platform-agnostic notification produced for one event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationDocument {
    /// Headline.
    pub title: String,
    /// Body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    /// 24-bit RGB color.
    pub color: u32,
    /// Actor block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    /// Link opened when clicking the title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Event time (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl NotificationDocument {
    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&EmbedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Outbound webhook body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Embeds posted in a single message.
    pub embeds: Vec<NotificationDocument>,
}

impl ChatMessage {
    /// Wrap a single document.
    #[must_use]
    pub fn single(document: NotificationDocument) -> Self {
        Self {
            embeds: vec![document],
        }
    }
}

/// Truncate `text` to at most `limit` characters, marking the cut with `…`.
#[must_use]
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(limit.saturating_sub(1)).collect();
    out.push('…');
    out
}
