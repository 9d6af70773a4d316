//! Inbound Plane webhook event model.
//!
//! A delivery is discriminated by the `event` × `action` pair. Each known
//! pair maps to exactly one [`InboundEvent`] variant whose `data` payload
//! has a fixed shape; unknown pairs are kept as
//! [`InboundEvent::Unrecognized`] so newer upstream actions are ignored
//! instead of rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plane user as embedded in webhook payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// User identifier.
    #[serde(default)]
    pub id: String,
    /// Name shown in the Plane UI.
    pub display_name: String,
    /// Avatar reference, absolute URL or upstream-relative path.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Legacy avatar field; used when `avatar_url` is empty.
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    /// The first non-empty avatar reference, if any.
    #[must_use]
    pub fn avatar_ref(&self) -> Option<&str> {
        [self.avatar_url.as_deref(), self.avatar.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// The user who triggered an event.
pub type Actor = User;

/// Label reference carried on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueLabel {
    /// Label identifier.
    pub id: String,
    /// Label name as embedded in the payload (may be stale).
    #[serde(default)]
    pub name: String,
    /// Label color hex string.
    #[serde(default)]
    pub color: String,
}

/// Workflow state carried on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueState {
    /// State identifier.
    #[serde(default)]
    pub id: String,
    /// State display name.
    pub name: String,
    /// State color hex string.
    #[serde(default)]
    pub color: String,
    /// State group (`backlog`, `started`, `completed`, ...).
    #[serde(default)]
    pub group: String,
}

/// Full issue entity sent with `created` and `updated` issue events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Issue identifier.
    pub id: String,
    /// Issue title.
    pub name: String,
    /// Owning project identifier.
    pub project: String,
    /// Owning workspace identifier.
    #[serde(default)]
    pub workspace: String,
    /// Attached labels.
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
    /// Assigned users.
    #[serde(default)]
    pub assignees: Vec<User>,
    /// Current workflow state.
    pub state: IssueState,
    /// Priority name (`urgent`, `high`, `medium`, `low`, `none`).
    #[serde(default)]
    pub priority: Option<String>,
    /// Plain-text description.
    #[serde(default)]
    pub description_stripped: Option<String>,
    /// Per-project sequence number.
    #[serde(default)]
    pub sequence_id: Option<u64>,
    /// Creation timestamp (RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp (RFC 3339).
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Comment entity sent with `created` and `updated` comment events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueComment {
    /// Comment identifier.
    pub id: String,
    /// Issue the comment belongs to.
    pub issue: String,
    /// Owning project identifier.
    pub project: String,
    /// Owning workspace identifier.
    #[serde(default)]
    pub workspace: String,
    /// Plain-text comment body.
    #[serde(default)]
    pub comment_stripped: String,
    /// Creation timestamp (RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp (RFC 3339).
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Id-only stub sent with `deleted` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletedObject {
    /// Identifier of the removed entity.
    pub id: String,
}

/// Change description attached to every event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    /// Name of the changed attribute, if any.
    #[serde(default)]
    pub field: Option<String>,
    /// Value before the change.
    #[serde(default)]
    pub old_value: Value,
    /// Value after the change.
    #[serde(default)]
    pub new_value: Value,
    /// User who triggered the change.
    pub actor: Actor,
    /// Identifier of the removed value (e.g. a label id).
    #[serde(default)]
    pub old_identifier: Option<String>,
    /// Identifier of the added value (e.g. an assignee id).
    #[serde(default)]
    pub new_identifier: Option<String>,
}

/// Fields common to every known event variant, plus its typed `data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    /// Plane webhook identifier.
    #[serde(default)]
    pub webhook_id: String,
    /// Workspace the event belongs to.
    pub workspace_id: String,
    /// Variant-specific entity payload.
    pub data: T,
    /// Change description.
    pub activity: Activity,
}

/// Entity family named by the `event` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `issue`
    Issue,
    /// `issue_comment`
    IssueComment,
}

impl EventKind {
    /// Parse a wire discriminant.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "issue" => Some(Self::Issue),
            "issue_comment" => Some(Self::IssueComment),
            _ => None,
        }
    }

    /// Wire discriminant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::IssueComment => "issue_comment",
        }
    }
}

/// Change kind named by the `action` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `created`
    Created,
    /// `updated`
    Updated,
    /// `deleted`
    Deleted,
}

impl Action {
    /// Parse a wire discriminant.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Wire discriminant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// A parsed inbound webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `issue` / `created`
    IssueCreated(Envelope<Issue>),
    /// `issue` / `updated`
    IssueUpdated(Envelope<Issue>),
    /// `issue` / `deleted`
    IssueDeleted(Envelope<DeletedObject>),
    /// `issue_comment` / `created`
    CommentCreated(Envelope<IssueComment>),
    /// `issue_comment` / `updated`
    CommentUpdated(Envelope<IssueComment>),
    /// `issue_comment` / `deleted`
    CommentDeleted(Envelope<DeletedObject>),
    /// Any other pair; acknowledged and ignored.
    Unrecognized {
        /// Raw `event` discriminant.
        event: String,
        /// Raw `action` discriminant.
        action: String,
    },
}

impl InboundEvent {
    /// The `event` discriminant as received.
    #[must_use]
    pub fn event_name(&self) -> &str {
        match self {
            Self::IssueCreated(_) | Self::IssueUpdated(_) | Self::IssueDeleted(_) => {
                EventKind::Issue.as_str()
            }
            Self::CommentCreated(_) | Self::CommentUpdated(_) | Self::CommentDeleted(_) => {
                EventKind::IssueComment.as_str()
            }
            Self::Unrecognized { event, .. } => event,
        }
    }

    /// The `action` discriminant as received.
    #[must_use]
    pub fn action_name(&self) -> &str {
        match self {
            Self::IssueCreated(_) | Self::CommentCreated(_) => Action::Created.as_str(),
            Self::IssueUpdated(_) | Self::CommentUpdated(_) => Action::Updated.as_str(),
            Self::IssueDeleted(_) | Self::CommentDeleted(_) => Action::Deleted.as_str(),
            Self::Unrecognized { action, .. } => action,
        }
    }

    /// Webhook identifier, absent for unrecognized deliveries.
    #[must_use]
    pub fn webhook_id(&self) -> Option<&str> {
        match self {
            Self::IssueCreated(e) | Self::IssueUpdated(e) => Some(&e.webhook_id),
            Self::CommentCreated(e) | Self::CommentUpdated(e) => Some(&e.webhook_id),
            Self::IssueDeleted(e) | Self::CommentDeleted(e) => Some(&e.webhook_id),
            Self::Unrecognized { .. } => None,
        }
    }

    /// Activity record, absent for unrecognized deliveries.
    #[must_use]
    pub fn activity(&self) -> Option<&Activity> {
        match self {
            Self::IssueCreated(e) | Self::IssueUpdated(e) => Some(&e.activity),
            Self::CommentCreated(e) | Self::CommentUpdated(e) => Some(&e.activity),
            Self::IssueDeleted(e) | Self::CommentDeleted(e) => Some(&e.activity),
            Self::Unrecognized { .. } => None,
        }
    }
}
