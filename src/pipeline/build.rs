//! Pure mapping from enriched events to notification documents.

use serde_json::Value;

use super::enrich::{EnrichedEvent, IssueContext};
use crate::config::StateColorConfig;
use crate::models::event::{Activity, Envelope, InboundEvent, Issue, IssueComment};
use crate::models::notification::{
    hue, truncate, EmbedAuthor, EmbedField, NotificationDocument, DESCRIPTION_LIMIT, TITLE_LIMIT,
};

/// Attribute name Plane reports for workflow state changes.
const STATE_FIELD: &str = "state";

/// Recoloring applied when an update moves an issue into a matching state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRule {
    /// Lower-cased state names that trigger the rule.
    pub keywords: Vec<String>,
    /// Embed color to use.
    pub color: u32,
    /// Replacement for the update notice in the title.
    pub notice: Option<String>,
}

/// Ordered state rules; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateColorRules {
    rules: Vec<StateRule>,
}

impl StateColorRules {
    /// Build rules from explicit entries.
    #[must_use]
    pub fn new(rules: Vec<StateRule>) -> Self {
        Self { rules }
    }

    /// Completion and in-progress rules from configured keywords.
    #[must_use]
    pub fn from_config(config: &StateColorConfig) -> Self {
        let lower = |words: &[String]| -> Vec<String> {
            words.iter().map(|w| w.trim().to_lowercase()).collect()
        };
        Self::new(vec![
            StateRule {
                keywords: lower(&config.completed),
                color: hue::SUCCESS,
                notice: Some("Issue Completed".into()),
            },
            StateRule {
                keywords: lower(&config.in_progress),
                color: hue::WARNING,
                notice: None,
            },
        ])
    }

    /// Rule matching a new state name, compared case-insensitively.
    #[must_use]
    pub fn classify(&self, new_state: &str) -> Option<&StateRule> {
        let needle = new_state.trim().to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| *k == needle))
    }
}

impl Default for StateColorRules {
    fn default() -> Self {
        Self::from_config(&StateColorConfig::default())
    }
}

/// Build the notification for `enriched`, or `None` for events that are
/// acknowledged without a message.
#[must_use]
pub fn build(enriched: &EnrichedEvent, rules: &StateColorRules) -> Option<NotificationDocument> {
    let ctx = enriched.context.as_ref();
    let doc = match &enriched.event {
        InboundEvent::IssueCreated(e) => issue_created(e, ctx, &enriched.labels),
        InboundEvent::CommentCreated(e) => comment_created(e, ctx),
        InboundEvent::IssueUpdated(e) => updated(
            &e.workspace_id,
            &e.activity,
            ctx,
            rules,
            &Subject::issue(&e.data.id),
            e.data.updated_at.clone(),
        ),
        InboundEvent::CommentUpdated(e) => updated(
            &e.workspace_id,
            &e.activity,
            ctx,
            rules,
            &Subject::comment(&e.data.id),
            e.data.updated_at.clone(),
        ),
        InboundEvent::IssueDeleted(e) => deleted(&Subject::issue(&e.data.id)),
        InboundEvent::CommentDeleted(e) => deleted(&Subject::comment(&e.data.id)),
        InboundEvent::Unrecognized { .. } => return None,
    };

    let author = enriched.event.activity().map(|activity| EmbedAuthor {
        name: activity.actor.display_name.clone(),
        icon_url: enriched.avatar_url.clone(),
    });
    Some(NotificationDocument { author, ..doc })
}

/// What an update or deletion refers to.
struct Subject<'a> {
    noun: &'static str,
    capitalized: &'static str,
    id: &'a str,
    /// Only issues have a workflow state for rules to match.
    has_state: bool,
}

impl<'a> Subject<'a> {
    fn issue(id: &'a str) -> Self {
        Self {
            noun: "issue",
            capitalized: "Issue",
            id,
            has_state: true,
        }
    }

    fn comment(id: &'a str) -> Self {
        Self {
            noun: "comment",
            capitalized: "Comment",
            id,
            has_state: false,
        }
    }
}

fn document(title: String, color: u32) -> NotificationDocument {
    NotificationDocument {
        title: truncate(&title, TITLE_LIMIT),
        description: None,
        fields: Vec::new(),
        color,
        author: None,
        url: None,
        timestamp: None,
    }
}

fn description(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| truncate(text, DESCRIPTION_LIMIT))
}

fn issue_created(
    e: &Envelope<Issue>,
    ctx: Option<&IssueContext>,
    labels: &[String],
) -> NotificationDocument {
    let issue = &e.data;
    let mut fields = Vec::new();
    if !labels.is_empty() {
        fields.push(EmbedField::inline("Labels", labels.join(", ")));
    }
    fields.push(EmbedField::inline("Status", &issue.state.name));
    fields.push(EmbedField::inline(
        "Priority",
        issue.priority.as_deref().unwrap_or("none"),
    ));
    if !issue.assignees.is_empty() {
        let names: Vec<&str> = issue
            .assignees
            .iter()
            .map(|a| a.display_name.as_str())
            .collect();
        fields.push(EmbedField::inline("Assignees", names.join(", ")));
    }

    NotificationDocument {
        description: issue.description_stripped.as_deref().and_then(description),
        fields,
        url: ctx.map(|c| c.url.clone()),
        timestamp: issue.created_at.clone(),
        ..document(issue.name.clone(), hue::INFORMATIONAL)
    }
}

fn comment_created(e: &Envelope<IssueComment>, ctx: Option<&IssueContext>) -> NotificationDocument {
    let title = match ctx {
        Some(c) => format!(
            "[{}] New comment on issue #{}: {}",
            e.workspace_id,
            c.reference(),
            c.work_item_name
        ),
        None => format!("[{}] New comment", e.workspace_id),
    };

    NotificationDocument {
        description: description(&e.data.comment_stripped),
        url: ctx.map(|c| c.url.clone()),
        timestamp: e.data.created_at.clone(),
        ..document(title, hue::COMMENT)
    }
}

fn updated(
    workspace_id: &str,
    activity: &Activity,
    ctx: Option<&IssueContext>,
    rules: &StateColorRules,
    subject: &Subject<'_>,
    timestamp: Option<String>,
) -> NotificationDocument {
    let default_notice = format!("{} Updated", subject.capitalized);
    let rule = match activity.field.as_deref() {
        Some(STATE_FIELD) if subject.has_state => {
            rules.classify(&render_value(&activity.new_value))
        }
        _ => None,
    };
    let color = rule.map_or(hue::INFORMATIONAL, |r| r.color);
    let notice = rule
        .and_then(|r| r.notice.as_deref())
        .unwrap_or(default_notice.as_str());

    let title = match ctx {
        Some(c) => format!("[{workspace_id}] {notice} {}", c.reference()),
        None => format!("[{workspace_id}] {notice}"),
    };

    let field = EmbedField::inline(
        activity.field.as_deref().unwrap_or("Update"),
        format!(
            "{} → {}",
            render_value(&activity.old_value),
            render_value(&activity.new_value)
        ),
    );

    NotificationDocument {
        description: Some(format!("Updated {} ID: {}", subject.noun, subject.id)),
        fields: vec![field],
        url: ctx.map(|c| c.url.clone()),
        timestamp,
        ..document(title, color)
    }
}

fn deleted(subject: &Subject<'_>) -> NotificationDocument {
    NotificationDocument {
        description: Some(format!("Deleted {} ID: {}", subject.noun, subject.id)),
        ..document(format!("{} Deleted", subject.capitalized), hue::ALERT)
    }
}

/// Render an activity value as plain text.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "none".into(),
        Value::String(s) if s.is_empty() => "none".into(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => "none".into(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
