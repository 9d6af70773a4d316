//! Raw body → [`InboundEvent`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::event::{Action, Envelope, EventKind, InboundEvent};
use crate::{AppError, Result};

/// Parse a verified request body into an event.
///
/// `path_workspace` fills `workspace_id` when the body omits it (absent,
/// null, or empty). Unknown `event`/`action` pairs are accepted as
/// [`InboundEvent::Unrecognized`].
///
/// # Errors
///
/// Returns `AppError::Parse` if the body is not a JSON object, the
/// discriminants are missing, no workspace can be determined, or the
/// payload does not match the shape its discriminants select.
pub fn normalize(raw_body: &[u8], path_workspace: Option<&str>) -> Result<InboundEvent> {
    let value: Value = serde_json::from_slice(raw_body)
        .map_err(|err| AppError::Parse(format!("body is not valid json: {err}")))?;
    let Value::Object(mut object) = value else {
        return Err(AppError::Parse("body is not a json object".into()));
    };

    let event = discriminant(&object, "event")?;
    let action = discriminant(&object, "action")?;

    let (Some(kind), Some(act)) = (EventKind::parse(&event), Action::parse(&action)) else {
        return Ok(InboundEvent::Unrecognized { event, action });
    };

    fill_workspace(&mut object, path_workspace)?;

    let event = match (kind, act) {
        (EventKind::Issue, Action::Created) => InboundEvent::IssueCreated(envelope(object)?),
        (EventKind::Issue, Action::Updated) => InboundEvent::IssueUpdated(envelope(object)?),
        (EventKind::Issue, Action::Deleted) => InboundEvent::IssueDeleted(envelope(object)?),
        (EventKind::IssueComment, Action::Created) => {
            InboundEvent::CommentCreated(envelope(object)?)
        }
        (EventKind::IssueComment, Action::Updated) => {
            InboundEvent::CommentUpdated(envelope(object)?)
        }
        (EventKind::IssueComment, Action::Deleted) => {
            InboundEvent::CommentDeleted(envelope(object)?)
        }
    };
    Ok(event)
}

fn discriminant(object: &Map<String, Value>, key: &str) -> Result<String> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(AppError::Parse(format!("`{key}` must be a string"))),
        None => Err(AppError::Parse(format!("missing `{key}`"))),
    }
}

fn fill_workspace(object: &mut Map<String, Value>, path_workspace: Option<&str>) -> Result<()> {
    let present = matches!(object.get("workspace_id"), Some(Value::String(s)) if !s.is_empty());
    if present {
        return Ok(());
    }
    match path_workspace.filter(|w| !w.is_empty()) {
        Some(workspace) => {
            object.insert("workspace_id".into(), Value::String(workspace.to_owned()));
            Ok(())
        }
        None => Err(AppError::Parse("missing `workspace_id`".into())),
    }
}

fn envelope<T: DeserializeOwned>(object: Map<String, Value>) -> Result<Envelope<T>> {
    serde_json::from_value(Value::Object(object))
        .map_err(|err| AppError::Parse(format!("invalid payload: {err}")))
}
