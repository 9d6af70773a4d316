//! Canned Plane webhook payloads shared by the unit and integration suites.
#![allow(dead_code)]

use serde_json::{json, Value};

pub const WORKSPACE: &str = "acme";
pub const PROJECT_ID: &str = "proj-1";
pub const ISSUE_ID: &str = "issue-1";
pub const LABEL_ID: &str = "lbl-1";

pub fn actor() -> Value {
    json!({
        "id": "user-1",
        "display_name": "Grace",
        "avatar_url": "/avatars/grace.png"
    })
}

pub fn issue_data() -> Value {
    json!({
        "id": ISSUE_ID,
        "name": "Fix login bug",
        "project": PROJECT_ID,
        "workspace": WORKSPACE,
        "labels": [{ "id": LABEL_ID, "name": "stale-name", "color": "#ff0000" }],
        "assignees": [
            { "id": "user-2", "display_name": "Ada" },
            { "id": "user-3", "display_name": "Linus" }
        ],
        "state": { "id": "state-1", "name": "In Review", "color": "#f59e0b", "group": "started" },
        "priority": "high",
        "description_stripped": "Users cannot log in with SSO",
        "sequence_id": 42,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-02T09:30:00Z"
    })
}

pub fn comment_data() -> Value {
    json!({
        "id": "comment-1",
        "issue": ISSUE_ID,
        "project": PROJECT_ID,
        "workspace": WORKSPACE,
        "comment_stripped": "Reproduced on staging",
        "created_at": "2024-05-03T08:00:00Z",
        "updated_at": "2024-05-03T08:05:00Z"
    })
}

fn envelope(event: &str, action: &str, data: Value, activity: Value) -> Value {
    json!({
        "event": event,
        "action": action,
        "webhook_id": "wh-1",
        "workspace_id": WORKSPACE,
        "data": data,
        "activity": activity
    })
}

fn plain_activity() -> Value {
    json!({ "field": null, "old_value": null, "new_value": null, "actor": actor() })
}

pub fn issue_created() -> Value {
    envelope("issue", "created", issue_data(), plain_activity())
}

pub fn issue_updated(field: &str, old_value: Value, new_value: Value) -> Value {
    envelope(
        "issue",
        "updated",
        issue_data(),
        json!({
            "field": field,
            "old_value": old_value,
            "new_value": new_value,
            "actor": actor()
        }),
    )
}

pub fn issue_deleted(id: &str) -> Value {
    envelope("issue", "deleted", json!({ "id": id }), plain_activity())
}

pub fn comment_created() -> Value {
    envelope("issue_comment", "created", comment_data(), plain_activity())
}

pub fn comment_updated() -> Value {
    envelope(
        "issue_comment",
        "updated",
        comment_data(),
        json!({
            "field": "comment",
            "old_value": "Reproduced",
            "new_value": "Reproduced on staging",
            "actor": actor()
        }),
    )
}

pub fn comment_deleted(id: &str) -> Value {
    envelope("issue_comment", "deleted", json!({ "id": id }), plain_activity())
}

pub fn unrecognized() -> Value {
    json!({ "event": "cycle", "action": "created", "workspace_id": WORKSPACE, "data": {} })
}

pub fn bytes(payload: &Value) -> Vec<u8> {
    serde_json::to_vec(payload).expect("serialize payload")
}
