//! Unit tests for the outcome to HTTP status mapping.

use axum::http::StatusCode;

use plane_relay::pipeline::dispatch::{status_for, Outcome};
use plane_relay::AppError;

fn all_errors() -> Vec<AppError> {
    vec![
        AppError::Config("c".into()),
        AppError::Unauthorized("u".into()),
        AppError::Parse("p".into()),
        AppError::Upstream("up".into()),
        AppError::ImageFetch("f".into()),
        AppError::ImageUpload("iu".into()),
        AppError::Forward("fw".into()),
        AppError::Db("d".into()),
        AppError::Io("i".into()),
    ]
}

#[test]
fn only_acknowledged_outcomes_are_ok() {
    assert_eq!(Outcome::Forwarded.status(), StatusCode::OK);
    assert_eq!(Outcome::Ignored.status(), StatusCode::OK);
    for err in all_errors() {
        assert_ne!(status_for(&err), StatusCode::OK, "{err}");
    }
}

#[test]
fn rejected_and_failed_share_the_error_status() {
    for err in all_errors() {
        let expected = status_for(&err);
        let message = err.to_string();
        assert_eq!(Outcome::Failed(err).status(), expected, "{message}");
    }
}

#[test]
fn upstream_failures_are_bad_gateway() {
    assert_eq!(
        Outcome::Failed(AppError::Upstream("label".into())).status(),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        Outcome::Failed(AppError::Forward("discord 400".into())).status(),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn response_bodies_are_short_and_non_empty() {
    let mut outcomes = vec![Outcome::Forwarded, Outcome::Ignored];
    for err in all_errors() {
        outcomes.push(Outcome::Failed(err));
    }
    outcomes.push(Outcome::Rejected(AppError::Unauthorized("sig".into())));
    for outcome in &outcomes {
        assert!(!outcome.body().is_empty());
        assert!(outcome.body().len() < 64);
    }
}
