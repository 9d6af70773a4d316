//! Webhook processing: normalize, enrich, build and dispatch.

pub mod build;
pub mod dispatch;
pub mod enrich;
pub mod normalize;

pub use build::{build, StateColorRules};
pub use dispatch::{Delivery, Dispatcher, Outcome};
pub use enrich::{EnrichedEvent, Enricher, IssueContext};
pub use normalize::normalize;
