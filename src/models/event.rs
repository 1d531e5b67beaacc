//! Organization event model (`GET /orgs/:org/events`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type emitted when a repository, branch or tag is created.
pub const REPOSITORY_CREATED_EVENT: &str = "CreateEvent";

/// An organization event. Only the `type` discriminant is interpreted;
/// every other field is passed through as GitHub sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Event {
    pub fn is_repository_created(&self) -> bool {
        self.kind == REPOSITORY_CREATED_EVENT
    }
}
