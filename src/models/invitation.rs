//! Request and response bodies of `POST /invite`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    /// Numeric GitHub id of the invitee.
    pub user_id: i64,

    /// Name of the personal repository to provision from the template.
    #[serde(default)]
    pub canvas_username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InviteOutcome {
    Success,
    AlreadyMember,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteResponse {
    pub message: InviteOutcome,

    /// Present only when provisioning was requested; `null` when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Option<String>>,
}
