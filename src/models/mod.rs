//! Data models for the relay.
//!
//! These mirror the subset of GitHub's REST payloads the relay reads, plus the
//! request and response bodies of the relay's own HTTP surface. Unknown
//! upstream fields are ignored except on events, which pass through whole.

pub mod account;
pub mod commit;
pub mod event;
pub mod invitation;
pub mod pull_request;
pub mod repository;
pub mod reviewer;

// Re-exports for convenient access
pub use account::Account;
pub use commit::{Commit, CommitDetail, GitSignature};
pub use event::{Event, REPOSITORY_CREATED_EVENT};
pub use invitation::{InviteOutcome, InviteRequest, InviteResponse};
pub use pull_request::PullRequest;
pub use repository::{AnnotatedRepository, Repository};
pub use reviewer::{PullRequestRef, ReviewerBatchItem, ReviewerRequest};
