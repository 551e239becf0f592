//! AI coach collaborator: feedback request/response contract, the HTTP
//! client and the channel-bridging worker.

pub mod client;
pub mod types;

pub use client::{spawn_worker, CoachClient};
pub use types::{
    CoachError, FeedbackRequest, FeedbackResponse, RecentAverages, SuggestedModification,
};
