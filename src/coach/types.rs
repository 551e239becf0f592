//! Coach request/response contract types.

use crate::workout::types::ModificationKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rolling averages over the most recent recorded samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentAverages {
    /// Average power in watts
    pub avg_power: f64,
    /// Average heart rate in BPM
    pub avg_heart_rate: f64,
    /// Average cadence in RPM
    pub avg_cadence: f64,
}

/// A feedback request sent to the coach while an interval is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Session the request belongs to; echoed back in the response
    pub session: Uuid,
    /// Description of the interval being ridden
    pub interval_description: Option<String>,
    /// Target power of the interval being ridden
    pub target_power: u16,
    /// Recent performance
    pub recent: RecentAverages,
    /// Rider name for personalized messages
    pub user_name: Option<String>,
}

/// A workout change suggested by the coach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedModification {
    /// What the delta applies to
    pub kind: ModificationKind,
    /// Signed delta (watts or seconds)
    pub value: i32,
    /// Human-readable rationale
    pub reason: String,
}

/// Coach feedback, possibly carrying a suggested modification.
///
/// The session id lets the engine drop responses that arrive after the
/// workout they were requested for has ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    /// Session the originating request belonged to
    #[serde(default)]
    pub session: Uuid,
    /// Encouragement or advice to display
    pub message: String,
    /// Optional suggested change, held for rider approval
    pub modification: Option<SuggestedModification>,
}

/// Errors from the coach client.
#[derive(Debug, Error)]
pub enum CoachError {
    /// Network unreachable or request timed out
    #[error("Coach service is offline")]
    Offline,

    /// Service responded with an error
    #[error("Coach API error: {0}")]
    ApiError(String),

    /// Request or response serialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
