//! Feedback model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review state of a feedback entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
}

impl FeedbackStatus {
    pub const ALL: [FeedbackStatus; 3] = [
        FeedbackStatus::Pending,
        FeedbackStatus::Reviewed,
        FeedbackStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Reviewed => "reviewed",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeedbackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "resolved" => Ok(Self::Resolved),
            _ => Err(format!("Invalid feedback status: {}", s)),
        }
    }
}

/// Feedback submitted by a visitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Optional email or phone, free-form
    pub contact: String,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for submitting feedback
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFeedbackInput {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub contact: Option<String>,
}

/// Counts of feedback entries per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCounts {
    pub pending: i64,
    pub reviewed: i64,
    pub resolved: i64,
}

impl FeedbackCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.reviewed + self.resolved
    }
}
