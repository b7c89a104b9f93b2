//! Broadcast data model — payloads, jobs, membership results.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// What a broadcast delivers to each recipient.
///
/// Persisted as JSON in the `broadcast_jobs.payload` column; the media
/// references are opaque platform file identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BroadcastPayload {
    Text {
        text: String,
    },
    Photo {
        file_ref: String,
        caption: Option<String>,
    },
    Video {
        file_ref: String,
        caption: Option<String>,
    },
}

impl BroadcastPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Short label for operator listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Photo { .. } => "photo",
            Self::Video { .. } => "video",
        }
    }
}

/// One inline link button shown under a broadcast message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

impl LinkButton {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Persisted job state. Cancellation is hard deletion, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A scheduled broadcast record.
///
/// `date` and `time` are civil values in the reference timezone; combined
/// with the configured offset they name the instant to fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastJob {
    pub id: i64,
    pub payload: BroadcastPayload,
    pub buttons: Vec<LinkButton>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Partial update applied to a pending job. Absent fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub payload: Option<BroadcastPayload>,
    pub buttons: Option<Vec<LinkButton>>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
            && self.buttons.is_none()
            && self.date.is_none()
            && self.time.is_none()
    }
}

/// Result of the opaque channel-membership probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Member,
    Left,
    Kicked,
    Unknown,
}

impl MembershipStatus {
    /// Map a platform status string. Anything that is not an explicit
    /// departure counts as present — probe ambiguity never locks a user out.
    pub fn from_api(status: &str) -> Self {
        match status {
            "left" => Self::Left,
            "kicked" => Self::Kicked,
            "member" | "administrator" | "creator" | "restricted" => Self::Member,
            _ => Self::Unknown,
        }
    }

    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Left | Self::Kicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_json_round_trip() {
        let payload = BroadcastPayload::Photo {
            file_ref: "AgACAgIAAxkBAAI".into(),
            caption: Some("new season".into()),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"photo\""));
        let back: BroadcastPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn membership_mapping() {
        assert!(MembershipStatus::from_api("left").is_blocked());
        assert!(MembershipStatus::from_api("kicked").is_blocked());
        assert!(!MembershipStatus::from_api("member").is_blocked());
        assert!(!MembershipStatus::from_api("administrator").is_blocked());
        // Unknown statuses never block.
        assert!(!MembershipStatus::from_api("subscriber?").is_blocked());
    }

    #[test]
    fn empty_patch() {
        assert!(JobPatch::default().is_empty());
        let patch = JobPatch {
            time: NaiveTime::from_hms_opt(18, 0, 0),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
