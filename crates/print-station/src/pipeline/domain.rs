use serde::{Deserialize, Serialize};

use crate::roster::TeamSeat;

/// Extensions accepted as pre-formed printable documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// Extensions accepted as plain-text or source submissions.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "cpp", "c", "java", "py", "js", "cs", "h", "hpp",
];

/// Upload kind, decided once at ingestion from the declared filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Document,
    Text,
}

impl SubmissionKind {
    /// Classify by extension; `None` when the extension is not accepted.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = filename.rsplit_once('.')?.1.to_ascii_lowercase();
        if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Document)
        } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Text)
        } else {
            None
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SubmissionKind::Document => "document",
            SubmissionKind::Text => "text",
        }
    }
}

/// One upload as handed over by the HTTP adapter.
#[derive(Debug)]
pub struct SubmissionRequest {
    pub team: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Seat info echoed back to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub room: String,
    pub desk: String,
}

impl From<&TeamSeat> for TeamInfo {
    fn from(seat: &TeamSeat) -> Self {
        Self {
            room: seat.room.clone(),
            desk: seat.desk.clone(),
        }
    }
}

/// Quota snapshot attached to success, quota-rejection, and print-failure
/// results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub max: u32,
    pub remaining: u32,
}

impl QuotaStatus {
    pub fn new(used: u32, max: u32) -> Self {
        Self {
            used,
            max,
            remaining: max.saturating_sub(used),
        }
    }
}

/// Success payload for a fully printed and archived submission.
#[derive(Debug, Clone, Serialize)]
pub struct PrintReceipt {
    pub team: String,
    pub team_info: TeamInfo,
    pub filename: String,
    pub pages: u32,
    pub quota: QuotaStatus,
    pub device: String,
    pub attempts: u32,
}

/// Per-team row for the quota status surface.
#[derive(Debug, Clone, Serialize)]
pub struct TeamQuotaView {
    pub team: String,
    pub used: u32,
    pub remaining: u32,
    pub percentage: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_documents_and_text_kinds() {
        assert_eq!(
            SubmissionKind::from_filename("solution.PDF"),
            Some(SubmissionKind::Document)
        );
        assert_eq!(
            SubmissionKind::from_filename("main.cpp"),
            Some(SubmissionKind::Text)
        );
        assert_eq!(
            SubmissionKind::from_filename("notes.TXT"),
            Some(SubmissionKind::Text)
        );
        assert_eq!(SubmissionKind::from_filename("archive.zip"), None);
        assert_eq!(SubmissionKind::from_filename("no-extension"), None);
    }

    #[test]
    fn quota_status_saturates_remaining() {
        let status = QuotaStatus::new(60, 50);
        assert_eq!(status.remaining, 0);
        let status = QuotaStatus::new(10, 50);
        assert_eq!(status.remaining, 40);
    }
}
