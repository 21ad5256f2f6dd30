//! The submission pipeline orchestrator.
//!
//! Composes roster, normalizer, validator, ledger, dispatcher, and archive
//! into the gate sequence a submission must clear. Only this module decides
//! user-facing outcomes and performs filesystem cleanup for failed gates;
//! the leaves below it never delete anything they did not create.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{error, info, warn};

use super::archive;
use super::dispatch::PrintDispatcher;
use super::domain::{
    PrintReceipt, QuotaStatus, SubmissionKind, SubmissionRequest, TeamInfo, TeamQuotaView,
};
use super::ledger::{LedgerError, QuotaLedger};
use super::normalizer::{self, NormalizeError, PrintHeader};
use super::validator::{self, ValidationError};
use crate::config::PrintConfig;
use crate::roster::SeatPlan;

/// Pipeline-facing slice of the configuration.
#[derive(Debug, Clone)]
pub struct PrintSettings {
    pub event_name: String,
    pub upload_root: PathBuf,
    pub max_pages: u32,
    pub max_file_bytes: u64,
    pub text_rendering: bool,
}

impl From<&PrintConfig> for PrintSettings {
    fn from(config: &PrintConfig) -> Self {
        Self {
            event_name: config.event_name.clone(),
            upload_root: config.upload_root.clone(),
            max_pages: config.max_pages,
            max_file_bytes: config.max_file_bytes,
            text_rendering: config.text_rendering,
        }
    }
}

pub struct PrintSubmissionService {
    roster: Arc<SeatPlan>,
    ledger: Arc<QuotaLedger>,
    dispatcher: PrintDispatcher,
    settings: PrintSettings,
}

impl PrintSubmissionService {
    pub fn new(
        roster: Arc<SeatPlan>,
        ledger: Arc<QuotaLedger>,
        dispatcher: PrintDispatcher,
        settings: PrintSettings,
    ) -> Self {
        Self {
            roster,
            ledger,
            dispatcher,
            settings,
        }
    }

    pub fn roster(&self) -> &SeatPlan {
        &self.roster
    }

    pub fn settings(&self) -> &PrintSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &PrintDispatcher {
        &self.dispatcher
    }

    /// Run one upload through every gate. Each failing gate is terminal,
    /// produces a specific rejection, and removes any artifacts this
    /// submission wrote — except a print failure, which charges the quota
    /// and preserves the files for manual handling.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<PrintReceipt, SubmissionError> {
        let SubmissionRequest {
            team,
            filename,
            bytes,
        } = request;

        let team = team.trim().to_string();
        if team.is_empty() {
            return Err(SubmissionError::MissingTeam);
        }
        if filename.trim().is_empty() {
            return Err(SubmissionError::MissingFile);
        }
        let seat = self
            .roster
            .lookup(&team)
            .cloned()
            .ok_or(SubmissionError::UnknownTeam)?;

        let kind =
            SubmissionKind::from_filename(&filename).ok_or(SubmissionError::UnsupportedExtension)?;
        if kind == SubmissionKind::Text && !self.settings.text_rendering {
            return Err(SubmissionError::TextRenderingUnavailable);
        }

        // Persist the raw upload under the team's folder, timestamp-prefixed
        // and never clobbering a concurrent upload.
        let team_dir = self.settings.upload_root.join(&team);
        fs::create_dir_all(&team_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let stored_name = format!("{stamp}_{}", archive::sanitize_filename(&filename));
        let raw_path = archive::unique_destination(&team_dir, &stored_name);
        fs::write(&raw_path, &bytes)?;
        info!(team = %team, kind = kind.label(), path = %raw_path.display(), "received submission");

        // Normalize: documents pass through, text is rendered to PDF.
        let generated = match kind {
            SubmissionKind::Document => None,
            SubmissionKind::Text => {
                let output = PathBuf::from(format!("{}.pdf", raw_path.display()));
                let header = PrintHeader::for_seat(&self.settings.event_name, &seat);
                if let Err(source) =
                    normalizer::normalize_text_submission(&bytes, &filename, &header, &output)
                {
                    self.discard(&raw_path, None);
                    return Err(SubmissionError::Conversion { source });
                }
                Some(output)
            }
        };
        let print_path = generated.as_deref().unwrap_or(&raw_path).to_path_buf();

        // Structural validation applies to uploaded documents only; a PDF we
        // just generated is trusted.
        if kind == SubmissionKind::Document && !validator::validate(&raw_path) {
            self.discard(&raw_path, generated.as_deref());
            return Err(SubmissionError::InvalidDocument);
        }

        let pages = match validator::count_pages(&print_path) {
            Ok(pages) => pages,
            Err(source) => {
                self.discard(&raw_path, generated.as_deref());
                return Err(SubmissionError::Validation(source));
            }
        };
        if pages == 0 {
            self.discard(&raw_path, generated.as_deref());
            return Err(SubmissionError::EmptyDocument);
        }

        // Quota gate: pure read, no mutation on the rejection path.
        let used = match self.ledger.get(&team) {
            Ok(used) => used,
            Err(source) => {
                self.discard(&raw_path, generated.as_deref());
                return Err(SubmissionError::Ledger(source));
            }
        };
        if used + pages > self.settings.max_pages {
            self.discard(&raw_path, generated.as_deref());
            return Err(SubmissionError::QuotaExceeded {
                used,
                max: self.settings.max_pages,
                pages,
            });
        }

        match self.dispatcher.dispatch(&print_path).await {
            Ok(report) => {
                // Charge the quota only now that a delivery was observed,
                // then move the artifacts into the completed archive.
                let total = self.ledger.commit(&team, pages)?;
                self.archive_artifacts(&raw_path, generated.as_deref(), &team_dir);
                info!(
                    team = %team,
                    pages,
                    total,
                    max = self.settings.max_pages,
                    device = %report.device,
                    "submission printed"
                );
                Ok(PrintReceipt {
                    team,
                    team_info: TeamInfo::from(&seat),
                    filename,
                    pages,
                    quota: QuotaStatus::new(total, self.settings.max_pages),
                    device: report.device,
                    attempts: report.attempts,
                })
            }
            Err(dispatch_error) => {
                // Anti-abuse policy: a failed print still consumes quota.
                // Artifacts stay in place so the organizers can print them
                // by hand.
                error!(team = %team, error = %dispatch_error, "printing failed; keeping artifacts for manual handling");
                let total = self.ledger.commit(&team, pages)?;
                Err(SubmissionError::PrintFailed {
                    cause: dispatch_error.to_string(),
                    quota: QuotaStatus::new(total, self.settings.max_pages),
                })
            }
        }
    }

    /// Quota standing for every roster team.
    pub fn quota_overview(&self) -> Result<Vec<TeamQuotaView>, LedgerError> {
        let snapshot = self.ledger.snapshot()?;
        let max = self.settings.max_pages;
        Ok(self
            .roster
            .team_names()
            .into_iter()
            .map(|team| {
                let used = snapshot.get(&team).copied().unwrap_or(0);
                TeamQuotaView {
                    used,
                    remaining: max.saturating_sub(used),
                    percentage: if max > 0 {
                        used as f32 / max as f32 * 100.0
                    } else {
                        0.0
                    },
                    team,
                }
            })
            .collect())
    }

    /// Administrative quota reset.
    pub fn reset_quota(&self, team: &str) -> Result<(), LedgerError> {
        self.ledger.reset(team)?;
        info!(%team, "quota reset");
        Ok(())
    }

    fn archive_artifacts(&self, raw_path: &Path, generated: Option<&Path>, team_dir: &Path) {
        for artifact in std::iter::once(raw_path).chain(generated) {
            match archive::move_to_completed(artifact, team_dir) {
                Ok(destination) => {
                    info!(path = %destination.display(), "archived artifact");
                }
                Err(err) => {
                    warn!(path = %artifact.display(), error = %err, "could not archive artifact");
                }
            }
        }
    }

    fn discard(&self, raw_path: &Path, generated: Option<&Path>) {
        for artifact in std::iter::once(raw_path).chain(generated) {
            if let Err(err) = fs::remove_file(artifact) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %artifact.display(), error = %err, "could not remove artifact");
                }
            }
        }
    }
}

/// Terminal outcome of a rejected or failed submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Team name is required")]
    MissingTeam,
    #[error("No file selected")]
    MissingFile,
    #[error("Invalid team name")]
    UnknownTeam,
    #[error("Only PDF, TXT, and code files (.cpp, .c, .java, .py, etc.) are allowed")]
    UnsupportedExtension,
    #[error("Text file printing is not available. Please convert to PDF first or contact organizers.")]
    TextRenderingUnavailable,
    #[error("Failed to process text file: {source}")]
    Conversion { source: NormalizeError },
    #[error("Invalid or corrupted PDF file")]
    InvalidDocument,
    #[error(transparent)]
    Validation(ValidationError),
    #[error("File has no pages")]
    EmptyDocument,
    #[error("Quota exceeded. You have used {used}/{max} pages. This file has {pages} pages.")]
    QuotaExceeded { used: u32, max: u32, pages: u32 },
    #[error("Printing failed: {cause}. The file has been saved and will be printed manually by organizers. Your quota has been updated.")]
    PrintFailed { cause: String, quota: QuotaStatus },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

impl SubmissionError {
    /// Quota standing to attach to the response, when one is meaningful.
    pub fn quota_info(&self) -> Option<QuotaStatus> {
        match self {
            SubmissionError::QuotaExceeded { used, max, .. } => {
                Some(QuotaStatus::new(*used, *max))
            }
            SubmissionError::PrintFailed { quota, .. } => Some(*quota),
            _ => None,
        }
    }

    /// True for faults the uploader cannot act on; the router logs these
    /// and answers with an opaque server error.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SubmissionError::Ledger(_) | SubmissionError::Storage(_)
        )
    }
}
