//! The print submission pipeline: validation, normalization, quota
//! accounting, durable dispatch, and archival.
//!
//! Stages are composed by [`service::PrintSubmissionService`]; everything
//! else in this module is a leaf with no knowledge of its callers.

pub mod archive;
pub mod dispatch;
pub mod domain;
pub mod ledger;
pub mod normalizer;
pub mod router;
pub mod service;
pub mod validator;

pub use dispatch::{
    select_backend, CupsBackend, DeliveryError, DispatchError, PrintBackend, PrintDispatcher,
    PrintOptions, PrintReport, SimulatedBackend,
};
pub use domain::{
    PrintReceipt, QuotaStatus, SubmissionKind, SubmissionRequest, TeamInfo, TeamQuotaView,
};
pub use ledger::{LedgerError, QuotaLedger};
pub use normalizer::{NormalizeError, PrintHeader};
pub use router::print_router;
pub use service::{PrintSettings, PrintSubmissionService, SubmissionError};
pub use validator::ValidationError;
