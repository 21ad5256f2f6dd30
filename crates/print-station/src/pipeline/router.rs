//! HTTP surface for the submission pipeline.
//!
//! A thin adapter: multipart decoding and status-code mapping live here,
//! every decision about a submission's fate is made by the service.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::dispatch::PrintBackend;
use super::domain::SubmissionRequest;
use super::service::{PrintSubmissionService, SubmissionError};
use crate::error::AppError;

pub fn print_router(service: Arc<PrintSubmissionService>) -> Router {
    Router::new()
        .route("/api/v1/print/submissions", post(submit_handler))
        .route("/api/v1/print/teams", get(teams_handler))
        .route("/api/v1/print/quota", get(quota_handler))
        .route("/api/v1/print/quota/:team/reset", post(reset_quota_handler))
        .route("/api/v1/print/printer-status", get(printer_status_handler))
        .with_state(service)
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<PrintSubmissionService>>,
    mut multipart: Multipart,
) -> Response {
    let max_bytes = service.settings().max_file_bytes;
    let mut team = String::new();
    let mut filename: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return rejection(StatusCode::BAD_REQUEST, "Invalid form data", None),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "team" => match field.text().await {
                Ok(value) => team = value,
                Err(_) => {
                    return rejection(StatusCode::BAD_REQUEST, "Invalid form data", None);
                }
            },
            "file" => {
                filename = field.file_name().map(ToString::to_string);
                let mut collected = Vec::new();
                loop {
                    match field.chunk().await {
                        Ok(Some(chunk)) => {
                            if (collected.len() + chunk.len()) as u64 > max_bytes {
                                let limit_mb = max_bytes / (1024 * 1024);
                                return rejection(
                                    StatusCode::PAYLOAD_TOO_LARGE,
                                    &format!("File size exceeds {limit_mb}MB limit"),
                                    None,
                                );
                            }
                            collected.extend_from_slice(&chunk);
                        }
                        Ok(None) => break,
                        Err(_) => {
                            return rejection(
                                StatusCode::BAD_REQUEST,
                                "Failed to read uploaded file",
                                None,
                            );
                        }
                    }
                }
                bytes = Some(collected);
            }
            _ => {}
        }
    }

    if team.trim().is_empty() {
        return submission_error_response(SubmissionError::MissingTeam);
    }
    let (Some(filename), Some(bytes)) = (filename, bytes) else {
        return submission_error_response(SubmissionError::MissingFile);
    };

    match service
        .submit(SubmissionRequest {
            team,
            filename,
            bytes,
        })
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "team": receipt.team,
                "team_info": receipt.team_info,
                "filename": receipt.filename,
                "pages": receipt.pages,
                "quota_info": receipt.quota,
            })),
        )
            .into_response(),
        Err(err) => submission_error_response(err),
    }
}

fn submission_error_response(err: SubmissionError) -> Response {
    if err.is_internal() {
        error!(error = %err, "submission failed unexpectedly");
        return rejection(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server error. Please try again or contact organizers.",
            None,
        );
    }

    let status = match err {
        SubmissionError::UnknownTeam => StatusCode::NOT_FOUND,
        SubmissionError::MissingTeam
        | SubmissionError::MissingFile
        | SubmissionError::UnsupportedExtension
        | SubmissionError::TextRenderingUnavailable => StatusCode::BAD_REQUEST,
        SubmissionError::QuotaExceeded { .. } => StatusCode::CONFLICT,
        SubmissionError::PrintFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let quota_info = err.quota_info();
    rejection(status, &err.to_string(), quota_info)
}

fn rejection(
    status: StatusCode,
    message: &str,
    quota_info: Option<super::domain::QuotaStatus>,
) -> Response {
    let mut body = json!({
        "success": false,
        "error": message,
    });
    if let Some(quota) = quota_info {
        body["quota_info"] = json!(quota);
    }
    (status, Json(body)).into_response()
}

pub(crate) async fn teams_handler(
    State(service): State<Arc<PrintSubmissionService>>,
) -> Json<serde_json::Value> {
    Json(json!({
        "teams": service.roster().team_names(),
        "max_pages": service.settings().max_pages,
    }))
}

pub(crate) async fn quota_handler(
    State(service): State<Arc<PrintSubmissionService>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let overview = service.quota_overview()?;
    Ok(Json(json!({
        "max_pages": service.settings().max_pages,
        "teams": overview,
    })))
}

pub(crate) async fn reset_quota_handler(
    State(service): State<Arc<PrintSubmissionService>>,
    Path(team): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    service.reset_quota(&team)?;
    Ok(Json(json!({ "success": true, "team": team })))
}

pub(crate) async fn printer_status_handler(
    State(service): State<Arc<PrintSubmissionService>>,
) -> Json<serde_json::Value> {
    let dispatcher = service.dispatcher();
    let backend = dispatcher.backend();
    Json(json!({
        "backend": backend.kind(),
        "default_device": backend.default_device(),
        "available_devices": backend.available_devices(),
        "device_override": dispatcher.options().device,
        "text_rendering": service.settings().text_rendering,
    }))
}
