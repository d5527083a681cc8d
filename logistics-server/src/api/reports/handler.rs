//! Report API Handlers
//!
//! Enqueue a CSV export, poll its state, download the finished file.
//! Polling is the only notification mechanism: there is no push channel.

use axum::{
    Json,
    body::Body,
    extract::{Extension, Path, State},
    http::{HeaderValue, header},
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::io::ReaderStream;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::jobs::{JOB_REPORT_EXPORT, JobState, JobStatus};
use crate::reports::{ReportFilters, ReportJobPayload, ReportType, Requester};
use crate::utils::{ApiResponse, AppError, AppResult, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub filters: ReportFilters,
    #[serde(default)]
    pub delivery: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub job_id: String,
}

/// POST /api/reports/export
pub async fn export(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<ExportRequest>,
) -> AppResult<Json<ApiResponse<ExportResponse>>> {
    let job_payload = ReportJobPayload {
        requester: Requester {
            id: current_user.id,
            role: current_user.role,
        },
        report_type: payload.report_type,
        filters: payload.filters,
        delivery: payload.delivery.unwrap_or_else(|| "download".to_string()),
    };
    let value = serde_json::to_value(&job_payload)
        .map_err(|e| AppError::internal(format!("Failed to serialize job payload: {e}")))?;

    let job_id = state.queue.enqueue(JOB_REPORT_EXPORT, value, None).await?;

    tracing::info!(
        job_id,
        report_type = ?job_payload.report_type,
        requester = current_user.id,
        "Report export enqueued"
    );

    Ok(ok_with_message(
        ExportResponse {
            job_id: job_id.to_string(),
        },
        "Report export enqueued",
    ))
}

/// GET /api/reports/:job_id/status
///
/// Unknown, evicted or unparseable ids poll as `state: "unknown"`.
pub async fn status(
    State(state): State<ServerState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let status = job_id
        .parse::<u64>()
        .ok()
        .and_then(|id| state.queue.status(id));

    let body = match status {
        Some(JobStatus {
            state: job_state,
            progress,
            result,
            failed_reason,
        }) => {
            let mut body = json!({
                "state": job_state,
                "progress": progress,
                "result": result,
            });
            if job_state == JobState::Failed
                && let Some(reason) = failed_reason
            {
                body["failed_reason"] = Value::String(reason);
            }
            body
        }
        None => json!({
            "state": "unknown",
            "progress": 0,
            "result": null,
        }),
    };

    Ok(ok_with_message(body, "Report status"))
}

/// GET /api/reports/:job_id/download
pub async fn download(
    State(state): State<ServerState>,
    Path(job_id): Path<String>,
) -> AppResult<Response> {
    let result = job_id
        .parse::<u64>()
        .ok()
        .and_then(|id| state.queue.result(id))
        .ok_or_else(|| AppError::not_found("Report file not ready"))?;

    let file_path = result
        .get("file_path")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::not_found("Report file not ready"))?;
    let file_name = result
        .get("file_name")
        .and_then(Value::as_str)
        .unwrap_or("report.csv");

    let file = tokio::fs::File::open(file_path)
        .await
        .map_err(|_| AppError::not_found("Report file missing"))?;

    let disposition = format!("attachment; filename=\"{file_name}\"");
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    Ok(response)
}
