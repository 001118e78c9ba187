use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::screening::ScreeningJob;
use crate::screening::classifier::Threshold;
use crate::screening::pipeline::{ScreeningReport, ScreeningRequest, UploadedFile};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Uuid,
}

/// POST /api/v1/screenings
///
/// Multipart fields: `owner_id`, `job_description`, optional `job_title`,
/// optional `threshold`, and one `files` part per resume.
pub async fn handle_run_screening(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ScreeningReport>), AppError> {
    let request = read_screening_form(multipart).await?;
    let report = state.pipeline.run(request).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /api/v1/screenings
pub async fn handle_list_screenings(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<Vec<ScreeningJob>>, AppError> {
    let jobs = state.pipeline.history(params.owner_id).await?;
    Ok(Json(jobs))
}

/// GET /api/v1/screenings/:job_id
pub async fn handle_get_screening(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<ScreeningReport>, AppError> {
    let report = state.pipeline.detail(params.owner_id, job_id).await?;
    Ok(Json(report))
}

async fn read_screening_form(mut multipart: Multipart) -> Result<ScreeningRequest, AppError> {
    let mut owner_id = None;
    let mut job_description = None;
    let mut job_title = None;
    let mut threshold = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "file" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                files.push(UploadedFile { file_name, content });
            }
            "owner_id" | "job_description" | "job_title" | "threshold" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                match name.as_str() {
                    "owner_id" => {
                        owner_id = Some(value.trim().parse::<Uuid>().map_err(|_| {
                            AppError::Validation("owner_id must be a UUID".to_string())
                        })?)
                    }
                    "job_description" => job_description = Some(value),
                    "job_title" => job_title = Some(value).filter(|t| !t.trim().is_empty()),
                    _ => threshold = parse_threshold(&value)?,
                }
            }
            other => {
                tracing::debug!("Ignoring unknown multipart field '{other}'");
            }
        }
    }

    Ok(ScreeningRequest {
        owner_id: owner_id.ok_or_else(|| AppError::Validation("owner_id is required".to_string()))?,
        job_description: job_description
            .ok_or_else(|| AppError::Validation("job_description is required".to_string()))?,
        job_title,
        threshold,
        files,
    })
}

/// Blank means "use the configured default".
fn parse_threshold(value: &str) -> Result<Option<Threshold>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let raw = value
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("threshold must be an integer, got '{value}'")))?;
    Threshold::new(raw)
        .map(Some)
        .map_err(|e| AppError::Validation(e.to_string()))
}
