use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Json, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use pressure_log_domain::auth::AuthenticatedUser;
use pressure_log_domain::entities::RecordUpdate;
use pressure_log_domain::mock;
use pressure_log_domain::services::validation::format_validation_errors;

use crate::api::error::{
    ApiError, CREATE_RECORD, DELETE_RECORD, GET_RECORD, LIST_RECORDS, RECORD_SUMMARY, UPDATE_RECORD,
};
use crate::api::handlers::serve;
use crate::entities::blood_pressure::{
    CreateRecordRequest, ListRecordsParams, RecordListResponse, RecordResponse, SummaryParams, SummaryResponse,
    UpdateRecordRequest,
};
use crate::entities::common::{ApiResponse, ErrorResponse};
use crate::state::AppState;

/// Identifier of a deleted record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedRecordResponse {
    pub id: String,
}

/// Record a blood pressure reading
#[utoipa::path(
    post,
    path = "/api/v1/blood-pressure",
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record created, wrapped in the response envelope", body = RecordResponse),
        (status = 400, description = "Missing or invalid values", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "blood-pressure"
)]
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_record(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateRecordRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    info!("Creating blood pressure record");

    if request.systolic.is_none() || request.diastolic.is_none() {
        warn!("Blood pressure record without systolic or diastolic value");
        return Err(ApiError::missing_values());
    }

    if let Err(errors) = request.validate() {
        warn!("Invalid blood pressure record: {}", errors);
        return Err(ApiError::validation(format_validation_errors(&errors)));
    }

    let input = request.into_new_record().ok_or_else(ApiError::missing_values)?;

    let result = state.records.create(&user.user_id, input.clone()).await;
    let served = serve(&state, result, &CREATE_RECORD, || {
        mock::mock_record(&user.user_id, input, Utc::now())
    })?;

    let body = served.map(RecordResponse::from).envelope("Blood pressure record created");
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// List the caller's readings, newest first
#[utoipa::path(
    get,
    path = "/api/v1/blood-pressure",
    params(ListRecordsParams),
    responses(
        (status = 200, description = "One page of records with window statistics", body = RecordListResponse),
        (status = 400, description = "Malformed query", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "blood-pressure"
)]
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn list_records(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    params: Result<Query<ListRecordsParams>, QueryRejection>,
) -> Result<Json<ApiResponse<RecordListResponse>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let query = params.to_query().map_err(ApiError::bad_request)?;
    info!("Listing blood pressure records: page {} limit {}", query.page, query.limit);

    let result = state.records.list(&user.user_id, query.clone()).await;
    let served = serve(&state, result, &LIST_RECORDS, || {
        mock::mock_page(&user.user_id, &query, Utc::now())
    })?;

    Ok(Json(served.map(RecordListResponse::from).envelope("Blood pressure records retrieved")))
}

/// Get one of the caller's readings
#[utoipa::path(
    get,
    path = "/api/v1/blood-pressure/{id}",
    params(("id" = String, Path, description = "Record ID")),
    responses(
        (status = 200, description = "The record", body = RecordResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No such record for this user", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "blood-pressure"
)]
#[instrument(skip_all, fields(user_id = %user.user_id, record_id = %id))]
pub async fn get_record(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RecordResponse>>, ApiError> {
    info!("Getting blood pressure record");

    let result = state.records.get(&user.user_id, &id).await;
    let served = serve(&state, result, &GET_RECORD, || {
        mock::mock_record_with_id(&id, &user.user_id, Utc::now())
    })?;

    Ok(Json(served.map(RecordResponse::from).envelope("Blood pressure record retrieved")))
}

/// Change one of the caller's readings; the merged record is validated again
#[utoipa::path(
    put,
    path = "/api/v1/blood-pressure/{id}",
    params(("id" = String, Path, description = "Record ID")),
    request_body = UpdateRecordRequest,
    responses(
        (status = 200, description = "The updated record", body = RecordResponse),
        (status = 400, description = "Invalid values", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No such record for this user", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "blood-pressure"
)]
#[instrument(skip_all, fields(user_id = %user.user_id, record_id = %id))]
pub async fn update_record(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRecordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RecordResponse>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    info!("Updating blood pressure record");

    if let Err(errors) = request.validate() {
        warn!("Invalid blood pressure update: {}", errors);
        return Err(ApiError::validation(format_validation_errors(&errors)));
    }

    let changes = RecordUpdate::from(request);
    let result = state.records.update(&user.user_id, &id, changes.clone()).await;
    let served = serve(&state, result, &UPDATE_RECORD, || {
        let mut record = mock::mock_record_with_id(&id, &user.user_id, Utc::now());
        record.systolic = changes.systolic.unwrap_or(record.systolic);
        record.diastolic = changes.diastolic.unwrap_or(record.diastolic);
        record.notes = changes.notes.or(record.notes);
        record
    })?;

    Ok(Json(served.map(RecordResponse::from).envelope("Blood pressure record updated")))
}

/// Delete one of the caller's readings
#[utoipa::path(
    delete,
    path = "/api/v1/blood-pressure/{id}",
    params(("id" = String, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record deleted", body = DeletedRecordResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No such record for this user", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "blood-pressure"
)]
#[instrument(skip_all, fields(user_id = %user.user_id, record_id = %id))]
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedRecordResponse>>, ApiError> {
    info!("Deleting blood pressure record");

    let result = state.records.delete(&user.user_id, &id).await;
    let served = serve(&state, result, &DELETE_RECORD, || ())?;

    Ok(Json(served.map(|()| DeletedRecordResponse { id }).envelope("Blood pressure record deleted")))
}

/// Statistics and severity distribution over the trailing window
#[utoipa::path(
    get,
    path = "/api/v1/blood-pressure/stats/summary",
    params(SummaryParams),
    responses(
        (status = 200, description = "Rounded averages, ranges and distribution", body = SummaryResponse),
        (status = 400, description = "Malformed query", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "blood-pressure"
)]
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    params: Result<Query<SummaryParams>, QueryRejection>,
) -> Result<Json<ApiResponse<SummaryResponse>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let time_range = params.time_range().map_err(ApiError::bad_request)?;
    info!("Summarizing blood pressure over {} days", time_range);

    let result = state.records.summary(&user.user_id, time_range).await;
    let served = serve(&state, result, &RECORD_SUMMARY, || mock::empty_summary(time_range))?;

    Ok(Json(served.map(SummaryResponse::from).envelope("Blood pressure statistics retrieved")))
}
