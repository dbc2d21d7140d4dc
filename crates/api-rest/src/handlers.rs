//! REST handlers.
//!
//! Each handler maps one HTTP route onto one [`PatientRecordService`] operation. Store and
//! blob calls are synchronous filesystem operations; only the summary routes await network
//! I/O.
//!
//! [`PatientRecordService`]: prs_core::PatientRecordService

use crate::auth::{Staff, API_KEY_HEADER};
use crate::error::ApiError;
use crate::AppState;
use api_shared::{
    validate_api_key, AppointmentDto, FileRecordDto, FileRecordsRes, HealthRes, HealthService,
    IntakeReq, LookupReq, PatientRecordRes, PrescriptionReq, ReportUploadReq, StoredBlobRes,
    SummaryReq, SummaryRes,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use prs_core::{
    BlobPath, IdentifierHash, IntakeForm, NationalId, PatientError, Prescription, ReportUpload,
};
use serde::Deserialize;

fn parse_hash(raw: &str) -> Result<IdentifierHash, ApiError> {
    IdentifierHash::parse(raw).map_err(|e| ApiError::Patient(e.into()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Unauthenticated; used by monitoring and load balancer health checks.
pub async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health(state.service.summaries_enabled()))
}

#[utoipa::path(
    post,
    path = "/patients",
    params(
        ("x-staff-name" = Option<String>, Header, description = "Acting staff member (required with attachments)"),
        ("x-facility" = Option<String>, Header, description = "Facility (defaults to server setting)")
    ),
    request_body = IntakeReq,
    responses(
        (status = 201, description = "Patient record created", body = PatientRecordRes),
        (status = 400, description = "Invalid intake form or attachment"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 409, description = "A record already exists for this national ID")
    )
)]
/// Register a new patient from the intake form
///
/// Reports attached to the form are uploaded and recorded once the patient exists.
pub async fn intake(
    State(state): State<AppState>,
    staff: Option<Staff>,
    Json(mut req): Json<IntakeReq>,
) -> Result<(StatusCode, Json<PatientRecordRes>), ApiError> {
    let reports = req.take_attachments();
    let form = IntakeForm::try_from(req)?;
    let session = staff.map(|Staff(session)| session);
    let record = state
        .service
        .intake_with_reports(session.as_ref(), form, reports)?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    post,
    path = "/patients/lookup",
    request_body = LookupReq,
    responses(
        (status = 200, description = "Patient record", body = PatientRecordRes),
        (status = 400, description = "Blank national ID"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No patient with this national ID")
    )
)]
/// Look up a patient by raw national ID
///
/// The identifier is hashed server-side and travels in the request body, never the URL.
pub async fn lookup(
    State(state): State<AppState>,
    Json(req): Json<LookupReq>,
) -> Result<Json<PatientRecordRes>, ApiError> {
    let national_id = NationalId::from_entry(&req.national_id).map_err(PatientError::from)?;
    let hash = national_id.hash();
    match state.service.lookup(&national_id)? {
        Some(record) => Ok(Json(record.into())),
        None => Err(PatientError::RecordNotFound(hash).into()),
    }
}

#[utoipa::path(
    get,
    path = "/patients/{hash}",
    params(("hash" = String, Path, description = "Identifier hash (64 lowercase hex)")),
    responses(
        (status = 200, description = "Patient record", body = PatientRecordRes),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No patient with this hash")
    )
)]
/// Fetch a patient by identifier hash
pub async fn get_patient(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<PatientRecordRes>, ApiError> {
    let hash = parse_hash(&hash)?;
    match state.service.lookup_by_hash(&hash)? {
        Some(record) => Ok(Json(record.into())),
        None => Err(PatientError::RecordNotFound(hash).into()),
    }
}

#[utoipa::path(
    get,
    path = "/patients/{hash}/files",
    params(("hash" = String, Path, description = "Identifier hash")),
    responses(
        (status = 200, description = "File records in append order", body = FileRecordsRes),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No patient with this hash")
    )
)]
/// List a patient's documents
pub async fn list_files(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<FileRecordsRes>, ApiError> {
    let hash = parse_hash(&hash)?;
    Ok(Json(state.service.file_records(&hash)?.into()))
}

#[utoipa::path(
    post,
    path = "/patients/{hash}/files",
    params(("hash" = String, Path, description = "Identifier hash")),
    request_body = FileRecordDto,
    responses(
        (status = 201, description = "Document added", body = FileRecordDto),
        (status = 400, description = "A required field is blank"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No patient with this hash")
    )
)]
/// Add an already-hosted document to a patient
pub async fn add_file(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Json(req): Json<FileRecordDto>,
) -> Result<(StatusCode, Json<FileRecordDto>), ApiError> {
    let hash = parse_hash(&hash)?;
    let record = state.service.add_document(&hash, req.into())?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    post,
    path = "/patients/{hash}/reports",
    params(
        ("hash" = String, Path, description = "Identifier hash"),
        ("x-staff-name" = String, Header, description = "Acting staff member"),
        ("x-facility" = Option<String>, Header, description = "Facility (defaults to server setting)")
    ),
    request_body = ReportUploadReq,
    responses(
        (status = 201, description = "Report stored and attached", body = FileRecordDto),
        (status = 400, description = "Missing type, date or content"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No patient with this hash")
    )
)]
/// Upload a report and attach it to a patient
pub async fn upload_report(
    State(state): State<AppState>,
    Staff(session): Staff,
    Path(hash): Path<String>,
    Json(req): Json<ReportUploadReq>,
) -> Result<(StatusCode, Json<FileRecordDto>), ApiError> {
    let hash = parse_hash(&hash)?;
    let record = state
        .service
        .upload_report(&session, &hash, ReportUpload::from(req))?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    post,
    path = "/patients/{hash}/prescriptions",
    params(
        ("hash" = String, Path, description = "Identifier hash"),
        ("x-staff-name" = String, Header, description = "Prescribing doctor"),
        ("x-facility" = Option<String>, Header, description = "Facility (defaults to server setting)")
    ),
    request_body = PrescriptionReq,
    responses(
        (status = 201, description = "Prescription stored and attached", body = FileRecordDto),
        (status = 400, description = "Invalid prescription"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No patient with this hash")
    )
)]
/// Submit a prescription for a patient
pub async fn submit_prescription(
    State(state): State<AppState>,
    Staff(session): Staff,
    Path(hash): Path<String>,
    Json(req): Json<PrescriptionReq>,
) -> Result<(StatusCode, Json<FileRecordDto>), ApiError> {
    let hash = parse_hash(&hash)?;
    let prescription = Prescription::try_from(req)?;
    let record = state
        .service
        .submit_prescription(&session, &hash, &prescription)?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    post,
    path = "/patients/{hash}/appointments",
    params(("hash" = String, Path, description = "Identifier hash")),
    request_body = AppointmentDto,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentDto),
        (status = 400, description = "Appointment date is blank"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No patient with this hash")
    )
)]
/// Book a follow-up appointment for a patient
pub async fn book_appointment(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Json(req): Json<AppointmentDto>,
) -> Result<(StatusCode, Json<AppointmentDto>), ApiError> {
    let hash = parse_hash(&hash)?;
    let booked = state.service.append_appointment(&hash, req.into())?;
    Ok((StatusCode::CREATED, Json(booked.into())))
}

#[utoipa::path(
    post,
    path = "/patients/{hash}/summary",
    params(("hash" = String, Path, description = "Identifier hash")),
    responses(
        (status = 200, description = "Summary of the patient's documents", body = SummaryRes),
        (status = 400, description = "Patient has no documents"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No patient with this hash"),
        (status = 502, description = "Summarisation service failed"),
        (status = 503, description = "Summarisation not configured")
    )
)]
/// Summarise every document attached to a patient
pub async fn summarise_patient(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<SummaryRes>, ApiError> {
    let hash = parse_hash(&hash)?;
    let summary = state.service.summarise_record(&hash).await?;
    Ok(Json(SummaryRes { summary }))
}

#[utoipa::path(
    post,
    path = "/summaries",
    request_body = SummaryReq,
    responses(
        (status = 200, description = "Summary text", body = SummaryRes),
        (status = 400, description = "No document URLs"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 502, description = "Summarisation service failed"),
        (status = 503, description = "Summarisation not configured")
    )
)]
/// Summarise the documents at the given URLs
pub async fn request_summary(
    State(state): State<AppState>,
    Json(req): Json<SummaryReq>,
) -> Result<Json<SummaryRes>, ApiError> {
    let summary = state.service.request_summary(&req.document_urls).await?;
    Ok(Json(SummaryRes { summary }))
}

/// Query string of `GET /blobs/*path`.
#[derive(Debug, Default, Deserialize)]
pub struct BlobQuery {
    /// Capability token carried by blob URLs.
    pub token: Option<String>,
    /// Return [`StoredBlobRes`] metadata instead of the bytes.
    #[serde(default)]
    pub meta: bool,
}

#[utoipa::path(
    get,
    path = "/blobs/{path}",
    params(
        ("path" = String, Path, description = "Blob path, e.g. `Ward 3/LabReport_<hash>_<millis>.pdf`"),
        ("token" = Option<String>, Query, description = "Capability token from the blob URL"),
        ("meta" = Option<bool>, Query, description = "Return metadata instead of bytes"),
        ("x-api-key" = Option<String>, Header, description = "Required when no token is given")
    ),
    responses(
        (status = 200, description = "Blob bytes with their stored content type, or metadata", body = StoredBlobRes),
        (status = 400, description = "Invalid blob path"),
        (status = 401, description = "No token and missing or invalid API key"),
        (status = 403, description = "Token was not issued for this path"),
        (status = 404, description = "No blob at this path")
    )
)]
/// Download a stored blob
///
/// Blob URLs carry a `token` signed for their path, so whoever holds the URL (for example
/// the summarisation service) can fetch it without the API key. Without a token the API key
/// is required.
pub async fn read_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<BlobQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = BlobPath::parse(&path).map_err(PatientError::from)?;
    let (bytes, blob) = match query.token.as_deref() {
        Some(token) => state.service.read_shared_blob(&path, token)?,
        None => {
            let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
            validate_api_key(provided, &state.api_key)?;
            state.service.read_blob(&path)?
        }
    };

    if query.meta {
        return Ok(Json(StoredBlobRes::from(blob)).into_response());
    }
    Ok((
        [(header::CONTENT_TYPE, blob.metadata.content_type.into_string())],
        bytes,
    )
        .into_response())
}
