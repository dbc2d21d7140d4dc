//! # API REST
//!
//! REST API implementation for PRS.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (API key checks, staff headers, JSON errors, CORS, request tracing)
//!
//! Uses `api-shared` for wire types and `prs-core` for every patient operation.

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod error;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use prs_core::{NonEmptyText, PatientRecordService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Largest accepted request body. Reports arrive base64-encoded in JSON.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    service: PatientRecordService,
    api_key: Arc<str>,
    default_facility: NonEmptyText,
}

impl AppState {
    pub fn new(
        service: PatientRecordService,
        api_key: impl Into<Arc<str>>,
        default_facility: NonEmptyText,
    ) -> Self {
        Self {
            service,
            api_key: api_key.into(),
            default_facility,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::intake,
        handlers::lookup,
        handlers::get_patient,
        handlers::list_files,
        handlers::add_file,
        handlers::upload_report,
        handlers::submit_prescription,
        handlers::book_appointment,
        handlers::summarise_patient,
        handlers::request_summary,
        handlers::read_blob,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::ErrorDetail,
        api_shared::LookupReq,
        api_shared::IntakeReq,
        api_shared::VitalsDto,
        api_shared::PatientRecordRes,
        api_shared::FileRecordDto,
        api_shared::FileRecordsRes,
        api_shared::AppointmentDto,
        api_shared::ReportUploadReq,
        api_shared::MedicationDto,
        api_shared::PrescriptionReq,
        api_shared::SummaryReq,
        api_shared::SummaryRes,
        api_shared::StoredBlobRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router.
///
/// Every route except `/health`, the OpenAPI docs and `/blobs` requires `x-api-key`.
/// `/blobs` accepts either the key or the path token carried by blob URLs.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/patients", post(handlers::intake))
        .route("/patients/lookup", post(handlers::lookup))
        .route("/patients/:hash", get(handlers::get_patient))
        .route(
            "/patients/:hash/files",
            get(handlers::list_files).post(handlers::add_file),
        )
        .route("/patients/:hash/reports", post(handlers::upload_report))
        .route(
            "/patients/:hash/prescriptions",
            post(handlers::submit_prescription),
        )
        .route(
            "/patients/:hash/appointments",
            post(handlers::book_appointment),
        )
        .route("/patients/:hash/summary", post(handlers::summarise_patient))
        .route("/summaries", post(handlers::request_summary))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/blobs/*path", get(handlers::read_blob))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// Binds `addr` and serves the REST API until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- Starting PRS REST API on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use prs_core::CoreConfig;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const API_KEY: &str = "test-key";
    const SAMPLE_HASH: &str = "2a33349e7e606a8ad2e30e3c84521f9377450cf09083e162e0a9b1480ce0f972";

    fn app() -> (TempDir, Router) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let facility = NonEmptyText::new("General Hospital").unwrap();
        let cfg = CoreConfig::new(
            temp_dir.path().join("patient_data"),
            temp_dir.path().join("blobs"),
            "http://localhost:3000/blobs",
            NonEmptyText::new("blob-secret").unwrap(),
            facility.clone(),
        )
        .unwrap();
        let service = PatientRecordService::new(Arc::new(cfg)).unwrap();
        (temp_dir, router(AppState::new(service, API_KEY, facility)))
    }

    fn make_request(
        method: &str,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let req = make_request(
            method,
            uri,
            body,
            &[("x-api-key", API_KEY), ("x-staff-name", "Dr. A")],
        );
        let (status, bytes) = send(app, req).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router) {
        let (status, _) = send_json(
            app,
            "POST",
            "/patients",
            Some(json!({ "nationalId": "123456789012", "name": "Asha Patil" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_health_does_not_require_api_key() {
        let (_tmp, app) = app();
        let (status, bytes) = send(&app, make_request("GET", "/health", None, &[])).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["summariesEnabled"], json!(false));
    }

    #[tokio::test]
    async fn test_protected_routes_require_api_key() {
        let (_tmp, app) = app();
        let body = json!({ "nationalId": "123456789012" });

        let req = make_request("POST", "/patients/lookup", Some(body.clone()), &[]);
        let (status, bytes) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(err["error"]["code"], json!("AUTH_REQUIRED"));

        let req = make_request(
            "POST",
            "/patients/lookup",
            Some(body),
            &[("x-api-key", "wrong")],
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_intake_then_lookup() {
        let (_tmp, app) = app();

        let (status, _) = send_json(
            &app,
            "POST",
            "/patients/lookup",
            Some(json!({ "nationalId": "123456789012" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        register(&app).await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/patients/lookup",
            Some(json!({ "nationalId": "123456789012" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["identifierHash"], json!(SAMPLE_HASH));
        assert_eq!(body["name"], json!("Asha Patil"));
        assert_eq!(body["fileRecords"], json!([]));

        let (status, body) =
            send_json(&app, "GET", &format!("/patients/{}", SAMPLE_HASH), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["identifierHash"], json!(SAMPLE_HASH));
    }

    #[tokio::test]
    async fn test_duplicate_intake_is_conflict() {
        let (_tmp, app) = app();
        register(&app).await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/patients",
            Some(json!({ "nationalId": "123456789012" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], json!("CONFLICT"));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_bad_request() {
        let (_tmp, app) = app();
        let (status, body) = send_json(&app, "GET", "/patients/ABC", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("VALIDATION_FAILED"));
    }

    #[tokio::test]
    async fn test_add_and_list_documents() {
        let (_tmp, app) = app();
        register(&app).await;
        let files_uri = format!("/patients/{}/files", SAMPLE_HASH);
        let doc = json!({
            "url": "https://x/y.pdf",
            "doctor": "Dr. A",
            "type": "LabReport",
            "date": "2024-01-01"
        });

        let (status, _) = send_json(&app, "POST", &files_uri, Some(doc.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send_json(
            &app,
            "POST",
            &files_uri,
            Some(json!({ "url": "https://x/z.pdf", "doctor": "", "type": "Scan", "date": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(&app, "GET", &files_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fileRecords"], json!([doc]));
    }

    #[tokio::test]
    async fn test_uploaded_report_is_served_from_its_url() {
        let (_tmp, app) = app();
        register(&app).await;

        let (status, record) = send_json(
            &app,
            "POST",
            &format!("/patients/{}/reports", SAMPLE_HASH),
            Some(json!({
                "type": "LabReport",
                "date": "2024-01-01",
                "contentBase64": "data:application/pdf;base64,JVBERi0xLjQK",
                "fileExtension": "pdf"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["doctor"], json!("Dr. A"));

        let url = record["url"].as_str().unwrap();
        let path = url.strip_prefix("http://localhost:3000").unwrap();
        assert!(path.starts_with("/blobs/General%20Hospital/LabReport_"));

        assert!(path.contains(".pdf?token="), "{path}");

        // The URL alone is enough; no API key.
        let response = app
            .clone()
            .oneshot(make_request("GET", path, None, &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/pdf"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"%PDF-1.4\n");
    }

    async fn upload_sample_report(app: &Router) -> String {
        let (status, record) = send_json(
            app,
            "POST",
            &format!("/patients/{}/reports", SAMPLE_HASH),
            Some(json!({
                "type": "LabReport",
                "date": "2024-01-01",
                "contentBase64": "JVBERi0xLjQK",
                "fileExtension": "pdf"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let url = record["url"].as_str().unwrap();
        url.strip_prefix("http://localhost:3000").unwrap().to_string()
    }

    #[tokio::test]
    async fn test_blob_with_tampered_token_is_forbidden() {
        let (_tmp, app) = app();
        register(&app).await;
        let path = upload_sample_report(&app).await;

        let (blob_path, token) = path.split_once("?token=").unwrap();
        let last = if token.ends_with('0') { "1" } else { "0" };
        let tampered = format!("{}?token={}{}", blob_path, &token[..token.len() - 1], last);

        let (status, bytes) = send(&app, make_request("GET", &tampered, None, &[])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let err: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(err["error"]["code"], json!("FORBIDDEN"));

        // A token signed for one blob does not open another.
        let other = format!("/blobs/General%20Hospital/Other.pdf?token={}", token);
        let (status, _) = send(&app, make_request("GET", &other, None, &[])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_blob_without_token_needs_api_key() {
        let (_tmp, app) = app();
        register(&app).await;
        let path = upload_sample_report(&app).await;
        let (blob_path, _) = path.split_once('?').unwrap();

        let (status, _) = send(&app, make_request("GET", blob_path, None, &[])).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = make_request("GET", blob_path, None, &[("x-api-key", API_KEY)]);
        let (status, bytes) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&bytes[..], b"%PDF-1.4\n");
    }

    #[tokio::test]
    async fn test_blob_metadata_is_served_on_request() {
        let (_tmp, app) = app();
        register(&app).await;
        let path = upload_sample_report(&app).await;

        let (status, bytes) = send(
            &app,
            make_request("GET", &format!("{}&meta=true", path), None, &[]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let meta: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(meta["contentType"], json!("application/pdf"));
        assert_eq!(meta["sizeBytes"], json!(9));
        assert_eq!(meta["hash"].as_str().unwrap().len(), 64);
        assert!(meta["path"]
            .as_str()
            .unwrap()
            .starts_with("General Hospital/LabReport_"));
    }

    #[tokio::test]
    async fn test_appointments_are_booked_in_order() {
        let (_tmp, app) = app();
        register(&app).await;
        let uri = format!("/patients/{}/appointments", SAMPLE_HASH);

        let (status, booked) = send_json(
            &app,
            "POST",
            &uri,
            Some(json!({ "doctor": " Dr. B ", "specialty": "ENT", "date": "2024-02-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booked["doctor"], json!("Dr. B"));

        let (status, _) = send_json(
            &app,
            "POST",
            &uri,
            Some(json!({ "doctor": "Dr. C", "date": "2024-01-15", "nextStep": "Review" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) =
            send_json(&app, "POST", &uri, Some(json!({ "doctor": "Dr. D", "date": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, patient) =
            send_json(&app, "GET", &format!("/patients/{}", SAMPLE_HASH), None).await;
        let upcoming = patient["upcomingAppointments"].as_array().unwrap();
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0]["doctor"], json!("Dr. B"));
        assert_eq!(upcoming[1]["nextStep"], json!("Review"));

        let (status, _) = send_json(
            &app,
            "POST",
            "/patients/0000000000000000000000000000000000000000000000000000000000000000/appointments",
            Some(json!({ "date": "2024-01-15" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_intake_with_attachments() {
        let (_tmp, app) = app();
        let form = json!({
            "nationalId": "123456789012",
            "name": "Asha Patil",
            "attachments": [
                { "type": "BloodReport", "date": "2024-01-01", "contentBase64": "JVBERi0xLjQK", "fileExtension": "pdf" },
                { "type": "Prescription", "date": "2023-12-20", "contentBase64": "JVBERi0xLjQK", "fileExtension": "pdf" }
            ]
        });

        // Attachments need a staff member.
        let req = make_request("POST", "/patients", Some(form.clone()), &[("x-api-key", API_KEY)]);
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, record) = send_json(&app, "POST", "/patients", Some(form)).await;
        assert_eq!(status, StatusCode::CREATED);
        let files = record["fileRecords"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["type"], json!("BloodReport"));
        assert_eq!(files[1]["doctor"], json!("Dr. A"));
    }

    #[tokio::test]
    async fn test_report_upload_requires_staff_header() {
        let (_tmp, app) = app();
        register(&app).await;

        let req = make_request(
            "POST",
            &format!("/patients/{}/reports", SAMPLE_HASH),
            Some(json!({ "type": "LabReport", "date": "2024-01-01", "contentBase64": "AAAA" })),
            &[("x-api-key", API_KEY)],
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_prescription_is_attached() {
        let (_tmp, app) = app();
        register(&app).await;

        let (status, record) = send_json(
            &app,
            "POST",
            &format!("/patients/{}/prescriptions", SAMPLE_HASH),
            Some(json!({
                "diagnosis": "Viral fever",
                "bloodGroup": "B+",
                "medications": [{ "name": "Paracetamol", "dose": "500mg", "timeToEat": "after food" }],
                "nextAppointment": { "doctor": "Dr. B", "specialty": "General", "date": "2024-01-08" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let kind = record["type"].as_str().unwrap();
        assert!(kind.starts_with("Prescription_") && kind.ends_with("_Dr. A"), "{kind}");

        let (_, patient) =
            send_json(&app, "GET", &format!("/patients/{}", SAMPLE_HASH), None).await;
        assert_eq!(patient["fileRecords"].as_array().unwrap().len(), 1);
        assert_eq!(patient["upcomingAppointments"][0]["doctor"], json!("Dr. B"));
    }

    #[tokio::test]
    async fn test_summaries_report_validation_and_disabled_service() {
        let (_tmp, app) = app();

        let (status, _) =
            send_json(&app, "POST", "/summaries", Some(json!({ "documentUrls": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(
            &app,
            "POST",
            "/summaries",
            Some(json!({ "documentUrls": ["https://x/y.pdf"] })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], json!("SUMMARIES_DISABLED"));
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let (_tmp, app) = app();
        let (status, bytes) =
            send(&app, make_request("GET", "/api-docs/openapi.json", None, &[])).await;
        assert_eq!(status, StatusCode::OK);
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/patients/lookup"].is_object());
        assert!(doc["paths"]["/patients/{hash}/appointments"].is_object());
        assert!(doc["components"]["schemas"]["StoredBlobRes"].is_object());
    }
}
