use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use prs_core::{PatientRecordService, resolve_core_config};

/// Main entry point for the PRS application
///
/// Resolves the core configuration from the environment, opens the record and blob stores
/// and serves the REST API until the process is stopped.
///
/// # Environment Variables
/// - `PRS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `API_KEY`: API key required in the `x-api-key` header (required)
/// - `PATIENT_DATA_DIR`: Directory for patient records (default: "patient_data")
/// - `PRS_BLOB_DIR`: Directory for uploaded blobs (default: "<PATIENT_DATA_DIR>/blobs")
/// - `PRS_PUBLIC_BLOB_URL`: Base URL used to build blob download links
/// - `PRS_FACILITY`: Facility used when a request does not name one
/// - `PRS_FACILITY_UTC_OFFSET_MINUTES`: Facility offset from UTC for prescription dates (default: 0)
/// - `PRS_BLOB_SIGNING_KEY`: Secret for blob URL tokens (default: `API_KEY`)
/// - `PRS_SUMMARY_URL`: Summarisation service base URL (summaries disabled when unset)
/// - `PRS_SUMMARY_TIMEOUT_SECS`: Timeout for summary requests
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("prs=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("PRS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let Some(api_key) = std::env::var("API_KEY").ok().filter(|k| !k.trim().is_empty()) else {
        anyhow::bail!("API_KEY must be set");
    };

    let cfg = Arc::new(resolve_core_config(|key| std::env::var(key).ok())?);
    let default_facility = cfg.default_facility().clone();
    tracing::info!(
        patient_data_dir = %cfg.patient_data_dir().display(),
        blob_dir = %cfg.blob_dir().display(),
        summaries = cfg.summary_url().is_some(),
        "++ Resolved PRS configuration"
    );

    let service = PatientRecordService::new(cfg)?;
    api_rest::serve(&rest_addr, AppState::new(service, api_key, default_facility)).await
}
