//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Nothing in request handling reads process-wide environment variables.

use crate::constants::{
    DEFAULT_BLOB_DIR_NAME, DEFAULT_FACILITY, DEFAULT_PATIENT_DATA_DIR, DEFAULT_PUBLIC_BLOB_URL,
    PATIENTS_COLLECTION,
};
use crate::{NonEmptyText, PatientError, PatientResult};
use chrono::FixedOffset;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    blob_dir: PathBuf,
    public_blob_url: NonEmptyText,
    blob_signing_key: NonEmptyText,
    default_facility: NonEmptyText,
    facility_offset: FixedOffset,
    summary_url: Option<NonEmptyText>,
    summary_timeout: Option<Duration>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with summaries disabled and facility dates in UTC.
    ///
    /// `blob_signing_key` signs the capability token on every blob URL; the server that
    /// serves `/blobs` must be configured with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if `public_blob_url` is blank.
    pub fn new(
        patient_data_dir: PathBuf,
        blob_dir: PathBuf,
        public_blob_url: &str,
        blob_signing_key: NonEmptyText,
        default_facility: NonEmptyText,
    ) -> PatientResult<Self> {
        let public_blob_url = NonEmptyText::new(public_blob_url)
            .map_err(|_| PatientError::InvalidInput("public blob URL cannot be empty".into()))?;

        Ok(Self {
            patient_data_dir,
            blob_dir,
            public_blob_url,
            blob_signing_key,
            default_facility,
            facility_offset: utc(),
            summary_url: None,
            summary_timeout: None,
        })
    }

    /// Enables the summarisation client.
    pub fn with_summary_service(mut self, url: NonEmptyText, timeout: Option<Duration>) -> Self {
        self.summary_url = Some(url);
        self.summary_timeout = timeout;
        self
    }

    /// Sets the UTC offset used for calendar dates recorded at the facility.
    pub fn with_facility_offset(mut self, offset: FixedOffset) -> Self {
        self.facility_offset = offset;
        self
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    /// Directory of the `patients` document collection.
    pub fn patients_dir(&self) -> PathBuf {
        self.patient_data_dir.join(PATIENTS_COLLECTION)
    }

    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    pub fn public_blob_url(&self) -> &str {
        self.public_blob_url.as_str()
    }

    pub fn blob_signing_key(&self) -> &NonEmptyText {
        &self.blob_signing_key
    }

    pub fn default_facility(&self) -> &NonEmptyText {
        &self.default_facility
    }

    pub fn facility_offset(&self) -> FixedOffset {
        self.facility_offset
    }

    pub fn summary_url(&self) -> Option<&str> {
        self.summary_url.as_ref().map(NonEmptyText::as_str)
    }

    pub fn summary_timeout(&self) -> Option<Duration> {
        self.summary_timeout
    }
}

/// Resolve a [`CoreConfig`] from key/value settings.
///
/// `lookup` is typically `|key| std::env::var(key).ok()`; tests pass a map instead. Blank
/// values are treated as unset.
///
/// | Key | Default |
/// |---|---|
/// | `PATIENT_DATA_DIR` | `patient_data` |
/// | `PRS_BLOB_DIR` | `<PATIENT_DATA_DIR>/blobs` |
/// | `PRS_PUBLIC_BLOB_URL` | `http://localhost:3000/blobs` |
/// | `PRS_BLOB_SIGNING_KEY` | `API_KEY` (one of the two is required) |
/// | `PRS_FACILITY` | `General Hospital` |
/// | `PRS_FACILITY_UTC_OFFSET_MINUTES` | `0` |
/// | `PRS_SUMMARY_URL` | unset (summaries disabled) |
/// | `PRS_SUMMARY_TIMEOUT_SECS` | unset (HTTP client default) |
///
/// # Errors
///
/// Returns [`PatientError::InvalidInput`] if:
/// - neither `PRS_BLOB_SIGNING_KEY` nor `API_KEY` is set,
/// - `PRS_FACILITY_UTC_OFFSET_MINUTES` is not a valid offset,
/// - `PRS_SUMMARY_TIMEOUT_SECS` is not a positive integer.
pub fn resolve_core_config(lookup: impl Fn(&str) -> Option<String>) -> PatientResult<CoreConfig> {
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let patient_data_dir =
        PathBuf::from(get("PATIENT_DATA_DIR").unwrap_or_else(|| DEFAULT_PATIENT_DATA_DIR.into()));
    let blob_dir = get("PRS_BLOB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| patient_data_dir.join(DEFAULT_BLOB_DIR_NAME));
    let public_blob_url =
        get("PRS_PUBLIC_BLOB_URL").unwrap_or_else(|| DEFAULT_PUBLIC_BLOB_URL.into());
    let signing_key = get("PRS_BLOB_SIGNING_KEY")
        .or_else(|| get("API_KEY"))
        .ok_or_else(|| {
            PatientError::InvalidInput(
                "PRS_BLOB_SIGNING_KEY or API_KEY must be set to sign blob URLs".into(),
            )
        })?;
    let facility = NonEmptyText::new(get("PRS_FACILITY").unwrap_or_else(|| DEFAULT_FACILITY.into()))?;
    let offset = facility_offset_from_env_value(get("PRS_FACILITY_UTC_OFFSET_MINUTES"))?;

    let cfg = CoreConfig::new(
        patient_data_dir,
        blob_dir,
        &public_blob_url,
        NonEmptyText::new(signing_key)?,
        facility,
    )?
    .with_facility_offset(offset);

    match NonEmptyText::optional(get("PRS_SUMMARY_URL")) {
        Some(url) => {
            let timeout = summary_timeout_from_env_value(get("PRS_SUMMARY_TIMEOUT_SECS"))?;
            Ok(cfg.with_summary_service(url, timeout))
        }
        None => Ok(cfg),
    }
}

/// Parse a facility UTC offset given in whole minutes east of UTC (e.g. `330` for IST).
pub fn facility_offset_from_env_value(value: Option<String>) -> PatientResult<FixedOffset> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(utc()),
        Some(v) => v
            .parse::<i32>()
            .ok()
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                PatientError::InvalidInput(format!(
                    "PRS_FACILITY_UTC_OFFSET_MINUTES must be minutes east of UTC, got '{}'",
                    v
                ))
            }),
    }
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is valid")
}

/// Parse the summary timeout from an optional string value of whole seconds.
pub fn summary_timeout_from_env_value(value: Option<String>) -> PatientResult<Option<Duration>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(None),
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
            _ => Err(PatientError::InvalidInput(format!(
                "PRS_SUMMARY_TIMEOUT_SECS must be a positive number of seconds, got '{}'",
                v
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_only_api_key_is_set() {
        let cfg = resolve_core_config(lookup_from(&[("API_KEY", "server-key")])).unwrap();

        assert_eq!(cfg.patient_data_dir(), Path::new("patient_data"));
        assert_eq!(cfg.patients_dir(), Path::new("patient_data").join("patients"));
        assert_eq!(cfg.blob_dir(), Path::new("patient_data").join("blobs"));
        assert_eq!(cfg.public_blob_url(), "http://localhost:3000/blobs");
        assert_eq!(cfg.blob_signing_key().as_str(), "server-key");
        assert_eq!(cfg.default_facility().as_str(), "General Hospital");
        assert_eq!(cfg.facility_offset(), utc());
        assert_eq!(cfg.summary_url(), None);
        assert_eq!(cfg.summary_timeout(), None);
    }

    #[test]
    fn test_signing_key_is_required() {
        let err = resolve_core_config(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, PatientError::InvalidInput(_)));
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let cfg = resolve_core_config(lookup_from(&[
            ("PATIENT_DATA_DIR", "/srv/prs"),
            ("PRS_BLOB_DIR", "/srv/blobs"),
            ("PRS_PUBLIC_BLOB_URL", "https://records.example/blobs"),
            ("API_KEY", "server-key"),
            ("PRS_BLOB_SIGNING_KEY", "blob-secret"),
            ("PRS_FACILITY", " Sasoon Pune "),
            ("PRS_FACILITY_UTC_OFFSET_MINUTES", "330"),
            ("PRS_SUMMARY_URL", "http://summariser:3000"),
            ("PRS_SUMMARY_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(cfg.patients_dir(), Path::new("/srv/prs/patients"));
        assert_eq!(cfg.blob_dir(), Path::new("/srv/blobs"));
        assert_eq!(cfg.public_blob_url(), "https://records.example/blobs");
        assert_eq!(cfg.blob_signing_key().as_str(), "blob-secret");
        assert_eq!(cfg.default_facility().as_str(), "Sasoon Pune");
        assert_eq!(cfg.facility_offset(), FixedOffset::east_opt(330 * 60).unwrap());
        assert_eq!(cfg.summary_url(), Some("http://summariser:3000"));
        assert_eq!(cfg.summary_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_blank_values_are_treated_as_unset() {
        let cfg = resolve_core_config(lookup_from(&[
            ("API_KEY", "server-key"),
            ("PRS_BLOB_SIGNING_KEY", " "),
            ("PRS_FACILITY", "   "),
            ("PRS_SUMMARY_URL", ""),
        ]))
        .unwrap();

        assert_eq!(cfg.blob_signing_key().as_str(), "server-key");
        assert_eq!(cfg.default_facility().as_str(), "General Hospital");
        assert_eq!(cfg.summary_url(), None);
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let err = resolve_core_config(lookup_from(&[
            ("API_KEY", "server-key"),
            ("PRS_SUMMARY_URL", "http://summariser:3000"),
            ("PRS_SUMMARY_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PatientError::InvalidInput(_)));

        assert!(summary_timeout_from_env_value(Some("0".into())).is_err());
        assert_eq!(summary_timeout_from_env_value(Some(" ".into())).unwrap(), None);
    }

    #[test]
    fn test_facility_offset_parsing() {
        assert_eq!(facility_offset_from_env_value(None).unwrap(), utc());
        assert_eq!(
            facility_offset_from_env_value(Some("-300".into())).unwrap(),
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
        assert!(facility_offset_from_env_value(Some("IST".into())).is_err());
        assert!(facility_offset_from_env_value(Some("1500".into())).is_err());
    }
}
