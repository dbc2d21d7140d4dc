//! Patient record service.
//!
//! [`PatientRecordService`] is the single entry point for reading and mutating patient
//! records. It owns the record store, the blob store and (when configured) the
//! summarisation client, and serialises every read-modify-write of a record behind one
//! write lock so concurrent appends within the process are never lost.

use crate::config::CoreConfig;
use crate::constants::{PRESCRIPTION_CONTENT_TYPE, PRESCRIPTION_LABEL};
use crate::intake::IntakeForm;
use crate::prescription::Prescription;
use crate::record::{Appointment, FileRecord, PatientRecord};
use crate::report::ReportUpload;
use crate::session::StaffSession;
use crate::store::{FsRecordStore, RecordStore};
use crate::validation::{validate_appointment, validate_file_record};
use crate::{PatientError, PatientResult};
use chrono::{DateTime, FixedOffset, Utc};
use prs_files::{BlobContent, BlobPath, BlobStore, FsBlobStore, StoredBlob, UrlSigner};
use prs_identifier::{IdentifierHash, NationalId};
use prs_summary::SummaryClient;
use std::fs;
use std::sync::{Arc, Mutex, PoisonError};

/// Pure patient data operations - no API concerns
#[derive(Clone, Debug)]
pub struct PatientRecordService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    summaries: Option<SummaryClient>,
    facility_offset: FixedOffset,
    write_lock: Arc<Mutex<()>>,
}

impl PatientRecordService {
    /// Creates a service over the filesystem stores described by `cfg`.
    ///
    /// The patients collection and blob directories are created if missing.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if:
    /// - a storage directory cannot be created,
    /// - the public blob URL is not a usable URL prefix,
    /// - the summarisation URL is configured but invalid.
    pub fn new(cfg: Arc<CoreConfig>) -> PatientResult<Self> {
        let store = FsRecordStore::new(cfg.patients_dir())?;

        fs::create_dir_all(cfg.blob_dir()).map_err(PatientError::StorageDirCreation)?;
        let signer = UrlSigner::new(cfg.blob_signing_key().as_str())?;
        let blobs = FsBlobStore::new(cfg.blob_dir(), cfg.public_blob_url(), signer)?;

        let summaries = cfg
            .summary_url()
            .map(|url| SummaryClient::new(url, cfg.summary_timeout()))
            .transpose()?;
        if summaries.is_none() {
            tracing::info!("summarisation service not configured; summaries disabled");
        }

        Ok(
            Self::with_backends(Arc::new(store), Arc::new(blobs), summaries)
                .with_facility_offset(cfg.facility_offset()),
        )
    }

    /// Creates a service over caller-supplied backends.
    pub fn with_backends(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        summaries: Option<SummaryClient>,
    ) -> Self {
        Self {
            store,
            blobs,
            summaries,
            facility_offset: FixedOffset::east_opt(0).expect("zero offset is valid"),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Records facility calendar dates (prescription dates) at this UTC offset.
    pub fn with_facility_offset(mut self, offset: FixedOffset) -> Self {
        self.facility_offset = offset;
        self
    }

    pub fn summaries_enabled(&self) -> bool {
        self.summaries.is_some()
    }

    /// Looks up the record for a raw national ID.
    ///
    /// A missing record is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if the store cannot be read or holds a malformed document.
    pub fn lookup(&self, national_id: &NationalId) -> PatientResult<Option<PatientRecord>> {
        self.lookup_by_hash(&national_id.hash())
    }

    /// Looks up a record by its already-hashed identifier.
    pub fn lookup_by_hash(&self, hash: &IdentifierHash) -> PatientResult<Option<PatientRecord>> {
        self.store.fetch(hash)
    }

    /// Creates a record from an intake form.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::RecordAlreadyExists`] if the patient is already registered,
    /// or a store error if the record cannot be written.
    pub fn intake(&self, form: IntakeForm) -> PatientResult<PatientRecord> {
        let record = form.into_record();
        let _guard = self.lock();
        self.store.create(&record)?;
        tracing::info!(patient = %record.identifier_hash, "patient record created");
        Ok(record)
    }

    /// Registers a patient and attaches the reports handed in with the intake form.
    ///
    /// Every report is validated before the record is created, so a bad attachment leaves
    /// nothing behind. Attachments are uploaded after the record exists, one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if reports are attached without a staff
    /// session or an attachment is incomplete, and otherwise the errors of [`Self::intake`]
    /// and [`Self::upload_report`].
    pub fn intake_with_reports(
        &self,
        session: Option<&StaffSession>,
        form: IntakeForm,
        reports: Vec<ReportUpload>,
    ) -> PatientResult<PatientRecord> {
        if reports.is_empty() {
            return self.intake(form);
        }
        let session = session.ok_or_else(|| {
            PatientError::InvalidInput("attaching reports requires a staff member".into())
        })?;
        for report in &reports {
            report.validate()?;
        }

        let hash = self.intake(form)?.identifier_hash;
        for report in reports {
            self.upload_report(session, &hash, report)?;
        }
        self.require(&hash)
    }

    /// Returns the document list for a patient, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::RecordNotFound`] if no record exists.
    pub fn file_records(&self, hash: &IdentifierHash) -> PatientResult<Vec<FileRecord>> {
        Ok(self.require(hash)?.file_records)
    }

    /// Appends `record` to the patient's file records and writes the document back.
    ///
    /// No field validation is applied here; see [`Self::add_document`] for the checked form.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::RecordNotFound`] if no record exists, or a store error if
    /// the document cannot be read or written.
    pub fn append_file_record(
        &self,
        hash: &IdentifierHash,
        record: FileRecord,
    ) -> PatientResult<PatientRecord> {
        let kind = record.kind.clone();
        let updated = self.update_record(hash, |patient| patient.file_records.push(record))?;
        tracing::info!(patient = %hash, kind = %kind, "file record appended");
        Ok(updated)
    }

    /// Appends a manually entered document after checking every field is filled in.
    pub fn add_document(
        &self,
        hash: &IdentifierHash,
        record: FileRecord,
    ) -> PatientResult<FileRecord> {
        let record = validate_file_record(&record)?;
        self.append_file_record(hash, record.clone())?;
        Ok(record)
    }

    /// Books a follow-up appointment at the end of the patient's upcoming appointments.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if the date is blank, or
    /// [`PatientError::RecordNotFound`] if no record exists.
    pub fn append_appointment(
        &self,
        hash: &IdentifierHash,
        appointment: Appointment,
    ) -> PatientResult<Appointment> {
        let appointment = validate_appointment(&appointment)?;
        let booked = appointment.clone();
        self.update_record(hash, |patient| {
            patient.upcoming_appointments.push(appointment)
        })?;
        tracing::info!(patient = %hash, date = %booked.date, "appointment booked");
        Ok(booked)
    }

    /// Stores content at `path` and returns its URL. Existing content is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::Files`] if the content cannot be decoded or written.
    pub fn upload_blob(
        &self,
        path: &BlobPath,
        content: BlobContent,
        content_type: Option<&str>,
    ) -> PatientResult<StoredBlob> {
        let stored = self.blobs.put(path, content, content_type)?;
        tracing::info!(
            path = %path,
            size_bytes = stored.metadata.size_bytes,
            "blob uploaded"
        );
        Ok(stored)
    }

    /// Reads a stored blob together with its URL and metadata.
    pub fn read_blob(&self, path: &BlobPath) -> PatientResult<(Vec<u8>, StoredBlob)> {
        let (bytes, metadata) = self.blobs.read(path)?;
        let url = self.blobs.url_for(path);
        Ok((bytes, StoredBlob { url, metadata }))
    }

    /// Reads a blob on behalf of an unauthenticated holder of its URL.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::BlobAccessDenied`] if `token` was not issued for `path`.
    pub fn read_shared_blob(
        &self,
        path: &BlobPath,
        token: &str,
    ) -> PatientResult<(Vec<u8>, StoredBlob)> {
        if !self.blobs.verify_token(path, token) {
            tracing::warn!(path = %path, "rejected blob token");
            return Err(PatientError::BlobAccessDenied(path.to_string()));
        }
        self.read_blob(path)
    }

    /// Uploads a report and attaches it to the patient.
    ///
    /// The blob is stored at `<facility>/<type>_<hash>_<millis>[.ext]`. The blob is
    /// written before the record; if the record write fails the blob is left orphaned.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if:
    /// - the type, date or content is missing,
    /// - no record exists for `hash`,
    /// - the blob or record cannot be written.
    pub fn upload_report(
        &self,
        session: &StaffSession,
        hash: &IdentifierHash,
        upload: ReportUpload,
    ) -> PatientResult<FileRecord> {
        let report = upload.validate()?;
        self.require(hash)?;

        let path = BlobPath::for_record(
            &session.facility,
            report.report_type.as_str(),
            hash,
            Utc::now(),
            upload.file_extension.as_deref(),
        )?;
        let stored = self.upload_blob(&path, upload.content, upload.content_type.as_deref())?;

        let doctor = report.doctor.unwrap_or_else(|| session.staff_name.clone());
        let record = FileRecord::new(
            stored.url,
            doctor.into_string(),
            report.report_type.into_string(),
            report.date.into_string(),
        );
        self.append_file_record(hash, record.clone())?;
        Ok(record)
    }

    /// Stores a prescription document and records it against the patient.
    ///
    /// The Markdown document is uploaded to `<facility>/Prescription_<hash>_<millis>.md`, a
    /// file record of type `Prescription_<millis>_<staff name>` dated today (in the facility's
    /// UTC offset) is appended and,
    /// if the prescription names a next appointment, it is added to the upcoming
    /// appointments in the same write.
    pub fn submit_prescription(
        &self,
        session: &StaffSession,
        hash: &IdentifierHash,
        prescription: &Prescription,
    ) -> PatientResult<FileRecord> {
        self.submit_prescription_at(session, hash, prescription, Utc::now())
    }

    fn submit_prescription_at(
        &self,
        session: &StaffSession,
        hash: &IdentifierHash,
        prescription: &Prescription,
        issued_at: DateTime<Utc>,
    ) -> PatientResult<FileRecord> {
        self.require(hash)?;
        let document = prescription.render_markdown(session, hash, issued_at)?;

        let path = BlobPath::for_record(
            &session.facility,
            PRESCRIPTION_LABEL,
            hash,
            issued_at,
            Some("md"),
        )?;
        let stored = self.upload_blob(
            &path,
            BlobContent::Bytes(document.into_bytes()),
            Some(PRESCRIPTION_CONTENT_TYPE),
        )?;

        let record = FileRecord::new(
            stored.url,
            session.staff_name.as_str(),
            format!(
                "{}_{}_{}",
                PRESCRIPTION_LABEL,
                issued_at.timestamp_millis(),
                session.staff_name
            ),
            issued_at
                .with_timezone(&self.facility_offset)
                .format("%Y-%m-%d")
                .to_string(),
        );

        let appended = record.clone();
        let next_appointment = prescription.next_appointment.clone();
        self.update_record(hash, move |patient| {
            patient.file_records.push(appended);
            if let Some(appointment) = next_appointment {
                patient.upcoming_appointments.push(appointment);
            }
        })?;
        tracing::info!(patient = %hash, "prescription recorded");
        Ok(record)
    }

    /// Requests a summary of the documents at `document_urls`.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if:
    /// - `document_urls` is empty (nothing to summarise),
    /// - no summarisation service is configured,
    /// - the service cannot be reached or answers with an error; the upstream message is
    ///   kept verbatim.
    pub async fn request_summary(&self, document_urls: &[String]) -> PatientResult<String> {
        if document_urls.is_empty() {
            return Err(PatientError::InvalidInput(
                "at least one document URL is required".into(),
            ));
        }
        let client = self
            .summaries
            .as_ref()
            .ok_or(PatientError::SummariesDisabled)?;

        match client.summarize(document_urls).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::warn!("summary request failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Summarises every document attached to a patient.
    pub async fn summarise_record(&self, hash: &IdentifierHash) -> PatientResult<String> {
        let urls = self.require(hash)?.document_urls();
        if urls.is_empty() {
            return Err(PatientError::InvalidInput(format!(
                "patient {} has no documents to summarise",
                hash
            )));
        }
        self.request_summary(&urls).await
    }

    fn require(&self, hash: &IdentifierHash) -> PatientResult<PatientRecord> {
        self.store
            .fetch(hash)?
            .ok_or_else(|| PatientError::RecordNotFound(hash.clone()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded value is `()`, so a panicked writer leaves nothing inconsistent behind.
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-modify-write of one record under the service write lock.
    fn update_record<F>(&self, hash: &IdentifierHash, mutate: F) -> PatientResult<PatientRecord>
    where
        F: FnOnce(&mut PatientRecord),
    {
        let _guard = self.lock();
        let mut record = self.require(hash)?;
        mutate(&mut record);
        self.store.write(&record)?;
        Ok(record)
    }
}
