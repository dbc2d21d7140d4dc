//! Wire types for the PRS APIs.
//!
//! Field names are camelCase, matching the stored patient document. Conversions into core
//! types live here so the REST layer and the CLI share one mapping.

use prs_core::{
    Appointment, BlobContent, BloodGroup, FileRecord, IntakeForm, Medication, NationalId,
    NonEmptyText, PatientError, PatientRecord, Prescription, ReportUpload, StoredBlob, TextList,
    Vitals,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    pub summaries_enabled: bool,
}

/// Error envelope returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `NOT_FOUND`.
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LookupReq {
    /// Raw national ID. Sent in the body so it never appears in URLs or access logs.
    pub national_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HashRes {
    pub identifier_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VitalsDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntakeReq {
    pub national_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub past_diseases: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub ongoing_medication: Vec<String>,
    #[serde(default)]
    pub vitals: Option<VitalsDto>,
    /// Reports (blood report, prescription scan, imaging) handed in at registration.
    /// Attaching any requires the `x-staff-name` header.
    #[serde(default)]
    pub attachments: Vec<ReportUploadReq>,
}

impl IntakeReq {
    /// Removes the attachments, leaving the form fields for conversion into an [`IntakeForm`].
    pub fn take_attachments(&mut self) -> Vec<ReportUpload> {
        std::mem::take(&mut self.attachments)
            .into_iter()
            .map(ReportUpload::from)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileRecordDto {
    pub url: String,
    pub doctor: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDto {
    #[serde(default)]
    pub doctor: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub next_step: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecordRes {
    pub identifier_hash: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<String>,
    pub city: Option<String>,
    pub date_of_birth: Option<String>,
    pub mobile_number: Option<String>,
    pub blood_type: Option<String>,
    pub past_diseases: Vec<String>,
    pub allergies: Vec<String>,
    pub ongoing_medication: Vec<String>,
    pub vitals: Option<VitalsDto>,
    pub file_records: Vec<FileRecordDto>,
    pub upcoming_appointments: Vec<AppointmentDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecordsRes {
    pub file_records: Vec<FileRecordDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportUploadReq {
    #[serde(rename = "type")]
    pub report_type: String,
    pub date: String,
    #[serde(default)]
    pub doctor: Option<String>,
    /// Standard base64, optionally as a `data:<type>;base64,` URL.
    pub content_base64: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub file_extension: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicationDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dose: String,
    #[serde(default)]
    pub time_to_eat: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionReq {
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    /// One of `A+ A- B+ B- O+ O- AB+ AB-`.
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub medications: Vec<MedicationDto>,
    #[serde(default)]
    pub next_appointment: Option<AppointmentDto>,
    #[serde(default)]
    pub doctor_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReq {
    pub document_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummaryRes {
    pub summary: String,
}

/// Blob metadata, returned by `GET /blobs/{path}?meta=true` instead of the bytes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlobRes {
    pub url: String,
    pub path: String,
    pub hash: String,
    pub size_bytes: u64,
    pub content_type: String,
}

impl From<Vitals> for VitalsDto {
    fn from(v: Vitals) -> Self {
        Self {
            blood_pressure: v.blood_pressure,
            heart_rate: v.heart_rate,
            respiratory_rate: v.respiratory_rate,
            temperature: v.temperature,
            oxygen_saturation: v.oxygen_saturation,
        }
    }
}

impl From<VitalsDto> for Vitals {
    fn from(v: VitalsDto) -> Self {
        Self {
            blood_pressure: v.blood_pressure,
            heart_rate: v.heart_rate,
            respiratory_rate: v.respiratory_rate,
            temperature: v.temperature,
            oxygen_saturation: v.oxygen_saturation,
        }
    }
}

impl From<FileRecord> for FileRecordDto {
    fn from(r: FileRecord) -> Self {
        Self {
            url: r.url,
            doctor: r.doctor,
            kind: r.kind,
            date: r.date,
        }
    }
}

impl From<FileRecordDto> for FileRecord {
    fn from(r: FileRecordDto) -> Self {
        FileRecord::new(r.url, r.doctor, r.kind, r.date)
    }
}

impl From<Appointment> for AppointmentDto {
    fn from(a: Appointment) -> Self {
        Self {
            doctor: a.doctor,
            specialty: a.specialty,
            date: a.date,
            next_step: a.next_step,
        }
    }
}

impl From<AppointmentDto> for Appointment {
    fn from(a: AppointmentDto) -> Self {
        Self {
            doctor: a.doctor,
            specialty: a.specialty,
            date: a.date,
            next_step: a.next_step,
        }
    }
}

impl From<PatientRecord> for PatientRecordRes {
    fn from(r: PatientRecord) -> Self {
        Self {
            identifier_hash: r.identifier_hash.to_string(),
            name: r.name,
            email: r.email,
            age: r.age,
            city: r.city,
            date_of_birth: r.date_of_birth,
            mobile_number: r.mobile_number,
            blood_type: r.blood_type,
            past_diseases: r.past_diseases.to_strings(),
            allergies: r.allergies.to_strings(),
            ongoing_medication: r.ongoing_medication.to_strings(),
            vitals: r.vitals.map(VitalsDto::from),
            file_records: r.file_records.into_iter().map(Into::into).collect(),
            upcoming_appointments: r.upcoming_appointments.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<FileRecord>> for FileRecordsRes {
    fn from(records: Vec<FileRecord>) -> Self {
        Self {
            file_records: records.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<StoredBlob> for StoredBlobRes {
    fn from(b: StoredBlob) -> Self {
        Self {
            url: b.url,
            path: b.metadata.path,
            hash: b.metadata.hash,
            size_bytes: b.metadata.size_bytes,
            content_type: b.metadata.content_type.into_string(),
        }
    }
}

impl TryFrom<IntakeReq> for IntakeForm {
    type Error = PatientError;

    fn try_from(req: IntakeReq) -> Result<Self, Self::Error> {
        let mut form = IntakeForm::new(NationalId::from_entry(&req.national_id)?);
        form.name = req.name;
        form.email = req.email;
        form.age = req.age;
        form.city = req.city;
        form.date_of_birth = req.date_of_birth;
        form.mobile_number = req.mobile_number;
        form.blood_type = req.blood_type;
        form.past_diseases = TextList::from_entries(req.past_diseases);
        form.allergies = TextList::from_entries(req.allergies);
        form.ongoing_medication = TextList::from_entries(req.ongoing_medication);
        form.vitals = req.vitals.map(Vitals::from).unwrap_or_default();
        Ok(form)
    }
}

impl From<ReportUploadReq> for ReportUpload {
    fn from(req: ReportUploadReq) -> Self {
        Self {
            report_type: req.report_type,
            date: req.date,
            doctor: req.doctor,
            content: BlobContent::Base64(req.content_base64),
            content_type: req.content_type,
            file_extension: req.file_extension,
        }
    }
}

impl TryFrom<PrescriptionReq> for Prescription {
    type Error = PatientError;

    fn try_from(req: PrescriptionReq) -> Result<Self, Self::Error> {
        let blood_group = req
            .blood_group
            .as_deref()
            .filter(|g| !g.trim().is_empty())
            .map(str::parse::<BloodGroup>)
            .transpose()?;

        let mut prescription = Prescription {
            symptoms: NonEmptyText::optional(req.symptoms),
            diagnosis: NonEmptyText::optional(req.diagnosis),
            height: NonEmptyText::optional(req.height),
            weight: NonEmptyText::optional(req.weight),
            blood_group,
            medications: req
                .medications
                .iter()
                .filter_map(|m| Medication::from_row(&m.name, &m.dose, &m.time_to_eat))
                .collect(),
            next_appointment: None,
            doctor_notes: NonEmptyText::optional(req.doctor_notes),
        };
        if let Some(appointment) = req.next_appointment {
            prescription.set_next_appointment(appointment.into());
        }
        Ok(prescription)
    }
}
