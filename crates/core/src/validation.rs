//! Input validation utilities.
//!
//! Checks applied to user-entered values before they are written to a record.

use crate::record::{Appointment, FileRecord};
use crate::{PatientError, PatientResult};

/// Validates that every field of a manually added document is filled in.
///
/// Values are trimmed; the returned record holds the trimmed values.
///
/// # Errors
///
/// Returns a `PatientError::InvalidInput` naming every blank field.
pub fn validate_file_record(record: &FileRecord) -> PatientResult<FileRecord> {
    let fields = [
        ("url", record.url.trim()),
        ("doctor", record.doctor.trim()),
        ("type", record.kind.trim()),
        ("date", record.date.trim()),
    ];

    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(PatientError::InvalidInput(format!(
            "document is missing required fields: {}",
            missing.join(", ")
        )));
    }

    let [url, doctor, kind, date] = fields.map(|(_, value)| value);
    Ok(FileRecord::new(url, doctor, kind, date))
}

/// Validates a directly booked follow-up: the date is required, other fields are optional.
///
/// # Errors
///
/// Returns a `PatientError::InvalidInput` if the date is blank.
pub fn validate_appointment(appointment: &Appointment) -> PatientResult<Appointment> {
    let cleaned = Appointment {
        doctor: appointment.doctor.trim().to_string(),
        specialty: appointment.specialty.trim().to_string(),
        date: appointment.date.trim().to_string(),
        next_step: appointment.next_step.trim().to_string(),
    };
    if cleaned.date.is_empty() {
        return Err(PatientError::InvalidInput(
            "appointment is missing required field: date".into(),
        ));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_record_is_trimmed() {
        let record = FileRecord::new(" https://x/y.pdf ", "Dr. A", "LabReport ", "2024-01-01");
        let cleaned = validate_file_record(&record).unwrap();
        assert_eq!(cleaned.url, "https://x/y.pdf");
        assert_eq!(cleaned.kind, "LabReport");
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        let record = FileRecord::new("https://x/y.pdf", " ", "LabReport", "");
        match validate_file_record(&record) {
            Err(PatientError::InvalidInput(msg)) => {
                assert_eq!(msg, "document is missing required fields: doctor, date")
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_appointment_requires_date() {
        let appointment = Appointment {
            doctor: " Dr. B ".into(),
            date: " ".into(),
            ..Appointment::default()
        };
        assert!(validate_appointment(&appointment).is_err());

        let appointment = Appointment {
            date: "2024-01-08 ".into(),
            ..appointment
        };
        let cleaned = validate_appointment(&appointment).unwrap();
        assert_eq!(cleaned.doctor, "Dr. B");
        assert_eq!(cleaned.date, "2024-01-08");
    }
}
