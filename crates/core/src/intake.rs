//! Patient intake.
//!
//! Turns the administrative intake form into a new [`PatientRecord`]. Scalars are trimmed
//! and blank values dropped; repeated fields arrive as [`TextList`]s and are therefore
//! already clean.

use crate::record::{PatientRecord, Vitals};
use crate::NonEmptyText;
use prs_identifier::NationalId;
use prs_types::TextList;

/// Values collected at intake.
#[derive(Debug, Clone)]
pub struct IntakeForm {
    pub national_id: NationalId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<String>,
    pub city: Option<String>,
    pub date_of_birth: Option<String>,
    pub mobile_number: Option<String>,
    pub blood_type: Option<String>,
    pub past_diseases: TextList,
    pub allergies: TextList,
    pub ongoing_medication: TextList,
    pub vitals: Vitals,
}

impl IntakeForm {
    /// A form with only the identifier filled in.
    pub fn new(national_id: NationalId) -> Self {
        Self {
            national_id,
            name: None,
            email: None,
            age: None,
            city: None,
            date_of_birth: None,
            mobile_number: None,
            blood_type: None,
            past_diseases: TextList::default(),
            allergies: TextList::default(),
            ongoing_medication: TextList::default(),
            vitals: Vitals::default(),
        }
    }

    /// Builds the initial record. The raw national ID is hashed and then discarded.
    pub fn into_record(self) -> PatientRecord {
        let mut record = PatientRecord::empty(self.national_id.hash());

        record.name = clean(self.name);
        record.email = clean(self.email);
        record.age = clean(self.age);
        record.city = clean(self.city);
        record.date_of_birth = clean(self.date_of_birth);
        record.mobile_number = clean(self.mobile_number);
        record.blood_type = clean(self.blood_type);
        record.past_diseases = self.past_diseases;
        record.allergies = self.allergies;
        record.ongoing_medication = self.ongoing_medication;

        let vitals = Vitals {
            blood_pressure: clean(self.vitals.blood_pressure),
            heart_rate: clean(self.vitals.heart_rate),
            respiratory_rate: clean(self.vitals.respiratory_rate),
            temperature: clean(self.vitals.temperature),
            oxygen_saturation: clean(self.vitals.oxygen_saturation),
        };
        record.vitals = (!vitals.is_empty()).then_some(vitals);

        record
    }
}

fn clean(value: Option<String>) -> Option<String> {
    NonEmptyText::optional(value).map(NonEmptyText::into_string)
}
