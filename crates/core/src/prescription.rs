//! Prescriptions and their Markdown rendering.
//!
//! A submitted prescription is stored as a Markdown document in the blob store and referenced
//! from the patient's file records. Free text from the form is escaped so it cannot introduce
//! headings, horizontal rules or code fences into the rendered document.

use crate::record::Appointment;
use crate::session::StaffSession;
use crate::{NonEmptyText, PatientError, PatientResult};
use chrono::{DateTime, SecondsFormat, Utc};
use prs_identifier::IdentifierHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DOCUMENT_HEADER: &str = "# Prescription";

/// ABO/Rh blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        BloodGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| {
                PatientError::InvalidInput(format!(
                    "unknown blood group '{}' (expected one of A+, A-, B+, B-, O+, O-, AB+, AB-)",
                    s.trim()
                ))
            })
    }
}

/// One medication line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Medication {
    pub name: NonEmptyText,
    pub dose: Option<NonEmptyText>,
    pub time_to_eat: Option<NonEmptyText>,
}

impl Medication {
    /// Builds a medication from a form row. Rows without a name yield `None`.
    pub fn from_row(name: &str, dose: &str, time_to_eat: &str) -> Option<Self> {
        let name = NonEmptyText::new(name).ok()?;
        Some(Self {
            name,
            dose: NonEmptyText::optional(Some(dose)),
            time_to_eat: NonEmptyText::optional(Some(time_to_eat)),
        })
    }
}

/// A prescription as authored by the doctor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prescription {
    pub symptoms: Option<NonEmptyText>,
    pub diagnosis: Option<NonEmptyText>,
    pub height: Option<NonEmptyText>,
    pub weight: Option<NonEmptyText>,
    pub blood_group: Option<BloodGroup>,
    pub medications: Vec<Medication>,
    pub next_appointment: Option<Appointment>,
    pub doctor_notes: Option<NonEmptyText>,
}

impl Prescription {
    /// Keeps `appointment` only if at least one of its fields is filled in.
    pub fn set_next_appointment(&mut self, appointment: Appointment) {
        let trimmed = Appointment {
            doctor: appointment.doctor.trim().to_string(),
            specialty: appointment.specialty.trim().to_string(),
            date: appointment.date.trim().to_string(),
            next_step: appointment.next_step.trim().to_string(),
        };
        self.next_appointment = (trimmed != Appointment::default()).then_some(trimmed);
    }

    /// Renders the prescription as a Markdown document.
    ///
    /// Document format:
    /// ```markdown
    /// # Prescription
    ///
    /// **Patient:** <identifier hash>
    /// **Prescribed by:** <staff name>
    /// **Facility:** <facility>
    /// **Issued:** <rfc3339>
    ///
    /// ## Symptoms
    /// ...
    /// ```
    ///
    /// Sections with no content are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if the prescription has neither a diagnosis nor
    /// any medication, since there would be nothing to prescribe.
    pub fn render_markdown(
        &self,
        session: &StaffSession,
        patient: &IdentifierHash,
        issued_at: DateTime<Utc>,
    ) -> PatientResult<String> {
        if self.diagnosis.is_none() && self.medications.is_empty() {
            return Err(PatientError::InvalidInput(
                "prescription needs a diagnosis or at least one medication".into(),
            ));
        }

        let mut output = String::new();
        output.push_str(DOCUMENT_HEADER);
        output.push_str("\n\n");
        output.push_str(&format!("**Patient:** {}\n", patient));
        output.push_str(&format!(
            "**Prescribed by:** {}\n",
            escape_inline(session.staff_name.as_str())
        ));
        output.push_str(&format!(
            "**Facility:** {}\n",
            escape_inline(session.facility.as_str())
        ));
        output.push_str(&format!(
            "**Issued:** {}\n",
            issued_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));

        push_section(&mut output, "Symptoms", self.symptoms.as_ref());
        push_section(&mut output, "Diagnosis", self.diagnosis.as_ref());

        let measurements: Vec<String> = [
            ("Height", self.height.as_ref().map(|t| escape_inline(t.as_str()))),
            ("Weight", self.weight.as_ref().map(|t| escape_inline(t.as_str()))),
            ("Blood group", self.blood_group.map(|g| g.to_string())),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| format!("- {}: {}", label, v)))
        .collect();
        if !measurements.is_empty() {
            output.push_str("\n## Measurements\n\n");
            output.push_str(&measurements.join("\n"));
            output.push('\n');
        }

        if !self.medications.is_empty() {
            output.push_str("\n## Medications\n\n");
            for med in &self.medications {
                output.push_str(&format!("- **{}**", escape_inline(med.name.as_str())));
                let details: Vec<String> = [med.dose.as_ref(), med.time_to_eat.as_ref()]
                    .into_iter()
                    .flatten()
                    .map(|t| escape_inline(t.as_str()))
                    .collect();
                if !details.is_empty() {
                    output.push_str(": ");
                    output.push_str(&details.join(", "));
                }
                output.push('\n');
            }
        }

        if let Some(appt) = &self.next_appointment {
            output.push_str("\n## Next appointment\n\n");
            for (label, value) in [
                ("Doctor", &appt.doctor),
                ("Specialty", &appt.specialty),
                ("Date", &appt.date),
                ("Next step", &appt.next_step),
            ] {
                if !value.is_empty() {
                    output.push_str(&format!("- {}: {}\n", label, escape_inline(value)));
                }
            }
        }

        push_section(&mut output, "Doctor notes", self.doctor_notes.as_ref());

        Ok(output)
    }
}

fn push_section(output: &mut String, title: &str, body: Option<&NonEmptyText>) {
    if let Some(body) = body {
        output.push_str(&format!("\n## {}\n\n", title));
        output.push_str(&escape_body(body.as_str()));
        output.push('\n');
    }
}

/// Escapes Markdown block syntax in multi-line prose.
///
/// - `#` at line start → `\#` (prevents headers)
/// - Triple backticks → `\`\`\`` (prevents code blocks)
/// - Standalone `---`, `***`, `___` → escaped (prevents horizontal rules)
fn escape_body(body: &str) -> String {
    body.lines()
        .map(|line| {
            let trimmed = line.trim();
            if line.trim_start().starts_with('#') {
                line.replacen('#', r"\#", 1)
            } else if trimmed == "---" || trimmed == "***" || trimmed == "___" {
                format!(r"\{}", trimmed)
            } else {
                line.replace("```", r"\`\`\`")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escapes a value that must stay on one line.
fn escape_inline(value: &str) -> String {
    let single_line = value.split_whitespace().collect::<Vec<_>>().join(" ");
    escape_body(&single_line)
}
