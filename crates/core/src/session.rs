//! The acting staff member.

use crate::NonEmptyText;
use serde::{Deserialize, Serialize};

/// Who is performing an operation and where.
///
/// Passed explicitly to every operation that attributes work to a person or places blobs
/// under a facility prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSession {
    pub staff_name: NonEmptyText,
    pub facility: NonEmptyText,
}

impl StaffSession {
    pub fn new(staff_name: NonEmptyText, facility: NonEmptyText) -> Self {
        Self {
            staff_name,
            facility,
        }
    }

    /// Builds a session from request values, using `default_facility` when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TextError::Empty`] if `staff_name` is blank.
    pub fn from_parts(
        staff_name: &str,
        facility: Option<&str>,
        default_facility: &NonEmptyText,
    ) -> Result<Self, crate::TextError> {
        let staff_name = NonEmptyText::new(staff_name)?;
        let facility = NonEmptyText::optional(facility).unwrap_or_else(|| default_facility.clone());
        Ok(Self::new(staff_name, facility))
    }
}
