//! Completed-treatment history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Chair, TreatmentType};

/// One completed treatment, appended when a chair is released.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentRecord {
    /// Chair the treatment took place in
    pub chair_id: i64,
    /// Patient name, captured from the chair's snapshot
    pub patient_name: String,
    /// Patient phone
    pub patient_phone: String,
    /// Treatment performed, when known
    pub treatment_type: Option<TreatmentType>,
    /// Treatment start
    pub started_at: DateTime<Utc>,
    /// Treatment end (release time)
    pub ended_at: DateTime<Utc>,
    /// Whole minutes between start and end
    pub duration_minutes: i64,
}

impl TreatmentRecord {
    /// Build the record for an active chair being released at `ended_at`.
    ///
    /// Returns `None` for a chair that is not actually treating anyone;
    /// callers gate on the chair being active before recording.
    pub fn from_release(
        chair: &Chair,
        treatment_type: Option<TreatmentType>,
        ended_at: DateTime<Utc>,
    ) -> Option<Self> {
        let patient = chair.assigned_patient.as_ref()?;
        let started_at = chair.occupied_since?;
        Some(Self {
            chair_id: chair.id,
            patient_name: patient.name.clone(),
            patient_phone: patient.phone.clone(),
            treatment_type,
            started_at,
            ended_at,
            duration_minutes: (ended_at - started_at).num_minutes().max(0),
        })
    }
}
