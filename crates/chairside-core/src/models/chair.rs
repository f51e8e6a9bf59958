//! Treatment chair model and status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Patient;

/// Chair status state machine violations.
#[derive(Error, Debug, PartialEq)]
pub enum TransitionError {
    #[error("Chair transition {from} -> {to} is not permitted")]
    NotPermitted { from: ChairStatus, to: ChairStatus },

    #[error("Activating a chair requires a patient")]
    PatientRequired,

    #[error("A patient may only accompany the active status, not {0}")]
    UnexpectedPatient(ChairStatus),

    #[error("Chair is already treating a different patient")]
    AlreadyOccupied,
}

/// Operational status of a treatment chair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChairStatus {
    Idle,
    Active,
    Maintenance,
}

impl ChairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChairStatus::Idle => "idle",
            ChairStatus::Active => "active",
            ChairStatus::Maintenance => "maintenance",
        }
    }
}

impl FromStr for ChairStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ChairStatus::Idle),
            "active" => Ok(ChairStatus::Active),
            "maintenance" => Ok(ChairStatus::Maintenance),
            other => Err(format!("Unknown chair status: {}", other)),
        }
    }
}

impl fmt::Display for ChairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patient details captured by value at assignment time. The chair never
/// holds a live reference into the queue, so removing queue history cannot
/// corrupt what the chair displays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSnapshot {
    pub name: String,
    pub phone: String,
}

impl From<&Patient> for PatientSnapshot {
    fn from(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            phone: patient.phone.clone(),
        }
    }
}

/// A treatment chair. The set of chairs is fixed at open time; chairs are
/// never created or destroyed while the clinic is running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chair {
    /// Fixed chair number (1-based)
    pub id: i64,
    /// Current status
    pub status: ChairStatus,
    /// Present iff status == Active
    pub assigned_patient: Option<PatientSnapshot>,
    /// Set when entering Active, cleared on leaving it
    pub occupied_since: Option<DateTime<Utc>>,
    /// Most recent meaningful status mutation
    pub last_update: DateTime<Utc>,
}

impl Chair {
    /// A fresh idle chair, as seeded at open time.
    pub fn idle(id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: ChairStatus::Idle,
            assigned_patient: None,
            occupied_since: None,
            last_update: now,
        }
    }

    /// Minutes since the current treatment started; 0 unless active.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.occupied_since
            .map(|since| (now - since).num_minutes().max(0))
            .unwrap_or(0)
    }

    /// Apply a status transition, returning the resulting chair.
    ///
    /// Requesting the current status with identical semantic fields is a
    /// pure no-op: the chair is returned unchanged, `last_update` included.
    pub fn apply(
        &self,
        target: ChairStatus,
        patient: Option<PatientSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<Chair, TransitionError> {
        // Snapshot legality is independent of the edge being taken.
        match target {
            ChairStatus::Active if patient.is_none() => {
                return Err(TransitionError::PatientRequired);
            }
            ChairStatus::Idle | ChairStatus::Maintenance if patient.is_some() => {
                return Err(TransitionError::UnexpectedPatient(target));
            }
            _ => {}
        }

        match (self.status, target) {
            // Idempotent re-request of the current state.
            (from, to) if from == to => {
                if self.assigned_patient == patient {
                    Ok(self.clone())
                } else {
                    // Swapping the patient on a live chair must go through
                    // release + assign.
                    Err(TransitionError::AlreadyOccupied)
                }
            }
            (ChairStatus::Idle, ChairStatus::Active) => Ok(Chair {
                id: self.id,
                status: ChairStatus::Active,
                assigned_patient: patient,
                occupied_since: Some(now),
                last_update: now,
            }),
            (ChairStatus::Active, ChairStatus::Idle)
            | (ChairStatus::Active, ChairStatus::Maintenance)
            | (ChairStatus::Idle, ChairStatus::Maintenance)
            | (ChairStatus::Maintenance, ChairStatus::Idle) => Ok(Chair {
                id: self.id,
                status: target,
                assigned_patient: None,
                occupied_since: None,
                last_update: now,
            }),
            (from, to) => Err(TransitionError::NotPermitted { from, to }),
        }
    }
}
