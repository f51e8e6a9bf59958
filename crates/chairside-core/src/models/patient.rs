//! Waiting-queue patient models.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Local phone-number shape: area prefix, exchange, subscriber
/// (e.g. "010-1234-5678").
fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0\d{1,2}-\d{3,4}-\d{4}$").expect("valid regex"))
}

/// Input validation errors for patient creation.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Patient name must not be empty")]
    EmptyName,

    #[error("Phone number must not be empty")]
    EmptyPhone,

    #[error("Malformed phone number: {0}")]
    MalformedPhone(String),

    #[error("Unknown treatment type: {0}")]
    UnknownTreatmentType(String),

    #[error("Unknown priority: {0}")]
    UnknownPriority(String),
}

/// Closed set of treatments the clinic offers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TreatmentType {
    RoutineCheckup,
    Scaling,
    CavityTreatment,
    Implant,
    Emergency,
}

impl TreatmentType {
    /// Wire string as used by the polling API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TreatmentType::RoutineCheckup => "routine-checkup",
            TreatmentType::Scaling => "scaling",
            TreatmentType::CavityTreatment => "cavity-treatment",
            TreatmentType::Implant => "implant",
            TreatmentType::Emergency => "emergency",
        }
    }
}

impl FromStr for TreatmentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routine-checkup" => Ok(TreatmentType::RoutineCheckup),
            "scaling" => Ok(TreatmentType::Scaling),
            "cavity-treatment" => Ok(TreatmentType::CavityTreatment),
            "implant" => Ok(TreatmentType::Implant),
            "emergency" => Ok(TreatmentType::Emergency),
            other => Err(ValidationError::UnknownTreatmentType(other.into())),
        }
    }
}

impl fmt::Display for TreatmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue priority. `High` entries sort before `Normal` regardless of arrival.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }

    /// Sort key for SQL ordering (higher sorts first under DESC).
    pub fn rank(&self) -> i64 {
        match self {
            Priority::Normal => 0,
            Priority::High => 1,
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::UnknownPriority(other.into())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A waiting patient. Immutable once enqueued; leaves the queue either by
/// explicit removal or by being consumed into a chair assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Unique ID, assigned at creation
    pub id: String,
    /// Patient name
    pub name: String,
    /// Contact phone
    pub phone: String,
    /// Requested treatment
    #[serde(rename = "type")]
    pub treatment_type: TreatmentType,
    /// Queue priority
    pub priority: Priority,
    /// When the patient joined the queue
    pub arrival_time: DateTime<Utc>,
}

impl Patient {
    /// Create a new patient after validating name and phone.
    pub fn new(
        name: &str,
        phone: &str,
        treatment_type: TreatmentType,
        priority: Priority,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        let phone = phone.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if phone.is_empty() {
            return Err(ValidationError::EmptyPhone);
        }
        if !phone_pattern().is_match(phone) {
            return Err(ValidationError::MalformedPhone(phone.into()));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            treatment_type,
            priority,
            arrival_time: Utc::now(),
        })
    }

    /// Minutes the patient has been waiting, floored at zero.
    pub fn waited_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.arrival_time).num_minutes().max(0)
    }
}
