//! Chairside Core Library
//!
//! Shared operational state for a small clinic: a fixed set of treatment
//! chairs and a priority-ordered waiting queue, mutated by command requests
//! and observed by any number of polling client terminals.
//!
//! # Architecture
//!
//! ```text
//!  client terminals (poll every few seconds; out of scope)
//!        │ reads                       │ write commands
//!        ▼                             ▼
//! ┌──────────────────────────────────────────────────┐
//! │                 ClinicCore                       │
//! │           Mutex<Database>  ← single              │
//! │             serialization point                  │
//! ├───────────────┬──────────────┬───────────────────┤
//! │ Waiting Queue │ Chair        │ Treatment         │
//! │ (priority,    │ Registry     │ History           │
//! │  arrival,seq) │ (idle/active │ (append on        │
//! │               │  /maint.)    │  release)         │
//! └───────┬───────┴──────┬───────┴─────────┬─────────┘
//!         └── Coordinator: atomic ─────────┘
//!             queue-pop + chair-activate
//! ```
//!
//! # Core Principle
//!
//! **The coordinator is the only gate from queue to chair.** Every
//! assignment pops exactly the queue head and binds it to exactly one
//! chair, inside one transaction, behind one lock. Polling readers always
//! observe the last committed state and never a patient both waiting and
//! in a chair.
//!
//! # Modules
//!
//! - [`db`]: SQLite store for queue, chairs, and history
//! - [`models`]: Domain types (Patient, Chair, TreatmentRecord, enums)
//! - [`coordinator`]: Atomic assignment and release
//! - [`stats`]: Read-only operational statistics

pub mod coordinator;
pub mod db;
pub mod models;
pub mod stats;

// Re-export commonly used types
pub use coordinator::{Coordinator, CoordinatorError};
pub use db::{Database, DbError, DEFAULT_CHAIR_COUNT};
pub use models::{
    Chair, ChairStatus, Patient, PatientSnapshot, Priority, TransitionError, TreatmentRecord,
    TreatmentType, ValidationError,
};
pub use stats::{HourlyActivity, StatsReporter, StatsSnapshot, HOURLY_WINDOW_HOURS};

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// =========================================================================
// Error Type
// =========================================================================

/// Caller-facing failure taxonomy.
///
/// None of these are process-fatal: a failed request leaves shared state
/// untouched. [`ClinicError::NotFound`] from a delete is the expected
/// outcome of the poll race where another terminal consumed the patient
/// first; boundaries should treat it as a no-op, not an error.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("No patient is waiting")]
    EmptyQueue,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClinicError {
    /// Whether this failure is the benign already-gone outcome of a delete
    /// race (§ idempotent delete).
    pub fn is_benign_not_found(&self) -> bool {
        matches!(self, ClinicError::NotFound(_))
    }
}

impl From<DbError> for ClinicError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => ClinicError::NotFound(what),
            other => ClinicError::Storage(other.to_string()),
        }
    }
}

impl From<ValidationError> for ClinicError {
    fn from(e: ValidationError) -> Self {
        ClinicError::Validation(e.to_string())
    }
}

impl From<TransitionError> for ClinicError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::PatientRequired | TransitionError::UnexpectedPatient(_) => {
                ClinicError::Validation(e.to_string())
            }
            other => ClinicError::InvalidTransition(other.to_string()),
        }
    }
}

impl From<CoordinatorError> for ClinicError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::Database(db) => db.into(),
            CoordinatorError::Transition(t) => t.into(),
            CoordinatorError::EmptyQueue => ClinicError::EmptyQueue,
            other @ (CoordinatorError::ChairNotIdle { .. }
            | CoordinatorError::ChairNotActive { .. }) => {
                ClinicError::InvalidTransition(other.to_string())
            }
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::Storage(format!("Lock poisoned: {}", e))
    }
}

pub type ClinicResult<T> = Result<T, ClinicError>;

// =========================================================================
// View Records (polling API shapes)
// =========================================================================

/// Chair record as returned to polling terminals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChairView {
    pub id: i64,
    pub status: ChairStatus,
    /// Assigned patient name; null unless active
    pub patient: Option<String>,
    pub patient_phone: Option<String>,
    /// Minutes since the current treatment started; 0 unless active
    pub elapsed_minutes: i64,
    pub last_update: DateTime<Utc>,
}

impl ChairView {
    fn from_chair(chair: &Chair, now: DateTime<Utc>) -> Self {
        let (patient, patient_phone) = match &chair.assigned_patient {
            Some(snapshot) => (Some(snapshot.name.clone()), Some(snapshot.phone.clone())),
            None => (None, None),
        };
        Self {
            id: chair.id,
            status: chair.status,
            patient,
            patient_phone,
            elapsed_minutes: chair.elapsed_minutes(now),
            last_update: chair.last_update,
        }
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe handle to the clinic's shared state.
///
/// Every operation takes the single internal lock, so writes are serialized
/// with respect to each other and every read observes a consistent
/// committed snapshot. Share one instance across client threads via `Arc`.
pub struct ClinicCore {
    db: Mutex<Database>,
}

impl ClinicCore {
    /// Open or create the clinic store at the given path with the default
    /// chair layout.
    pub fn open<P: AsRef<Path>>(path: P) -> ClinicResult<Self> {
        Ok(Self {
            db: Mutex::new(Database::open(path)?),
        })
    }

    /// Open or create the clinic store with a custom chair count.
    pub fn open_with_chairs<P: AsRef<Path>>(path: P, chair_count: i64) -> ClinicResult<Self> {
        Ok(Self {
            db: Mutex::new(Database::open_with_chairs(path, chair_count)?),
        })
    }

    /// In-memory clinic (for testing).
    pub fn open_in_memory() -> ClinicResult<Self> {
        Ok(Self {
            db: Mutex::new(Database::open_in_memory()?),
        })
    }

    fn lock(&self) -> ClinicResult<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }

    // =====================================================================
    // Queue Operations
    // =====================================================================

    /// Add a patient to the waiting queue.
    pub fn enqueue_patient(
        &self,
        name: &str,
        phone: &str,
        treatment_type: TreatmentType,
        priority: Priority,
    ) -> ClinicResult<Patient> {
        let patient = Patient::new(name, phone, treatment_type, priority)?;
        let db = self.lock()?;
        db.enqueue_patient(&patient)?;
        info!(patient_id = %patient.id, %priority, "patient enqueued");
        Ok(patient)
    }

    /// Remove a waiting patient by id.
    ///
    /// Returns [`ClinicError::NotFound`] when the id is absent — including
    /// when another terminal assigned or removed the patient between polls.
    /// Callers should swallow that case as an idempotent success.
    pub fn remove_patient(&self, patient_id: &str) -> ClinicResult<()> {
        let db = self.lock()?;
        if db.remove_queued_patient(patient_id)? {
            info!(patient_id, "patient removed from queue");
            Ok(())
        } else {
            Err(ClinicError::NotFound(format!("Patient {}", patient_id)))
        }
    }

    /// Waiting patients in queue order.
    pub fn list_queue(&self) -> ClinicResult<Vec<Patient>> {
        Ok(self.lock()?.list_queue()?)
    }

    /// Head of the queue, if any, without consuming it.
    pub fn peek_next(&self) -> ClinicResult<Option<Patient>> {
        Ok(self.lock()?.peek_next()?)
    }

    // =====================================================================
    // Chair Operations
    // =====================================================================

    /// All chairs ascending by id, as polling view records.
    pub fn list_chairs(&self) -> ClinicResult<Vec<ChairView>> {
        let now = Utc::now();
        let chairs = self.lock()?.list_chairs()?;
        Ok(chairs.iter().map(|c| ChairView::from_chair(c, now)).collect())
    }

    /// One chair by id.
    pub fn get_chair(&self, chair_id: i64) -> ClinicResult<ChairView> {
        let now = Utc::now();
        let chair = self.lock()?.get_chair(chair_id)?;
        Ok(ChairView::from_chair(&chair, now))
    }

    /// Administrative status change on a chair.
    ///
    /// Going active→idle here is the same completion event as
    /// [`ClinicCore::release_chair`] and records history identically.
    /// Re-requesting the current state is an accepted no-op.
    pub fn update_chair(
        &self,
        chair_id: i64,
        status: ChairStatus,
        patient: Option<PatientSnapshot>,
    ) -> ClinicResult<ChairView> {
        let now = Utc::now();
        let mut db = self.lock()?;
        let tx = db.transaction()?;

        let chair = db::get_chair(&tx, chair_id)?;
        let updated = chair.apply(status, patient, now)?;
        if updated != chair {
            if chair.status == ChairStatus::Active && updated.status == ChairStatus::Idle {
                if let Some(record) = TreatmentRecord::from_release(&chair, None, now) {
                    db::record_treatment(&tx, &record)?;
                }
            }
            db::store_chair(&tx, &updated)?;
            tx.commit().map_err(DbError::from)?;
            info!(chair_id, status = %updated.status, "chair status updated");
        }

        Ok(ChairView::from_chair(&updated, now))
    }

    // =====================================================================
    // Assignment Operations
    // =====================================================================

    /// Atomically pull the next waiting patient and bind them to an idle
    /// chair.
    pub fn assign_next(&self, chair_id: i64) -> ClinicResult<ChairView> {
        let now = Utc::now();
        let mut db = self.lock()?;
        let chair = Coordinator::new(&mut db).assign_next(chair_id)?;
        Ok(ChairView::from_chair(&chair, now))
    }

    /// Finish treatment on an active chair, recording it in history.
    pub fn release_chair(&self, chair_id: i64) -> ClinicResult<ChairView> {
        let now = Utc::now();
        let mut db = self.lock()?;
        let chair = Coordinator::new(&mut db).release(chair_id)?;
        Ok(ChairView::from_chair(&chair, now))
    }

    // =====================================================================
    // Read-Only Reporting
    // =====================================================================

    /// Current operational statistics.
    pub fn stats(&self) -> ClinicResult<StatsSnapshot> {
        let db = self.lock()?;
        Ok(StatsReporter::new(&db).snapshot()?)
    }

    /// Recent completed treatments, newest first.
    pub fn history(&self, limit: usize) -> ClinicResult<Vec<TreatmentRecord>> {
        Ok(self.lock()?.list_history(limit)?)
    }
}
