//! Assignment coordinator.
//!
//! The single gate through which a patient ever leaves the queue into a
//! chair. Both operations run inside one SQLite transaction, so the
//! queue-pop and the chair activation commit together or not at all: a
//! patient can never be dequeued twice, and a chair can never end up with
//! two patients.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::{self, Database, DbError};
use crate::models::{Chair, ChairStatus, PatientSnapshot, TransitionError, TreatmentRecord};

/// Coordinator errors.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Chair {id} is {status}, not idle; cannot assign a patient")]
    ChairNotIdle { id: i64, status: ChairStatus },

    #[error("Chair {id} is {status}, not active; nothing to release")]
    ChairNotActive { id: i64, status: ChairStatus },

    /// No patient waiting. A normal operational condition, not a fault.
    #[error("No patient is waiting")]
    EmptyQueue,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Coordinates atomic queue-to-chair assignment and its inverse.
pub struct Coordinator<'a> {
    db: &'a mut Database,
}

impl<'a> Coordinator<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Bind the head of the queue to an idle chair.
    ///
    /// Fails without touching either store if the chair is not idle or the
    /// queue is empty.
    pub fn assign_next(&mut self, chair_id: i64) -> CoordinatorResult<Chair> {
        let now = Utc::now();
        let tx = self.db.transaction()?;

        let chair = db::get_chair(&tx, chair_id)?;
        if chair.status != ChairStatus::Idle {
            return Err(CoordinatorError::ChairNotIdle {
                id: chair_id,
                status: chair.status,
            });
        }

        let patient = db::pop_next(&tx)?.ok_or(CoordinatorError::EmptyQueue)?;
        debug!(chair_id, patient_id = %patient.id, "assigning queue head to chair");

        let active = chair.apply(
            ChairStatus::Active,
            Some(PatientSnapshot::from(&patient)),
            now,
        )?;
        db::store_chair(&tx, &active)?;
        tx.commit().map_err(DbError::from)?;

        info!(chair_id, patient_id = %patient.id, "treatment started");
        Ok(active)
    }

    /// Finish treatment: return an active chair to idle and append the
    /// completed treatment to history.
    ///
    /// The consumed queue entry is terminal; the patient is not re-enqueued.
    pub fn release(&mut self, chair_id: i64) -> CoordinatorResult<Chair> {
        let now = Utc::now();
        let tx = self.db.transaction()?;

        let chair = db::get_chair(&tx, chair_id)?;
        if chair.status != ChairStatus::Active {
            return Err(CoordinatorError::ChairNotActive {
                id: chair_id,
                status: chair.status,
            });
        }

        let record = TreatmentRecord::from_release(&chair, None, now).ok_or_else(|| {
            DbError::Constraint(format!("Active chair {} has no treatment in progress", chair_id))
        })?;
        db::record_treatment(&tx, &record)?;

        let idle = chair.apply(ChairStatus::Idle, None, now)?;
        db::store_chair(&tx, &idle)?;
        tx.commit().map_err(DbError::from)?;

        info!(
            chair_id,
            duration_minutes = record.duration_minutes,
            "treatment completed"
        );
        Ok(idle)
    }
}
