//! Waiting-queue database operations.
//!
//! The queue order is total: priority descending, then arrival time
//! ascending, then insertion sequence ascending. Every query in this module
//! reads through that order so listings never reorder spontaneously.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Patient, Priority};

const ORDER_CLAUSE: &str = "ORDER BY priority DESC, arrival_time ASC, seq ASC";

impl Database {
    /// Insert a patient at its ordered position in the queue.
    pub fn enqueue_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn().execute(
            r#"
            INSERT INTO waiting_queue (
                patient_id, name, phone, treatment_type, priority, arrival_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                patient.id,
                patient.name,
                patient.phone,
                patient.treatment_type.as_str(),
                patient.priority.rank(),
                patient.arrival_time,
            ],
        )?;
        Ok(())
    }

    /// Remove a patient from the queue regardless of position.
    ///
    /// Returns `false` if the id is not (or no longer) in the queue — the
    /// caller decides whether that is an error or the benign already-gone
    /// race.
    pub fn remove_queued_patient(&self, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            "DELETE FROM waiting_queue WHERE patient_id = ?",
            [patient_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Head of the queue without mutating it.
    pub fn peek_next(&self) -> DbResult<Option<Patient>> {
        peek_next(self.conn())
    }

    /// Full queue snapshot in queue order.
    pub fn list_queue(&self) -> DbResult<Vec<Patient>> {
        let sql = format!(
            "SELECT patient_id, name, phone, treatment_type, priority, arrival_time
             FROM waiting_queue {}",
            ORDER_CLAUSE
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], queue_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Number of waiting patients.
    pub fn queue_len(&self) -> DbResult<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM waiting_queue", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Head of the queue on an arbitrary connection (usable inside a
/// transaction).
pub(crate) fn peek_next(conn: &Connection) -> DbResult<Option<Patient>> {
    let sql = format!(
        "SELECT patient_id, name, phone, treatment_type, priority, arrival_time
         FROM waiting_queue {} LIMIT 1",
        ORDER_CLAUSE
    );
    conn.query_row(&sql, [], queue_row)
        .optional()?
        .map(Patient::try_from)
        .transpose()
}

/// Atomically remove and return the head of the queue.
///
/// Only the assignment coordinator calls this, inside its transaction; no
/// other code path may consume queue entries.
pub(crate) fn pop_next(conn: &Connection) -> DbResult<Option<Patient>> {
    let head = peek_next(conn)?;
    if let Some(patient) = &head {
        let rows_affected = conn.execute(
            "DELETE FROM waiting_queue WHERE patient_id = ?",
            [&patient.id],
        )?;
        if rows_affected == 0 {
            return Err(DbError::Constraint(format!(
                "Queue head {} vanished mid-pop",
                patient.id
            )));
        }
    }
    Ok(head)
}

/// Intermediate row struct for database mapping.
struct QueueRow {
    patient_id: String,
    name: String,
    phone: String,
    treatment_type: String,
    priority: i64,
    arrival_time: DateTime<Utc>,
}

fn queue_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueRow> {
    Ok(QueueRow {
        patient_id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        treatment_type: row.get(3)?,
        priority: row.get(4)?,
        arrival_time: row.get(5)?,
    })
}

impl TryFrom<QueueRow> for Patient {
    type Error = DbError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        let treatment_type = row
            .treatment_type
            .parse()
            .map_err(|e| DbError::Constraint(format!("{}", e)))?;
        let priority = match row.priority {
            0 => Priority::Normal,
            1 => Priority::High,
            other => {
                return Err(DbError::Constraint(format!(
                    "Unknown priority rank: {}",
                    other
                )))
            }
        };

        Ok(Patient {
            id: row.patient_id,
            name: row.name,
            phone: row.phone,
            treatment_type,
            priority,
            arrival_time: row.arrival_time,
        })
    }
}
