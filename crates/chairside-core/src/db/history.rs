//! Treatment history database operations.
//!
//! History is append-only: one record per completed treatment, written by
//! the release path and never updated afterwards.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{Database, DbError, DbResult};
use crate::models::TreatmentRecord;

impl Database {
    /// Append a completed-treatment record.
    pub fn record_treatment(&self, record: &TreatmentRecord) -> DbResult<()> {
        record_treatment(self.conn(), record)
    }

    /// Most recent treatments, newest first.
    pub fn list_history(&self, limit: usize) -> DbResult<Vec<TreatmentRecord>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT chair_id, patient_name, patient_phone, treatment_type,
                   started_at, ended_at, duration_minutes
            FROM treatment_history
            ORDER BY ended_at DESC, id DESC
            LIMIT ?
            "#,
        )?;
        let rows = stmt.query_map([limit as i64], history_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Number of treatments completed in `[start, end)`.
    pub fn treatments_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM treatment_history WHERE ended_at >= ?1 AND ended_at < ?2",
            params![start, end],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Append a record on an arbitrary connection (usable inside a transaction).
pub(crate) fn record_treatment(conn: &Connection, record: &TreatmentRecord) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO treatment_history (
            chair_id, patient_name, patient_phone, treatment_type,
            started_at, ended_at, duration_minutes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            record.chair_id,
            record.patient_name,
            record.patient_phone,
            record.treatment_type.map(|t| t.as_str()),
            record.started_at,
            record.ended_at,
            record.duration_minutes,
        ],
    )?;
    Ok(())
}

/// Intermediate row struct for database mapping.
struct HistoryRow {
    chair_id: i64,
    patient_name: String,
    patient_phone: String,
    treatment_type: Option<String>,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_minutes: i64,
}

fn history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok(HistoryRow {
        chair_id: row.get(0)?,
        patient_name: row.get(1)?,
        patient_phone: row.get(2)?,
        treatment_type: row.get(3)?,
        started_at: row.get(4)?,
        ended_at: row.get(5)?,
        duration_minutes: row.get(6)?,
    })
}

impl TryFrom<HistoryRow> for TreatmentRecord {
    type Error = DbError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let treatment_type = row
            .treatment_type
            .map(|t| t.parse().map_err(|e| DbError::Constraint(format!("{}", e))))
            .transpose()?;

        Ok(TreatmentRecord {
            chair_id: row.chair_id,
            patient_name: row.patient_name,
            patient_phone: row.patient_phone,
            treatment_type,
            started_at: row.started_at,
            ended_at: row.ended_at,
            duration_minutes: row.duration_minutes,
        })
    }
}
