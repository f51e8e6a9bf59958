//! Chair registry database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Chair, ChairStatus, PatientSnapshot};

impl Database {
    /// Get a chair by id. The chair set is fixed, so an unknown id is a
    /// caller error, not an empty result.
    pub fn get_chair(&self, chair_id: i64) -> DbResult<Chair> {
        get_chair(self.conn(), chair_id)
    }

    /// All chairs, ascending by id.
    pub fn list_chairs(&self) -> DbResult<Vec<Chair>> {
        let mut stmt = self.conn().prepare(
            r#"
            SELECT id, status, patient_name, patient_phone, occupied_since, last_update
            FROM chairs
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map([], chair_row)?;

        let mut chairs = Vec::new();
        for row in rows {
            chairs.push(row?.try_into()?);
        }
        Ok(chairs)
    }

    /// Persist a chair's current state.
    pub fn store_chair(&self, chair: &Chair) -> DbResult<()> {
        store_chair(self.conn(), chair)
    }

    /// Number of chairs in the fixed set.
    pub fn chair_count(&self) -> DbResult<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM chairs", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Get a chair on an arbitrary connection (usable inside a transaction).
pub(crate) fn get_chair(conn: &Connection, chair_id: i64) -> DbResult<Chair> {
    conn.query_row(
        r#"
        SELECT id, status, patient_name, patient_phone, occupied_since, last_update
        FROM chairs
        WHERE id = ?
        "#,
        [chair_id],
        chair_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("Chair {}", chair_id)))?
    .try_into()
}

/// Write a chair row, inserting or replacing the fixed slot.
pub(crate) fn store_chair(conn: &Connection, chair: &Chair) -> DbResult<()> {
    let (patient_name, patient_phone) = match &chair.assigned_patient {
        Some(snapshot) => (Some(snapshot.name.as_str()), Some(snapshot.phone.as_str())),
        None => (None, None),
    };

    conn.execute(
        r#"
        INSERT INTO chairs (id, status, patient_name, patient_phone, occupied_since, last_update)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            patient_name = excluded.patient_name,
            patient_phone = excluded.patient_phone,
            occupied_since = excluded.occupied_since,
            last_update = excluded.last_update
        "#,
        params![
            chair.id,
            chair.status.as_str(),
            patient_name,
            patient_phone,
            chair.occupied_since,
            chair.last_update,
        ],
    )?;
    Ok(())
}

/// Intermediate row struct for database mapping.
struct ChairRow {
    id: i64,
    status: String,
    patient_name: Option<String>,
    patient_phone: Option<String>,
    occupied_since: Option<DateTime<Utc>>,
    last_update: DateTime<Utc>,
}

fn chair_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChairRow> {
    Ok(ChairRow {
        id: row.get(0)?,
        status: row.get(1)?,
        patient_name: row.get(2)?,
        patient_phone: row.get(3)?,
        occupied_since: row.get(4)?,
        last_update: row.get(5)?,
    })
}

impl TryFrom<ChairRow> for Chair {
    type Error = DbError;

    fn try_from(row: ChairRow) -> Result<Self, Self::Error> {
        let status: ChairStatus = row.status.parse().map_err(DbError::Constraint)?;
        let assigned_patient = match (row.patient_name, row.patient_phone) {
            (Some(name), Some(phone)) => Some(PatientSnapshot { name, phone }),
            (None, None) => None,
            _ => {
                return Err(DbError::Constraint(format!(
                    "Chair {} has a half-populated patient snapshot",
                    row.id
                )))
            }
        };

        Ok(Chair {
            id: row.id,
            status,
            assigned_patient,
            occupied_since: row.occupied_since,
            last_update: row.last_update,
        })
    }
}
