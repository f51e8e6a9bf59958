//! SQLite schema definition.

/// Complete database schema for chairside.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Waiting Queue
-- ============================================================================

-- seq is the monotonic insertion counter; together with (priority, arrival)
-- it makes the queue order total and deterministic.
CREATE TABLE IF NOT EXISTS waiting_queue (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    treatment_type TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,         -- 0 normal, 1 high
    arrival_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_order
    ON waiting_queue(priority DESC, arrival_time ASC, seq ASC);

-- ============================================================================
-- Chairs (fixed set, seeded at open)
-- ============================================================================

CREATE TABLE IF NOT EXISTS chairs (
    id INTEGER PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'idle'
        CHECK (status IN ('idle', 'active', 'maintenance')),
    patient_name TEXT,
    patient_phone TEXT,
    occupied_since TEXT,
    last_update TEXT NOT NULL,
    -- A patient is attached iff the chair is active.
    CHECK ((status = 'active') = (patient_name IS NOT NULL)),
    CHECK ((patient_name IS NULL) = (patient_phone IS NULL))
);

-- ============================================================================
-- Treatment History (append-only, written on release)
-- ============================================================================

CREATE TABLE IF NOT EXISTS treatment_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chair_id INTEGER NOT NULL,
    patient_name TEXT NOT NULL,
    patient_phone TEXT NOT NULL,
    treatment_type TEXT,
    started_at TEXT NOT NULL,
    ended_at TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_ended_at ON treatment_history(ended_at);
"#;
