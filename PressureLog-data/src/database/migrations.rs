use rusqlite::Connection;
use tracing::info;

use super::DatabaseError;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Running SQLite migrations");

    create_users_table(conn)?;
    create_blood_pressure_table(conn)?;
    create_blood_pressure_indexes(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

/// Create the users table
fn create_users_table(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            open_id TEXT NOT NULL UNIQUE,
            nickname TEXT NOT NULL,
            avatar TEXT NOT NULL DEFAULT '',
            settings TEXT NOT NULL,
            total_records INTEGER NOT NULL DEFAULT 0,
            average_systolic INTEGER,
            average_diastolic INTEGER,
            last_record_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| DatabaseError::MigrationError(format!("users table: {}", e)))?;

    Ok(())
}

/// Create the blood pressure records table
fn create_blood_pressure_table(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS blood_pressure_records (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            systolic INTEGER NOT NULL,
            diastolic INTEGER NOT NULL,
            measure_time TEXT NOT NULL,
            activity TEXT NOT NULL,
            emotion TEXT NOT NULL,
            notes TEXT,
            source TEXT NOT NULL,
            device_name TEXT,
            device_model TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| DatabaseError::MigrationError(format!("blood_pressure_records table: {}", e)))?;

    Ok(())
}

/// Indexes for per-user time-window lookups
fn create_blood_pressure_indexes(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_bp_records_user_time
            ON blood_pressure_records (user_id, measure_time DESC);
         CREATE INDEX IF NOT EXISTS idx_bp_records_created
            ON blood_pressure_records (created_at DESC);",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    Ok(())
}
