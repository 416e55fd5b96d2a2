use anyhow::Context;
use rusqlite::{params, Connection};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS services (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
    price REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS bookings (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    service_id TEXT NOT NULL REFERENCES services(id),
    start_time TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'scheduled',
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bookings_start ON bookings(start_time);
CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status);

CREATE TABLE IF NOT EXISTS time_blocks (
    id TEXT PRIMARY KEY,
    block_date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    reason TEXT
);

CREATE INDEX IF NOT EXISTS idx_time_blocks_date ON time_blocks(block_date);

CREATE TABLE IF NOT EXISTS business_hours (
    day_of_week INTEGER PRIMARY KEY CHECK (day_of_week BETWEEN 0 AND 6),
    is_open INTEGER NOT NULL,
    open_time TEXT NOT NULL,
    close_time TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS special_days (
    id TEXT PRIMARY KEY,
    day TEXT NOT NULL UNIQUE,
    is_open INTEGER NOT NULL,
    open_time TEXT,
    close_time TEXT,
    reason TEXT
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    category TEXT NOT NULL,
    channel TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    scheduled_for TEXT NOT NULL,
    booking_id TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    sent_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_due ON notifications(status, scheduled_for);

CREATE TABLE IF NOT EXISTS notification_preferences (
    user_id TEXT PRIMARY KEY REFERENCES users(id),
    email_enabled INTEGER NOT NULL DEFAULT 1,
    sms_enabled INTEGER NOT NULL DEFAULT 0,
    reminders_enabled INTEGER NOT NULL DEFAULT 1,
    reminder_lead_hours INTEGER NOT NULL DEFAULT 24
);
";

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(SCHEMA)
        .context("failed to apply schema")?;

    seed_default_hours(conn)?;

    Ok(())
}

/// Weekday defaults are seeded once: closed on Sunday, 08:00-18:00 otherwise.
fn seed_default_hours(conn: &Connection) -> anyhow::Result<()> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM business_hours", [], |row| {
        row.get(0)
    })?;

    if existing > 0 {
        return Ok(());
    }

    for day in 0..7 {
        conn.execute(
            "INSERT INTO business_hours (day_of_week, is_open, open_time, close_time)
             VALUES (?1, ?2, '08:00', '18:00')",
            params![day, (day != 0) as i32],
        )?;
    }

    tracing::info!("seeded default business hours");
    Ok(())
}
