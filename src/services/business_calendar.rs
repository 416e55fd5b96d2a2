use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::DayAvailability;

pub fn default_open() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()
}

pub fn default_close() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default()
}

/// Resolves the open/closed state for a date. Resolution order: date-specific
/// override, then the weekday default row, then the global 08:00-18:00
/// fallback. Always returns a value.
pub fn resolve(conn: &Connection, date: NaiveDate) -> anyhow::Result<DayAvailability> {
    if let Some(special) = queries::get_special_day(conn, date)? {
        if !special.is_open {
            return Ok(DayAvailability::closed());
        }
        return Ok(DayAvailability::open(
            special.open_time.unwrap_or_else(default_open),
            special.close_time.unwrap_or_else(default_close),
        ));
    }

    // chrono numbers Sunday as 7 in weekday(); the table uses 0=Sunday..6=Saturday
    let day_of_week = date.weekday().num_days_from_sunday() as u8;

    match queries::get_weekday_hours(conn, day_of_week)? {
        Some(hours) if hours.is_open => {
            Ok(DayAvailability::open(hours.open_time, hours.close_time))
        }
        Some(_) => Ok(DayAvailability::closed()),
        None => Ok(DayAvailability::open(default_open(), default_close())),
    }
}

/// Time-boxed cache over [`resolve`]. Settings mutators invalidate it so
/// slot queries never serve stale hours for longer than the TTL.
pub struct CalendarCache {
    ttl: Duration,
    entries: Mutex<HashMap<NaiveDate, (Instant, DayAvailability)>>,
}

impl CalendarCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, conn: &Connection, date: NaiveDate) -> anyhow::Result<DayAvailability> {
        if let Ok(entries) = self.entries.lock() {
            if let Some((cached_at, availability)) = entries.get(&date) {
                if cached_at.elapsed() < self.ttl {
                    return Ok(*availability);
                }
            }
        }

        let availability = resolve(conn, date)?;

        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(date, (Instant::now(), availability));
        }

        Ok(availability)
    }

    pub fn invalidate(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
