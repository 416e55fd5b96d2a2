use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Admin-imposed blackout interval. Participates in conflict checks exactly
/// like a booking interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: String,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub reason: Option<String>,
}
