use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Per-weekday default hours. `day_of_week` is 0=Sunday .. 6=Saturday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekdayHours {
    pub day_of_week: u8,
    pub is_open: bool,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

/// Date-specific override. Wins over the weekday default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialDay {
    pub id: String,
    pub date: NaiveDate,
    pub is_open: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub reason: Option<String>,
}

/// Resolved open/closed state for one date. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub is_open: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
}

impl DayAvailability {
    pub fn closed() -> Self {
        Self {
            is_open: false,
            open_time: None,
            close_time: None,
        }
    }

    pub fn open(open_time: NaiveTime, close_time: NaiveTime) -> Self {
        Self {
            is_open: true,
            open_time: Some(open_time),
            close_time: Some(close_time),
        }
    }
}
