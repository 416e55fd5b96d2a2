use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingStatus, Channel, NotificationCategory, NotificationMessage,
    NotificationPreference, NotificationStatus, Service, SpecialDay, TimeBlock, User, WeekdayHours,
};

pub const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FMT: &str = "%Y-%m-%d";
pub const TIME_FMT: &str = "%H:%M";

const ACTIVE_STATUSES: &str = "('scheduled', 'confirmed', 'rescheduled')";

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FMT).to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DT_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

fn parse_time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, TIME_FMT)
        .unwrap_or_else(|_| NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default())
}

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, phone) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.name, user.email, user.phone],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, name, email, phone FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
            })
        },
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Services ──

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, duration_minutes, price) VALUES (?1, ?2, ?3, ?4)",
        params![
            service.id,
            service.name,
            service.duration_minutes,
            service.price
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, name, duration_minutes, price FROM services WHERE id = ?1",
        params![id],
        |row| {
            Ok(Service {
                id: row.get(0)?,
                name: row.get(1)?,
                duration_minutes: row.get(2)?,
                price: row.get(3)?,
            })
        },
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt =
        conn.prepare("SELECT id, name, duration_minutes, price FROM services ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Service {
            id: row.get(0)?,
            name: row.get(1)?,
            duration_minutes: row.get(2)?,
            price: row.get(3)?,
        })
    })?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, service_id, start_time, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            booking.id,
            booking.user_id,
            booking.service_id,
            fmt_dt(&booking.start),
            booking.status.as_str(),
            booking.notes,
            fmt_dt(&booking.created_at),
            fmt_dt(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, user_id, service_id, start_time, status, notes, created_at, updated_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(booking_from_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    Ok(count > 0)
}

pub fn update_booking_start(
    conn: &Connection,
    id: &str,
    start: &NaiveDateTime,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings SET start_time = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
        params![fmt_dt(start), status.as_str(), now, id],
    )?;
    Ok(count > 0)
}

pub struct BookingFilter<'a> {
    pub user_id: Option<&'a str>,
    pub status: Option<BookingStatus>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub limit: i64,
    pub offset: i64,
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut sql = String::from(
        "SELECT id, user_id, service_id, start_time, status, notes, created_at, updated_at
         FROM bookings WHERE 1=1",
    );
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(user_id) = filter.user_id {
        sql.push_str(" AND user_id = ?");
        values.push(Box::new(user_id.to_string()));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.as_str().to_string()));
    }
    if let Some(from) = filter.from {
        sql.push_str(" AND start_time >= ?");
        values.push(Box::new(fmt_dt(&from)));
    }
    if let Some(to) = filter.to {
        sql.push_str(" AND start_time <= ?");
        values.push(Box::new(fmt_dt(&to)));
    }

    sql.push_str(" ORDER BY start_time ASC LIMIT ? OFFSET ?");
    values.push(Box::new(filter.limit));
    values.push(Box::new(filter.offset));

    let mut stmt = conn.prepare(&sql)?;
    let value_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(value_refs.as_slice(), |row| Ok(booking_from_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Occupied [start, end) intervals of active bookings on one date.
/// End is derived from the booked service's duration.
pub fn busy_intervals_for_date(
    conn: &Connection,
    date: NaiveDate,
    exclude_booking_id: Option<&str>,
) -> anyhow::Result<Vec<(NaiveDateTime, NaiveDateTime)>> {
    let day_start = date.and_hms_opt(0, 0, 0).map(|dt| fmt_dt(&dt));
    let day_end = date.and_hms_opt(23, 59, 59).map(|dt| fmt_dt(&dt));

    let sql = format!(
        "SELECT b.start_time, s.duration_minutes
         FROM bookings b JOIN services s ON s.id = b.service_id
         WHERE b.start_time >= ?1 AND b.start_time <= ?2
           AND b.status IN {ACTIVE_STATUSES}
           AND (?3 IS NULL OR b.id <> ?3)
         ORDER BY b.start_time ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![day_start, day_end, exclude_booking_id], |row| {
        let start: String = row.get(0)?;
        let duration: i64 = row.get(1)?;
        Ok((start, duration))
    })?;

    let mut intervals = vec![];
    for row in rows {
        let (start_str, duration) = row?;
        let start = parse_dt(&start_str);
        intervals.push((start, start + chrono::Duration::minutes(duration)));
    }
    Ok(intervals)
}

pub fn upcoming_active_bookings(
    conn: &Connection,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT id, user_id, service_id, start_time, status, notes, created_at, updated_at
         FROM bookings
         WHERE start_time >= ?1 AND start_time <= ?2 AND status IN {ACTIVE_STATUSES}
         ORDER BY start_time ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![fmt_dt(from), fmt_dt(to)], |row| {
        Ok(booking_from_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn booking_from_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start: String = row.get(3)?;
    let status: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service_id: row.get(2)?,
        start: parse_dt(&start),
        status: BookingStatus::parse(&status),
        notes: row.get(5)?,
        created_at: parse_dt(&created_at),
        updated_at: parse_dt(&updated_at),
    })
}

// ── Time blocks ──

pub fn create_time_block(conn: &Connection, block: &TimeBlock) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO time_blocks (id, block_date, start_time, end_time, reason)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            block.id,
            block.date.format(DATE_FMT).to_string(),
            fmt_dt(&block.start),
            fmt_dt(&block.end),
            block.reason,
        ],
    )?;
    Ok(())
}

pub fn list_time_blocks(conn: &Connection) -> anyhow::Result<Vec<TimeBlock>> {
    let mut stmt = conn.prepare(
        "SELECT id, block_date, start_time, end_time, reason
         FROM time_blocks ORDER BY block_date ASC, start_time ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(time_block_from_row(row)))?;

    let mut blocks = vec![];
    for row in rows {
        blocks.push(row??);
    }
    Ok(blocks)
}

pub fn time_blocks_for_date(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<TimeBlock>> {
    let mut stmt = conn.prepare(
        "SELECT id, block_date, start_time, end_time, reason
         FROM time_blocks WHERE block_date = ?1 ORDER BY start_time ASC",
    )?;
    let rows = stmt.query_map(params![date.format(DATE_FMT).to_string()], |row| {
        Ok(time_block_from_row(row))
    })?;

    let mut blocks = vec![];
    for row in rows {
        blocks.push(row??);
    }
    Ok(blocks)
}

pub fn delete_time_block(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM time_blocks WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn time_block_from_row(row: &rusqlite::Row) -> anyhow::Result<TimeBlock> {
    let date: String = row.get(1)?;
    let start: String = row.get(2)?;
    let end: String = row.get(3)?;

    Ok(TimeBlock {
        id: row.get(0)?,
        date: NaiveDate::parse_from_str(&date, DATE_FMT)
            .unwrap_or_else(|_| Utc::now().date_naive()),
        start: parse_dt(&start),
        end: parse_dt(&end),
        reason: row.get(4)?,
    })
}

// ── Business hours ──

pub fn get_weekday_hours(conn: &Connection, day_of_week: u8) -> anyhow::Result<Option<WeekdayHours>> {
    let result = conn.query_row(
        "SELECT day_of_week, is_open, open_time, close_time FROM business_hours WHERE day_of_week = ?1",
        params![day_of_week],
        |row| {
            let open: String = row.get(2)?;
            let close: String = row.get(3)?;
            Ok(WeekdayHours {
                day_of_week: row.get(0)?,
                is_open: row.get::<_, i64>(1)? != 0,
                open_time: parse_time(&open),
                close_time: parse_time(&close),
            })
        },
    );

    match result {
        Ok(hours) => Ok(Some(hours)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_weekday_hours(conn: &Connection) -> anyhow::Result<Vec<WeekdayHours>> {
    let mut stmt = conn.prepare(
        "SELECT day_of_week, is_open, open_time, close_time FROM business_hours ORDER BY day_of_week ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        let open: String = row.get(2)?;
        let close: String = row.get(3)?;
        Ok(WeekdayHours {
            day_of_week: row.get(0)?,
            is_open: row.get::<_, i64>(1)? != 0,
            open_time: parse_time(&open),
            close_time: parse_time(&close),
        })
    })?;

    let mut hours = vec![];
    for row in rows {
        hours.push(row?);
    }
    Ok(hours)
}

pub fn update_weekday_hours(conn: &Connection, hours: &WeekdayHours) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE business_hours SET is_open = ?1, open_time = ?2, close_time = ?3 WHERE day_of_week = ?4",
        params![
            hours.is_open as i32,
            hours.open_time.format(TIME_FMT).to_string(),
            hours.close_time.format(TIME_FMT).to_string(),
            hours.day_of_week,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_special_day(conn: &Connection, date: NaiveDate) -> anyhow::Result<Option<SpecialDay>> {
    let result = conn.query_row(
        "SELECT id, day, is_open, open_time, close_time, reason FROM special_days WHERE day = ?1",
        params![date.format(DATE_FMT).to_string()],
        |row| Ok(special_day_from_row(row)),
    );

    match result {
        Ok(day) => Ok(Some(day?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_special_days(conn: &Connection) -> anyhow::Result<Vec<SpecialDay>> {
    let mut stmt = conn.prepare(
        "SELECT id, day, is_open, open_time, close_time, reason FROM special_days ORDER BY day ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(special_day_from_row(row)))?;

    let mut days = vec![];
    for row in rows {
        days.push(row??);
    }
    Ok(days)
}

pub fn upsert_special_day(conn: &Connection, day: &SpecialDay) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO special_days (id, day, is_open, open_time, close_time, reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(day) DO UPDATE SET
           is_open = excluded.is_open,
           open_time = excluded.open_time,
           close_time = excluded.close_time,
           reason = excluded.reason",
        params![
            day.id,
            day.date.format(DATE_FMT).to_string(),
            day.is_open as i32,
            day.open_time.map(|t| t.format(TIME_FMT).to_string()),
            day.close_time.map(|t| t.format(TIME_FMT).to_string()),
            day.reason,
        ],
    )?;
    Ok(())
}

pub fn delete_special_day(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM special_days WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn special_day_from_row(row: &rusqlite::Row) -> anyhow::Result<SpecialDay> {
    let date: String = row.get(1)?;
    let open: Option<String> = row.get(3)?;
    let close: Option<String> = row.get(4)?;

    Ok(SpecialDay {
        id: row.get(0)?,
        date: NaiveDate::parse_from_str(&date, DATE_FMT)
            .unwrap_or_else(|_| Utc::now().date_naive()),
        is_open: row.get::<_, i64>(2)? != 0,
        open_time: open.as_deref().map(parse_time),
        close_time: close.as_deref().map(parse_time),
        reason: row.get(5)?,
    })
}

// ── Notifications ──

pub fn create_notification(conn: &Connection, msg: &NotificationMessage) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, category, channel, subject, body, scheduled_for, booking_id, status, sent_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            msg.id,
            msg.user_id,
            msg.category.as_str(),
            msg.channel.as_str(),
            msg.subject,
            msg.body,
            fmt_dt(&msg.scheduled_for),
            msg.booking_id,
            msg.status.as_str(),
            msg.sent_at.map(|dt| fmt_dt(&dt)),
            fmt_dt(&msg.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_notification(conn: &Connection, id: &str) -> anyhow::Result<Option<NotificationMessage>> {
    let result = conn.query_row(
        "SELECT id, user_id, category, channel, subject, body, scheduled_for, booking_id, status, sent_at, created_at
         FROM notifications WHERE id = ?1",
        params![id],
        |row| Ok(notification_from_row(row)),
    );

    match result {
        Ok(msg) => Ok(Some(msg?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_notifications_for_user(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Vec<NotificationMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category, channel, subject, body, scheduled_for, booking_id, status, sent_at, created_at
         FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| Ok(notification_from_row(row)))?;

    let mut messages = vec![];
    for row in rows {
        messages.push(row??);
    }
    Ok(messages)
}

/// Pending messages whose scheduled time has passed, oldest first.
pub fn due_pending_notifications(
    conn: &Connection,
    now: &NaiveDateTime,
    limit: i64,
) -> anyhow::Result<Vec<NotificationMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category, channel, subject, body, scheduled_for, booking_id, status, sent_at, created_at
         FROM notifications
         WHERE status = 'pending' AND scheduled_for <= ?1
         ORDER BY scheduled_for ASC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![fmt_dt(now), limit], |row| {
        Ok(notification_from_row(row))
    })?;

    let mut messages = vec![];
    for row in rows {
        messages.push(row??);
    }
    Ok(messages)
}

pub fn pending_reminder_exists(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications
         WHERE booking_id = ?1 AND category = 'reminder' AND status = 'pending'",
        params![booking_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn mark_notification_sent(
    conn: &Connection,
    id: &str,
    channel: Channel,
    sent_at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE notifications SET status = 'sent', channel = ?1, sent_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![channel.as_str(), fmt_dt(sent_at), id],
    )?;
    Ok(count > 0)
}

pub fn mark_notification_failed(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE notifications SET status = 'failed' WHERE id = ?1 AND status = 'pending'",
        params![id],
    )?;
    Ok(count > 0)
}

fn notification_from_row(row: &rusqlite::Row) -> anyhow::Result<NotificationMessage> {
    let category: String = row.get(2)?;
    let channel: String = row.get(3)?;
    let scheduled_for: String = row.get(6)?;
    let status: String = row.get(8)?;
    let sent_at: Option<String> = row.get(9)?;
    let created_at: String = row.get(10)?;

    Ok(NotificationMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: NotificationCategory::parse(&category),
        channel: Channel::parse(&channel),
        subject: row.get(4)?,
        body: row.get(5)?,
        scheduled_for: parse_dt(&scheduled_for),
        booking_id: row.get(7)?,
        status: NotificationStatus::parse(&status),
        sent_at: sent_at.as_deref().map(parse_dt),
        created_at: parse_dt(&created_at),
    })
}

// ── Notification preferences ──

/// Preferences are created lazily with defaults on first access.
pub fn get_or_create_preference(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<NotificationPreference> {
    let result = conn.query_row(
        "SELECT user_id, email_enabled, sms_enabled, reminders_enabled, reminder_lead_hours
         FROM notification_preferences WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(NotificationPreference {
                user_id: row.get(0)?,
                email_enabled: row.get::<_, i64>(1)? != 0,
                sms_enabled: row.get::<_, i64>(2)? != 0,
                reminders_enabled: row.get::<_, i64>(3)? != 0,
                reminder_lead_hours: row.get(4)?,
            })
        },
    );

    match result {
        Ok(pref) => Ok(pref),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            let pref = NotificationPreference::defaults(user_id);
            save_preference(conn, &pref)?;
            Ok(pref)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn save_preference(conn: &Connection, pref: &NotificationPreference) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO notification_preferences (user_id, email_enabled, sms_enabled, reminders_enabled, reminder_lead_hours)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id) DO UPDATE SET
           email_enabled = excluded.email_enabled,
           sms_enabled = excluded.sms_enabled,
           reminders_enabled = excluded.reminders_enabled,
           reminder_lead_hours = excluded.reminder_lead_hours",
        params![
            pref.user_id,
            pref.email_enabled as i32,
            pref.sms_enabled as i32,
            pref.reminders_enabled as i32,
            NotificationPreference::clamp_lead_hours(pref.reminder_lead_hours),
        ],
    )?;
    Ok(())
}
