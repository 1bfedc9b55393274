use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Actor, ActorRole, Booking, BookingEvent, CombinedStatus, EventKind, Side, SideStatus,
};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, client_id, therapist_id, store_id, date_time, duration_minutes, price, \
     location, notes, therapist_status, store_status, checked_in_at, created_at, updated_at";

fn now_str() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Actors ──

pub fn create_actor(conn: &Connection, actor: &Actor) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO actors (id, role, display_name, token, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            actor.id,
            actor.role.as_str(),
            actor.display_name,
            actor.token,
            actor.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .context("failed to insert actor")?;
    Ok(())
}

fn parse_actor_row(row: &rusqlite::Row) -> anyhow::Result<Actor> {
    let role_str: String = row.get(1)?;
    let created_at_str: String = row.get(4)?;
    let role = ActorRole::parse(&role_str)
        .with_context(|| format!("unknown actor role in database: {role_str}"))?;

    Ok(Actor {
        id: row.get(0)?,
        role,
        display_name: row.get(2)?,
        token: row.get(3)?,
        created_at: parse_timestamp(&created_at_str),
    })
}

fn get_actor_where(conn: &Connection, column: &str, value: &str) -> anyhow::Result<Option<Actor>> {
    let sql = format!("SELECT id, role, display_name, token, created_at FROM actors WHERE {column} = ?1");
    let result = conn.query_row(&sql, params![value], |row| Ok(parse_actor_row(row)));

    match result {
        Ok(actor) => Ok(Some(actor?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_actor_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<Actor>> {
    get_actor_where(conn, "token", token)
}

pub fn get_actor_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Actor>> {
    get_actor_where(conn, "id", id)
}

pub fn list_actors(conn: &Connection, role: Option<ActorRole>) -> anyhow::Result<Vec<Actor>> {
    let mut stmt = conn.prepare(
        "SELECT id, role, display_name, token, created_at FROM actors
         WHERE ?1 IS NULL OR role = ?1 ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![role.map(|r| r.as_str())], |row| {
        Ok(parse_actor_row(row))
    })?;

    let mut actors = vec![];
    for row in rows {
        actors.push(row??);
    }
    Ok(actors)
}

// ── Bookings ──

/// Which bookings a read may see. Each actor variant is an equality filter
/// on the matching participant column.
#[derive(Debug, Clone)]
pub enum BookingScope {
    All,
    Client(String),
    Therapist(String),
    Store(String),
}

impl BookingScope {
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            ActorRole::Client => BookingScope::Client(actor.id.clone()),
            ActorRole::Therapist => BookingScope::Therapist(actor.id.clone()),
            ActorRole::Store => BookingScope::Store(actor.id.clone()),
        }
    }

    fn filter(&self) -> (&'static str, Option<&str>) {
        match self {
            BookingScope::All => ("?1 IS NULL", None),
            BookingScope::Client(id) => ("client_id = ?1", Some(id)),
            BookingScope::Therapist(id) => ("therapist_id = ?1", Some(id)),
            BookingScope::Store(id) => ("store_id = ?1", Some(id)),
        }
    }
}

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            booking.id,
            booking.client_id,
            booking.therapist_id,
            booking.store_id,
            booking.date_time.format(TIMESTAMP_FORMAT).to_string(),
            booking.duration_minutes,
            booking.price,
            booking.location,
            booking.notes,
            booking.therapist_status.as_str(),
            booking.store_status.map(|s| s.as_str()),
            booking
                .checked_in_at
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .context("failed to insert booking")?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Bookings visible in `scope`, newest appointment first. `None` means no limit.
pub fn list_bookings(
    conn: &Connection,
    scope: &BookingScope,
    limit: Option<i64>,
) -> anyhow::Result<Vec<Booking>> {
    let (filter, value) = scope.filter();
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {filter} ORDER BY date_time DESC, id ASC LIMIT ?2"
    ))?;

    let rows = stmt.query_map(params![value, limit.unwrap_or(-1)], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_bookings_on_date(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<Booking>> {
    let start = date.format("%Y-%m-%d 00:00:00").to_string();
    let end = date
        .succ_opt()
        .unwrap_or(date)
        .format("%Y-%m-%d 00:00:00")
        .to_string();

    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE date_time >= ?1 AND date_time < ?2 ORDER BY date_time ASC"
    ))?;

    let rows = stmt.query_map(params![start, end], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Set one side's status, but only if that column still holds `expected`.
///
/// The write touches a single status column so the therapist and the store
/// never overwrite each other. Unrecognised stored values compare as
/// `pending`, matching how rows are read. Returns `false` when the row is
/// missing or the column changed since it was read.
pub fn update_side_status(
    conn: &Connection,
    id: &str,
    side: Side,
    expected: SideStatus,
    next: SideStatus,
) -> anyhow::Result<bool> {
    let column = side.column();
    let sql = format!(
        "UPDATE bookings SET {column} = ?1, updated_at = ?2
         WHERE id = ?3
           AND (CASE WHEN {column} IN ('confirmed', 'completed', 'cancelled') THEN {column} ELSE 'pending' END) = ?4"
    );
    let count = conn.execute(
        &sql,
        params![next.as_str(), now_str(), id, expected.as_str()],
    )?;
    Ok(count > 0)
}

/// Record a check-in. Returns `false` if the booking was already checked in.
pub fn mark_checked_in(conn: &Connection, id: &str, at: &NaiveDateTime) -> anyhow::Result<bool> {
    let at = at.format(TIMESTAMP_FORMAT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET checked_in_at = ?1, updated_at = ?1 WHERE id = ?2 AND checked_in_at IS NULL",
        params![at, id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_time_str: String = row.get(4)?;
    let therapist_status_str: Option<String> = row.get(9)?;
    let store_status_str: Option<String> = row.get(10)?;
    let checked_in_str: Option<String> = row.get(11)?;
    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    Ok(Booking {
        id: row.get(0)?,
        client_id: row.get(1)?,
        therapist_id: row.get(2)?,
        store_id: row.get(3)?,
        date_time: parse_timestamp(&date_time_str),
        duration_minutes: row.get(5)?,
        price: row.get(6)?,
        location: row.get(7)?,
        notes: row.get(8)?,
        therapist_status: therapist_status_str
            .as_deref()
            .map(SideStatus::parse)
            .unwrap_or(SideStatus::Pending),
        store_status: store_status_str.as_deref().map(SideStatus::parse),
        checked_in_at: checked_in_str.as_deref().map(parse_timestamp),
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

// ── Booking events ──

pub fn insert_booking_event(
    conn: &Connection,
    booking_id: &str,
    kind: EventKind,
    combined_status: CombinedStatus,
    detail: &str,
) -> anyhow::Result<BookingEvent> {
    let created_at = now_str();
    conn.execute(
        "INSERT INTO booking_events (booking_id, kind, combined_status, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![booking_id, kind.as_str(), combined_status.as_str(), detail, created_at],
    )?;

    Ok(BookingEvent {
        id: conn.last_insert_rowid(),
        booking_id: booking_id.to_string(),
        kind,
        combined_status,
        detail: detail.to_string(),
        created_at,
    })
}

fn parse_event_row(row: &rusqlite::Row) -> rusqlite::Result<BookingEvent> {
    let kind: String = row.get(2)?;
    let combined: String = row.get(3)?;
    Ok(BookingEvent {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        kind: EventKind::parse(&kind),
        combined_status: CombinedStatus::parse_filter(&combined).unwrap_or(CombinedStatus::Pending),
        detail: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn get_booking_events_since(conn: &Connection, since_id: i64) -> anyhow::Result<Vec<BookingEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, kind, combined_status, detail, created_at
         FROM booking_events WHERE id > ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![since_id], parse_event_row)?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

pub fn get_events_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<BookingEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, kind, combined_status, detail, created_at
         FROM booking_events WHERE booking_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], parse_event_row)?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}
