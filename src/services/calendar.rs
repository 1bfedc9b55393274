use chrono::Duration;

use crate::errors::AppError;
use crate::models::Booking;

/// Escape a TEXT property value (RFC 5545 3.3.11).
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

pub fn generate_ics(booking: &Booking, therapist_name: &str) -> Result<String, AppError> {
    let end = booking
        .date_time
        .checked_add_signed(Duration::minutes(i64::from(booking.duration_minutes)))
        .ok_or_else(|| AppError::BadRequest("booking end time is out of range".to_string()))?;

    let dtstart = booking.date_time.format("%Y%m%dT%H%M%S").to_string();
    let dtend = end.format("%Y%m%dT%H%M%S").to_string();
    let dtstamp = booking.updated_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@salonbook", booking.id);

    let summary = escape_text(&format!("Session with {therapist_name}"));
    let location = escape_text(booking.location.as_deref().unwrap_or(""));
    let description = escape_text(booking.notes.as_deref().unwrap_or("No additional notes"));
    let status = booking.combined_status().as_str().to_uppercase();

    Ok(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Salonbook//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         LOCATION:{location}\r\n\
         DESCRIPTION:{description}\r\n\
         X-SALONBOOK-STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    ))
}
