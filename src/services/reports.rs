use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries::{self, BookingScope};
use crate::models::{Booking, CombinedStatus};

#[derive(Debug, Clone)]
pub struct CompletedReport {
    pub date: NaiveDate,
    pub bookings: Vec<Booking>,
}

impl CompletedReport {
    pub fn count(&self) -> usize {
        self.bookings.len()
    }

    pub fn total_price(&self) -> i64 {
        self.bookings.iter().map(|b| b.price).sum()
    }
}

/// Bookings on `date` whose combined status is completed.
pub fn completed_on(conn: &Connection, date: NaiveDate) -> anyhow::Result<CompletedReport> {
    let bookings = queries::get_bookings_on_date(conn, date)?
        .into_iter()
        .filter(|b| b.combined_status() == CombinedStatus::Completed)
        .collect();

    Ok(CompletedReport { date, bookings })
}

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub total: i64,
}

pub fn status_counts(conn: &Connection) -> anyhow::Result<StatusCounts> {
    let mut counts = StatusCounts::default();
    for booking in queries::list_bookings(conn, &BookingScope::All, None)? {
        match booking.combined_status() {
            CombinedStatus::Pending => counts.pending += 1,
            CombinedStatus::Confirmed => counts.confirmed += 1,
            CombinedStatus::Completed => counts.completed += 1,
            CombinedStatus::Cancelled => counts.cancelled += 1,
        }
        counts.total += 1;
    }
    Ok(counts)
}
