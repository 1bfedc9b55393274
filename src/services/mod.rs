pub mod bookings;
pub mod calendar;
pub mod events;
pub mod reconcile;
pub mod reports;
