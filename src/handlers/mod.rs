pub mod admin;
pub mod auth;
pub mod bookings;
pub mod calendar;
pub mod events;
pub mod health;
