pub mod actor;
pub mod booking;
pub mod event;
pub mod status;

pub use actor::{Actor, ActorRole, Principal};
pub use booking::Booking;
pub use event::{BookingEvent, EventKind};
pub use status::{CombinedStatus, PendingPartyHint, Side, SideStatus};
