use chrono::{Datelike, NaiveDateTime, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, ActorRole, Booking, CombinedStatus, Principal, Side, SideStatus};

const MAX_DURATION_MINUTES: i32 = 24 * 60;
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 2000..=2999;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub therapist_id: String,
    pub store_id: Option<String>,
    pub date_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub price: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Outcome of setting one side's status.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking: Booking,
    pub side: Side,
    pub from: SideStatus,
    pub to: SideStatus,
    pub previous: CombinedStatus,
}

impl StatusChange {
    pub fn current(&self) -> CombinedStatus {
        self.booking.combined_status()
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// The client is told whenever the combined status moves.
    pub fn notify_client(&self) -> bool {
        self.previous != self.current()
    }
}

pub fn create_booking(conn: &Connection, client: &Actor, new: NewBooking) -> Result<Booking, AppError> {
    if client.role != ActorRole::Client {
        return Err(AppError::Forbidden("only clients can request bookings".to_string()));
    }
    if new.duration_minutes <= 0 || new.duration_minutes > MAX_DURATION_MINUTES {
        return Err(AppError::BadRequest(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    if !YEAR_RANGE.contains(&new.date_time.year()) {
        return Err(AppError::BadRequest("date_time is out of range".to_string()));
    }
    if new.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    require_role(conn, &new.therapist_id, ActorRole::Therapist)?;
    if let Some(store_id) = &new.store_id {
        require_role(conn, store_id, ActorRole::Store)?;
    }

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        client_id: client.id.clone(),
        therapist_id: new.therapist_id,
        store_status: new.store_id.as_ref().map(|_| SideStatus::Pending),
        store_id: new.store_id,
        date_time: new.date_time,
        duration_minutes: new.duration_minutes,
        price: new.price,
        location: new.location,
        notes: new.notes,
        therapist_status: SideStatus::Pending,
        checked_in_at: None,
        created_at: now,
        updated_at: now,
    };
    queries::create_booking(conn, &booking)?;

    tracing::info!(
        booking_id = %booking.id,
        client_id = %booking.client_id,
        therapist_id = %booking.therapist_id,
        store_id = ?booking.store_id,
        "booking requested"
    );

    Ok(booking)
}

fn require_role(conn: &Connection, id: &str, role: ActorRole) -> Result<(), AppError> {
    match queries::get_actor_by_id(conn, id)? {
        Some(actor) if actor.role == role => Ok(()),
        _ => Err(AppError::BadRequest(format!("unknown {}: {id}", role.as_str()))),
    }
}

fn load(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

/// Load a booking the caller is allowed to see.
pub fn load_visible(conn: &Connection, id: &str, principal: &Principal) -> Result<Booking, AppError> {
    let booking = load(conn, id)?;
    match principal {
        Principal::Admin => Ok(booking),
        Principal::Actor(actor) if booking.is_participant(&actor.id) => Ok(booking),
        Principal::Actor(_) => Err(AppError::Forbidden("not a participant in this booking".to_string())),
    }
}

/// The status column the caller owns on this booking.
pub fn side_for(booking: &Booking, principal: &Principal) -> Result<Side, AppError> {
    let actor = principal
        .actor()
        .ok_or_else(|| AppError::Forbidden("only the therapist or store can set a status".to_string()))?;

    match actor.role {
        ActorRole::Therapist if booking.therapist_id == actor.id => Ok(Side::Therapist),
        ActorRole::Store if booking.store_id.as_deref() == Some(actor.id.as_str()) => Ok(Side::Store),
        _ => Err(AppError::Forbidden(
            "only the therapist or store on this booking can set a status".to_string(),
        )),
    }
}

pub fn set_side_status(
    conn: &Connection,
    booking_id: &str,
    principal: &Principal,
    next: SideStatus,
) -> Result<StatusChange, AppError> {
    let booking = load(conn, booking_id)?;
    let side = side_for(&booking, principal)?;
    apply(conn, booking, side, next)
}

fn apply(conn: &Connection, booking: Booking, side: Side, next: SideStatus) -> Result<StatusChange, AppError> {
    let from = booking.side_status(side);
    let previous = booking.combined_status();

    if from == next {
        return Ok(StatusChange {
            booking,
            side,
            from,
            to: next,
            previous,
        });
    }

    if !from.can_transition_to(next) {
        return Err(AppError::InvalidTransition { side, from, to: next });
    }

    if !queries::update_side_status(conn, &booking.id, side, from, next)? {
        return Err(AppError::Conflict(format!(
            "concurrent update of {side} status on booking {}",
            booking.id
        )));
    }

    let booking = load(conn, &booking.id)?;

    tracing::info!(
        booking_id = %booking.id,
        side = %side,
        from = %from,
        to = %next,
        combined = %booking.combined_status(),
        "side status updated"
    );

    Ok(StatusChange {
        booking,
        side,
        from,
        to: next,
        previous,
    })
}

/// Cancel a booking on behalf of the caller.
///
/// A therapist or store cancels its own side. A client (or admin) cancels
/// every side that can still move to cancelled.
pub fn cancel_booking(
    conn: &Connection,
    booking_id: &str,
    principal: &Principal,
) -> Result<Vec<StatusChange>, AppError> {
    let booking = load_visible(conn, booking_id, principal)?;

    let combined = booking.combined_status();
    if !combined.can_cancel() {
        return Err(AppError::Conflict(format!(
            "booking is {combined} and can no longer be cancelled"
        )));
    }

    let client_side = match principal {
        Principal::Admin => true,
        Principal::Actor(actor) => actor.role == ActorRole::Client,
    };

    if !client_side {
        let side = side_for(&booking, principal)?;
        return Ok(vec![apply(conn, booking, side, SideStatus::Cancelled)?]);
    }

    let mut sides = vec![Side::Therapist];
    if booking.has_store() {
        sides.push(Side::Store);
    }

    // Both sides move together or not at all.
    let tx = conn.unchecked_transaction()?;
    let mut changes = Vec::new();
    let mut current = booking;
    for side in sides {
        if !current.side_status(side).can_transition_to(SideStatus::Cancelled) {
            continue;
        }
        let change = apply(&tx, current, side, SideStatus::Cancelled)?;
        current = change.booking.clone();
        changes.push(change);
    }

    if changes.is_empty() {
        return Err(AppError::Conflict("no side of this booking can be cancelled".to_string()));
    }

    tx.commit()?;
    Ok(changes)
}

/// Record arrival for a confirmed booking. Client or therapist only.
pub fn check_in(
    conn: &Connection,
    booking_id: &str,
    principal: &Principal,
    at: &NaiveDateTime,
) -> Result<Booking, AppError> {
    let booking = load_visible(conn, booking_id, principal)?;

    let allowed = principal
        .actor()
        .map(|a| a.id == booking.client_id || a.id == booking.therapist_id)
        .unwrap_or(false);
    if !allowed {
        return Err(AppError::Forbidden("only the client or therapist can check in".to_string()));
    }

    let combined = booking.combined_status();
    if !combined.can_check_in() {
        return Err(AppError::Conflict(format!(
            "booking is {combined}; check-in needs a confirmed booking"
        )));
    }

    if !queries::mark_checked_in(conn, &booking.id, at)? {
        return Err(AppError::Conflict("booking already checked in".to_string()));
    }

    tracing::info!(booking_id = %booking.id, "checked in");
    load(conn, &booking.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:", "migrations").unwrap()
    }

    fn actor(conn: &Connection, id: &str, role: ActorRole) -> Actor {
        let actor = Actor {
            id: id.to_string(),
            role,
            display_name: id.to_string(),
            token: format!("token-{id}"),
            created_at: Utc::now().naive_utc(),
        };
        queries::create_actor(conn, &actor).unwrap();
        actor
    }

    struct Cast {
        client: Principal,
        therapist: Principal,
        store: Principal,
        stranger: Principal,
        client_actor: Actor,
    }

    fn cast(conn: &Connection) -> Cast {
        let client_actor = actor(conn, "client-1", ActorRole::Client);
        Cast {
            client: Principal::Actor(client_actor.clone()),
            therapist: Principal::Actor(actor(conn, "therapist-1", ActorRole::Therapist)),
            store: Principal::Actor(actor(conn, "store-1", ActorRole::Store)),
            stranger: Principal::Actor(actor(conn, "therapist-2", ActorRole::Therapist)),
            client_actor,
        }
    }

    fn new_booking(store: bool) -> NewBooking {
        NewBooking {
            therapist_id: "therapist-1".to_string(),
            store_id: store.then(|| "store-1".to_string()),
            date_time: NaiveDateTime::parse_from_str("2025-06-16 10:00", "%Y-%m-%d %H:%M").unwrap(),
            duration_minutes: 90,
            price: 12000,
            location: Some("Ebisu".to_string()),
            notes: None,
        }
    }

    #[test]
    fn test_create_defaults_to_pending() {
        let conn = setup_db();
        let c = cast(&conn);

        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();
        assert_eq!(booking.therapist_status, SideStatus::Pending);
        assert_eq!(booking.store_status, Some(SideStatus::Pending));
        assert_eq!(booking.combined_status(), CombinedStatus::Pending);

        let direct = create_booking(&conn, &c.client_actor, new_booking(false)).unwrap();
        assert_eq!(direct.store_status, None);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let conn = setup_db();
        let c = cast(&conn);

        let mut req = new_booking(true);
        req.therapist_id = "store-1".to_string();
        assert!(matches!(
            create_booking(&conn, &c.client_actor, req),
            Err(AppError::BadRequest(_))
        ));

        let mut req = new_booking(false);
        req.duration_minutes = 0;
        assert!(matches!(
            create_booking(&conn, &c.client_actor, req),
            Err(AppError::BadRequest(_))
        ));

        let mut req = new_booking(false);
        req.duration_minutes = 24 * 60 + 1;
        assert!(matches!(
            create_booking(&conn, &c.client_actor, req),
            Err(AppError::BadRequest(_))
        ));

        let mut req = new_booking(false);
        req.date_time = NaiveDateTime::parse_from_str("3000-01-01 10:00", "%Y-%m-%d %H:%M").unwrap();
        assert!(matches!(
            create_booking(&conn, &c.client_actor, req),
            Err(AppError::BadRequest(_))
        ));

        let therapist = c.therapist.actor().unwrap().clone();
        assert!(matches!(
            create_booking(&conn, &therapist, new_booking(false)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_dual_approval_flow() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();

        let change = set_side_status(&conn, &booking.id, &c.therapist, SideStatus::Confirmed).unwrap();
        assert_eq!(change.side, Side::Therapist);
        assert_eq!(change.current(), CombinedStatus::Pending);
        assert!(!change.notify_client());

        let change = set_side_status(&conn, &booking.id, &c.store, SideStatus::Confirmed).unwrap();
        assert_eq!(change.current(), CombinedStatus::Confirmed);
        assert!(change.notify_client());

        let change = set_side_status(&conn, &booking.id, &c.therapist, SideStatus::Completed).unwrap();
        assert_eq!(change.current(), CombinedStatus::Completed);
    }

    #[test]
    fn test_only_owning_actor_sets_side() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();

        for who in [&c.client, &c.stranger, &Principal::Admin] {
            assert!(matches!(
                set_side_status(&conn, &booking.id, who, SideStatus::Confirmed),
                Err(AppError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn test_illegal_transition() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();

        let err = set_side_status(&conn, &booking.id, &c.therapist, SideStatus::Completed).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                side: Side::Therapist,
                from: SideStatus::Pending,
                to: SideStatus::Completed
            }
        ));
    }

    #[test]
    fn test_same_status_is_noop() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();

        let change = set_side_status(&conn, &booking.id, &c.store, SideStatus::Pending).unwrap();
        assert!(change.is_noop());
        assert!(!change.notify_client());
    }

    #[test]
    fn test_client_cancel_cancels_both_sides() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();
        set_side_status(&conn, &booking.id, &c.therapist, SideStatus::Confirmed).unwrap();

        let changes = cancel_booking(&conn, &booking.id, &c.client).unwrap();
        assert_eq!(changes.len(), 2);
        let last = changes.last().unwrap();
        assert_eq!(last.booking.therapist_status, SideStatus::Cancelled);
        assert_eq!(last.booking.store_status, Some(SideStatus::Cancelled));
        assert_eq!(last.current(), CombinedStatus::Cancelled);
        assert!(changes[0].notify_client());
    }

    #[test]
    fn test_client_cancel_rolls_back_when_a_side_fails() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();

        conn.execute_batch(
            "CREATE TRIGGER fail_store_update BEFORE UPDATE OF store_status ON bookings
             BEGIN SELECT RAISE(ABORT, 'store update failed'); END;",
        )
        .unwrap();

        assert!(matches!(
            cancel_booking(&conn, &booking.id, &c.client),
            Err(AppError::Internal(_))
        ));

        let reloaded = load(&conn, &booking.id).unwrap();
        assert_eq!(reloaded.therapist_status, SideStatus::Pending);
        assert_eq!(reloaded.store_status, Some(SideStatus::Pending));
        assert_eq!(reloaded.combined_status(), CombinedStatus::Pending);
    }

    #[test]
    fn test_store_cancel_only_touches_store_side() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();

        let changes = cancel_booking(&conn, &booking.id, &c.store).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].booking.therapist_status, SideStatus::Pending);
        assert_eq!(changes[0].current(), CombinedStatus::Cancelled);

        assert!(matches!(
            cancel_booking(&conn, &booking.id, &c.client),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_store_side_on_direct_booking() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(false)).unwrap();

        assert!(matches!(
            set_side_status(&conn, &booking.id, &c.store, SideStatus::Confirmed),
            Err(AppError::Forbidden(_))
        ));

        let change = set_side_status(&conn, &booking.id, &c.therapist, SideStatus::Confirmed).unwrap();
        assert_eq!(change.current(), CombinedStatus::Confirmed);
    }

    #[test]
    fn test_check_in_gated_on_confirmed() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();
        let at = Utc::now().naive_utc();

        assert!(matches!(
            check_in(&conn, &booking.id, &c.client, &at),
            Err(AppError::Conflict(_))
        ));

        set_side_status(&conn, &booking.id, &c.therapist, SideStatus::Confirmed).unwrap();
        set_side_status(&conn, &booking.id, &c.store, SideStatus::Confirmed).unwrap();

        assert!(matches!(
            check_in(&conn, &booking.id, &c.store, &at),
            Err(AppError::Forbidden(_))
        ));

        let checked = check_in(&conn, &booking.id, &c.client, &at).unwrap();
        assert!(checked.checked_in_at.is_some());
        assert!(matches!(
            check_in(&conn, &booking.id, &c.therapist, &at),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_visibility() {
        let conn = setup_db();
        let c = cast(&conn);
        let booking = create_booking(&conn, &c.client_actor, new_booking(true)).unwrap();

        assert!(load_visible(&conn, &booking.id, &c.store).is_ok());
        assert!(load_visible(&conn, &booking.id, &Principal::Admin).is_ok());
        assert!(matches!(
            load_visible(&conn, &booking.id, &c.stranger),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            load_visible(&conn, "missing", &c.client),
            Err(AppError::NotFound(_))
        ));
    }
}
