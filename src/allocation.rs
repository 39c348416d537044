//! Capacity and double-booking rules, and automatic table choice.

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::services::db_models::{DiningTable, Reservation};
use crate::types::TableStatus;

#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    /// How long a reservation holds its table.
    pub slot: Duration,
}

impl BookingPolicy {
    pub fn with_slot_minutes(minutes: i64) -> Self {
        BookingPolicy { slot: Duration::minutes(minutes) }
    }

    pub fn overlaps(&self, a: NaiveDateTime, b: NaiveDateTime) -> bool {
        a < self.slot_end(b) && b < self.slot_end(a)
    }

    fn slot_end(&self, start: NaiveDateTime) -> NaiveDateTime {
        start.checked_add_signed(self.slot).unwrap_or(NaiveDateTime::MAX)
    }

    /// Fails if `table` cannot seat `party_size` guests at `at`, given the
    /// reservations already placed on it. `ignore` skips the reservation being moved.
    pub fn ensure_fits(
        &self,
        table: &DiningTable,
        party_size: i32,
        at: NaiveDateTime,
        existing: &[Reservation],
        ignore: Option<Uuid>,
    ) -> Result<(), DomainError> {
        if table.status == TableStatus::OutOfService {
            return Err(DomainError::InvalidState {
                operation: "table assignment",
                reason: format!("table {} is out of service", table.name),
            });
        }
        if party_size > table.capacity {
            return Err(DomainError::Validation(format!(
                "table {} seats {} but the party has {}",
                table.name, table.capacity, party_size
            )));
        }
        if let Some(clash) = self.first_clash(table.id, at, existing, ignore) {
            return Err(DomainError::ConstraintViolation(format!(
                "table {} is already booked at {} by reservation {}",
                table.name, clash.date_time, clash.id
            )));
        }

        Ok(())
    }

    fn first_clash<'a>(
        &self,
        table_id: Uuid,
        at: NaiveDateTime,
        existing: &'a [Reservation],
        ignore: Option<Uuid>,
    ) -> Option<&'a Reservation> {
        existing.iter().find(|r| {
            r.table_id == Some(table_id)
                && Some(r.id) != ignore
                && r.status.is_active()
                && self.overlaps(r.date_time, at)
        })
    }

    /// Smallest free table that seats the party; ties go to the table name, then id.
    pub fn pick_table<'a>(
        &self,
        tables: &'a [DiningTable],
        party_size: i32,
        at: NaiveDateTime,
        existing: &[Reservation],
    ) -> Option<&'a DiningTable> {
        tables
            .iter()
            .filter(|t| t.status != TableStatus::OutOfService && t.capacity >= party_size)
            .filter(|t| self.first_clash(t.id, at, existing, None).is_none())
            .min_by(|a, b| {
                a.capacity
                    .cmp(&b.capacity)
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.id.cmp(&b.id))
            })
    }
}

impl Default for BookingPolicy {
    fn default() -> Self {
        BookingPolicy::with_slot_minutes(120)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::{ReservationStatus, TableShape, TableVisibility};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 8).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn table(name: &str, capacity: i32) -> DiningTable {
        DiningTable {
            id: Uuid::new_v4(),
            name: name.into(),
            capacity,
            pos_x: 0,
            pos_y: 0,
            shape: TableShape::Round,
            status: TableStatus::Available,
            visibility: TableVisibility::Public,
            floor_id: Uuid::new_v4(),
            created_at: at(9, 0),
            updated_at: at(9, 0),
        }
    }

    fn booked(table: &DiningTable, when: NaiveDateTime, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            table_id: Some(table.id),
            name: "Grace".into(),
            email: None,
            phone: "555".into(),
            status,
            party_size: 2,
            date_time: when,
            notes: None,
            created_by: None,
            created_at: at(9, 0),
            updated_at: at(9, 0),
        }
    }

    #[test]
    fn slots_overlap_within_duration() {
        let policy = BookingPolicy::default();
        assert!(policy.overlaps(at(19, 0), at(20, 59)));
        assert!(policy.overlaps(at(20, 59), at(19, 0)));
        assert!(!policy.overlaps(at(19, 0), at(21, 0)));
    }

    #[test]
    fn slot_end_saturates_at_the_calendar_limit() {
        let policy = BookingPolicy::default();
        let last = NaiveDateTime::MAX - Duration::minutes(30);
        assert!(policy.overlaps(last, NaiveDateTime::MAX));
        assert!(policy.overlaps(NaiveDateTime::MAX, NaiveDateTime::MAX));
        assert!(!policy.overlaps(at(19, 0), NaiveDateTime::MAX));
    }

    #[test]
    fn capacity_is_enforced() {
        let policy = BookingPolicy::default();
        let t = table("T1", 4);

        assert!(policy.ensure_fits(&t, 4, at(19, 0), &[], None).is_ok());
        assert!(matches!(
            policy.ensure_fits(&t, 5, at(19, 0), &[], None),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn active_bookings_block_but_terminal_ones_do_not() {
        let policy = BookingPolicy::default();
        let t = table("T1", 4);
        let confirmed = booked(&t, at(19, 0), ReservationStatus::Confirmed);
        let cancelled = booked(&t, at(20, 0), ReservationStatus::Cancelled);

        assert!(matches!(
            policy.ensure_fits(&t, 2, at(20, 0), &[confirmed.clone()], None),
            Err(DomainError::ConstraintViolation(_))
        ));
        assert!(policy.ensure_fits(&t, 2, at(20, 0), &[cancelled], None).is_ok());
        assert!(policy
            .ensure_fits(&t, 2, at(20, 0), &[confirmed.clone()], Some(confirmed.id))
            .is_ok());
    }

    #[test]
    fn out_of_service_tables_are_refused() {
        let policy = BookingPolicy::default();
        let mut t = table("T1", 4);
        t.status = TableStatus::OutOfService;

        assert!(matches!(
            policy.ensure_fits(&t, 2, at(19, 0), &[], None),
            Err(DomainError::InvalidState { .. })
        ));
    }

    #[test]
    fn picks_smallest_free_table() {
        let policy = BookingPolicy::default();
        let big = table("B", 8);
        let small = table("S", 2);
        let medium = table("M", 4);
        let taken = table("A", 4);
        let tables = vec![big.clone(), small, medium.clone(), taken.clone()];
        let existing = vec![booked(&taken, at(19, 30), ReservationStatus::Pending)];

        let choice = policy.pick_table(&tables, 3, at(19, 0), &existing).unwrap();
        assert_eq!(choice.id, medium.id);

        let choice = policy.pick_table(&tables, 6, at(19, 0), &existing).unwrap();
        assert_eq!(choice.id, big.id);

        assert!(policy.pick_table(&tables, 9, at(19, 0), &existing).is_none());
    }
}
