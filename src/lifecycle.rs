//! Reservation status lifecycle and the table-status coupling layered on top of it.
//!
//! ```text
//! pending -> confirmed -> seated -> completed
//!    \___________\___________\____> cancelled
//! ```

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::services::db_models::Reservation;
use crate::types::{ReservationStatus, TableStatus};

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReservationStatus::Completed | ReservationStatus::Cancelled)
    }

    /// Active reservations hold their table for the duration of the slot.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(self, target: ReservationStatus) -> bool {
        use ReservationStatus::*;

        match (self, target) {
            (Pending, Confirmed) | (Confirmed, Seated) | (Seated, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn accepts_table_assignment(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

impl Reservation {
    /// Moves along one lifecycle edge. On rejection the reservation is untouched.
    pub fn transition(&mut self, target: ReservationStatus, now: NaiveDateTime) -> Result<(), DomainError> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::InvalidTransition { from: self.status, to: target });
        }

        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    pub fn assign_table(&mut self, table_id: Uuid, now: NaiveDateTime) -> Result<(), DomainError> {
        if !self.status.accepts_table_assignment() {
            return Err(DomainError::InvalidState {
                operation: "table assignment",
                reason: format!("reservation is already {}", self.status),
            });
        }

        self.table_id = Some(table_id);
        self.updated_at = now;
        Ok(())
    }
}

/// Status a reservation's table should take after the reservation moved
/// `from -> to`, if any.
pub fn table_status_after(from: ReservationStatus, to: ReservationStatus) -> Option<TableStatus> {
    match (from, to) {
        (_, ReservationStatus::Seated) => Some(TableStatus::Occupied),
        (ReservationStatus::Seated, ReservationStatus::Completed | ReservationStatus::Cancelled) => {
            Some(TableStatus::Available)
        }
        _ => None,
    }
}

/// Raw booking input as received from guests or staff.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDraft {
    pub name: String,
    pub phone: String,
    pub party_size: i32,
    pub date_time: String,
    pub table_id: Option<Uuid>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub name: String,
    pub phone: String,
    pub party_size: i32,
    pub date_time: NaiveDateTime,
    pub table_id: Option<Uuid>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl ReservationDraft {
    pub fn validate(self) -> Result<ValidDraft, DomainError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("guest name is required".into()));
        }
        let phone = self.phone.trim();
        if phone.is_empty() {
            return Err(DomainError::Validation("phone is required".into()));
        }
        if self.party_size <= 0 {
            return Err(DomainError::Validation(format!(
                "party size must be positive, got {}",
                self.party_size
            )));
        }
        let date_time = parse_date_time(&self.date_time)?;

        Ok(ValidDraft {
            name: name.to_owned(),
            phone: phone.to_owned(),
            party_size: self.party_size,
            date_time,
            table_id: self.table_id,
            email: non_blank(self.email),
            notes: non_blank(self.notes),
        })
    }
}

/// Years a booking may fall in.
pub const BOOKABLE_YEARS: RangeInclusive<i32> = 1970..=9999;

/// Accepts RFC 3339 (converted to UTC) or a naive `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
pub fn parse_date_time(raw: &str) -> Result<NaiveDateTime, DomainError> {
    let raw = raw.trim();
    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc).naive_utc()),
        Err(_) => ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok()),
    };

    match parsed {
        Some(dt) if BOOKABLE_YEARS.contains(&dt.year()) => Ok(dt),
        Some(dt) => Err(DomainError::Validation(format!(
            "date/time {dt} is outside years {} to {}",
            BOOKABLE_YEARS.start(),
            BOOKABLE_YEARS.end()
        ))),
        None => Err(DomainError::Validation(format!("'{raw}' is not a valid date/time"))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use ReservationStatus::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 8).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn reservation(status: ReservationStatus) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            table_id: None,
            name: "Ada".into(),
            email: None,
            phone: "+33 1 23 45 67 89".into(),
            status,
            party_size: 2,
            date_time: at(19, 30),
            notes: None,
            created_by: None,
            created_at: at(10, 0),
            updated_at: at(10, 0),
        }
    }

    fn draft() -> ReservationDraft {
        ReservationDraft {
            name: "Ada".into(),
            phone: "0123456789".into(),
            party_size: 2,
            date_time: "2024-11-08T19:30:00Z".into(),
            ..Default::default()
        }
    }

    #[test]
    fn only_lifecycle_edges_are_allowed() {
        let allowed = [
            (Pending, Confirmed),
            (Confirmed, Seated),
            (Seated, Completed),
            (Pending, Cancelled),
            (Confirmed, Cancelled),
            (Seated, Cancelled),
        ];

        for from in ReservationStatus::ALL {
            for to in ReservationStatus::ALL {
                let expected = allowed.contains(&(*from, *to));
                assert_eq!(from.can_transition_to(*to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn rejected_transition_leaves_reservation_unchanged() {
        let mut res = reservation(Completed);
        let before = res.clone();

        let err = res.transition(Pending, at(12, 0)).unwrap_err();

        assert!(matches!(err, DomainError::InvalidTransition { from: Completed, to: Pending }));
        assert_eq!(res, before);
    }

    #[test]
    fn transition_touches_updated_at() {
        let mut res = reservation(Pending);
        res.transition(Confirmed, at(12, 0)).unwrap();

        assert_eq!(res.status, Confirmed);
        assert_eq!(res.updated_at, at(12, 0));
    }

    #[test]
    fn tables_are_assigned_only_before_seating() {
        let table = Uuid::new_v4();
        for status in [Pending, Confirmed] {
            let mut res = reservation(status);
            res.assign_table(table, at(11, 0)).unwrap();
            assert_eq!(res.table_id, Some(table));
        }
        for status in [Seated, Completed, Cancelled] {
            let mut res = reservation(status);
            assert!(matches!(
                res.assign_table(table, at(11, 0)),
                Err(DomainError::InvalidState { .. })
            ));
            assert_eq!(res.table_id, None);
        }
    }

    #[test]
    fn table_follows_seating() {
        assert_eq!(table_status_after(Confirmed, Seated), Some(TableStatus::Occupied));
        assert_eq!(table_status_after(Seated, Completed), Some(TableStatus::Available));
        assert_eq!(table_status_after(Seated, Cancelled), Some(TableStatus::Available));
        assert_eq!(table_status_after(Pending, Cancelled), None);
        assert_eq!(table_status_after(Pending, Confirmed), None);
    }

    #[test]
    fn valid_draft_is_normalised() {
        let valid = ReservationDraft {
            email: Some("  ".into()),
            notes: Some(" window seat ".into()),
            ..draft()
        }
        .validate()
        .unwrap();

        assert_eq!(valid.date_time, at(19, 30));
        assert_eq!(valid.email, None);
        assert_eq!(valid.notes.as_deref(), Some("window seat"));
    }

    #[test]
    fn draft_rejects_missing_phone_and_bad_party_size() {
        let no_phone = ReservationDraft { phone: "   ".into(), ..draft() };
        assert!(matches!(no_phone.validate(), Err(DomainError::Validation(_))));

        for party_size in [0, -3] {
            let bad = ReservationDraft { party_size, ..draft() };
            assert!(matches!(bad.validate(), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn date_time_formats() {
        assert_eq!(parse_date_time("2024-11-08T21:30:00+02:00").unwrap(), at(19, 30));
        assert_eq!(parse_date_time("2024-11-08T19:30").unwrap(), at(19, 30));
        assert_eq!(parse_date_time("2024-11-08 19:30:00").unwrap(), at(19, 30));
        assert!(parse_date_time("tomorrow evening").is_err());
        assert!(parse_date_time("2024-13-40T19:30").is_err());
    }

    #[test]
    fn date_time_outside_bookable_years_is_rejected() {
        for raw in ["+262142-12-31T23:00", "1969-12-31T23:00", "0001-01-01 12:00"] {
            let err = parse_date_time(raw).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{raw} gave {err:?}");
        }
        assert!(parse_date_time("9999-12-31T23:59").is_ok());
    }
}
