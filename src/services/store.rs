use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::services::db_models::{DiningTable, Floor, Reservation, Restaurant, Session, User};
use crate::services::insertable::{
    NewDiningTable, NewFloor, NewReservation, NewRestaurant, TableChanges,
};
use crate::types::ReservationStatus;

pub type StoreResult<T> = Result<T, DomainError>;

#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    /// Half-open `[from, to)` window on the reservation date/time.
    pub window: Option<(NaiveDateTime, NaiveDateTime)>,
    pub status: Option<ReservationStatus>,
}

impl ReservationFilter {
    pub fn matches(&self, reservation: &Reservation) -> bool {
        let in_window = self
            .window
            .map_or(true, |(from, to)| reservation.date_time >= from && reservation.date_time < to);
        let status_ok = self.status.map_or(true, |s| reservation.status == s);

        in_window && status_ok
    }
}

/// Row-level persistence used by the booking workflow.
///
/// Implementations must uphold the relational rules of the schema: unique slugs,
/// unique floor names per restaurant, cascading deletes from restaurant to floor
/// to table, and `table_id` set to null when a table goes away. Lookups by key
/// fail with `DomainError::NotFound`; constraint breaches fail with
/// `DomainError::ConstraintViolation`.
pub trait Store {
    fn session_with_user(&mut self, token: &str) -> StoreResult<Option<(Session, User)>>;

    fn insert_restaurant(&mut self, new: NewRestaurant) -> StoreResult<Restaurant>;
    fn restaurant_by_slug(&mut self, slug: &str) -> StoreResult<Restaurant>;
    /// Reads the restaurant and holds its row lock until the transaction ends.
    /// Every check-then-insert on its bookings takes this lock first.
    fn lock_restaurant(&mut self, id: Uuid) -> StoreResult<Restaurant>;
    fn restaurants(&mut self) -> StoreResult<Vec<Restaurant>>;
    fn set_automatic_allocation(&mut self, id: Uuid, enabled: bool, now: NaiveDateTime) -> StoreResult<Restaurant>;
    fn delete_restaurant(&mut self, id: Uuid) -> StoreResult<()>;

    fn insert_floor(&mut self, new: NewFloor) -> StoreResult<Floor>;
    fn floor(&mut self, id: Uuid) -> StoreResult<Floor>;
    fn floors_of(&mut self, restaurant_id: Uuid) -> StoreResult<Vec<Floor>>;
    fn delete_floor(&mut self, id: Uuid) -> StoreResult<()>;

    fn insert_table(&mut self, new: NewDiningTable) -> StoreResult<DiningTable>;
    fn table(&mut self, id: Uuid) -> StoreResult<DiningTable>;
    fn tables_of(&mut self, restaurant_id: Uuid) -> StoreResult<Vec<DiningTable>>;
    fn update_table(&mut self, id: Uuid, changes: TableChanges) -> StoreResult<DiningTable>;
    fn delete_table(&mut self, id: Uuid) -> StoreResult<()>;

    fn insert_reservation(&mut self, new: NewReservation) -> StoreResult<Reservation>;
    fn reservation(&mut self, id: Uuid) -> StoreResult<Reservation>;
    fn save_reservation(&mut self, reservation: &Reservation) -> StoreResult<Reservation>;
    fn reservations_of(&mut self, restaurant_id: Uuid, filter: &ReservationFilter) -> StoreResult<Vec<Reservation>>;
    fn reservations_on_table(&mut self, table_id: Uuid) -> StoreResult<Vec<Reservation>>;
}
