use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::services::db_models::{DiningTable, Floor, Reservation, Restaurant, Session, User};
use crate::services::insertable::{
    NewDiningTable, NewFloor, NewReservation, NewRestaurant, TableChanges,
};
use crate::services::store::{ReservationFilter, Store, StoreResult};

fn unique_violation(constraint: &str) -> DomainError {
    DomainError::ConstraintViolation(format!(
        "duplicate key value violates unique constraint ({constraint})"
    ))
}

fn fk_violation(constraint: &str) -> DomainError {
    DomainError::ConstraintViolation(format!(
        "insert or update violates foreign key constraint ({constraint})"
    ))
}

/// Tables kept in process memory, with the same keys and cascades as the
/// PostgreSQL schema.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    users: BTreeMap<String, User>,
    sessions: BTreeMap<String, Session>,
    restaurants: BTreeMap<Uuid, Restaurant>,
    floors: BTreeMap<Uuid, Floor>,
    tables: BTreeMap<Uuid, DiningTable>,
    reservations: BTreeMap<Uuid, Reservation>,
}

impl MemoryState {
    /// Registers a user and a session for it, as the identity provider would.
    pub fn add_session(&mut self, user: User, session: Session) {
        self.sessions.insert(session.token.clone(), session);
        self.users.insert(user.id.clone(), user);
    }

    fn drop_tables_where(&mut self, doomed: impl Fn(&DiningTable) -> bool) {
        let removed: Vec<Uuid> = self.tables.values().filter(|t| doomed(t)).map(|t| t.id).collect();
        for id in &removed {
            self.tables.remove(id);
        }
        for reservation in self.reservations.values_mut() {
            if reservation.table_id.is_some_and(|t| removed.contains(&t)) {
                reservation.table_id = None;
            }
        }
    }

    fn check_table_ref(&self, table_id: Option<Uuid>) -> StoreResult<()> {
        match table_id {
            Some(id) if !self.tables.contains_key(&id) => Err(fk_violation("reservation_table_id_fkey")),
            _ => Ok(()),
        }
    }

    fn floor_ids_of(&self, restaurant_id: Uuid) -> Vec<Uuid> {
        self.floors
            .values()
            .filter(|f| f.restaurant_id == restaurant_id)
            .map(|f| f.id)
            .collect()
    }
}

impl Store for MemoryState {
    fn session_with_user(&mut self, token: &str) -> StoreResult<Option<(Session, User)>> {
        let Some(session) = self.sessions.get(token) else {
            return Ok(None);
        };
        Ok(self
            .users
            .get(&session.user_id)
            .map(|user| (session.clone(), user.clone())))
    }

    fn insert_restaurant(&mut self, new: NewRestaurant) -> StoreResult<Restaurant> {
        if self.restaurants.values().any(|r| r.slug == new.slug) {
            return Err(unique_violation("restaurant_slug_key"));
        }
        let restaurant = Restaurant {
            id: new.id,
            name: new.name,
            slug: new.slug,
            address: new.address,
            automatic_allocation: new.automatic_allocation,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        self.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(restaurant)
    }

    fn restaurant_by_slug(&mut self, slug: &str) -> StoreResult<Restaurant> {
        self.restaurants
            .values()
            .find(|r| r.slug == slug)
            .cloned()
            .ok_or_else(|| DomainError::not_found("restaurant", slug))
    }

    fn lock_restaurant(&mut self, id: Uuid) -> StoreResult<Restaurant> {
        self.restaurants
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("restaurant", id))
    }

    fn restaurants(&mut self) -> StoreResult<Vec<Restaurant>> {
        let mut all: Vec<Restaurant> = self.restaurants.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    fn set_automatic_allocation(&mut self, id: Uuid, enabled: bool, now: NaiveDateTime) -> StoreResult<Restaurant> {
        let restaurant = self
            .restaurants
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("restaurant", id))?;
        restaurant.automatic_allocation = enabled;
        restaurant.updated_at = now;
        Ok(restaurant.clone())
    }

    fn delete_restaurant(&mut self, id: Uuid) -> StoreResult<()> {
        if self.restaurants.remove(&id).is_none() {
            return Err(DomainError::not_found("restaurant", id));
        }
        let floors = self.floor_ids_of(id);
        self.floors.retain(|_, f| f.restaurant_id != id);
        self.reservations.retain(|_, r| r.restaurant_id != id);
        self.drop_tables_where(|t| floors.contains(&t.floor_id));
        Ok(())
    }

    fn insert_floor(&mut self, new: NewFloor) -> StoreResult<Floor> {
        if !self.restaurants.contains_key(&new.restaurant_id) {
            return Err(fk_violation("floor_restaurant_id_fkey"));
        }
        if self
            .floors
            .values()
            .any(|f| f.restaurant_id == new.restaurant_id && f.name == new.name)
        {
            return Err(unique_violation("floor_restaurantId_name_idx"));
        }
        let floor = Floor {
            id: new.id,
            name: new.name,
            restaurant_id: new.restaurant_id,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        self.floors.insert(floor.id, floor.clone());
        Ok(floor)
    }

    fn floor(&mut self, id: Uuid) -> StoreResult<Floor> {
        self.floors
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("floor", id))
    }

    fn floors_of(&mut self, restaurant_id: Uuid) -> StoreResult<Vec<Floor>> {
        Ok(self
            .floors
            .values()
            .filter(|f| f.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    fn delete_floor(&mut self, id: Uuid) -> StoreResult<()> {
        if self.floors.remove(&id).is_none() {
            return Err(DomainError::not_found("floor", id));
        }
        self.drop_tables_where(|t| t.floor_id == id);
        Ok(())
    }

    fn insert_table(&mut self, new: NewDiningTable) -> StoreResult<DiningTable> {
        if !self.floors.contains_key(&new.floor_id) {
            return Err(fk_violation("table_floor_id_fkey"));
        }
        if new.capacity <= 0 {
            return Err(DomainError::ConstraintViolation("check constraint table_capacity_check".into()));
        }
        let table = DiningTable {
            id: new.id,
            name: new.name,
            capacity: new.capacity,
            pos_x: new.pos_x,
            pos_y: new.pos_y,
            shape: new.shape,
            status: new.status,
            visibility: new.visibility,
            floor_id: new.floor_id,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        self.tables.insert(table.id, table.clone());
        Ok(table)
    }

    fn table(&mut self, id: Uuid) -> StoreResult<DiningTable> {
        self.tables
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("table", id))
    }

    fn tables_of(&mut self, restaurant_id: Uuid) -> StoreResult<Vec<DiningTable>> {
        let floors = self.floor_ids_of(restaurant_id);
        Ok(self
            .tables
            .values()
            .filter(|t| floors.contains(&t.floor_id))
            .cloned()
            .collect())
    }

    fn update_table(&mut self, id: Uuid, changes: TableChanges) -> StoreResult<DiningTable> {
        let table = self
            .tables
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("table", id))?;

        if let Some(name) = changes.name {
            table.name = name;
        }
        if let Some(capacity) = changes.capacity {
            table.capacity = capacity;
        }
        if let Some(pos_x) = changes.pos_x {
            table.pos_x = pos_x;
        }
        if let Some(pos_y) = changes.pos_y {
            table.pos_y = pos_y;
        }
        if let Some(shape) = changes.shape {
            table.shape = shape;
        }
        if let Some(status) = changes.status {
            table.status = status;
        }
        if let Some(visibility) = changes.visibility {
            table.visibility = visibility;
        }
        if let Some(updated_at) = changes.updated_at {
            table.updated_at = updated_at;
        }
        Ok(table.clone())
    }

    fn delete_table(&mut self, id: Uuid) -> StoreResult<()> {
        if !self.tables.contains_key(&id) {
            return Err(DomainError::not_found("table", id));
        }
        self.drop_tables_where(|t| t.id == id);
        Ok(())
    }

    fn insert_reservation(&mut self, new: NewReservation) -> StoreResult<Reservation> {
        if !self.restaurants.contains_key(&new.restaurant_id) {
            return Err(fk_violation("reservation_restaurant_id_fkey"));
        }
        self.check_table_ref(new.table_id)?;
        let reservation = Reservation {
            id: new.id,
            restaurant_id: new.restaurant_id,
            table_id: new.table_id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            status: new.status,
            party_size: new.party_size,
            date_time: new.date_time,
            notes: new.notes,
            created_by: new.created_by,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    fn reservation(&mut self, id: Uuid) -> StoreResult<Reservation> {
        self.reservations
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("reservation", id))
    }

    fn save_reservation(&mut self, reservation: &Reservation) -> StoreResult<Reservation> {
        self.check_table_ref(reservation.table_id)?;
        let stored = self
            .reservations
            .get_mut(&reservation.id)
            .ok_or_else(|| DomainError::not_found("reservation", reservation.id))?;

        stored.table_id = reservation.table_id;
        stored.status = reservation.status;
        stored.updated_at = reservation.updated_at;
        Ok(stored.clone())
    }

    fn reservations_of(&mut self, restaurant_id: Uuid, filter: &ReservationFilter) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .values()
            .filter(|r| r.restaurant_id == restaurant_id && filter.matches(r))
            .cloned()
            .collect())
    }

    fn reservations_on_table(&mut self, table_id: Uuid) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .values()
            .filter(|r| r.table_id == Some(table_id))
            .cloned()
            .collect())
    }
}

/// Shared in-memory database. Every operation holds the lock for its whole
/// duration and is rolled back if it fails.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb(Arc<Mutex<MemoryState>>);

impl MemoryDb {
    pub fn run<T>(&self, work: impl FnOnce(&mut dyn Store) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self
            .0
            .lock()
            .map_err(|_| DomainError::Storage("in-memory store lock poisoned".into()))?;
        let snapshot = state.clone();

        let result = work(&mut *state);
        if result.is_err() {
            *state = snapshot;
        }
        result
    }

    /// Runs `work` under the lock without taking a rollback snapshot.
    pub fn read<T>(&self, work: impl FnOnce(&mut dyn Store) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self
            .0
            .lock()
            .map_err(|_| DomainError::Storage("in-memory store lock poisoned".into()))?;
        work(&mut *state)
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> StoreResult<T> {
        let mut state = self
            .0
            .lock()
            .map_err(|_| DomainError::Storage("in-memory store lock poisoned".into()))?;
        Ok(f(&mut state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::workflow::{self, RestaurantInput};

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 11, 8).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn failed_operation_rolls_back() {
        let db = MemoryDb::default();

        let result: StoreResult<()> = db.run(|store| {
            workflow::create_restaurant(
                store,
                RestaurantInput {
                    name: "Le Test".into(),
                    slug: None,
                    address: "1 rue de la Paix".into(),
                    automatic_allocation: false,
                },
                now(),
            )?;
            Err(DomainError::Validation("abort".into()))
        });

        assert!(result.is_err());
        let restaurants = db.run(|store| store.restaurants()).unwrap();
        assert!(restaurants.is_empty());
    }

    #[test]
    fn reads_see_committed_writes() {
        let db = MemoryDb::default();
        db.run(|store| {
            workflow::create_restaurant(
                store,
                RestaurantInput {
                    name: "Le Test".into(),
                    slug: None,
                    address: "1 rue de la Paix".into(),
                    automatic_allocation: false,
                },
                now(),
            )
        })
        .unwrap();

        let found = db.read(|store| store.restaurant_by_slug("le-test")).unwrap();
        assert_eq!(found.name, "Le Test");
        assert!(db.read(|store| store.restaurant_by_slug("nowhere")).is_err());
        assert_eq!(db.read(|store| store.restaurants()).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_slug_is_a_constraint_violation() {
        let mut state = MemoryState::default();
        let input = || RestaurantInput {
            name: "Le Test".into(),
            slug: Some("le-test".into()),
            address: "1 rue de la Paix".into(),
            automatic_allocation: true,
        };

        workflow::create_restaurant(&mut state, input(), now()).unwrap();
        let err = workflow::create_restaurant(&mut state, input(), now()).unwrap_err();

        assert!(matches!(err, DomainError::ConstraintViolation(_)));
    }
}
