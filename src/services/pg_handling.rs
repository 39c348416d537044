use chrono::NaiveDateTime;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl,
    RunQueryDsl, SelectableHelper,
};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::services::db_models::{DiningTable, Floor, Reservation, Restaurant, Session, User};
use crate::services::insertable::{
    NewDiningTable, NewFloor, NewReservation, NewRestaurant, TableChanges,
};
use crate::services::store::{ReservationFilter, Store, StoreResult};

/// `Store` over one PostgreSQL connection, normally inside an open transaction.
/// Cascades and `SET NULL` on delete are done by the foreign keys.
pub struct PgStore<'a>(pub &'a mut PgConnection);

fn or_not_found<T>(found: Option<T>, entity: &'static str, key: impl ToString) -> StoreResult<T> {
    found.ok_or_else(|| DomainError::not_found(entity, key))
}

fn ensure_deleted(rows: usize, entity: &'static str, key: Uuid) -> StoreResult<()> {
    if rows == 0 {
        return Err(DomainError::not_found(entity, key));
    }
    Ok(())
}

impl Store for PgStore<'_> {
    fn session_with_user(&mut self, token: &str) -> StoreResult<Option<(Session, User)>> {
        use crate::schema::session::dsl as s;
        use crate::schema::user::dsl::user;

        let found = s::session
            .inner_join(user)
            .filter(s::token.eq(token))
            .select((Session::as_select(), User::as_select()))
            .first::<(Session, User)>(self.0)
            .optional()?;

        Ok(found)
    }

    fn insert_restaurant(&mut self, new: NewRestaurant) -> StoreResult<Restaurant> {
        use crate::schema::restaurant::dsl::restaurant;

        let created = diesel::insert_into(restaurant)
            .values(&new)
            .returning(Restaurant::as_returning())
            .get_result(self.0)?;

        Ok(created)
    }

    fn restaurant_by_slug(&mut self, wanted: &str) -> StoreResult<Restaurant> {
        use crate::schema::restaurant::dsl::{restaurant, slug};

        let found = restaurant
            .filter(slug.eq(wanted))
            .select(Restaurant::as_select())
            .first(self.0)
            .optional()?;

        or_not_found(found, "restaurant", wanted)
    }

    fn lock_restaurant(&mut self, id: Uuid) -> StoreResult<Restaurant> {
        use crate::schema::restaurant::dsl::restaurant;

        let found = restaurant
            .find(id)
            .select(Restaurant::as_select())
            .for_update()
            .first(self.0)
            .optional()?;

        or_not_found(found, "restaurant", id)
    }

    fn restaurants(&mut self) -> StoreResult<Vec<Restaurant>> {
        use crate::schema::restaurant::dsl::{name, restaurant};

        let all = restaurant
            .order(name.asc())
            .select(Restaurant::as_select())
            .load(self.0)?;

        Ok(all)
    }

    fn set_automatic_allocation(&mut self, id: Uuid, enabled: bool, now: NaiveDateTime) -> StoreResult<Restaurant> {
        use crate::schema::restaurant::dsl::{automatic_allocation, restaurant, updated_at};

        let updated = diesel::update(restaurant.find(id))
            .set((automatic_allocation.eq(enabled), updated_at.eq(now)))
            .returning(Restaurant::as_returning())
            .get_result(self.0)
            .optional()?;

        or_not_found(updated, "restaurant", id)
    }

    fn delete_restaurant(&mut self, id: Uuid) -> StoreResult<()> {
        use crate::schema::restaurant::dsl::restaurant;

        let rows = diesel::delete(restaurant.find(id)).execute(self.0)?;
        ensure_deleted(rows, "restaurant", id)
    }

    fn insert_floor(&mut self, new: NewFloor) -> StoreResult<Floor> {
        use crate::schema::floor::dsl::floor;

        let created = diesel::insert_into(floor)
            .values(&new)
            .returning(Floor::as_returning())
            .get_result(self.0)?;

        Ok(created)
    }

    fn floor(&mut self, id: Uuid) -> StoreResult<Floor> {
        use crate::schema::floor::dsl::floor;

        let found = floor
            .find(id)
            .select(Floor::as_select())
            .first(self.0)
            .optional()?;

        or_not_found(found, "floor", id)
    }

    fn floors_of(&mut self, owner: Uuid) -> StoreResult<Vec<Floor>> {
        use crate::schema::floor::dsl::{floor, name, restaurant_id};

        let floors = floor
            .filter(restaurant_id.eq(owner))
            .order(name.asc())
            .select(Floor::as_select())
            .load(self.0)?;

        Ok(floors)
    }

    fn delete_floor(&mut self, id: Uuid) -> StoreResult<()> {
        use crate::schema::floor::dsl::floor;

        let rows = diesel::delete(floor.find(id)).execute(self.0)?;
        ensure_deleted(rows, "floor", id)
    }

    fn insert_table(&mut self, new: NewDiningTable) -> StoreResult<DiningTable> {
        use crate::schema::dining_table::dsl::dining_table;

        let created = diesel::insert_into(dining_table)
            .values(&new)
            .returning(DiningTable::as_returning())
            .get_result(self.0)?;

        Ok(created)
    }

    fn table(&mut self, id: Uuid) -> StoreResult<DiningTable> {
        use crate::schema::dining_table::dsl::dining_table;

        let found = dining_table
            .find(id)
            .select(DiningTable::as_select())
            .first(self.0)
            .optional()?;

        or_not_found(found, "table", id)
    }

    fn tables_of(&mut self, owner: Uuid) -> StoreResult<Vec<DiningTable>> {
        use crate::schema::dining_table::dsl::{dining_table, name};
        use crate::schema::floor::dsl::{floor, restaurant_id};

        let tables = dining_table
            .inner_join(floor)
            .filter(restaurant_id.eq(owner))
            .order(name.asc())
            .select(DiningTable::as_select())
            .load(self.0)?;

        Ok(tables)
    }

    fn update_table(&mut self, id: Uuid, changes: TableChanges) -> StoreResult<DiningTable> {
        use crate::schema::dining_table::dsl::dining_table;

        let updated = diesel::update(dining_table.find(id))
            .set(&changes)
            .returning(DiningTable::as_returning())
            .get_result(self.0)
            .optional()?;

        or_not_found(updated, "table", id)
    }

    fn delete_table(&mut self, id: Uuid) -> StoreResult<()> {
        use crate::schema::dining_table::dsl::dining_table;

        let rows = diesel::delete(dining_table.find(id)).execute(self.0)?;
        ensure_deleted(rows, "table", id)
    }

    fn insert_reservation(&mut self, new: NewReservation) -> StoreResult<Reservation> {
        use crate::schema::reservation::dsl::reservation;

        let created = diesel::insert_into(reservation)
            .values(&new)
            .returning(Reservation::as_returning())
            .get_result(self.0)?;

        Ok(created)
    }

    fn reservation(&mut self, id: Uuid) -> StoreResult<Reservation> {
        use crate::schema::reservation::dsl::reservation;

        // Row lock so concurrent transitions on one reservation serialize.
        let found = reservation
            .find(id)
            .select(Reservation::as_select())
            .for_update()
            .first(self.0)
            .optional()?;

        or_not_found(found, "reservation", id)
    }

    fn save_reservation(&mut self, changed: &Reservation) -> StoreResult<Reservation> {
        use crate::schema::reservation::dsl::{reservation, status, table_id, updated_at};

        let saved = diesel::update(reservation.find(changed.id))
            .set((
                table_id.eq(changed.table_id),
                status.eq(changed.status),
                updated_at.eq(changed.updated_at),
            ))
            .returning(Reservation::as_returning())
            .get_result(self.0)
            .optional()?;

        or_not_found(saved, "reservation", changed.id)
    }

    fn reservations_of(&mut self, owner: Uuid, filter: &ReservationFilter) -> StoreResult<Vec<Reservation>> {
        use crate::schema::reservation::dsl::{date_time, reservation, restaurant_id, status};

        let mut query = reservation
            .filter(restaurant_id.eq(owner))
            .select(Reservation::as_select())
            .into_boxed();

        if let Some((from, to)) = filter.window {
            query = query.filter(date_time.ge(from).and(date_time.lt(to)));
        }
        if let Some(wanted) = filter.status {
            query = query.filter(status.eq(wanted));
        }

        let found = query.order(date_time.asc()).load(self.0)?;
        Ok(found)
    }

    fn reservations_on_table(&mut self, wanted: Uuid) -> StoreResult<Vec<Reservation>> {
        use crate::schema::reservation::dsl::{date_time, reservation, table_id};

        let found = reservation
            .filter(table_id.eq(wanted))
            .order(date_time.asc())
            .select(Reservation::as_select())
            .load(self.0)?;

        Ok(found)
    }
}
