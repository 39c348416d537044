//! Booking operations. Each function runs inside one store transaction
//! (see `Backend::run`), so checks and writes are applied together.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::allocation::BookingPolicy;
use crate::errors::DomainError;
use crate::lifecycle::{table_status_after, ReservationDraft};
use crate::services::db_models::{DiningTable, Floor, FloorLayout, Layout, Reservation, Restaurant};
use crate::services::insertable::{
    NewDiningTable, NewFloor, NewReservation, NewRestaurant, TableChanges,
};
use crate::services::store::{ReservationFilter, Store, StoreResult};
use crate::types::{ReservationStatus, TableShape, TableStatus, TableVisibility};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantInput {
    pub name: String,
    pub slug: Option<String>,
    pub address: String,
    #[serde(default)]
    pub automatic_allocation: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInput {
    pub name: String,
    pub capacity: i32,
    #[serde(default)]
    pub pos_x: i32,
    #[serde(default)]
    pub pos_y: i32,
    pub shape: TableShape,
    pub status: Option<TableStatus>,
    pub visibility: Option<TableVisibility>,
}

/// Lowercase ascii words joined by single dashes.
pub fn slugify(raw: &str) -> String {
    raw.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

fn validate_capacity(capacity: i32) -> Result<(), DomainError> {
    if capacity <= 0 {
        return Err(DomainError::Validation(format!("capacity must be positive, got {capacity}")));
    }
    Ok(())
}

pub fn create_restaurant(store: &mut dyn Store, input: RestaurantInput, now: NaiveDateTime) -> StoreResult<Restaurant> {
    let name = required("name", &input.name)?;
    let address = required("address", &input.address)?;
    let slug = match input.slug {
        Some(slug) if slugify(&slug) != slug => {
            return Err(DomainError::Validation(format!(
                "slug '{slug}' must be lowercase words separated by dashes"
            )))
        }
        Some(slug) => slug,
        None => slugify(&name),
    };
    if slug.is_empty() {
        return Err(DomainError::Validation("slug is required".into()));
    }

    let restaurant = store.insert_restaurant(NewRestaurant {
        id: Uuid::new_v4(),
        name,
        slug,
        address,
        automatic_allocation: input.automatic_allocation,
        created_at: now,
        updated_at: now,
    })?;

    tracing::info!(restaurant = %restaurant.slug, "restaurant created");
    Ok(restaurant)
}

pub fn set_automatic_allocation(store: &mut dyn Store, slug: &str, enabled: bool, now: NaiveDateTime) -> StoreResult<Restaurant> {
    let restaurant = store.restaurant_by_slug(slug)?;
    store.set_automatic_allocation(restaurant.id, enabled, now)
}

/// Removes the restaurant with every floor, table and reservation under it.
pub fn delete_restaurant(store: &mut dyn Store, slug: &str) -> StoreResult<Restaurant> {
    let restaurant = store.restaurant_by_slug(slug)?;
    store.delete_restaurant(restaurant.id)?;

    tracing::info!(restaurant = %restaurant.slug, "restaurant deleted");
    Ok(restaurant)
}

pub fn create_floor(store: &mut dyn Store, slug: &str, name: &str, now: NaiveDateTime) -> StoreResult<Floor> {
    let name = required("floor name", name)?;
    let restaurant = store.restaurant_by_slug(slug)?;

    store.insert_floor(NewFloor {
        id: Uuid::new_v4(),
        name,
        restaurant_id: restaurant.id,
        created_at: now,
        updated_at: now,
    })
}

pub fn delete_floor(store: &mut dyn Store, floor_id: Uuid) -> StoreResult<Floor> {
    let floor = store.floor(floor_id)?;
    store.delete_floor(floor.id)?;
    Ok(floor)
}

/// Returns the new table together with the id of the restaurant it belongs to.
pub fn create_table(store: &mut dyn Store, floor_id: Uuid, input: TableInput, now: NaiveDateTime) -> StoreResult<(DiningTable, Uuid)> {
    let name = required("table name", &input.name)?;
    validate_capacity(input.capacity)?;
    let floor = store.floor(floor_id)?;

    let table = store.insert_table(NewDiningTable {
        id: Uuid::new_v4(),
        name,
        capacity: input.capacity,
        pos_x: input.pos_x,
        pos_y: input.pos_y,
        shape: input.shape,
        status: input.status.unwrap_or(TableStatus::Available),
        visibility: input.visibility.unwrap_or(TableVisibility::Public),
        floor_id: floor.id,
        created_at: now,
        updated_at: now,
    })?;

    Ok((table, floor.restaurant_id))
}

pub fn update_table(store: &mut dyn Store, table_id: Uuid, mut changes: TableChanges, now: NaiveDateTime) -> StoreResult<(DiningTable, Uuid)> {
    if let Some(capacity) = changes.capacity {
        validate_capacity(capacity)?;
    }
    if let Some(name) = &changes.name {
        changes.name = Some(required("table name", name)?);
    }
    changes.updated_at = Some(now);

    let table = store.update_table(table_id, changes)?;
    let floor = store.floor(table.floor_id)?;
    Ok((table, floor.restaurant_id))
}

pub fn set_table_status(store: &mut dyn Store, table_id: Uuid, status: TableStatus, now: NaiveDateTime) -> StoreResult<(DiningTable, Uuid)> {
    let changes = TableChanges { status: Some(status), ..Default::default() };
    update_table(store, table_id, changes, now)
}

/// Deletes the table; its reservations stay on record without a table.
pub fn delete_table(store: &mut dyn Store, table_id: Uuid) -> StoreResult<(DiningTable, Uuid)> {
    let table = store.table(table_id)?;
    let floor = store.floor(table.floor_id)?;
    store.delete_table(table.id)?;
    Ok((table, floor.restaurant_id))
}

fn table_of_restaurant(store: &mut dyn Store, table_id: Uuid, restaurant_id: Uuid) -> StoreResult<DiningTable> {
    let table = store.table(table_id)?;
    let floor = store.floor(table.floor_id)?;
    if floor.restaurant_id != restaurant_id {
        return Err(DomainError::not_found("table", table_id));
    }
    Ok(table)
}

/// Books a new `pending` reservation. An explicit table is checked for
/// capacity and clashes; without one, restaurants with automatic allocation
/// get the best free table and the others leave the reservation unassigned.
pub fn create_reservation(
    store: &mut dyn Store,
    slug: &str,
    draft: ReservationDraft,
    created_by: Option<String>,
    policy: &BookingPolicy,
    now: NaiveDateTime,
) -> StoreResult<Reservation> {
    let draft = draft.validate()?;
    let found = store.restaurant_by_slug(slug)?;
    let restaurant = store.lock_restaurant(found.id)?;

    let table_id = match draft.table_id {
        Some(table_id) => {
            let table = table_of_restaurant(store, table_id, restaurant.id)?;
            let existing = store.reservations_on_table(table.id)?;
            policy.ensure_fits(&table, draft.party_size, draft.date_time, &existing, None)?;
            Some(table.id)
        }
        None if restaurant.automatic_allocation => {
            let tables = store.tables_of(restaurant.id)?;
            let existing = store.reservations_of(restaurant.id, &ReservationFilter::default())?;
            let choice = policy.pick_table(&tables, draft.party_size, draft.date_time, &existing);
            if choice.is_none() {
                tracing::warn!(
                    restaurant = %restaurant.slug,
                    party_size = draft.party_size,
                    at = %draft.date_time,
                    "no free table fits, reservation left unassigned"
                );
            }
            choice.map(|t| t.id)
        }
        None => None,
    };

    let reservation = store.insert_reservation(NewReservation {
        id: Uuid::new_v4(),
        restaurant_id: restaurant.id,
        table_id,
        name: draft.name,
        email: draft.email,
        phone: draft.phone,
        status: ReservationStatus::Pending,
        party_size: draft.party_size,
        date_time: draft.date_time,
        notes: draft.notes,
        created_by,
        created_at: now,
        updated_at: now,
    })?;

    tracing::info!(
        reservation = %reservation.id,
        restaurant = %restaurant.slug,
        table = ?reservation.table_id,
        "reservation created"
    );
    Ok(reservation)
}

/// Moves the reservation along its lifecycle and keeps its table's status in step.
pub fn transition_reservation(store: &mut dyn Store, id: Uuid, target: ReservationStatus, now: NaiveDateTime) -> StoreResult<Reservation> {
    let mut reservation = store.reservation(id)?;
    let from = reservation.status;
    reservation.transition(target, now)?;
    let saved = store.save_reservation(&reservation)?;

    if let (Some(table_id), Some(status)) = (saved.table_id, table_status_after(from, target)) {
        set_table_status(store, table_id, status, now)?;
    }

    tracing::info!(reservation = %id, %from, to = %target, "reservation status changed");
    Ok(saved)
}

pub fn assign_table(store: &mut dyn Store, id: Uuid, table_id: Uuid, policy: &BookingPolicy, now: NaiveDateTime) -> StoreResult<Reservation> {
    let mut reservation = store.reservation(id)?;
    reservation.assign_table(table_id, now)?;

    store.lock_restaurant(reservation.restaurant_id)?;
    let table = table_of_restaurant(store, table_id, reservation.restaurant_id)?;
    let existing = store.reservations_on_table(table.id)?;
    policy.ensure_fits(&table, reservation.party_size, reservation.date_time, &existing, Some(id))?;

    store.save_reservation(&reservation)
}

pub fn reservation(store: &mut dyn Store, id: Uuid) -> StoreResult<Reservation> {
    store.reservation(id)
}

pub fn list_reservations(
    store: &mut dyn Store,
    slug: &str,
    date: Option<NaiveDate>,
    status: Option<ReservationStatus>,
) -> StoreResult<Vec<Reservation>> {
    let restaurant = store.restaurant_by_slug(slug)?;
    let window = date.and_then(|d| {
        let from = d.and_hms_opt(0, 0, 0)?;
        let to = d.succ_opt()?.and_hms_opt(0, 0, 0)?;
        Some((from, to))
    });

    let mut reservations = store.reservations_of(restaurant.id, &ReservationFilter { window, status })?;
    reservations.sort_by(|a, b| a.date_time.cmp(&b.date_time).then_with(|| a.id.cmp(&b.id)));
    Ok(reservations)
}

/// Floors and tables of a restaurant, sorted by name. `public_only` drops
/// staff-only tables.
pub fn layout(store: &mut dyn Store, slug: &str, public_only: bool) -> StoreResult<Layout> {
    let restaurant = store.restaurant_by_slug(slug)?;
    let mut floors = store.floors_of(restaurant.id)?;
    floors.sort_by(|a, b| a.name.cmp(&b.name));
    let tables = store.tables_of(restaurant.id)?;

    let floors = floors
        .into_iter()
        .map(|floor| {
            let mut tables: Vec<DiningTable> = tables
                .iter()
                .filter(|t| t.floor_id == floor.id)
                .filter(|t| !public_only || t.visibility == TableVisibility::Public)
                .cloned()
                .collect();
            tables.sort_by(|a, b| a.name.cmp(&b.name));
            FloorLayout { floor, tables }
        })
        .collect();

    Ok(Layout { restaurant, floors })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_dash_separated_lowercase() {
        assert_eq!(slugify("Le Test"), "le-test");
        assert_eq!(slugify("  Chez  Marcel & Fils! "), "chez-marcel-fils");
        assert_eq!(slugify("---"), "");
    }
}
