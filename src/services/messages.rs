use actix::Message;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::allocation::BookingPolicy;
use crate::auth::Identity;
use crate::errors::DomainError;
use crate::lifecycle::ReservationDraft;
use crate::services::db_models::{DiningTable, Floor, Layout, Reservation, Restaurant};
use crate::services::insertable::TableChanges;
use crate::services::workflow::{RestaurantInput, TableInput};
use crate::types::{ReservationStatus, TableStatus};

#[derive(Message)]
#[rtype(result = "Result<Option<Identity>, DomainError>")]
pub struct ResolveSession {
    pub token: String,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<Restaurant>, DomainError>")]
pub struct FetchRestaurants;

#[derive(Message)]
#[rtype(result = "Result<Restaurant, DomainError>")]
pub struct FetchRestaurant(pub String);

#[derive(Message)]
#[rtype(result = "Result<Restaurant, DomainError>")]
pub struct CreateRestaurant(pub RestaurantInput);

#[derive(Message)]
#[rtype(result = "Result<Restaurant, DomainError>")]
pub struct DeleteRestaurant(pub String);

#[derive(Message)]
#[rtype(result = "Result<Restaurant, DomainError>")]
pub struct SetAutomaticAllocation {
    pub slug: String,
    pub enabled: bool,
}

#[derive(Message)]
#[rtype(result = "Result<Layout, DomainError>")]
pub struct FetchLayout {
    pub slug: String,
    pub public_only: bool,
}

#[derive(Message)]
#[rtype(result = "Result<Floor, DomainError>")]
pub struct CreateFloor {
    pub slug: String,
    pub name: String,
}

#[derive(Message)]
#[rtype(result = "Result<Floor, DomainError>")]
pub struct DeleteFloor(pub Uuid);

// Table messages answer with the owning restaurant id so callers can drop its cached layout.

#[derive(Message)]
#[rtype(result = "Result<(DiningTable, Uuid), DomainError>")]
pub struct CreateTable {
    pub floor_id: Uuid,
    pub input: TableInput,
}

#[derive(Message)]
#[rtype(result = "Result<(DiningTable, Uuid), DomainError>")]
pub struct UpdateTable {
    pub table_id: Uuid,
    pub changes: TableChanges,
}

#[derive(Message)]
#[rtype(result = "Result<(DiningTable, Uuid), DomainError>")]
pub struct SetTableStatus {
    pub table_id: Uuid,
    pub status: TableStatus,
}

#[derive(Message)]
#[rtype(result = "Result<(DiningTable, Uuid), DomainError>")]
pub struct DeleteTable(pub Uuid);

#[derive(Message)]
#[rtype(result = "Result<Reservation, DomainError>")]
pub struct CreateReservation {
    pub slug: String,
    pub draft: ReservationDraft,
    pub created_by: Option<String>,
    pub policy: BookingPolicy,
}

#[derive(Message)]
#[rtype(result = "Result<Reservation, DomainError>")]
pub struct FetchReservation(pub Uuid);

#[derive(Message)]
#[rtype(result = "Result<Vec<Reservation>, DomainError>")]
pub struct FetchReservations {
    pub slug: String,
    pub date: Option<NaiveDate>,
    pub status: Option<ReservationStatus>,
}

#[derive(Message)]
#[rtype(result = "Result<Reservation, DomainError>")]
pub struct TransitionReservation {
    pub id: Uuid,
    pub status: ReservationStatus,
}

#[derive(Message)]
#[rtype(result = "Result<Reservation, DomainError>")]
pub struct AssignTable {
    pub id: Uuid,
    pub table_id: Uuid,
    pub policy: BookingPolicy,
}
