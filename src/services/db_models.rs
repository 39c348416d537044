use chrono::NaiveDateTime;
use diesel::{Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{ReservationStatus, TableShape, TableStatus, TableVisibility};

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::user)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub role: Option<String>,
    pub banned: Option<bool>,
    pub ban_reason: Option<String>,
    pub ban_expires: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::session)]
pub struct Session {
    pub id: String,
    pub expires_at: NaiveDateTime,
    pub token: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: String,
    pub impersonated_by: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = crate::schema::restaurant)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub automatic_allocation: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = crate::schema::floor)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub id: Uuid,
    pub name: String,
    pub restaurant_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = crate::schema::dining_table)]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub pos_x: i32,
    pub pos_y: i32,
    pub shape: TableShape,
    pub status: TableStatus,
    pub visibility: TableVisibility,
    pub floor_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = crate::schema::reservation)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub table_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub status: ReservationStatus,
    pub party_size: i32,
    pub date_time: NaiveDateTime,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct FloorLayout {
    pub floor: Floor,
    pub tables: Vec<DiningTable>,
}

/// A restaurant with its floors and tables, as drawn by the booking UI.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub restaurant: Restaurant,
    pub floors: Vec<FloorLayout>,
}
