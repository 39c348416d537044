use chrono::NaiveDateTime;
use diesel::{AsChangeset, Insertable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::dining_table;
use crate::schema::floor;
use crate::schema::reservation;
use crate::schema::restaurant;
use crate::types::{ReservationStatus, TableShape, TableStatus, TableVisibility};

#[derive(Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = restaurant)]
pub struct NewRestaurant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub automatic_allocation: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = floor)]
pub struct NewFloor {
    pub id: Uuid,
    pub name: String,
    pub restaurant_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = dining_table)]
pub struct NewDiningTable {
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

/// Partial edit of a table; `None` leaves the column untouched.
#[derive(AsChangeset, Deserialize, Clone, Debug, Default)]
#[diesel(table_name = dining_table)]
#[serde(rename_all = "camelCase")]
pub struct TableChanges {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub pos_x: Option<i32>,
    pub pos_y: Option<i32>,
    pub shape: Option<TableShape>,
    pub status: Option<TableStatus>,
    pub visibility: Option<TableVisibility>,
    #[serde(skip)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = reservation)]
pub struct NewReservation {
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
