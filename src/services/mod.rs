use actix_web::{get, HttpResponse, Responder};

pub mod db_models;
pub mod db_utils;
pub mod insertable;
pub mod memory_store;
pub mod messages;
pub mod pg_handling;
pub mod redis_handling;
pub mod store;
pub mod workflow;

#[get("/")]
pub async fn home_page() -> impl Responder {
    HttpResponse::Ok().body("Table booking service")
}

// sub-route "/auth"
pub mod auth_route {
    use actix_web::web::{Data, Path};
    use actix_web::{get, HttpResponse};

    use crate::auth::{redirect_signed_in, CurrentUser};
    use crate::services::db_utils::AppState;

    #[get("/{page}")]
    pub async fn auth_page(state: Data<AppState>, user: CurrentUser, path: Path<String>) -> HttpResponse {
        if let Some(redirect) = redirect_signed_in(user.0.as_ref(), &state.auth) {
            return redirect;
        }

        HttpResponse::Ok().json(format!("auth page '{}'", path.into_inner()))
    }
}

// sub-route "/restaurants"
pub mod restaurants_route {
    use actix_web::web::{block, Data, Json, Path};
    use actix_web::{delete, get, post, put, HttpResponse};
    use serde::Deserialize;

    use crate::auth::{Admin, Staff};
    use crate::errors::ApiError;
    use crate::services::db_utils::AppState;
    use crate::services::messages::{
        CreateFloor, CreateRestaurant, DeleteRestaurant, FetchLayout, FetchRestaurant,
        FetchRestaurants, SetAutomaticAllocation,
    };
    use crate::services::redis_handling::{get_layout, invalidate_layout, put_layout};
    use crate::services::workflow::RestaurantInput;

    #[get("")]
    pub async fn list_restaurants(state: Data<AppState>) -> Result<HttpResponse, ApiError> {
        let restaurants = state.db.send(FetchRestaurants).await??;
        Ok(HttpResponse::Ok().json(restaurants))
    }

    #[post("")]
    pub async fn create_restaurant(
        state: Data<AppState>,
        Admin(admin): Admin,
        body: Json<RestaurantInput>,
    ) -> Result<HttpResponse, ApiError> {
        let restaurant = state.db.send(CreateRestaurant(body.into_inner())).await??;

        tracing::info!(restaurant = %restaurant.slug, by = %admin.user_id, "restaurant registered");
        Ok(HttpResponse::Created().json(restaurant))
    }

    #[get("/{slug}")]
    pub async fn get_restaurant(state: Data<AppState>, path: Path<String>) -> Result<HttpResponse, ApiError> {
        let restaurant = state.db.send(FetchRestaurant(path.into_inner())).await??;
        Ok(HttpResponse::Ok().json(restaurant))
    }

    #[delete("/{slug}")]
    pub async fn delete_restaurant(
        state: Data<AppState>,
        _admin: Admin,
        path: Path<String>,
    ) -> Result<HttpResponse, ApiError> {
        let restaurant = state.db.send(DeleteRestaurant(path.into_inner())).await??;
        drop_cached_layout(&state, restaurant.id).await;

        Ok(HttpResponse::Ok().json(restaurant))
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AllocationBody {
        pub automatic_allocation: bool,
    }

    #[put("/{slug}/allocation")]
    pub async fn set_allocation(
        state: Data<AppState>,
        _admin: Admin,
        path: Path<String>,
        body: Json<AllocationBody>,
    ) -> Result<HttpResponse, ApiError> {
        let restaurant = state
            .db
            .send(SetAutomaticAllocation { slug: path.into_inner(), enabled: body.automatic_allocation })
            .await??;
        drop_cached_layout(&state, restaurant.id).await;

        Ok(HttpResponse::Ok().json(restaurant))
    }

    /// Guest-facing layout, served from redis when possible.
    #[get("/{slug}/layout")]
    pub async fn public_layout(state: Data<AppState>, path: Path<String>) -> Result<HttpResponse, ApiError> {
        let slug = path.into_inner();

        // Generation the cache was at before the database read; `None` skips caching.
        let mut seen = None;
        if let Some(redis_db) = state.redis_db.clone() {
            let restaurant = state.db.send(FetchRestaurant(slug.clone())).await??;
            match block(move || get_layout(&redis_db, restaurant.id)).await {
                Ok(Ok((Some(cached), _))) => {
                    return Ok(HttpResponse::Ok().content_type("application/json").body(cached))
                }
                Ok(Ok((None, generation))) => seen = Some(generation),
                Ok(Err(err)) => tracing::warn!(error = %err, "layout cache unavailable"),
                Err(err) => tracing::warn!(error = %err, "layout cache lookup aborted"),
            }
        }

        let layout = state.db.send(FetchLayout { slug, public_only: true }).await??;

        if let (Some(redis_db), Some(seen)) = (state.redis_db.clone(), seen) {
            let ttl = state.layout_ttl_s;
            let to_cache = layout.clone();
            match block(move || put_layout(&redis_db, &to_cache, seen, ttl)).await {
                Ok(Ok(true)) => tracing::debug!(restaurant = %layout.restaurant.id, "layout cached"),
                Ok(Ok(false)) => tracing::debug!(restaurant = %layout.restaurant.id, "layout changed meanwhile, not cached"),
                Ok(Err(err)) => tracing::warn!(error = %err, "failed to cache layout"),
                Err(err) => tracing::warn!(error = %err, "layout caching aborted"),
            }
        }

        Ok(HttpResponse::Ok().json(layout))
    }

    #[get("/{slug}/layout/staff")]
    pub async fn staff_layout(state: Data<AppState>, _staff: Staff, path: Path<String>) -> Result<HttpResponse, ApiError> {
        let layout = state.db.send(FetchLayout { slug: path.into_inner(), public_only: false }).await??;
        Ok(HttpResponse::Ok().json(layout))
    }

    #[derive(Deserialize)]
    pub struct FloorBody {
        pub name: String,
    }

    #[post("/{slug}/floors")]
    pub async fn create_floor(
        state: Data<AppState>,
        _admin: Admin,
        path: Path<String>,
        body: Json<FloorBody>,
    ) -> Result<HttpResponse, ApiError> {
        let floor = state
            .db
            .send(CreateFloor { slug: path.into_inner(), name: body.into_inner().name })
            .await??;
        drop_cached_layout(&state, floor.restaurant_id).await;

        Ok(HttpResponse::Created().json(floor))
    }

    pub(crate) async fn drop_cached_layout(state: &AppState, restaurant_id: uuid::Uuid) {
        let Some(redis_db) = state.redis_db.clone() else {
            return;
        };

        match block(move || invalidate_layout(&redis_db, restaurant_id)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, restaurant = %restaurant_id, "stale layout may be served"),
            Err(err) => tracing::warn!(error = %err, restaurant = %restaurant_id, "layout invalidation aborted"),
        }
    }
}

// sub-routes "/floors" and "/tables"
pub mod tables_route {
    use actix_web::web::{Data, Json, Path};
    use actix_web::{delete, post, put, HttpResponse};
    use serde::Deserialize;
    use uuid::Uuid;

    use crate::auth::{Admin, Staff};
    use crate::errors::ApiError;
    use crate::services::db_utils::AppState;
    use crate::services::insertable::TableChanges;
    use crate::services::messages::{CreateTable, DeleteFloor, DeleteTable, SetTableStatus, UpdateTable};
    use crate::services::restaurants_route::drop_cached_layout;
    use crate::services::workflow::TableInput;
    use crate::types::TableStatus;

    #[delete("/{floor_id}")]
    pub async fn delete_floor(state: Data<AppState>, _admin: Admin, path: Path<Uuid>) -> Result<HttpResponse, ApiError> {
        let floor = state.db.send(DeleteFloor(path.into_inner())).await??;
        drop_cached_layout(&state, floor.restaurant_id).await;

        Ok(HttpResponse::Ok().json(floor))
    }

    #[post("/{floor_id}/tables")]
    pub async fn create_table(
        state: Data<AppState>,
        _admin: Admin,
        path: Path<Uuid>,
        body: Json<TableInput>,
    ) -> Result<HttpResponse, ApiError> {
        let (table, restaurant_id) = state
            .db
            .send(CreateTable { floor_id: path.into_inner(), input: body.into_inner() })
            .await??;
        drop_cached_layout(&state, restaurant_id).await;

        Ok(HttpResponse::Created().json(table))
    }

    #[put("/{table_id}")]
    pub async fn update_table(
        state: Data<AppState>,
        _admin: Admin,
        path: Path<Uuid>,
        body: Json<TableChanges>,
    ) -> Result<HttpResponse, ApiError> {
        let (table, restaurant_id) = state
            .db
            .send(UpdateTable { table_id: path.into_inner(), changes: body.into_inner() })
            .await??;
        drop_cached_layout(&state, restaurant_id).await;

        Ok(HttpResponse::Ok().json(table))
    }

    #[derive(Deserialize)]
    pub struct TableStatusBody {
        pub status: TableStatus,
    }

    #[put("/{table_id}/status")]
    pub async fn set_table_status(
        state: Data<AppState>,
        Staff(staff): Staff,
        path: Path<Uuid>,
        body: Json<TableStatusBody>,
    ) -> Result<HttpResponse, ApiError> {
        let (table, restaurant_id) = state
            .db
            .send(SetTableStatus { table_id: path.into_inner(), status: body.status })
            .await??;
        drop_cached_layout(&state, restaurant_id).await;

        tracing::info!(table = %table.id, status = %table.status, by = %staff.user_id, "table status changed");
        Ok(HttpResponse::Ok().json(table))
    }

    #[delete("/{table_id}")]
    pub async fn delete_table(state: Data<AppState>, _admin: Admin, path: Path<Uuid>) -> Result<HttpResponse, ApiError> {
        let (table, restaurant_id) = state.db.send(DeleteTable(path.into_inner())).await??;
        drop_cached_layout(&state, restaurant_id).await;

        Ok(HttpResponse::Ok().json(table))
    }
}

// sub-routes "/restaurants/{slug}/reservations" and "/reservations"
pub mod reservations_route {
    use actix_web::web::{Data, Json, Path, Query};
    use actix_web::{get, post, put, HttpResponse};
    use chrono::NaiveDate;
    use serde::Deserialize;
    use uuid::Uuid;

    use crate::auth::{CurrentUser, Staff};
    use crate::errors::ApiError;
    use crate::lifecycle::ReservationDraft;
    use crate::services::db_utils::AppState;
    use crate::services::messages::{
        AssignTable, CreateReservation, FetchReservation, FetchReservations, TransitionReservation,
    };
    use crate::services::restaurants_route::drop_cached_layout;
    use crate::types::ReservationStatus;

    #[post("/{slug}/reservations")]
    pub async fn create_reservation(
        state: Data<AppState>,
        user: CurrentUser,
        path: Path<String>,
        body: Json<ReservationDraft>,
    ) -> Result<HttpResponse, ApiError> {
        let reservation = state
            .db
            .send(CreateReservation {
                slug: path.into_inner(),
                draft: body.into_inner(),
                created_by: user.0.map(|identity| identity.user_id),
                policy: state.policy,
            })
            .await??;

        Ok(HttpResponse::Created().json(reservation))
    }

    #[derive(Deserialize)]
    pub struct ReservationQuery {
        pub date: Option<NaiveDate>,
        pub status: Option<ReservationStatus>,
    }

    #[get("/{slug}/reservations")]
    pub async fn list_reservations(
        state: Data<AppState>,
        _staff: Staff,
        path: Path<String>,
        query: Query<ReservationQuery>,
    ) -> Result<HttpResponse, ApiError> {
        let ReservationQuery { date, status } = query.into_inner();
        let reservations = state
            .db
            .send(FetchReservations { slug: path.into_inner(), date, status })
            .await??;

        Ok(HttpResponse::Ok().json(reservations))
    }

    #[get("/{id}")]
    pub async fn get_reservation(state: Data<AppState>, _staff: Staff, path: Path<Uuid>) -> Result<HttpResponse, ApiError> {
        let reservation = state.db.send(FetchReservation(path.into_inner())).await??;
        Ok(HttpResponse::Ok().json(reservation))
    }

    #[derive(Deserialize)]
    pub struct StatusBody {
        pub status: ReservationStatus,
    }

    #[put("/{id}/status")]
    pub async fn set_status(
        state: Data<AppState>,
        Staff(staff): Staff,
        path: Path<Uuid>,
        body: Json<StatusBody>,
    ) -> Result<HttpResponse, ApiError> {
        let reservation = state
            .db
            .send(TransitionReservation { id: path.into_inner(), status: body.status })
            .await??;
        if reservation.table_id.is_some() {
            drop_cached_layout(&state, reservation.restaurant_id).await;
        }

        tracing::debug!(reservation = %reservation.id, by = %staff.user_id, "status updated by staff");
        Ok(HttpResponse::Ok().json(reservation))
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AssignBody {
        pub table_id: Uuid,
    }

    #[put("/{id}/table")]
    pub async fn assign_table(
        state: Data<AppState>,
        _staff: Staff,
        path: Path<Uuid>,
        body: Json<AssignBody>,
    ) -> Result<HttpResponse, ApiError> {
        let reservation = state
            .db
            .send(AssignTable { id: path.into_inner(), table_id: body.table_id, policy: state.policy })
            .await??;

        Ok(HttpResponse::Ok().json(reservation))
    }
}

// sub-route "/test"
pub mod test_route {
    use actix_web::{get, HttpResponse, Responder};

    #[get("/healthcheck")]
    pub async fn healthcheck() -> impl Responder {
        HttpResponse::Ok().body("I'm alive!")
    }
}
