use actix::Handler;
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::DomainError;
use crate::services::db_models::{DiningTable, Floor, Layout, Reservation, Restaurant};
use crate::services::db_utils::DbActor;
use crate::services::messages::{
    AssignTable, CreateFloor, CreateReservation, CreateRestaurant, CreateTable, DeleteFloor,
    DeleteRestaurant, DeleteTable, FetchLayout, FetchReservation, FetchReservations,
    FetchRestaurant, FetchRestaurants, ResolveSession, SetAutomaticAllocation, SetTableStatus,
    TransitionReservation, UpdateTable,
};
use crate::services::workflow;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl Handler<ResolveSession> for DbActor {
    type Result = Result<Option<Identity>, DomainError>;

    fn handle(&mut self, msg: ResolveSession, _ctx: &mut Self::Context) -> Self::Result {
        let found = self.0.read(|store| store.session_with_user(&msg.token))?;

        Ok(found.and_then(|(session, user)| Identity::from_session(&session, &user, now())))
    }
}

impl Handler<FetchRestaurants> for DbActor {
    type Result = Result<Vec<Restaurant>, DomainError>;

    fn handle(&mut self, _msg: FetchRestaurants, _ctx: &mut Self::Context) -> Self::Result {
        self.0.read(|store| store.restaurants())
    }
}

impl Handler<FetchRestaurant> for DbActor {
    type Result = Result<Restaurant, DomainError>;

    fn handle(&mut self, msg: FetchRestaurant, _ctx: &mut Self::Context) -> Self::Result {
        self.0.read(|store| store.restaurant_by_slug(&msg.0))
    }
}

impl Handler<CreateRestaurant> for DbActor {
    type Result = Result<Restaurant, DomainError>;

    fn handle(&mut self, msg: CreateRestaurant, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| workflow::create_restaurant(store, msg.0, now()))
    }
}

impl Handler<DeleteRestaurant> for DbActor {
    type Result = Result<Restaurant, DomainError>;

    fn handle(&mut self, msg: DeleteRestaurant, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| workflow::delete_restaurant(store, &msg.0))
    }
}

impl Handler<SetAutomaticAllocation> for DbActor {
    type Result = Result<Restaurant, DomainError>;

    fn handle(&mut self, msg: SetAutomaticAllocation, _ctx: &mut Self::Context) -> Self::Result {
        self.0
            .run(|store| workflow::set_automatic_allocation(store, &msg.slug, msg.enabled, now()))
    }
}

impl Handler<FetchLayout> for DbActor {
    type Result = Result<Layout, DomainError>;

    fn handle(&mut self, msg: FetchLayout, _ctx: &mut Self::Context) -> Self::Result {
        self.0.read(|store| workflow::layout(store, &msg.slug, msg.public_only))
    }
}

impl Handler<CreateFloor> for DbActor {
    type Result = Result<Floor, DomainError>;

    fn handle(&mut self, msg: CreateFloor, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| workflow::create_floor(store, &msg.slug, &msg.name, now()))
    }
}

impl Handler<DeleteFloor> for DbActor {
    type Result = Result<Floor, DomainError>;

    fn handle(&mut self, msg: DeleteFloor, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| workflow::delete_floor(store, msg.0))
    }
}

impl Handler<CreateTable> for DbActor {
    type Result = Result<(DiningTable, Uuid), DomainError>;

    fn handle(&mut self, msg: CreateTable, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| workflow::create_table(store, msg.floor_id, msg.input, now()))
    }
}

impl Handler<UpdateTable> for DbActor {
    type Result = Result<(DiningTable, Uuid), DomainError>;

    fn handle(&mut self, msg: UpdateTable, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| workflow::update_table(store, msg.table_id, msg.changes, now()))
    }
}

impl Handler<SetTableStatus> for DbActor {
    type Result = Result<(DiningTable, Uuid), DomainError>;

    fn handle(&mut self, msg: SetTableStatus, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| workflow::set_table_status(store, msg.table_id, msg.status, now()))
    }
}

impl Handler<DeleteTable> for DbActor {
    type Result = Result<(DiningTable, Uuid), DomainError>;

    fn handle(&mut self, msg: DeleteTable, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| workflow::delete_table(store, msg.0))
    }
}

impl Handler<CreateReservation> for DbActor {
    type Result = Result<Reservation, DomainError>;

    fn handle(&mut self, msg: CreateReservation, _ctx: &mut Self::Context) -> Self::Result {
        let CreateReservation { slug, draft, created_by, policy } = msg;

        self.0.run(|store| {
            workflow::create_reservation(store, &slug, draft, created_by, &policy, now())
        })
    }
}

impl Handler<FetchReservation> for DbActor {
    type Result = Result<Reservation, DomainError>;

    fn handle(&mut self, msg: FetchReservation, _ctx: &mut Self::Context) -> Self::Result {
        self.0.read(|store| workflow::reservation(store, msg.0))
    }
}

impl Handler<FetchReservations> for DbActor {
    type Result = Result<Vec<Reservation>, DomainError>;

    fn handle(&mut self, msg: FetchReservations, _ctx: &mut Self::Context) -> Self::Result {
        self.0
            .read(|store| workflow::list_reservations(store, &msg.slug, msg.date, msg.status))
    }
}

impl Handler<TransitionReservation> for DbActor {
    type Result = Result<Reservation, DomainError>;

    fn handle(&mut self, msg: TransitionReservation, _ctx: &mut Self::Context) -> Self::Result {
        self.0
            .run(|store| workflow::transition_reservation(store, msg.id, msg.status, now()))
    }
}

impl Handler<AssignTable> for DbActor {
    type Result = Result<Reservation, DomainError>;

    fn handle(&mut self, msg: AssignTable, _ctx: &mut Self::Context) -> Self::Result {
        self.0.run(|store| {
            workflow::assign_table(store, msg.id, msg.table_id, &msg.policy, now())
        })
    }
}
