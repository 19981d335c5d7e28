pub mod recovery;
pub mod start_recovery;

use actix_web::web;
use db_connector::models::users::User;
use diesel::{prelude::*, result::Error::NotFound};

use crate::{
    config::LoginMethod,
    error::Error,
    utils::{get_connection, web_block_unpacked},
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    let scope = web::scope("/auth")
        .service(start_recovery::start_recovery)
        .service(recovery::recovery);
    cfg.service(scope);
}

/// Resolve a user by the configured login identifier. `None` when no such
/// account exists; the caller decides whether that is surfaced.
pub async fn find_user_by_login(
    state: &web::Data<AppState>,
    value: String,
    method: LoginMethod,
) -> actix_web::Result<Option<User>> {
    let mut conn = get_connection(state)?;
    web_block_unpacked(move || {
        use db_connector::schema::users::dsl::*;

        let result = match method {
            LoginMethod::Username => users
                .filter(name.eq(&value))
                .select(User::as_select())
                .get_result(&mut conn),
            LoginMethod::Email => users
                .filter(email.eq(value.to_lowercase()))
                .select(User::as_select())
                .get_result(&mut conn),
            LoginMethod::Phone => users
                .filter(phone.eq(&value))
                .select(User::as_select())
                .get_result(&mut conn),
        };

        match result {
            Ok(user) => Ok(Some(user)),
            Err(NotFound) => Ok(None),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await
}

pub async fn find_user_by_id(
    state: &web::Data<AppState>,
    uid: uuid::Uuid,
) -> actix_web::Result<Option<User>> {
    let mut conn = get_connection(state)?;
    web_block_unpacked(move || {
        use db_connector::schema::users::dsl::*;

        match users
            .find(uid)
            .select(User::as_select())
            .get_result(&mut conn)
        {
            Ok(user) => Ok(Some(user)),
            Err(NotFound) => Ok(None),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await
}
