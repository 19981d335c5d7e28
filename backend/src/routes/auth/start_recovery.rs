use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;
use db_connector::models::recoveries::Recovery;
use diesel::{prelude::*, result::DatabaseErrorKind};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::LoginMethod,
    error::{Error, FieldErrors},
    routes::auth::find_user_by_login,
    utils::{format_date_time, generate_code, generate_token, get_connection, nullify},
    validation::{validate_contact, EmailRule, PhoneRule},
    AppState,
};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct StartRecoverySchema {
    /// Login identifier when the deployment uses username login.
    pub username: Option<String>,
    /// Login identifier for email login, contact channel otherwise.
    pub email: Option<String>,
    /// Login identifier for phone login, contact channel otherwise.
    pub phone: Option<String>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct StartRecoveryResponse {
    pub token: String,
    pub expiration_date_time: String,
}

/// Start the process of account recovery.
///
/// A created response never reveals whether the account exists: unknown
/// accounts and accounts without a usable contact channel get the same
/// response shape with a token that is not backed by a record.
#[utoipa::path(
    context_path = "/auth",
    request_body = StartRecoverySchema,
    responses(
        (status = 201, description = "A recovery code was issued", body = StartRecoveryResponse),
        (status = 422, description = "Request contained invalid data")
    )
)]
#[post("/start_recovery")]
pub async fn start_recovery(
    state: web::Data<AppState>,
    data: web::Json<StartRecoverySchema>,
    lang: crate::models::lang::Lang,
) -> actix_web::Result<impl Responder> {
    let config = &state.config;
    let login_method = config.login_method;

    let login_value = nullify(match login_method {
        LoginMethod::Username => data.username.as_deref(),
        LoginMethod::Email => data.email.as_deref(),
        LoginMethod::Phone => data.phone.as_deref(),
    });

    let mut errors = FieldErrors::new();

    let user = match login_value {
        None => {
            errors.set(login_method.as_str(), "required");
            None
        }
        Some(value) => {
            let user = find_user_by_login(&state, value, login_method).await?;
            if user.is_none() && config.validate_login_not_found {
                errors.set(login_method.as_str(), "not_found");
            }
            user
        }
    };

    // Candidate contacts to deliver the code through. With username login
    // they come from the request, otherwise only the user's own stored
    // value for the login channel is eligible.
    let (email, phone) = match login_method {
        LoginMethod::Username => (nullify(data.email.as_deref()), nullify(data.phone.as_deref())),
        LoginMethod::Email => (user.as_ref().and_then(|user| user.email.clone()), None),
        LoginMethod::Phone => (None, user.as_ref().and_then(|user| user.phone.clone())),
    };

    let email_rule = EmailRule;
    let phone_rule = PhoneRule::new(
        config.phone_allow_nanp,
        config.phone_allow_e164,
        config.phone_allow_formatting,
    );
    let (email, phone, mut contact_errors) =
        validate_contact(user.as_ref(), email, phone, &email_rule, &phone_rule);

    // Single-channel login methods have no separate contact field in the
    // UI, so report generic contact errors under the login field.
    if matches!(login_method, LoginMethod::Email | LoginMethod::Phone) {
        contact_errors.rename("contact", login_method.as_str());
    }

    errors.merge(contact_errors);

    if !config.validate_contact_mismatch {
        errors.remove_if("phone", "mismatch");
        errors.remove_if("email", "mismatch");
    }

    if !errors.is_empty() {
        return Ok(errors.unprocessable());
    }

    let expiration = Utc::now().timestamp() + config.token_expiration;

    // Unknown account, or nothing to deliver through: answer as if a
    // recovery was issued, without persisting anything.
    let user = match user {
        Some(user) if email.is_some() || phone.is_some() => user,
        _ => {
            return Ok(HttpResponse::Created().json(StartRecoveryResponse {
                token: generate_token(),
                expiration_date_time: format_date_time(expiration),
            }));
        }
    };

    let recovery = Recovery {
        id: uuid::Uuid::new_v4(),
        user_id: user.id,
        token: generate_token(),
        code: generate_code(config.code_length),
        expiration,
        attempts: 0,
    };

    let mut conn = get_connection(&state)?;
    let insert = recovery.clone();
    match web::block(move || {
        use db_connector::schema::recoveries::dsl::*;

        diesel::insert_into(recoveries)
            .values(&insert)
            .execute(&mut conn)
    })
    .await
    {
        Ok(Ok(_)) => (),
        Ok(Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))) => {
            let mut errors = FieldErrors::new();
            errors.set("general", "insert");
            return Ok(errors.unprocessable());
        }
        Ok(Err(_err)) => return Err(Error::InternalError.into()),
        Err(_err) => return Err(Error::InternalError.into()),
    }

    // The notifier result decides the response, so the dispatch stays in
    // the request path instead of a fire-and-forget thread.
    let notifier = state.notifier.clone();
    let lang: String = lang.into();
    let send_user = user.clone();
    let send_recovery = recovery.clone();
    let sent = match web::block(move || {
        notifier.send_recovery_code(
            &send_user,
            &send_recovery,
            email.as_deref(),
            phone.as_deref(),
            &lang,
        )
    })
    .await
    {
        Ok(sent) => sent,
        Err(_err) => false,
    };

    if !sent {
        // The record stays; it expires on its own and the user can retry.
        let mut errors = FieldErrors::new();
        errors.set("general", "send");
        return Ok(errors.unprocessable());
    }

    Ok(HttpResponse::Created().json(StartRecoveryResponse {
        token: recovery.token,
        expiration_date_time: format_date_time(recovery.expiration),
    }))
}
