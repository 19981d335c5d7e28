use actix_web::{patch, web, HttpResponse, Responder};
use chrono::Utc;
use db_connector::models::recoveries::Recovery;
use diesel::{prelude::*, result::Error::NotFound};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::RecoveryConfig,
    error::{Error, FieldErrors},
    password::{hash_pass, PasswordRule},
    routes::auth::find_user_by_id,
    utils::{get_connection, nullify, web_block_unpacked},
    AppState,
};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct RecoverySchema {
    /// Token from the start_recovery response.
    pub token: String,
    /// Code that was delivered out-of-band.
    pub code: Option<String>,
    /// New password, unless password confirmation is configured.
    pub password: Option<String>,
    /// New password pair when password confirmation is configured.
    pub password1: Option<String>,
    pub password2: Option<String>,
}

/// Complete an account recovery by setting a new password.
#[utoipa::path(
    context_path = "/auth",
    request_body = RecoverySchema,
    responses(
        (status = 204, description = "The password was updated"),
        (status = 404, description = "No recovery exists for the token"),
        (status = 401, description = "The recovery is expired"),
        (status = 422, description = "Request contained invalid data")
    )
)]
#[patch("/recovery")]
pub async fn recovery(
    state: web::Data<AppState>,
    data: web::Json<RecoverySchema>,
) -> actix_web::Result<impl Responder> {
    let config = &state.config;

    let token_value = data.token.clone();
    let mut conn = get_connection(&state)?;
    let record: Recovery = web_block_unpacked(move || {
        use db_connector::schema::recoveries::dsl::*;

        match recoveries
            .filter(token.eq(&token_value))
            .select(Recovery::as_select())
            .get_result(&mut conn)
        {
            Ok(record) => Ok(record),
            Err(NotFound) => Err(Error::NotFound),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    let user = match find_user_by_id(&state, record.user_id).await? {
        Some(user) => user,
        None => {
            // The account is gone; a reset must not outlive it.
            delete_recovery(&state, record.id).await?;
            return Err(Error::NotFound.into());
        }
    };

    // Expired records do not consume attempts.
    if Utc::now().timestamp() >= record.expiration {
        let mut errors = FieldErrors::new();
        errors.set("general", "expired");
        return Ok(errors.unauthorized());
    }

    if record.attempts >= config.max_attempts {
        let mut errors = FieldErrors::new();
        errors.set("code", "attempts");
        return Ok(errors.unprocessable());
    }

    let (new_hash, mut errors) = validate_item_data(&data, config)?;

    // Only compare when the code itself was acceptable; the comparison is
    // exact and case sensitive.
    if !errors.contains("code")
        && nullify(data.code.as_deref()).as_deref() != Some(record.code.as_str())
    {
        errors.set("code", "mismatch");
    }

    // Every failed submission counts against the record, including ones
    // that never reached the code comparison.
    if !errors.is_empty() {
        increment_attempts(&state, record.id).await?;
        return Ok(errors.unprocessable());
    }

    let new_hash = match new_hash {
        Some(hash) => hash,
        None => return Err(Error::InternalError.into()),
    };

    let mut conn = get_connection(&state)?;
    let uid = user.id;
    web_block_unpacked(move || {
        use db_connector::schema::users::dsl::*;

        match diesel::update(users.find(uid))
            .set(password.eq(new_hash))
            .execute(&mut conn)
        {
            Ok(_) => Ok(()),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    // A completed recovery is spent; keeping it would allow repeated
    // resets with the same token and code until expiration.
    delete_recovery(&state, record.id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Validate code and password fields, returning the hashed password
/// candidate alongside the collected errors.
fn validate_item_data(
    data: &RecoverySchema,
    config: &RecoveryConfig,
) -> Result<(Option<String>, FieldErrors), Error> {
    let mut errors = FieldErrors::new();

    if nullify(data.code.as_deref()).is_none() {
        errors.set("code", "required");
    }

    let password = if config.require_password_confirmation {
        let password = nullify(data.password1.as_deref());
        let password2 = nullify(data.password2.as_deref());

        if password.is_none() {
            errors.set("password1", "required");
        }
        if password2.is_none() {
            errors.set("password2", "required");
        }
        if let (Some(first), Some(second)) = (&password, &password2) {
            if first != second {
                errors.set("password1", "mismatch");
            }
        }

        password
    } else {
        let password = nullify(data.password.as_deref());

        if password.is_none() {
            errors.set("password", "required");
        }

        password
    };

    let mut hashed = None;
    if let Some(candidate) = &password {
        let rule = PasswordRule::new(config.password_min_length);
        match rule.validate(candidate) {
            Err(reason) => errors.set("password", reason),
            Ok(()) => match hash_pass(candidate) {
                Ok(hash) => hashed = Some(hash),
                Err(_err) => return Err(Error::InternalError),
            },
        }
    }

    // In confirmation mode the UI only shows the first password field.
    if config.require_password_confirmation {
        if let Some(reason) = errors.take("password") {
            errors.set("password1", &reason);
        }
    }

    Ok((hashed, errors))
}

async fn increment_attempts(
    state: &web::Data<AppState>,
    recovery_id: uuid::Uuid,
) -> actix_web::Result<()> {
    let mut conn = get_connection(state)?;
    web_block_unpacked(move || {
        use db_connector::schema::recoveries::dsl::*;

        // Single update statement, safe against concurrent confirms.
        match diesel::update(recoveries.find(recovery_id))
            .set(attempts.eq(attempts + 1))
            .execute(&mut conn)
        {
            Ok(_) => Ok(()),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await
}

async fn delete_recovery(
    state: &web::Data<AppState>,
    recovery_id: uuid::Uuid,
) -> actix_web::Result<()> {
    let mut conn = get_connection(state)?;
    web_block_unpacked(move || {
        use db_connector::schema::recoveries::dsl::*;

        match diesel::delete(recoveries.find(recovery_id)).execute(&mut conn) {
            Ok(_) => Ok(()),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use actix_web::{
        http::header::ContentType,
        test::{self, TestRequest},
        App,
    };
    use chrono::Utc;
    use serde_json::json;

    use super::recovery;
    use crate::{
        config::RecoveryConfig,
        defer,
        password::password_matches,
        tests::{
            call_service, configure, create_test_user, delete_test_user, get_recovery_by_token,
            get_test_user, insert_test_recovery, test_state_with,
        },
    };

    #[actix_web::test]
    async fn test_unknown_token() {
        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": "unknown-token",
                "code": "12345",
                "password": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body = test::read_body(resp).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_expired_does_not_charge_attempts() {
        let name = "confirm_expired";
        let user = create_test_user(name, Some("confirm_expired@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() - 1, 0);

        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["general"], "expired");

        let record = get_recovery_by_token(&record.token).unwrap();
        assert_eq!(record.attempts, 0);
    }

    #[actix_web::test]
    async fn test_exhausted_attempts_block_even_correct_code() {
        let name = "confirm_exhausted";
        let user = create_test_user(name, Some("confirm_exhausted@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() + 600, 5);

        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["code"], "attempts");

        // Blocked before the counting branch; it stays at the limit.
        let record = get_recovery_by_token(&record.token).unwrap();
        assert_eq!(record.attempts, 5);
    }

    #[actix_web::test]
    async fn test_wrong_code_increments_attempts() {
        let name = "confirm_wrong_code";
        let user = create_test_user(name, Some("confirm_wrong_code@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() + 600, 0);

        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        for expected_attempts in 1..=2 {
            let req = TestRequest::patch()
                .uri("/recovery")
                .insert_header(ContentType::json())
                .set_json(json!({
                    "token": record.token,
                    "code": "00000",
                    "password": "NewPassword123"
                }))
                .to_request();
            let resp = call_service(&app, req).await;
            assert_eq!(resp.status(), 422);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["errors"]["code"], "mismatch");

            let record = get_recovery_by_token(&record.token).unwrap();
            assert_eq!(record.attempts, expected_attempts);
        }
    }

    #[actix_web::test]
    async fn test_missing_code_charges_attempt() {
        let name = "confirm_missing_code";
        let user = create_test_user(name, Some("confirm_missing_code@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() + 600, 0);

        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "password": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["code"], "required");

        let record = get_recovery_by_token(&record.token).unwrap();
        assert_eq!(record.attempts, 1);
    }

    #[actix_web::test]
    async fn test_missing_password() {
        let name = "confirm_missing_password";
        let user = create_test_user(name, Some("confirm_missing_password@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() + 600, 0);

        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["password"], "required");

        let record = get_recovery_by_token(&record.token).unwrap();
        assert_eq!(record.attempts, 1);
    }

    #[actix_web::test]
    async fn test_short_password() {
        let name = "confirm_short_password";
        let user = create_test_user(name, Some("confirm_short_password@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() + 600, 0);

        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password": "short"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["password"], "length");
    }

    #[actix_web::test]
    async fn test_password_confirmation_mode() {
        let name = "confirm_password_pair";
        let user = create_test_user(name, Some("confirm_password_pair@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() + 600, 0);

        let config = RecoveryConfig {
            require_password_confirmation: true,
            ..RecoveryConfig::default()
        };
        let (state, _) = test_state_with(config, false);
        let app = App::new().app_data(state).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password1": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["password2"], "required");

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password1": "NewPassword123",
                "password2": "OtherPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["password1"], "mismatch");

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password1": "short",
                "password2": "short"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["password1"], "length");

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password1": "NewPassword123",
                "password2": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 204);

        let user = get_test_user(name);
        assert!(password_matches("NewPassword123", &user.password).unwrap());
    }

    #[actix_web::test]
    async fn test_wrong_then_correct_code() {
        let name = "confirm_wrong_then_correct";
        let user = create_test_user(name, Some("confirm_wrong_then_correct@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() + 600, 0);

        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "00000",
                "password": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["code"], "mismatch");
        assert_eq!(get_recovery_by_token(&record.token).unwrap().attempts, 1);

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 204);
        let body = test::read_body(resp).await;
        assert!(body.is_empty());

        let user = get_test_user(name);
        assert!(password_matches("NewPassword123", &user.password).unwrap());
        assert!(!password_matches("TestTestTest", &user.password).unwrap());
    }

    #[actix_web::test]
    async fn test_success_consumes_record() {
        let name = "confirm_consumes_record";
        let user = create_test_user(name, Some("confirm_consumes_record@test.invalid"), None);
        defer!(delete_test_user(name));
        let record = insert_test_recovery(user.id, "12345", Utc::now().timestamp() + 600, 0);

        let app = App::new().configure(configure).service(recovery);
        let app = test::init_service(app).await;

        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password": "NewPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 204);
        assert!(get_recovery_by_token(&record.token).is_none());

        // Replaying the spent token is indistinguishable from an unknown one.
        let req = TestRequest::patch()
            .uri("/recovery")
            .insert_header(ContentType::json())
            .set_json(json!({
                "token": record.token,
                "code": "12345",
                "password": "OtherPassword123"
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
