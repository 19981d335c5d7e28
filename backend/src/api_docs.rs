use std::net::Ipv4Addr;

use actix_web::{App, HttpServer};
pub use userhub::*;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/**
 * Start a server that hosts the api documentation.
 */
#[actix_web::main]
async fn main() {
    #[derive(OpenApi)]
    #[openapi(
        paths(
            routes::auth::start_recovery::start_recovery,
            routes::auth::recovery::recovery,
        ),
        components(schemas(
            routes::auth::start_recovery::StartRecoverySchema,
            routes::auth::start_recovery::StartRecoveryResponse,
            routes::auth::recovery::RecoverySchema,
        ))
    )]
    struct ApiDoc;

    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        App::new().service(SwaggerUi::new("/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind((Ipv4Addr::UNSPECIFIED, 12345))
    .unwrap()
    .run()
    .await
    .unwrap();
}
