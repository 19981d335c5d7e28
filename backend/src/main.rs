/* userhub
 * Copyright (C) 2025 The userhub authors
 *
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU
 * Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public
 * License along with this library; if not, write to the
 * Free Software Foundation, Inc., 59 Temple Place - Suite 330,
 * Boston, MA 02111-1307, USA.
 */

use std::{sync::Arc, time::Duration};

use actix_web::{
    middleware::{Compress, Logger},
    web, App, HttpServer,
};
use db_connector::{get_connection_pool, run_migrations};
use lettre::{transport::smtp::authentication::Credentials, SmtpTransport};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode,
};
pub use userhub::*;
use userhub::{config::RecoveryConfig, notify::SmtpNotifier, utils::get_connection};

fn cleanup_thread(state: web::Data<AppState>) {
    loop {
        std::thread::sleep(Duration::from_secs(60));

        let mut conn = match get_connection(&state) {
            Ok(c) => c,
            Err(_err) => {
                continue;
            }
        };

        clean_expired_recoveries(&mut conn);
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap()
        .build();

    #[cfg(debug_assertions)]
    let log_level = LevelFilter::Debug;
    #[cfg(not(debug_assertions))]
    let log_level = LevelFilter::Info;

    CombinedLogger::init(vec![TermLogger::new(
        log_level,
        log_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])
    .unwrap();

    dotenvy::dotenv().ok();

    let pool = get_connection_pool();
    let mut conn = pool.get().expect("Failed to get connection from pool");
    run_migrations(&mut conn).expect("Failed to run migrations");

    let mailer = {
        let email = std::env::var("EMAIL_USER").expect("EMAIL_USER must be set");
        let pass = std::env::var("EMAIL_PASS").expect("EMAIL_PASS must be set");
        let relay = std::env::var("EMAIL_RELAY").expect("EMAIL_RELAY must be set");
        let port: u16 = std::env::var("EMAIL_RELAY_PORT")
            .expect("EMAIL_RELAY_PORT must be set")
            .parse()
            .unwrap();
        SmtpTransport::relay(&relay)
            .unwrap()
            .port(port)
            .credentials(Credentials::new(email, pass))
            .build()
    };

    let notifier = SmtpNotifier {
        mailer,
        sender_email: std::env::var("SENDER_EMAIL").expect("SENDER_EMAIL must be set"),
        sender_name: std::env::var("SENDER_NAME").expect("SENDER_NAME must be set"),
    };

    let state = web::Data::new(AppState {
        pool,
        config: RecoveryConfig::from_env(),
        notifier: Arc::new(notifier),
    });

    let state_cpy = state.clone();
    std::thread::spawn(move || cleanup_thread(state_cpy));

    let server = HttpServer::new(move || {
        let cors = actix_cors::Cors::permissive();
        App::new()
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .app_data(state.clone())
            .service(web::scope("/api").configure(routes::configure))
    });

    #[cfg(debug_assertions)]
    let port = "8081";
    #[cfg(not(debug_assertions))]
    let port = "8080";

    let addr = format!("0.0.0.0:{port}");

    server.bind(&addr)?.run().await?;

    Ok(())
}
