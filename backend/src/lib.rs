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

use std::sync::Arc;

use chrono::Utc;
use db_connector::Pool;
use diesel::{prelude::*, r2d2::PooledConnection};

use crate::{config::RecoveryConfig, notify::CodeNotifier};

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod password;
pub mod routes;
pub mod utils;
pub mod validation;

pub struct AppState {
    pub pool: Pool,
    pub config: RecoveryConfig,
    pub notifier: Arc<dyn CodeNotifier>,
}

pub fn clean_expired_recoveries(
    conn: &mut PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
) {
    use db_connector::schema::recoveries::dsl::*;

    diesel::delete(recoveries.filter(expiration.lt(Utc::now().timestamp())))
        .execute(conn)
        .ok();
}
