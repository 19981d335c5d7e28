use diesel::prelude::*;
use uuid::Uuid;

/// One outstanding password-recovery attempt. The token is the external
/// lookup key, the code is the out-of-band shared secret.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = crate::schema::recoveries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Recovery {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub code: String,
    pub expiration: i64,
    pub attempts: i32,
}
