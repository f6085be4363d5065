use actix_session::Session;
use sqlx::PgPool;

use crate::auth::subject::{ScopeOverrides, SubjectContext, SubjectContextFactory};
use crate::errors::AppError;
use crate::models::subject::find_subject_record;

/// Session key written by the login service.
pub const USER_ID_KEY: &str = "user_id";

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(USER_ID_KEY).unwrap_or(None)
}

/// Build the acting user's context for this request.
///
/// A session pointing at a user that no longer exists (or was soft-deleted)
/// is treated like no session at all.
pub async fn load_subject(
    session: &Session,
    pool: &PgPool,
    factory: &SubjectContextFactory,
    overrides: ScopeOverrides,
) -> Result<SubjectContext, AppError> {
    let user_id = get_user_id(session).ok_or_else(|| AppError::Session("no user in session".to_string()))?;
    let record = find_subject_record(pool, user_id)
        .await?
        .ok_or_else(|| AppError::Session(format!("user {user_id} not found or deleted")))?;
    Ok(factory.build(&record, overrides))
}
