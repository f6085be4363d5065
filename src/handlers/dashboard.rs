use std::collections::BTreeMap;

use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::scope::ScopeEngine;
use crate::auth::session::load_subject;
use crate::auth::subject::{DashboardScope, ScopeOverrides, SubjectContext, SubjectContextFactory};
use crate::errors::AppError;
use crate::models::query::SelectQuery;
use crate::models::resource as rows;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub scope: Option<DashboardScope>,
    pub counts: BTreeMap<&'static str, i64>,
}

pub fn parse_scope(raw: Option<&str>) -> Result<Option<DashboardScope>, AppError> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => DashboardScope::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("unknown scope {s:?}"))),
    }
}

/// The subject with the requested hint applied. A hint the subject holds no
/// reporting code for is refused.
pub fn with_hint(ctx: &SubjectContext, requested: Option<DashboardScope>) -> Result<SubjectContext, AppError> {
    if let Some(scope) = requested {
        if !ctx.permissions().has_any(scope.required_permissions()) {
            return Err(AppError::Forbidden(format!(
                "user {} may not request the {scope:?} dashboard scope",
                ctx.user_id()
            )));
        }
    }
    let overrides = ScopeOverrides { dashboard_scope: requested, ..*ctx.overrides() };
    Ok(ctx.with_overrides(overrides))
}

/// GET /api/dashboard?scope=global|filiale|department
/// Visible row count per resource type.
pub async fn index(
    pool: web::Data<PgPool>,
    factory: web::Data<SubjectContextFactory>,
    engine: web::Data<ScopeEngine>,
    session: Session,
    params: web::Query<DashboardParams>,
) -> Result<HttpResponse, AppError> {
    let scope = parse_scope(params.scope.as_deref())?;
    let subject = load_subject(&session, &pool, &factory, ScopeOverrides::default()).await?;
    let ctx = with_hint(&subject, scope)?;

    let mut counts = BTreeMap::new();
    for (resource, predicate) in engine.build_all(&ctx) {
        let query = SelectQuery::from_table(resource.table()).scoped(&predicate);
        counts.insert(resource.name(), rows::count(&pool, &query).await?);
    }

    Ok(HttpResponse::Ok().json(DashboardResponse { scope, counts }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scope_is_bad_request() {
        assert!(matches!(parse_scope(Some("planet")), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_scope(Some("")), Ok(None)));
        assert_eq!(parse_scope(Some("department")).unwrap(), Some(DashboardScope::Department));
    }
}
