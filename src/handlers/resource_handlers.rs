use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::auth::scope::{ResourceType, ScopeEngine};
use crate::auth::session::load_subject;
use crate::auth::subject::{ScopeOverrides, SubjectContextFactory};
use crate::errors::AppError;
use crate::models::predicate::ScopePredicate;
use crate::models::query::{SelectQuery, SortDir};
use crate::models::resource as rows;

const DEFAULT_PER_PAGE: i64 = 25;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub filiale_id: Option<i64>,
    pub user_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListParams {
    /// Narrowing only. Listings never carry a dashboard hint.
    pub fn overrides(&self) -> ScopeOverrides {
        ScopeOverrides {
            filter_user_id: self.user_id,
            filter_filiale_id: self.filiale_id,
            dashboard_scope: None,
        }
    }

    fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, 100)
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse {
    pub items: Vec<Value>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

async fn scoped_page(
    pool: &PgPool,
    table: &str,
    scope: &ScopePredicate,
    params: &ListParams,
) -> Result<PaginatedResponse, AppError> {
    let query = SelectQuery::from_table(table).scoped(scope);
    let total = rows::count(pool, &query).await?;
    let page_query = query
        .order_by("id", SortDir::Desc)
        .paginate(params.page(), params.per_page());
    let items = rows::fetch_page(pool, &page_query).await?;
    Ok(PaginatedResponse { items, page: params.page(), per_page: params.per_page(), total })
}

/// GET /api/resources/{resource}
/// Query params: filiale_id, user_id (narrowing), page, per_page
pub async fn list(
    pool: web::Data<PgPool>,
    factory: web::Data<SubjectContextFactory>,
    engine: web::Data<ScopeEngine>,
    session: Session,
    path: web::Path<String>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let resource = ResourceType::parse(&path).ok_or(AppError::NotFound)?;
    let ctx = load_subject(&session, &pool, &factory, params.overrides()).await?;
    let scope = engine.build(resource, &ctx);
    let response = scoped_page(&pool, resource.table(), &scope, &params).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/tickets/category/{category}
/// Unknown categories answer with an empty page.
pub async fn by_category(
    pool: web::Data<PgPool>,
    factory: web::Data<SubjectContextFactory>,
    engine: web::Data<ScopeEngine>,
    session: Session,
    path: web::Path<String>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let ctx = load_subject(&session, &pool, &factory, params.overrides()).await?;
    let scope = engine.build_ticket_category(&path, &ctx);
    let response = scoped_page(&pool, ResourceType::Tickets.table(), &scope, &params).await?;
    Ok(HttpResponse::Ok().json(response))
}
