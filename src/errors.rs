use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

use crate::models::predicate::builder::BuildError;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Migrate(sqlx::migrate::MigrateError),
    Query(BuildError),
    Config(String),
    Io(std::io::Error),
    Session(String),
    BadRequest(String),
    Forbidden(String),
    NotFound,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Migrate(e) => write!(f, "Migration error: {e}"),
            AppError::Query(e) => write!(f, "Query build error: {e}"),
            AppError::Config(e) => write!(f, "Configuration error: {e}"),
            AppError::Io(e) => write!(f, "I/O error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::BadRequest(e) => write!(f, "Bad request: {e}"),
            AppError::Forbidden(e) => write!(f, "Forbidden: {e}"),
            AppError::NotFound => write!(f, "Not found"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound => HttpResponse::NotFound().json(json!({ "error": "not found" })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({ "error": msg })),
            AppError::Forbidden(msg) => {
                log::warn!("Forbidden: {msg}");
                HttpResponse::Forbidden().json(json!({ "error": "forbidden" }))
            }
            AppError::Session(msg) => {
                log::warn!("Rejected request: {msg}");
                HttpResponse::Unauthorized().json(json!({ "error": "unauthorized" }))
            }
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError().json(json!({ "error": "internal server error" }))
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Migrate(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

impl From<BuildError> for AppError {
    fn from(e: BuildError) -> Self {
        AppError::Query(e)
    }
}
