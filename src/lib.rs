//! ITSM row-level authorization scoping.
//!
//! Given an authenticated user and a resource type, [`auth::scope::ScopeEngine`]
//! produces the predicate that restricts a listing query to the rows that user
//! may see. The HTTP layer in [`handlers`] attaches it to every query before
//! execution.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
