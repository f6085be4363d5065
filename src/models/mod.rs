pub mod permission;
pub mod predicate;
pub mod query;
pub mod resource;
pub mod subject;
