pub mod catalog;
pub mod middleware;
pub mod probe;
pub mod scope;
pub mod session;
pub mod subject;
