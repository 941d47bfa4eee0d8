pub mod manager;
pub mod models;
pub mod pagination;
pub mod query_builder;
pub mod repository;
pub mod schema;

pub use manager::{DatabaseError, DatabaseManager};
pub use pagination::{Page, PageRequest, PageWindow, Pagination};
pub use repository::{find_in, find_in_404, Entity, Repository};
