pub mod mapping;
pub mod schema;
pub mod service;

pub use schema::{default_categories, ListKind, DEFAULT_CATEGORIES};
pub use service::{SharePointService, VIEW_COUNT_ATTEMPTS};
