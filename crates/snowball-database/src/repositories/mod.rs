//! PostgreSQL store implementations.

pub mod email;
pub mod job;
pub mod repository;
pub mod user;

pub use email::PgEmailStore;
pub use job::PgJobStore;
pub use repository::PgRepositoryStore;
pub use user::PgUserStore;
