pub mod executor;
pub mod manager;
pub mod models;
pub mod repository;

pub use executor::{Executor, JsonRow};
pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{CompanyRepository, JobRepository, ModelError, UserRepository};
