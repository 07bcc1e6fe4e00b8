pub mod postgres_connection;
pub mod schema;
pub mod transaction;
