pub mod entities;
pub mod errors;
pub mod repositories;
pub mod transaction;
pub mod value_objects;
