pub mod backup;
pub mod crypto;
pub mod errors;
pub mod models;
pub mod validate;
